//! Debounced place-name suggestions and reverse resolution.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::epoch::EpochClock;
use crate::model::{LatLon, Suggestion};
use crate::ports::GeocodePort;

/// Label used when a point cannot be reverse-resolved.
pub const FALLBACK_LABEL: &str = "Current location";

/// Resolves typed text into place suggestions once the input settles.
pub struct SuggestionProvider {
    geocoder: Arc<dyn GeocodePort>,
    debounce: Duration,
    min_chars: usize,
    limit: usize,
    keystrokes: EpochClock,
}

impl SuggestionProvider {
    /// Create a provider using the debounce and limits from `config`.
    #[must_use]
    pub fn new(geocoder: Arc<dyn GeocodePort>, config: &EngineConfig) -> Self {
        Self {
            geocoder,
            debounce: config.debounce,
            min_chars: config.min_query_chars,
            limit: config.suggestion_limit,
            keystrokes: EpochClock::new(),
        }
    }

    /// Feed the current input text.
    ///
    /// Resolves to `None` when newer input arrived during the debounce window or while the
    /// lookup was in flight. Input shorter than the minimum yields an empty list without
    /// calling the geocoder.
    pub async fn on_input(&self, text: &str) -> Option<Vec<Suggestion>> {
        let guard = self.keystrokes.begin();
        tokio::time::sleep(self.debounce).await;
        if !guard.is_current() {
            return None;
        }

        let query = text.trim();
        if query.chars().count() < self.min_chars {
            return Some(Vec::new());
        }

        let suggestions = self.suggest(query).await;
        guard.is_current().then_some(suggestions)
    }

    /// Query the geocoder immediately, best match first. Failures yield an empty list.
    pub async fn suggest(&self, query: &str) -> Vec<Suggestion> {
        match self.geocoder.search(query, self.limit).await {
            Ok(mut suggestions) => {
                suggestions.sort_by(|left, right| right.importance.total_cmp(&left.importance));
                suggestions.truncate(self.limit);
                debug!(query, found = suggestions.len(), "Suggestions resolved");
                suggestions
            }
            Err(err) => {
                warn!(query, error = %err, "Suggestion lookup failed");
                Vec::new()
            }
        }
    }

    /// Human label for a point, or [`FALLBACK_LABEL`] when the geocoder cannot help.
    pub async fn reverse_resolve(&self, point: LatLon) -> String {
        match self.geocoder.reverse(point).await {
            Ok(label) if !label.trim().is_empty() => label,
            Ok(_blank) => FALLBACK_LABEL.to_owned(),
            Err(err) => {
                warn!(%point, error = %err, "Reverse lookup failed");
                FALLBACK_LABEL.to_owned()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockGeocoder, suggestion};

    fn provider(geocoder: MockGeocoder) -> SuggestionProvider {
        SuggestionProvider::new(Arc::new(geocoder), &EngineConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn typing_burst_issues_one_query_for_settled_text() {
        let geocoder = MockGeocoder::new().on_search(
            "IIT",
            vec![suggestion("IIT Bombay", 19.13, 72.91, 0.7)],
        );
        let queries = geocoder.queries();
        let provider = provider(geocoder);

        let (first, second, third) = tokio::join!(
            provider.on_input("I"),
            async {
                tokio::time::sleep(Duration::from_millis(80)).await;
                provider.on_input("II").await
            },
            async {
                tokio::time::sleep(Duration::from_millis(160)).await;
                provider.on_input("IIT").await
            }
        );

        assert!(first.is_none());
        assert!(second.is_none());
        assert_eq!(third.map(|found| found.len()), Some(1));
        assert_eq!(queries.recorded(), ["IIT"]);
    }

    #[tokio::test(start_paused = true)]
    async fn short_input_never_reaches_the_geocoder() {
        let geocoder = MockGeocoder::new();
        let queries = geocoder.queries();
        let provider = provider(geocoder);

        let result = provider.on_input(" I ").await;

        assert_eq!(result, Some(Vec::new()));
        assert!(queries.recorded().is_empty());
    }

    #[tokio::test]
    async fn results_are_sorted_by_importance() {
        let provider = provider(MockGeocoder::new().on_search(
            "powai",
            vec![
                suggestion("Powai Lake", 19.12, 72.90, 0.4),
                suggestion("Powai", 19.11, 72.90, 0.9),
                suggestion("Powai Plaza", 19.12, 72.91, 0.6),
            ],
        ));

        let names: Vec<String> = provider
            .suggest("powai")
            .await
            .into_iter()
            .map(|found| found.display_name)
            .collect();

        assert_eq!(names, ["Powai", "Powai Plaza", "Powai Lake"]);
    }

    #[tokio::test]
    async fn reverse_failures_degrade_to_placeholder() {
        let provider = provider(MockGeocoder::new());

        let label = provider.reverse_resolve(LatLon::new(19.0, 72.0)).await;

        assert_eq!(label, FALLBACK_LABEL);
    }

    #[tokio::test]
    async fn reverse_success_returns_provider_label() {
        let provider = provider(MockGeocoder::new().with_reverse("Hiranandani Gardens, Powai"));

        let label = provider.reverse_resolve(LatLon::new(19.0, 72.0)).await;

        assert_eq!(label, "Hiranandani Gardens, Powai");
    }
}
