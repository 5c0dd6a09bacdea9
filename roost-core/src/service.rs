//! High-level service facade wiring providers into the engine components.

use std::sync::Arc;

use tracing::info;

use crate::aggregator::AmenityAggregator;
use crate::commute::CommuteEstimator;
use crate::config::EngineConfig;
use crate::coordinator::RefreshCoordinator;
use crate::providers::ProviderSet;
use crate::suggest::SuggestionProvider;

/// Public entry point bundling the refresh coordinator and the suggestion provider.
pub struct RoostService {
    coordinator: Arc<RefreshCoordinator>,
    suggestions: Arc<SuggestionProvider>,
}

impl RoostService {
    /// Build the engine on top of the given providers.
    #[must_use]
    pub fn new(providers: ProviderSet, config: &EngineConfig) -> Self {
        info!(
            mirrors = ?providers.mirror_endpoints().collect::<Vec<_>>(),
            routed = providers.router.is_some(),
            "Starting location engine"
        );

        let suggestions = Arc::new(SuggestionProvider::new(providers.geocoder, config));
        let aggregator = AmenityAggregator::new(providers.amenity_mirrors, config.attempt_timeout);
        let commute = CommuteEstimator::new(providers.router);
        let coordinator = Arc::new(RefreshCoordinator::new(
            aggregator,
            providers.listings,
            Arc::clone(&suggestions),
            commute,
            config,
        ));

        Self {
            coordinator,
            suggestions,
        }
    }

    /// Coordinator owning the published snapshot.
    #[must_use]
    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    /// Debounced place-name suggestions.
    #[must_use]
    pub fn suggestions(&self) -> &Arc<SuggestionProvider> {
        &self.suggestions
    }
}
