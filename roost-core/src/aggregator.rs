//! Amenity aggregation: composite query, mirror failover, parsing and classification.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::category::CategorySet;
use crate::epoch::EpochGuard;
use crate::model::{Element, LatLon, Place, PlaceId};
use crate::ports::{AmenitySource, PortError};

/// Display name for elements that carry neither a name nor an operator tag.
pub const UNNAMED_PLACE: &str = "Unnamed place";

/// Queries mirrors in priority order and turns the first successful answer into places.
pub struct AmenityAggregator {
    mirrors: Vec<Arc<dyn AmenitySource>>,
    attempt_timeout: Duration,
}

impl AmenityAggregator {
    /// Create an aggregator over the given mirrors.
    #[must_use]
    pub fn new(mirrors: Vec<Arc<dyn AmenitySource>>, attempt_timeout: Duration) -> Self {
        Self {
            mirrors,
            attempt_timeout,
        }
    }

    /// Fetch and classify amenities around `center`.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::AllEndpointsFailed`] when no mirror produced an answer.
    pub async fn fetch_amenities(
        &self,
        center: LatLon,
        radius_m: u32,
        categories: &CategorySet,
    ) -> Result<Vec<Place>, PortError> {
        self.run(center, radius_m, categories, None).await
    }

    /// Like [`Self::fetch_amenities`], but gives up once `guard` is superseded.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Aborted`] when a newer request took over, or
    /// [`PortError::AllEndpointsFailed`] when no mirror produced an answer.
    pub async fn fetch_amenities_for(
        &self,
        center: LatLon,
        radius_m: u32,
        categories: &CategorySet,
        guard: &EpochGuard,
    ) -> Result<Vec<Place>, PortError> {
        self.run(center, radius_m, categories, Some(guard)).await
    }

    async fn run(
        &self,
        center: LatLon,
        radius_m: u32,
        categories: &CategorySet,
        guard: Option<&EpochGuard>,
    ) -> Result<Vec<Place>, PortError> {
        let Some(query) = build_query(center, radius_m, categories, self.attempt_timeout) else {
            debug!("No tag matchers enabled, skipping amenity query");
            return Ok(Vec::new());
        };

        let mut attempted = 0;
        for mirror in &self.mirrors {
            if let Some(guard) = guard {
                guard.ensure_current()?;
            }
            attempted += 1;
            let endpoint = mirror.endpoint();

            let outcome = tokio::time::timeout(self.attempt_timeout, mirror.execute(&query))
                .await
                .unwrap_or(Err(PortError::Timeout(self.attempt_timeout)));

            match outcome {
                Ok(elements) => {
                    if let Some(guard) = guard {
                        guard.ensure_current()?;
                    }
                    let received = elements.len();
                    let places = parse_elements(elements, categories);
                    info!(
                        endpoint,
                        received,
                        kept = places.len(),
                        radius_m,
                        "Amenities loaded"
                    );
                    return Ok(places);
                }
                Err(err) => {
                    warn!(endpoint, error = %err, "Amenity mirror failed, trying next");
                }
            }
        }

        Err(PortError::AllEndpointsFailed {
            attempted,
            radius_m,
            categories: categories.enabled().count(),
        })
    }
}

/// Build the composite query for every enabled category, or `None` when nothing is enabled.
#[must_use]
pub fn build_query(
    center: LatLon,
    radius_m: u32,
    categories: &CategorySet,
    timeout: Duration,
) -> Option<String> {
    let mut seen = Vec::new();
    for matcher in categories.enabled().flat_map(|filter| &filter.tag_matchers) {
        if !seen.contains(&matcher) {
            seen.push(matcher);
        }
    }
    if seen.is_empty() {
        return None;
    }

    let clauses: Vec<String> = seen
        .into_iter()
        .map(|matcher| {
            format!(
                "  nwr[\"{}\"=\"{}\"](around:{radius_m},{},{});",
                matcher.key, matcher.value, center.lat, center.lon
            )
        })
        .collect();
    let query = format!(
        "[out:json][timeout:{}];\n(\n{}\n);\nout center tags;",
        timeout.as_secs(),
        clauses.join("\n")
    );
    Some(query)
}

/// Turn raw elements into classified places, silently dropping malformed ones.
#[must_use]
pub fn parse_elements(elements: Vec<Element>, categories: &CategorySet) -> Vec<Place> {
    let mut places = Vec::with_capacity(elements.len());
    let mut dropped = 0_usize;
    for element in elements {
        match place_from_element(element, categories) {
            Ok(place) => places.push(place),
            Err(err) => {
                dropped += 1;
                debug!(error = %err, "Dropping amenity element");
            }
        }
    }
    if dropped > 0 {
        debug!(dropped, "Dropped malformed or unclassified elements");
    }
    places
}

/// Build a single place from a provider element.
///
/// # Errors
///
/// Returns [`PortError::MalformedElement`] when the element has no coordinates or
/// matches no enabled category.
pub fn place_from_element(element: Element, categories: &CategorySet) -> Result<Place, PortError> {
    let id = PlaceId::from_element(&element.kind, element.id);
    let position = element
        .position()
        .ok_or_else(|| PortError::MalformedElement(format!("{id} has no coordinates")))?;
    let category = categories
        .classify(&element.tags)
        .map(|filter| filter.id.clone())
        .ok_or_else(|| PortError::MalformedElement(format!("{id} matches no enabled category")))?;

    let tag = |key: &str| {
        element
            .tags
            .get(key)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    };
    let name = tag("name")
        .or_else(|| tag("operator"))
        .unwrap_or(UNNAMED_PLACE)
        .to_owned();
    let opening_hours = element.tags.get("opening_hours").cloned();

    Ok(Place {
        id,
        name,
        category,
        position,
        raw_tags: element.tags,
        opening_hours,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::{FOOD, GYM, INSTITUTION};
    use crate::testing::{MirrorBehaviour, MockMirror, element};

    const CENTER: LatLon = LatLon::new(19.1334, 72.9133);

    fn aggregator(mirrors: Vec<Arc<dyn AmenitySource>>) -> AmenityAggregator {
        AmenityAggregator::new(mirrors, Duration::from_secs(25))
    }

    #[test]
    fn query_combines_enabled_matchers_once() {
        let mut categories = CategorySet::catalogue();
        for id in ["transport", "hospital", "pharmacy", "grocery", "atm", "police", GYM] {
            categories.set_enabled(id, false);
        }

        let query = build_query(CENTER, 1200, &categories, Duration::from_secs(25))
            .expect("institution keeps the query non-empty");

        assert!(query.starts_with("[out:json][timeout:25];"));
        assert!(query.contains("nwr[\"amenity\"=\"university\"](around:1200,19.1334,72.9133);"));
        assert!(query.contains("nwr[\"amenity\"=\"cafe\"](around:1200,19.1334,72.9133);"));
        assert!(!query.contains("bus_stop"));
        assert!(query.ends_with("out center tags;"));
        assert_eq!(query.matches("\"restaurant\"").count(), 1);
    }

    #[test]
    fn empty_category_set_builds_no_query() {
        let categories = CategorySet::new(Vec::new());

        assert!(build_query(CENTER, 500, &categories, Duration::from_secs(5)).is_none());
    }

    #[test]
    fn parsing_uses_centroids_and_name_fallbacks() {
        let categories = CategorySet::catalogue();
        let mut way = element("way", 7, None, &[("amenity", "cafe"), ("operator", "Chai Co")]);
        way.center = Some(crate::model::Centroid {
            lat: 19.2,
            lon: 72.9,
        });
        let elements = vec![
            element("node", 1, Some((19.1, 72.9)), &[("amenity", "restaurant"), ("name", "Dosa Hut")]),
            way,
            element("node", 2, Some((19.1, 72.9)), &[("amenity", "restaurant")]),
            element("node", 3, None, &[("amenity", "restaurant"), ("name", "Ghost")]),
            element("node", 4, Some((19.1, 72.9)), &[("shop", "bakery")]),
        ];

        let places = parse_elements(elements, &categories);

        let names: Vec<&str> = places.iter().map(|place| place.name.as_str()).collect();
        assert_eq!(names, ["Dosa Hut", "Chai Co", UNNAMED_PLACE]);
        assert!(places.iter().all(|place| place.category.as_str() == FOOD));
        assert_eq!(
            places.get(1).map(|place| place.id.0.as_str()),
            Some("way/7")
        );
        assert_eq!(
            places.get(1).map(|place| place.position),
            Some(LatLon::new(19.2, 72.9))
        );
    }

    #[test]
    fn element_matching_two_categories_goes_to_the_first_declared() {
        let categories = CategorySet::catalogue();
        let cafe_gym = element(
            "node",
            9,
            Some((19.0, 72.0)),
            &[("leisure", "fitness_centre"), ("amenity", "cafe")],
        );

        let place = place_from_element(cafe_gym, &categories).expect("classifiable");

        assert_eq!(place.category.as_str(), FOOD);
    }

    #[test]
    fn institution_wins_over_later_categories() {
        let categories = CategorySet::catalogue();
        let campus = element(
            "way",
            11,
            Some((19.0, 72.0)),
            &[("amenity", "university"), ("leisure", "sports_centre")],
        );

        let place = place_from_element(campus, &categories).expect("classifiable");

        assert_eq!(place.category.as_str(), INSTITUTION);
        assert_ne!(place.category.as_str(), GYM);
    }

    #[tokio::test(start_paused = true)]
    async fn fails_over_to_the_third_mirror() {
        let hanging = MockMirror::new("primary", MirrorBehaviour::Hang);
        let broken = MockMirror::new("secondary", MirrorBehaviour::Fail(503));
        let healthy = MockMirror::new(
            "tertiary",
            MirrorBehaviour::Respond(vec![element(
                "node",
                1,
                Some((19.1, 72.9)),
                &[("amenity", "university"), ("name", "IIT Bombay")],
            )]),
        );
        let calls = [hanging.calls(), broken.calls(), healthy.calls()];
        let aggregator = aggregator(vec![Arc::new(hanging), Arc::new(broken), Arc::new(healthy)]);

        let places = aggregator
            .fetch_amenities(CENTER, 1500, &CategorySet::catalogue())
            .await
            .expect("third mirror answers");

        assert_eq!(places.len(), 1);
        assert_eq!(calls.map(|counter| counter.get()), [1, 1, 1]);
    }

    #[tokio::test(start_paused = true)]
    async fn reports_all_endpoints_failed_with_context() {
        let aggregator = aggregator(vec![
            Arc::new(MockMirror::new("a", MirrorBehaviour::Fail(500))),
            Arc::new(MockMirror::new("b", MirrorBehaviour::Hang)),
        ]);
        let mut categories = CategorySet::catalogue();
        categories.set_enabled(GYM, false);

        let err = aggregator
            .fetch_amenities(CENTER, 900, &categories)
            .await
            .expect_err("every mirror fails");

        assert!(matches!(
            err,
            PortError::AllEndpointsFailed {
                attempted: 2,
                radius_m: 900,
                categories: 8
            }
        ));
        assert!(err.to_string().contains("900 m"));
    }

    #[tokio::test]
    async fn superseded_run_reports_aborted() {
        let clock = crate::epoch::EpochClock::new();
        let guard = clock.begin();
        let _newer = clock.begin();
        let mirror = MockMirror::new("only", MirrorBehaviour::Respond(Vec::new()));
        let calls = mirror.calls();
        let aggregator = aggregator(vec![Arc::new(mirror)]);

        let err = aggregator
            .fetch_amenities_for(CENTER, 1500, &CategorySet::catalogue(), &guard)
            .await
            .expect_err("stale guard");

        assert!(err.is_aborted());
        assert_eq!(calls.get(), 0);
    }
}
