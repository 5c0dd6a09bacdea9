//! Commute estimates: local heuristics and provider-backed routes.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::epoch::EpochClock;
use crate::model::{LatLon, Listing, ListingId, NearestInstitution, RouteEstimate, TravelMode};
use crate::ports::{PortError, RoutePort, RoutedLeg};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
/// Heuristic travel minutes for every mode over one distance.
pub struct CommuteTimes {
    /// Planar distance in kilometres.
    pub distance_km: f64,
    /// Minutes on foot.
    pub walking_min: u32,
    /// Minutes by bicycle.
    pub cycling_min: u32,
    /// Minutes by motorized transport.
    pub driving_min: u32,
}

impl CommuteTimes {
    /// Heuristic minutes for a distance.
    #[must_use]
    pub fn for_distance(distance_km: f64) -> Self {
        Self {
            distance_km,
            walking_min: whole_minutes(distance_km, TravelMode::Walking),
            cycling_min: whole_minutes(distance_km, TravelMode::Cycling),
            driving_min: whole_minutes(distance_km, TravelMode::Driving),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// Commute summary from one listing to the nearest institution.
pub struct ListingCommute {
    /// Listing the summary belongs to.
    pub listing_id: ListingId,
    /// Heuristic times.
    pub times: CommuteTimes,
}

/// Produces heuristic summaries and routed estimates. Only the latest routed lookup is live.
pub struct CommuteEstimator {
    router: Option<Arc<dyn RoutePort>>,
    lookups: EpochClock,
}

impl CommuteEstimator {
    /// Create an estimator; without a router every routed lookup falls back to the heuristic.
    #[must_use]
    pub fn new(router: Option<Arc<dyn RoutePort>>) -> Self {
        Self {
            router,
            lookups: EpochClock::new(),
        }
    }

    /// Heuristic times from every listing to the institution. No network.
    #[must_use]
    pub fn summaries(
        &self,
        institution: &NearestInstitution,
        listings: &[Listing],
    ) -> Vec<ListingCommute> {
        listings
            .iter()
            .map(|listing| ListingCommute {
                listing_id: listing.id.clone(),
                times: CommuteTimes::for_distance(
                    listing
                        .position()
                        .planar_distance_km(institution.place.position),
                ),
            })
            .collect()
    }

    /// Routed estimate, falling back to the heuristic when the router is absent or fails.
    ///
    /// Starting a lookup supersedes any lookup still in flight.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Aborted`] when a newer lookup started before this one finished.
    pub async fn route(
        &self,
        origin: LatLon,
        destination: LatLon,
        mode: TravelMode,
    ) -> Result<RouteEstimate, PortError> {
        let guard = self.lookups.begin();

        let estimate = match &self.router {
            Some(router) => match router.route(origin, destination, mode).await {
                Ok(leg) => routed_estimate(leg, mode),
                Err(err) => {
                    warn!(error = %err, %mode, "Routing failed, using heuristic estimate");
                    heuristic_estimate(origin, destination, mode)
                }
            },
            None => {
                debug!(%mode, "No router configured, using heuristic estimate");
                heuristic_estimate(origin, destination, mode)
            }
        };

        guard.ensure_current()?;
        Ok(estimate)
    }
}

/// Locally computed estimate, flagged with `is_estimated = true`.
#[must_use]
pub fn heuristic_estimate(origin: LatLon, destination: LatLon, mode: TravelMode) -> RouteEstimate {
    let distance_km = origin.planar_distance_km(destination);
    let distance_meters = distance_km * 1000.0;
    let duration_seconds = distance_km * mode.minutes_per_km() * 60.0;
    RouteEstimate {
        distance_text: format_distance(distance_meters),
        duration_text: format_duration(duration_seconds),
        distance_meters: saturate(distance_meters),
        duration_seconds: saturate(duration_seconds),
        mode,
        is_estimated: true,
    }
}

fn routed_estimate(leg: RoutedLeg, mode: TravelMode) -> RouteEstimate {
    RouteEstimate {
        distance_text: format_distance(leg.distance_meters),
        duration_text: format_duration(leg.duration_seconds),
        distance_meters: saturate(leg.distance_meters),
        duration_seconds: saturate(leg.duration_seconds),
        mode,
        is_estimated: false,
    }
}

/// `"850 m"` below one kilometre, `"1.2 km"` above. The unit is picked after rounding.
#[must_use]
pub fn format_distance(meters: f64) -> String {
    let rounded = saturate(meters);
    if rounded < 1000 {
        format!("{rounded} m")
    } else {
        format!("{:.1} km", meters / 1000.0)
    }
}

/// `"14 min"` below one hour, `"1 h 5 min"` above.
#[must_use]
pub fn format_duration(seconds: f64) -> String {
    let minutes = saturate(seconds / 60.0);
    if minutes < 60 {
        format!("{minutes} min")
    } else {
        format!("{} h {} min", minutes / 60, minutes % 60)
    }
}

fn whole_minutes(distance_km: f64, mode: TravelMode) -> u32 {
    saturate(distance_km * mode.minutes_per_km())
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "float-to-int casts saturate; the value is rounded first"
)]
fn saturate(value: f64) -> u32 {
    value.round() as u32
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::category::INSTITUTION;
    use crate::model::KM_PER_DEGREE;
    use crate::testing::{MockRouter, listing, place};

    const ORIGIN: LatLon = LatLon::new(0.0, 0.0);

    fn two_km_north() -> LatLon {
        LatLon::new(2.0 / KM_PER_DEGREE, 0.0)
    }

    #[test]
    fn heuristic_uses_minutes_per_km() {
        let times = CommuteTimes::for_distance(2.0);

        assert_eq!(times.walking_min, 24);
        assert_eq!(times.cycling_min, 6);
        assert_eq!(times.driving_min, 4);
    }

    #[test]
    fn formatting_switches_units() {
        assert_eq!(format_distance(850.0), "850 m");
        assert_eq!(format_distance(1234.0), "1.2 km");
        assert_eq!(format_distance(999.4), "999 m");
        assert_eq!(format_distance(999.6), "1.0 km");
        assert_eq!(format_duration(14.0 * 60.0), "14 min");
        assert_eq!(format_duration(65.0 * 60.0), "1 h 5 min");
    }

    #[test]
    fn summaries_cover_every_listing() {
        let estimator = CommuteEstimator::new(None);
        let institution = NearestInstitution {
            place: place("campus", INSTITUTION, 0.0, 0.0),
            distance_km: 0.0,
        };
        let listings = vec![
            listing("near", 1.0 / KM_PER_DEGREE, 0.0, 9000),
            listing("far", 3.0 / KM_PER_DEGREE, 0.0, 7000),
        ];

        let summaries = estimator.summaries(&institution, &listings);

        let walking: Vec<u32> = summaries.iter().map(|summary| summary.times.walking_min).collect();
        assert_eq!(walking, [12, 36]);
    }

    #[tokio::test]
    async fn unreachable_router_falls_back_to_heuristic() {
        let estimator = CommuteEstimator::new(Some(Arc::new(MockRouter::unreachable())));

        let estimate = estimator
            .route(ORIGIN, two_km_north(), TravelMode::Walking)
            .await
            .expect("fallback never fails");

        assert!(estimate.is_estimated);
        assert_eq!(estimate.distance_meters, 2000);
        assert_eq!(estimate.duration_seconds, 24 * 60);
        assert_eq!(estimate.duration_text, "24 min");
        assert_eq!(estimate, heuristic_estimate(ORIGIN, two_km_north(), TravelMode::Walking));
    }

    #[tokio::test]
    async fn missing_router_falls_back_to_heuristic() {
        let estimator = CommuteEstimator::new(None);

        let estimate = estimator
            .route(ORIGIN, two_km_north(), TravelMode::Driving)
            .await
            .expect("fallback never fails");

        assert!(estimate.is_estimated);
        assert_eq!(estimate.duration_seconds, 4 * 60);
    }

    #[tokio::test]
    async fn provider_answers_are_not_flagged() {
        let estimator = CommuteEstimator::new(Some(Arc::new(MockRouter::answering(3100.0, 540.0))));

        let estimate = estimator
            .route(ORIGIN, two_km_north(), TravelMode::Cycling)
            .await
            .expect("router answers");

        assert!(!estimate.is_estimated);
        assert_eq!(estimate.distance_text, "3.1 km");
        assert_eq!(estimate.duration_text, "9 min");
    }

    #[tokio::test(start_paused = true)]
    async fn newer_lookup_supersedes_in_flight_one() {
        let router = MockRouter::answering(1000.0, 300.0).with_delay(Duration::from_millis(500));
        let estimator = CommuteEstimator::new(Some(Arc::new(router)));

        let (first, second) = tokio::join!(
            estimator.route(ORIGIN, two_km_north(), TravelMode::Walking),
            async {
                tokio::time::sleep(Duration::from_millis(100)).await;
                estimator.route(ORIGIN, two_km_north(), TravelMode::Driving).await
            }
        );

        assert!(first.is_err_and(|err| err.is_aborted()));
        assert!(second.is_ok_and(|estimate| estimate.mode == TravelMode::Driving));
    }
}
