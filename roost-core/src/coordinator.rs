//! Single entry point for location and filter changes, and owner of the published snapshot.
//!
//! Every trigger starts a new [`RequestEpoch`]. Results are applied only while their epoch
//! is still current, so a slow earlier request can never overwrite a newer one, and every
//! data slice in a snapshot always comes from the same epoch.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::aggregator::AmenityAggregator;
use crate::category::CategorySet;
use crate::commute::{CommuteEstimator, ListingCommute};
use crate::config::EngineConfig;
use crate::epoch::{EpochClock, EpochGuard, RequestEpoch};
use crate::institution::nearest_institution;
use crate::model::{
    LatLon, Listing, ListingId, LocationInsights, NearestInstitution, Place, RouteEstimate,
    Suggestion, TravelMode,
};
use crate::ports::{ListingPort, ListingQuery, PortError};
use crate::scoring::compute_insights;
use crate::suggest::SuggestionProvider;

#[derive(Debug, Clone, PartialEq)]
/// Everything that can start a refresh.
pub enum Trigger {
    /// First position fix from the device.
    GeolocationFix(LatLon),
    /// Free text committed without picking a suggestion; resolved to the top match.
    ManualSearch(String),
    /// A suggestion was picked.
    SuggestionSelected(Suggestion),
    /// The user asked to jump back to their own position.
    UseCurrentLocation(LatLon),
    /// A category was switched on or off.
    CategoryToggle(String),
    /// New search radius in metres.
    RadiusChange(u32),
    /// New upper price bound for listings.
    BudgetChange(Option<u32>),
}

impl Trigger {
    /// Short name for logs.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::GeolocationFix(_) => "geolocation_fix",
            Self::ManualSearch(_) => "manual_search",
            Self::SuggestionSelected(_) => "suggestion_selected",
            Self::UseCurrentLocation(_) => "use_current_location",
            Self::CategoryToggle(_) => "category_toggle",
            Self::RadiusChange(_) => "radius_change",
            Self::BudgetChange(_) => "budget_change",
        }
    }

    /// Apply the change to `params`. Returns `false` when nothing changed.
    fn apply(&self, params: &mut RefreshParams) -> bool {
        match self {
            Self::GeolocationFix(point) | Self::UseCurrentLocation(point) => {
                params.center = Some(*point);
                true
            }
            Self::SuggestionSelected(suggestion) => {
                params.center = Some(suggestion.position);
                true
            }
            Self::CategoryToggle(id) => params.categories.toggle(id),
            Self::RadiusChange(radius_m) => {
                let changed = params.radius_m != *radius_m;
                params.radius_m = *radius_m;
                changed
            }
            Self::BudgetChange(max_price) => {
                let changed = params.max_price != *max_price;
                params.max_price = *max_price;
                changed
            }
            // Geocoded into a SuggestionSelected before it is committed.
            Self::ManualSearch(_) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Parameters of the current refresh.
pub struct RefreshParams {
    /// Reference point, unknown until the first location trigger.
    pub center: Option<LatLon>,
    /// Search radius in metres.
    pub radius_m: u32,
    /// Upper price bound for listings.
    pub max_price: Option<u32>,
    /// Category filters in effect.
    pub categories: CategorySet,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Lifecycle of the current epoch.
pub enum RefreshStatus {
    /// Nothing requested yet.
    Idle,
    /// A refresh is in flight.
    Loading,
    /// Data for the current epoch is available.
    Ready,
    /// Amenity aggregation failed for the current epoch.
    Failed {
        /// Summarized, user-facing explanation.
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
/// All data slices produced by one epoch. Applied together or not at all.
pub struct EpochData {
    /// Epoch that produced the data.
    pub epoch: RequestEpoch,
    /// Completion time.
    pub refreshed_at: DateTime<Utc>,
    /// Reference point the data was computed for.
    pub center: LatLon,
    /// Classified amenities.
    pub places: Vec<Place>,
    /// Scores derived from `places`; absent when aggregation failed.
    pub insights: Option<LocationInsights>,
    /// Closest institution to `center`.
    pub nearest: Option<NearestInstitution>,
    /// Listings around `center`.
    pub listings: Vec<Listing>,
    /// Heuristic commute from each listing to `nearest`.
    pub commutes: Vec<ListingCommute>,
}

#[derive(Debug, Clone, PartialEq)]
/// Routed lookup for one listing.
pub struct RouteSelection {
    /// Listing the route starts from.
    pub listing_id: ListingId,
    /// The estimate itself.
    pub estimate: RouteEstimate,
}

#[derive(Debug, Clone, PartialEq)]
/// Read-only view published to the rendering surface.
pub struct Snapshot {
    /// Latest epoch committed.
    pub epoch: RequestEpoch,
    /// Lifecycle state of `epoch`.
    pub status: RefreshStatus,
    /// Parameters in effect.
    pub params: RefreshParams,
    /// Human label for the reference point.
    pub label: Option<String>,
    /// Data from the most recent applied epoch.
    pub data: Option<Arc<EpochData>>,
    /// Routed lookup tied to `data`.
    pub route: Option<RouteSelection>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// What happened to one trigger.
pub enum TriggerOutcome {
    /// Results (or a failure) were applied for this epoch.
    Applied(RequestEpoch),
    /// A newer trigger took over; nothing was applied.
    Superseded,
    /// No reference point yet; only the parameters were recorded.
    Deferred,
    /// The trigger changed nothing; no epoch was started.
    Unchanged,
}

/// Sequences refreshes and owns the versioned snapshot.
pub struct RefreshCoordinator {
    aggregator: AmenityAggregator,
    listings: Arc<dyn ListingPort>,
    suggestions: Arc<SuggestionProvider>,
    commute: CommuteEstimator,
    clock: EpochClock,
    state: Mutex<Snapshot>,
    published: watch::Sender<Arc<Snapshot>>,
}

impl RefreshCoordinator {
    /// Create an idle coordinator.
    #[must_use]
    pub fn new(
        aggregator: AmenityAggregator,
        listings: Arc<dyn ListingPort>,
        suggestions: Arc<SuggestionProvider>,
        commute: CommuteEstimator,
        config: &EngineConfig,
    ) -> Self {
        let initial = Snapshot {
            epoch: RequestEpoch::default(),
            status: RefreshStatus::Idle,
            params: RefreshParams {
                center: None,
                radius_m: config.default_radius_m,
                max_price: None,
                categories: CategorySet::catalogue(),
            },
            label: None,
            data: None,
            route: None,
        };
        let (published, _receiver) = watch::channel(Arc::new(initial.clone()));
        Self {
            aggregator,
            listings,
            suggestions,
            commute,
            clock: EpochClock::new(),
            state: Mutex::new(initial),
            published,
        }
    }

    /// Current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.published.borrow())
    }

    /// Receiver notified on every published change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.published.subscribe()
    }

    /// Commit a change and refresh everything that depends on it.
    ///
    /// Free text is geocoded first and committed like a picked suggestion, so the searched
    /// point is part of the parameters from the moment its epoch starts.
    pub async fn trigger(&self, trigger: Trigger) -> TriggerOutcome {
        let trigger = match trigger {
            Trigger::ManualSearch(text) => {
                match self.suggestions.suggest(&text).await.into_iter().next() {
                    Some(found) => {
                        debug!(query = %text, resolved = %found.display_name, "Manual search resolved");
                        Trigger::SuggestionSelected(found)
                    }
                    None => return self.search_failed(&text),
                }
            }
            other => other,
        };

        let Some((guard, params)) = self.commit(&trigger) else {
            debug!(reason = trigger.reason(), "Trigger changed nothing, refresh skipped");
            return TriggerOutcome::Unchanged;
        };
        info!(reason = trigger.reason(), epoch = %guard.epoch(), "Refresh triggered");

        let Some(params) = params else {
            debug!(epoch = %guard.epoch(), "No reference point yet, parameters recorded");
            return TriggerOutcome::Deferred;
        };

        let (center, label) = match &trigger {
            Trigger::SuggestionSelected(found) => (found.position, Some(found.display_name.clone())),
            _ => match params.center {
                Some(center) => (center, None),
                None => return TriggerOutcome::Deferred,
            },
        };

        let listing_query = ListingQuery {
            center,
            radius_m: params.radius_m,
            max_price: params.max_price,
        };
        let (amenities, listings, reverse_label) = tokio::join!(
            self.aggregator.fetch_amenities_for(
                center,
                params.radius_m,
                &params.categories,
                &guard
            ),
            self.listings.listings_within(&listing_query),
            self.reverse_label(&trigger, center),
        );
        let label = label.or(reverse_label);

        let listings = listings.unwrap_or_else(|err| {
            warn!(error = %err, "Listings unavailable, continuing without them");
            Vec::new()
        });

        let (status, places) = match amenities {
            Ok(places) => (RefreshStatus::Ready, places),
            Err(PortError::Aborted) => {
                debug!(epoch = %guard.epoch(), "Amenity fetch aborted by newer request");
                return TriggerOutcome::Superseded;
            }
            Err(err) => {
                warn!(epoch = %guard.epoch(), error = %err, "Amenity aggregation failed");
                (
                    RefreshStatus::Failed {
                        message: err.to_string(),
                    },
                    Vec::new(),
                )
            }
        };

        let insights = (status == RefreshStatus::Ready).then(|| compute_insights(&places));
        let nearest = nearest_institution(&places, center);
        let commutes = nearest
            .as_ref()
            .map(|institution| self.commute.summaries(institution, &listings))
            .unwrap_or_default();

        let data = EpochData {
            epoch: guard.epoch(),
            refreshed_at: Utc::now(),
            center,
            places,
            insights,
            nearest,
            listings,
            commutes,
        };
        self.apply(&guard, status, label, data)
    }

    /// Routed estimate from a listing in the current snapshot to its nearest institution.
    ///
    /// Selecting a route never changes aggregation state; only the route slice is written,
    /// and only while the snapshot still holds the data the lookup started from.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::UnknownListing`] or [`PortError::NoInstitution`] when the current
    /// snapshot cannot answer, or [`PortError::Aborted`] when a newer lookup took over.
    pub async fn request_route(
        &self,
        listing_id: &ListingId,
        mode: TravelMode,
    ) -> Result<RouteEstimate, PortError> {
        let snapshot = self.snapshot();
        let data = snapshot
            .data
            .as_ref()
            .ok_or_else(|| PortError::UnknownListing(listing_id.to_string()))?;
        let listing = data
            .listings
            .iter()
            .find(|candidate| candidate.id == *listing_id)
            .ok_or_else(|| PortError::UnknownListing(listing_id.to_string()))?;
        let institution = data.nearest.as_ref().ok_or(PortError::NoInstitution)?;

        let estimate = self
            .commute
            .route(listing.position(), institution.place.position, mode)
            .await?;

        let data_epoch = data.epoch;
        self.update(|current| {
            if current.data.as_ref().map(|data| data.epoch) == Some(data_epoch) {
                current.route = Some(RouteSelection {
                    listing_id: listing_id.clone(),
                    estimate: estimate.clone(),
                });
            } else {
                debug!(listing = %listing_id, "Data changed during route lookup, not storing route");
            }
        });
        Ok(estimate)
    }

    /// Apply the parameter change and start a new epoch in one step.
    ///
    /// Returns `None` when the trigger changed nothing. The parameters are `None` while no
    /// reference point is known; the status then stays as it was instead of turning `Loading`.
    fn commit(&self, trigger: &Trigger) -> Option<(EpochGuard, Option<RefreshParams>)> {
        let mut snapshot = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if !trigger.apply(&mut snapshot.params) {
            return None;
        }
        let guard = self.clock.begin();
        snapshot.epoch = guard.epoch();
        match trigger {
            Trigger::SuggestionSelected(found) => snapshot.label = Some(found.display_name.clone()),
            // Relabelled by the reverse lookup once the refresh lands.
            Trigger::GeolocationFix(_) | Trigger::UseCurrentLocation(_) => snapshot.label = None,
            _ => {}
        }

        let locatable = snapshot.params.center.is_some();
        if locatable {
            snapshot.status = RefreshStatus::Loading;
        }
        let params = locatable.then(|| snapshot.params.clone());
        self.published.send_replace(Arc::new(snapshot.clone()));
        Some((guard, params))
    }

    async fn reverse_label(&self, trigger: &Trigger, center: LatLon) -> Option<String> {
        match trigger {
            Trigger::GeolocationFix(_) | Trigger::UseCurrentLocation(_) => {
                Some(self.suggestions.reverse_resolve(center).await)
            }
            _ => None,
        }
    }

    fn apply(
        &self,
        guard: &EpochGuard,
        status: RefreshStatus,
        label: Option<String>,
        data: EpochData,
    ) -> TriggerOutcome {
        self.update(|snapshot| {
            if !guard.is_current() {
                debug!(
                    epoch = %guard.epoch(),
                    current = %snapshot.epoch,
                    "Discarding stale refresh result"
                );
                return TriggerOutcome::Superseded;
            }
            snapshot.params.center = Some(data.center);
            if label.is_some() {
                snapshot.label = label;
            }
            snapshot.status = status;
            snapshot.data = Some(Arc::new(data));
            snapshot.route = None;
            debug!(epoch = %guard.epoch(), "Refresh applied");
            TriggerOutcome::Applied(guard.epoch())
        })
    }

    /// Free text that resolved to nothing. Starts its own epoch so the failure supersedes
    /// anything still in flight, and keeps the data of the previous epoch.
    fn search_failed(&self, text: &str) -> TriggerOutcome {
        let message = format!("No place found for \"{}\"", text.trim());
        self.update(|snapshot| {
            let epoch = self.clock.begin().epoch();
            warn!(%epoch, %message, "Manual search failed");
            snapshot.epoch = epoch;
            snapshot.status = RefreshStatus::Failed { message };
            TriggerOutcome::Applied(epoch)
        })
    }

    /// Mutate the snapshot under the lock and publish the result.
    fn update<R>(&self, change: impl FnOnce(&mut Snapshot) -> R) -> R {
        let mut snapshot = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let result = change(&mut snapshot);
        self.published.send_replace(Arc::new(snapshot.clone()));
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::FOOD;
    use crate::model::KM_PER_DEGREE;
    use crate::testing::{
        MirrorBehaviour, MockGeocoder, MockListings, MockMirror, element, listing, suggestion,
    };

    fn coordinator(mirror: MockMirror, geocoder: MockGeocoder) -> RefreshCoordinator {
        let config = EngineConfig::default();
        RefreshCoordinator::new(
            AmenityAggregator::new(vec![Arc::new(mirror)], config.attempt_timeout),
            Arc::new(MockListings::new(vec![listing("flat-1", 0.0, 1.0 / KM_PER_DEGREE, 9000)])),
            Arc::new(SuggestionProvider::new(Arc::new(geocoder), &config)),
            CommuteEstimator::new(None),
            &config,
        )
    }

    fn campus_mirror() -> MockMirror {
        MockMirror::new(
            "mirror",
            MirrorBehaviour::Respond(vec![
                element("node", 1, Some((0.0, 0.0)), &[("amenity", "university"), ("name", "Campus")]),
                element("node", 2, Some((0.0, 0.001)), &[("amenity", "cafe")]),
            ]),
        )
    }

    #[tokio::test]
    async fn toggles_before_a_location_are_only_recorded() {
        let coordinator = coordinator(campus_mirror(), MockGeocoder::new());

        let outcome = coordinator.trigger(Trigger::CategoryToggle(FOOD.to_owned())).await;

        let snapshot = coordinator.snapshot();
        assert_eq!(outcome, TriggerOutcome::Deferred);
        assert_eq!(snapshot.status, RefreshStatus::Idle);
        assert!(snapshot.params.categories.get(FOOD).is_some_and(|filter| !filter.is_enabled()));
    }

    #[tokio::test]
    async fn geolocation_fix_fills_every_slice() {
        let coordinator =
            coordinator(campus_mirror(), MockGeocoder::new().with_reverse("Powai, Mumbai"));

        let outcome = coordinator
            .trigger(Trigger::GeolocationFix(LatLon::new(0.0, 0.0)))
            .await;

        let snapshot = coordinator.snapshot();
        let data = snapshot.data.as_ref().expect("data applied");
        assert_eq!(outcome, TriggerOutcome::Applied(RequestEpoch(1)));
        assert_eq!(snapshot.status, RefreshStatus::Ready);
        assert_eq!(snapshot.label.as_deref(), Some("Powai, Mumbai"));
        assert_eq!(data.places.len(), 2);
        assert_eq!(data.insights.as_ref().map(|insights| insights.count(FOOD)), Some(1));
        assert_eq!(data.nearest.as_ref().map(|nearest| nearest.place.name.as_str()), Some("Campus"));
        assert_eq!(data.commutes.len(), 1);
        assert_eq!(data.commutes.first().map(|commute| commute.times.walking_min), Some(12));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_aggregation_reports_summary() {
        let coordinator =
            coordinator(MockMirror::new("down", MirrorBehaviour::Fail(502)), MockGeocoder::new());

        coordinator
            .trigger(Trigger::UseCurrentLocation(LatLon::new(0.0, 0.0)))
            .await;

        let snapshot = coordinator.snapshot();
        let RefreshStatus::Failed { message } = &snapshot.status else {
            panic!("expected failure, got {:?}", snapshot.status);
        };
        assert!(message.contains("all 1 map servers failed"));
        assert!(snapshot.data.as_ref().is_some_and(|data| data.insights.is_none()));
        assert_eq!(snapshot.label.as_deref(), Some(crate::suggest::FALLBACK_LABEL));
    }

    #[tokio::test]
    async fn manual_search_without_match_fails_softly() {
        let coordinator = coordinator(campus_mirror(), MockGeocoder::new());

        let outcome = coordinator.trigger(Trigger::ManualSearch("Atlantis".to_owned())).await;

        assert_eq!(outcome, TriggerOutcome::Applied(RequestEpoch(1)));
        assert_eq!(
            coordinator.snapshot().status,
            RefreshStatus::Failed {
                message: "No place found for \"Atlantis\"".to_owned()
            }
        );
    }

    #[tokio::test]
    async fn failed_search_keeps_previous_data() {
        let coordinator = coordinator(campus_mirror(), MockGeocoder::new());
        coordinator
            .trigger(Trigger::GeolocationFix(LatLon::new(0.0, 0.0)))
            .await;

        let outcome = coordinator.trigger(Trigger::ManualSearch("  Atlantis ".to_owned())).await;

        let snapshot = coordinator.snapshot();
        assert_eq!(outcome, TriggerOutcome::Applied(RequestEpoch(2)));
        assert_eq!(snapshot.epoch, RequestEpoch(2));
        assert!(matches!(&snapshot.status, RefreshStatus::Failed { message } if message.contains("Atlantis\"")));
        assert_eq!(snapshot.params.center, Some(LatLon::new(0.0, 0.0)));
        assert!(snapshot.data.as_ref().is_some_and(|data| data.epoch == RequestEpoch(1)));
    }

    #[tokio::test]
    async fn manual_search_commits_top_suggestion() {
        let geocoder = MockGeocoder::new().on_search(
            "IIT Bombay",
            vec![
                suggestion("Bombay Hospital", 1.0, 1.0, 0.2),
                suggestion("IIT Bombay, Powai", 0.0, 0.0, 0.9),
            ],
        );
        let coordinator = coordinator(campus_mirror(), geocoder);

        let outcome = coordinator.trigger(Trigger::ManualSearch("IIT Bombay".to_owned())).await;

        let snapshot = coordinator.snapshot();
        let data = snapshot.data.as_ref().expect("data applied");
        assert_eq!(outcome, TriggerOutcome::Applied(RequestEpoch(1)));
        assert_eq!(snapshot.status, RefreshStatus::Ready);
        assert_eq!(snapshot.label.as_deref(), Some("IIT Bombay, Powai"));
        assert_eq!(snapshot.params.center, Some(LatLon::new(0.0, 0.0)));
        assert_eq!(data.center, LatLon::new(0.0, 0.0));
        assert_eq!(data.places.len(), 2);
        assert_eq!(data.nearest.as_ref().map(|nearest| nearest.place.name.as_str()), Some("Campus"));
        assert_eq!(data.listings.len(), 1);
    }

    #[tokio::test]
    async fn unchanged_parameters_skip_the_refresh() {
        let coordinator = coordinator(campus_mirror(), MockGeocoder::new());
        coordinator
            .trigger(Trigger::GeolocationFix(LatLon::new(0.0, 0.0)))
            .await;
        let before = coordinator.snapshot();

        let same_radius = coordinator
            .trigger(Trigger::RadiusChange(before.params.radius_m))
            .await;
        let same_budget = coordinator.trigger(Trigger::BudgetChange(None)).await;
        let institution = coordinator
            .trigger(Trigger::CategoryToggle(crate::category::INSTITUTION.to_owned()))
            .await;

        assert_eq!(same_radius, TriggerOutcome::Unchanged);
        assert_eq!(same_budget, TriggerOutcome::Unchanged);
        assert_eq!(institution, TriggerOutcome::Unchanged);
        let after = coordinator.snapshot();
        assert_eq!(after.epoch, RequestEpoch(1));
        assert_eq!(after.status, RefreshStatus::Ready);
        assert!(Arc::ptr_eq(&before, &after));
    }

    #[tokio::test]
    async fn route_requests_fall_back_and_are_stored() {
        let coordinator = coordinator(campus_mirror(), MockGeocoder::new());
        coordinator
            .trigger(Trigger::GeolocationFix(LatLon::new(0.0, 0.0)))
            .await;

        let estimate = coordinator
            .request_route(&ListingId("flat-1".to_owned()), TravelMode::Cycling)
            .await
            .expect("heuristic fallback");

        assert!(estimate.is_estimated);
        assert_eq!(estimate.duration_seconds, 180);
        let snapshot = coordinator.snapshot();
        assert_eq!(snapshot.route.as_ref().map(|route| &route.estimate), Some(&estimate));
    }

    #[tokio::test]
    async fn unknown_listing_is_rejected() {
        let coordinator = coordinator(campus_mirror(), MockGeocoder::new());
        coordinator
            .trigger(Trigger::GeolocationFix(LatLon::new(0.0, 0.0)))
            .await;

        let result = coordinator
            .request_route(&ListingId("missing".to_owned()), TravelMode::Walking)
            .await;

        assert!(matches!(result, Err(PortError::UnknownListing(_))));
    }

    #[tokio::test]
    async fn subscribers_see_published_changes() {
        let coordinator = coordinator(campus_mirror(), MockGeocoder::new());
        let mut receiver = coordinator.subscribe();

        coordinator.trigger(Trigger::RadiusChange(800)).await;

        assert!(receiver.has_changed().unwrap_or(false));
        assert_eq!(receiver.borrow_and_update().params.radius_m, 800);
    }
}
