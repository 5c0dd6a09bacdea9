use std::sync::Arc;

use roost_core::{
    coordinator::{RefreshStatus, Snapshot},
    model::{LatLon, Listing, Suggestion},
    service::RoostService,
};
use tokio::sync::watch;

/// Radius step for `+`/`-`, in metres.
pub(crate) const RADIUS_STEP_M: u32 = 500;
pub(crate) const MIN_RADIUS_M: u32 = 500;
pub(crate) const MAX_RADIUS_M: u32 = 5000;
/// Budget step for `[`/`]`.
pub(crate) const BUDGET_STEP: u32 = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Screen {
    Search,
    Insights,
    Categories,
}

pub(crate) struct App {
    pub service: Arc<RoostService>,
    pub snapshots: watch::Receiver<Arc<Snapshot>>,
    pub home: Option<LatLon>,

    pub screen: Screen,

    pub query_input: String,
    pub suggestions: Vec<Suggestion>,
    pub suggestion_index: usize,

    pub category_index: usize,
    pub listing_index: usize,

    pub error_message: Option<String>,
}

impl App {
    pub(crate) fn new(service: Arc<RoostService>, home: Option<LatLon>) -> Self {
        let snapshots = service.coordinator().subscribe();
        Self {
            service,
            snapshots,
            home,
            screen: Screen::Search,
            query_input: String::new(),
            suggestions: Vec::new(),
            suggestion_index: 0,
            category_index: 0,
            listing_index: 0,
            error_message: None,
        }
    }

    pub(crate) fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshots.borrow())
    }

    pub(crate) fn is_loading(&self) -> bool {
        self.snapshots.borrow().status == RefreshStatus::Loading
    }

    pub(crate) fn set_suggestions(&mut self, suggestions: Vec<Suggestion>) {
        self.suggestions = suggestions;
        self.suggestion_index = 0;
    }

    /// Take the highlighted suggestion and move to the insights screen.
    pub(crate) fn pick_suggestion(&mut self) -> Option<Suggestion> {
        let picked = self.suggestions.get(self.suggestion_index).cloned()?;
        self.query_input.clone_from(&picked.display_name);
        self.suggestions.clear();
        self.suggestion_index = 0;
        self.screen = Screen::Insights;
        Some(picked)
    }

    pub(crate) fn selected_listing(&self) -> Option<Listing> {
        self.snapshot()
            .data
            .as_ref()
            .and_then(|data| data.listings.get(self.listing_index).cloned())
    }

    pub(crate) fn listing_count(&self) -> usize {
        self.snapshots
            .borrow()
            .data
            .as_ref()
            .map_or(0, |data| data.listings.len())
    }

    pub(crate) fn category_count(&self) -> usize {
        self.snapshots.borrow().params.categories.len()
    }

    pub(crate) fn highlighted_category(&self) -> Option<String> {
        self.snapshots
            .borrow()
            .params
            .categories
            .iter()
            .nth(self.category_index)
            .map(|filter| filter.id.as_str().to_owned())
    }

    pub(crate) fn radius_m(&self) -> u32 {
        self.snapshots.borrow().params.radius_m
    }

    pub(crate) fn max_price(&self) -> Option<u32> {
        self.snapshots.borrow().params.max_price
    }

    /// Keep the listing cursor inside the current data after a refresh.
    pub(crate) fn clamp_cursors(&mut self) {
        let listings = self.listing_count();
        if self.listing_index >= listings {
            self.listing_index = listings.saturating_sub(1);
        }
    }
}

/// Next radius when stepping up or down, bounded to the supported range.
pub(crate) fn step_radius(current: u32, grow: bool) -> u32 {
    let next = if grow {
        current.saturating_add(RADIUS_STEP_M)
    } else {
        current.saturating_sub(RADIUS_STEP_M)
    };
    next.clamp(MIN_RADIUS_M, MAX_RADIUS_M)
}

/// Next budget bound. Lowering below one step clears it.
pub(crate) fn step_budget(current: Option<u32>, grow: bool) -> Option<u32> {
    match (current, grow) {
        (None, true) => Some(BUDGET_STEP),
        (None, false) => None,
        (Some(max), true) => Some(max.saturating_add(BUDGET_STEP)),
        (Some(max), false) => max.checked_sub(BUDGET_STEP).filter(|&next| next > 0),
    }
}
