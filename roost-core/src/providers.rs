//! Bundle of collaborator implementations the engine is wired to.

use std::sync::Arc;

use crate::ports::{AmenitySource, GeocodePort, ListingPort, RoutePort};

/// Collection of ports backing one engine instance.
pub struct ProviderSet {
    /// Amenity mirrors in priority order.
    pub amenity_mirrors: Vec<Arc<dyn AmenitySource>>,
    /// Place-name resolution.
    pub geocoder: Arc<dyn GeocodePort>,
    /// Optional routing collaborator; commute lookups fall back to heuristics without it.
    pub router: Option<Arc<dyn RoutePort>>,
    /// Housing listings.
    pub listings: Arc<dyn ListingPort>,
}

impl ProviderSet {
    /// Build a provider set without a routing collaborator.
    #[must_use]
    pub fn new(
        amenity_mirrors: Vec<Arc<dyn AmenitySource>>,
        geocoder: Arc<dyn GeocodePort>,
        listings: Arc<dyn ListingPort>,
    ) -> Self {
        Self {
            amenity_mirrors,
            geocoder,
            router: None,
            listings,
        }
    }

    /// Attach a routing collaborator.
    #[must_use]
    pub fn with_router(mut self, router: Arc<dyn RoutePort>) -> Self {
        self.router = Some(router);
        self
    }

    /// Endpoint identifiers of all mirrors, in priority order.
    pub fn mirror_endpoints(&self) -> impl Iterator<Item = &str> {
        self.amenity_mirrors.iter().map(|mirror| mirror.endpoint())
    }
}
