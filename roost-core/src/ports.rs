//! Traits describing collaborator capabilities and the shared error type.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Error as ReqwestError;

use crate::model::{Element, LatLon, Listing, Suggestion, TravelMode};

#[derive(thiserror::Error, Debug)]
/// Errors that can occur while talking to collaborators or running the engine.
pub enum PortError {
    /// Network layer failed.
    #[error("Network error: {0}")]
    Network(#[from] ReqwestError),
    /// Provider answered with a non-success status.
    #[error("Provider returned HTTP {0}")]
    Status(u16),
    /// Provider response could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),
    /// A single attempt exceeded its time budget.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    /// A non-essential collaborator is down or not configured.
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Every mirror endpoint failed for one aggregation run.
    #[error(
        "Couldn't load nearby places: all {attempted} map servers failed \
         ({categories} categories within {radius_m} m). \
         Retry, turn off some categories, or reduce the radius."
    )]
    AllEndpointsFailed {
        /// Number of endpoints tried.
        attempted: usize,
        /// Radius in effect, in metres.
        radius_m: u32,
        /// Number of enabled categories in effect.
        categories: usize,
    },
    /// Superseded by a newer request.
    #[error("Request superseded by a newer one")]
    Aborted,
    /// A single provider element lacks required fields.
    #[error("Malformed element: {0}")]
    MalformedElement(String),
    /// Listing id is not part of the current snapshot.
    #[error("Unknown listing: {0}")]
    UnknownListing(String),
    /// No institution is known for the current location.
    #[error("No institution near the current location")]
    NoInstitution,
}

impl PortError {
    /// Whether the error only signals that a newer request took over.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
/// Query parameters for the listings collaborator.
pub struct ListingQuery {
    /// Search centre.
    pub center: LatLon,
    /// Search radius in metres.
    pub radius_m: u32,
    /// Optional upper price bound.
    pub max_price: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
/// Provider-backed route leg.
pub struct RoutedLeg {
    /// Travel distance in metres.
    pub distance_meters: f64,
    /// Travel time in seconds.
    pub duration_seconds: f64,
}

#[async_trait]
/// One mirror of the amenity data service.
pub trait AmenitySource: Send + Sync {
    /// Endpoint identifier used in logs and diagnostics.
    fn endpoint(&self) -> &str;

    /// Run a composite amenity query and return the raw elements.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the request fails or the response cannot be decoded.
    async fn execute(&self, query: &str) -> Result<Vec<Element>, PortError>;
}

#[async_trait]
/// Forward and reverse place-name resolution.
pub trait GeocodePort: Send + Sync {
    /// Resolve free text into candidate places.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the provider request fails.
    async fn search(&self, text: &str, limit: usize) -> Result<Vec<Suggestion>, PortError>;

    /// Derive a human label for a point.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the provider request fails or knows no label.
    async fn reverse(&self, point: LatLon) -> Result<String, PortError>;
}

#[async_trait]
/// Routing collaborator.
pub trait RoutePort: Send + Sync {
    /// Compute a route leg between two points.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the provider is unreachable or finds no route.
    async fn route(
        &self,
        origin: LatLon,
        destination: LatLon,
        mode: TravelMode,
    ) -> Result<RoutedLeg, PortError>;
}

#[async_trait]
/// Housing listings collaborator.
pub trait ListingPort: Send + Sync {
    /// Listings within a radius and optional price bound.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the collaborator cannot be queried.
    async fn listings_within(&self, query: &ListingQuery) -> Result<Vec<Listing>, PortError>;
}
