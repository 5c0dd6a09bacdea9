//! Domain data structures for places, listings, suggestions, and the derived insights.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::category::CategoryId;

/// Kilometres per degree at the equator, used by the planar distance approximation.
pub const KM_PER_DEGREE: f64 = 111.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
/// Geographic point in the engine's lat-first convention.
pub struct LatLon {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

impl LatLon {
    /// Construct a point from latitude and longitude.
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Planar distance in kilometres: `sqrt(dLat² + dLon²) * 111`.
    ///
    /// Not geodesically exact. East-west distances are overstated away from the
    /// equator; score thresholds are tuned against this approximation.
    #[must_use]
    pub fn planar_distance_km(self, other: Self) -> f64 {
        let d_lat = self.lat - other.lat;
        let d_lon = self.lon - other.lon;
        d_lat.hypot(d_lon) * KM_PER_DEGREE
    }
}

impl fmt::Display for LatLon {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{:.5},{:.5}", self.lat, self.lon)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
/// Centroid supplied by the provider for way/relation elements.
pub struct Centroid {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

#[derive(Debug, Clone, Deserialize)]
/// Raw element as returned by an amenity provider.
pub struct Element {
    /// Element type (`node`, `way`, `relation`).
    #[serde(rename = "type")]
    pub kind: String,
    /// Provider-local identifier, unique per element type.
    pub id: i64,
    /// Latitude for point elements.
    #[serde(default)]
    pub lat: Option<f64>,
    /// Longitude for point elements.
    #[serde(default)]
    pub lon: Option<f64>,
    /// Centroid for area-type elements.
    #[serde(default)]
    pub center: Option<Centroid>,
    /// Free-form key/value tags.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl Element {
    /// Element-level coordinates, falling back to the centroid.
    #[must_use]
    pub fn position(&self) -> Option<LatLon> {
        match (self.lat, self.lon, self.center) {
            (Some(lat), Some(lon), _) => Some(LatLon::new(lat, lon)),
            (_, _, Some(center)) => Some(LatLon::new(center.lat, center.lon)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
/// Stable place identifier derived from the source element type and id, e.g. `node/42`.
pub struct PlaceId(pub String);

impl PlaceId {
    /// Derive the identifier for a provider element.
    #[must_use]
    pub fn from_element(kind: &str, id: i64) -> Self {
        Self(format!("{kind}/{id}"))
    }
}

impl fmt::Display for PlaceId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// Classified point of interest. Immutable once built from a provider response.
pub struct Place {
    /// Stable identifier.
    pub id: PlaceId,
    /// Display name (name tag, then operator tag, then a placeholder).
    pub name: String,
    /// Category the element was classified into.
    pub category: CategoryId,
    /// Coordinates.
    pub position: LatLon,
    /// All tags reported by the provider.
    pub raw_tags: BTreeMap<String, String>,
    /// Raw `opening_hours` tag, if present.
    pub opening_hours: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Identifier of a housing listing.
pub struct ListingId(pub String);

impl fmt::Display for ListingId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Housing listing as delivered by the listings collaborator.
pub struct Listing {
    /// Unique identifier.
    pub id: ListingId,
    /// Human-friendly title.
    #[serde(default)]
    pub title: String,
    /// Coordinates in `[lng, lat]` order, exactly as the collaborator sends them.
    pub coordinates: [f64; 2],
    /// Monthly price.
    pub price: u32,
}

impl Listing {
    /// Listing position converted to the engine's lat-first convention.
    #[must_use]
    pub fn position(&self) -> LatLon {
        let [lng, lat] = self.coordinates;
        LatLon::new(lat, lng)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// Place-name suggestion from the geocoder.
pub struct Suggestion {
    /// Full display name.
    pub display_name: String,
    /// Resolved coordinates.
    pub position: LatLon,
    /// Provider relevance signal, higher is better.
    pub importance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Travel modes supported by commute estimates.
pub enum TravelMode {
    /// On foot.
    Walking,
    /// Bicycle.
    Cycling,
    /// Any motorized vehicle.
    Driving,
}

impl TravelMode {
    /// Every mode, in display order.
    pub const ALL: [Self; 3] = [Self::Walking, Self::Cycling, Self::Driving];

    /// Heuristic minutes needed per kilometre.
    #[must_use]
    pub const fn minutes_per_km(self) -> f64 {
        match self {
            Self::Walking => 12.0,
            Self::Cycling => 3.0,
            Self::Driving => 2.0,
        }
    }
}

impl fmt::Display for TravelMode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Walking => "walking",
            Self::Cycling => "cycling",
            Self::Driving => "driving",
        };
        formatter.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// Travel distance and duration between two points.
pub struct RouteEstimate {
    /// Distance formatted for display.
    pub distance_text: String,
    /// Duration formatted for display.
    pub duration_text: String,
    /// Distance in metres.
    pub distance_meters: u32,
    /// Duration in seconds.
    pub duration_seconds: u32,
    /// Mode the estimate applies to.
    pub mode: TravelMode,
    /// `true` when computed locally instead of by the routing provider.
    pub is_estimated: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
/// Named sub-scores (0–100) and their weighted composite.
pub struct Scores {
    /// Eateries nearby.
    pub food: u8,
    /// Hospitals and pharmacies.
    pub health: u8,
    /// Transit stops.
    pub connectivity: u8,
    /// Police presence.
    pub safety: u8,
    /// Groceries and cash access.
    pub convenience: u8,
    /// Gyms and sports centres.
    pub fitness: u8,
    /// Everyday errands reachable on foot.
    pub walkability: u8,
    /// Services available after dark.
    pub night_safety: u8,
    /// Places advertising internet access.
    pub wifi: u8,
    /// Weighted composite of the nine sub-scores.
    pub overall: u8,
}

impl Scores {
    /// Sub-scores paired with their display names, excluding `overall`.
    #[must_use]
    pub fn named(&self) -> [(&'static str, u8); 9] {
        [
            ("food", self.food),
            ("health", self.health),
            ("connectivity", self.connectivity),
            ("safety", self.safety),
            ("convenience", self.convenience),
            ("fitness", self.fitness),
            ("walkability", self.walkability),
            ("night safety", self.night_safety),
            ("wifi", self.wifi),
        ]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
/// Estimated monthly living costs.
pub struct CostEstimate {
    /// Food spend.
    pub food: u32,
    /// Transport spend.
    pub transport: u32,
    /// Fixed miscellaneous spend.
    pub misc: u32,
    /// Sum of all of the above.
    pub total: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// Aggregate produced by one scoring pass over a place set.
pub struct LocationInsights {
    /// Places per category.
    pub counts: BTreeMap<CategoryId, u32>,
    /// Sub-scores and composite.
    pub scores: Scores,
    /// Monthly cost breakdown.
    pub cost_estimate: CostEstimate,
    /// Whether any place advertises round-the-clock service.
    pub is_24x7_available: bool,
}

impl LocationInsights {
    /// Count for a category, zero when absent.
    #[must_use]
    pub fn count(&self, category: &str) -> u32 {
        self.counts.get(category).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// Closest institution to a reference point.
pub struct NearestInstitution {
    /// The institution itself.
    pub place: Place,
    /// Planar distance from the reference point.
    pub distance_km: f64,
}
