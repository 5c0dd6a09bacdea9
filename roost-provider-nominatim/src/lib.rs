//! Geocoder implementation using the Nominatim search and reverse endpoints.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use roost_core::{
    model::{LatLon, Suggestion},
    ports::{GeocodePort, PortError},
};

/// Public Nominatim instance.
pub const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org";

/// Search hit as returned by /search?format=jsonv2
#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String, // Nominatim encodes coordinates as strings
    lon: String,
    display_name: String,
    #[serde(default)]
    importance: Option<f64>,
}

/// Response from /reverse?format=jsonv2
#[derive(Debug, Deserialize)]
struct ReverseResponse {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Forward and reverse geocoding against one Nominatim instance.
pub struct NominatimGeocoder {
    client: Client,
    base_url: String,
}

impl NominatimGeocoder {
    /// Create a geocoder bound to the given HTTP client and base URL.
    #[must_use]
    pub fn new<S: Into<String>>(client: Client, base_url: S) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }
}

#[async_trait]
impl GeocodePort for NominatimGeocoder {
    async fn search(&self, text: &str, limit: usize) -> Result<Vec<Suggestion>, PortError> {
        if limit == 0 || text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let limit_s = limit.to_string();
        let req = self.client.get(format!("{}/search", self.base_url)).query(&[
            ("q", text.trim()),
            ("format", "jsonv2"),
            ("limit", &limit_s),
        ]);

        let hits = fetch_json::<Vec<SearchHit>>(req).await?;
        debug!(query = text, hits = hits.len(), "Nominatim search answered");

        Ok(hits.into_iter().filter_map(suggestion_from_hit).collect())
    }

    async fn reverse(&self, point: LatLon) -> Result<String, PortError> {
        let lat_s = point.lat.to_string();
        let lon_s = point.lon.to_string();
        let req = self.client.get(format!("{}/reverse", self.base_url)).query(&[
            ("lat", lat_s.as_str()),
            ("lon", lon_s.as_str()),
            ("format", "jsonv2"),
            ("zoom", "16"),
        ]);

        let resp = fetch_json::<ReverseResponse>(req).await?;
        match (resp.display_name, resp.error) {
            (Some(name), _) => Ok(name),
            (None, Some(error)) => Err(PortError::ProviderUnavailable(error)),
            (None, None) => Err(PortError::Decode("reverse response without a name".into())),
        }
    }
}

// Hits with unparsable coordinates are skipped rather than failing the whole search.
fn suggestion_from_hit(hit: SearchHit) -> Option<Suggestion> {
    let lat = hit.lat.parse().ok()?;
    let lon = hit.lon.parse().ok()?;
    Some(Suggestion {
        display_name: hit.display_name,
        position: LatLon::new(lat, lon),
        importance: hit.importance.unwrap_or(0.0),
    })
}

// Small helper to fetch and decode JSON with status handling.
async fn fetch_json<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, PortError> {
    let resp = req.send().await.map_err(PortError::from)?;
    let status = resp.status();
    if !status.is_success() {
        return Err(PortError::Status(status.as_u16()));
    }
    resp.json().await.map_err(PortError::from)
}
