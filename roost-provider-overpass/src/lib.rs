//! Amenity source for Overpass API mirrors.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use roost_core::{
    model::Element,
    ports::{AmenitySource, PortError},
};

/// Public mirrors, in the order they are tried.
pub const DEFAULT_ENDPOINTS: &[&str] = &[
    "https://overpass-api.de/api/interpreter",
    "https://overpass.kumi.systems/api/interpreter",
    "https://maps.mail.ru/osm/tools/overpass/api/interpreter",
];

/// Response from the interpreter endpoint
#[derive(Debug, Deserialize)]
struct InterpreterResponse {
    #[serde(default)]
    elements: Vec<Element>,
    // "version", "generator" and "osm3s" are ignored
    #[serde(default)]
    remark: Option<String>,
}

/// One Overpass mirror.
pub struct OverpassMirror {
    client: Client,
    endpoint: String,
}

impl OverpassMirror {
    /// Create a mirror bound to the given HTTP client and interpreter URL.
    #[must_use]
    pub fn new<S: Into<String>>(client: Client, endpoint: S) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl AmenitySource for OverpassMirror {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn execute(&self, query: &str) -> Result<Vec<Element>, PortError> {
        let req = self
            .client
            .post(&self.endpoint)
            .form(&[("data", query)]);

        let resp = fetch_json::<InterpreterResponse>(req).await?;

        // Overpass reports server-side timeouts as a 200 with a remark and partial data.
        if let Some(remark) = resp.remark.filter(|remark| remark.contains("runtime error")) {
            return Err(PortError::ProviderUnavailable(remark));
        }

        debug!(endpoint = %self.endpoint, elements = resp.elements.len(), "Overpass answered");
        Ok(resp.elements)
    }
}

/// Build mirrors for the given endpoints, falling back to [`DEFAULT_ENDPOINTS`] when empty.
#[must_use]
pub fn mirrors(client: &Client, endpoints: &[String]) -> Vec<Arc<dyn AmenitySource>> {
    let endpoints: Vec<&str> = if endpoints.is_empty() {
        DEFAULT_ENDPOINTS.to_vec()
    } else {
        endpoints.iter().map(String::as_str).collect()
    };

    endpoints
        .into_iter()
        .map(|endpoint| Arc::new(OverpassMirror::new(client.clone(), endpoint)) as Arc<dyn AmenitySource>)
        .collect()
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_nodes_and_way_centroids() {
        let body = r#"{
            "version": 0.6,
            "elements": [
                {"type": "node", "id": 101, "lat": 19.13, "lon": 72.91,
                 "tags": {"amenity": "cafe", "name": "Chaayos"}},
                {"type": "way", "id": 202, "center": {"lat": 19.14, "lon": 72.92},
                 "tags": {"amenity": "university", "name": "IIT Bombay"}},
                {"type": "relation", "id": 303}
            ]
        }"#;

        let resp: InterpreterResponse = serde_json::from_str(body).expect("valid fixture");

        assert_eq!(resp.elements.len(), 3);
        let way = resp.elements.get(1).expect("way present");
        assert_eq!(way.kind, "way");
        assert!(way.lat.is_none());
        assert_eq!(
            way.position().map(|point| (point.lat, point.lon)),
            Some((19.14, 72.92))
        );
        let relation = resp.elements.get(2).expect("relation present");
        assert!(relation.tags.is_empty());
        assert!(relation.position().is_none());
    }

    #[test]
    fn empty_endpoint_list_uses_defaults() {
        let client = Client::new();

        let defaults = mirrors(&client, &[]);
        let custom = mirrors(&client, &["http://localhost:12345/api/interpreter".to_owned()]);

        let names: Vec<&str> = defaults.iter().map(|mirror| mirror.endpoint()).collect();
        assert_eq!(names, DEFAULT_ENDPOINTS);
        assert_eq!(custom.len(), 1);
    }
}
