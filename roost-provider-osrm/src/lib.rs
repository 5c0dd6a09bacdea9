//! Turn-by-turn routing collaborator backed by an OSRM-compatible HTTP service.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use roost_core::{
    model::{LatLon, TravelMode},
    ports::{PortError, RoutePort, RoutedLeg},
};

/// Public OSRM demo server.
pub const DEFAULT_BASE_URL: &str = "https://router.project-osrm.org";

#[derive(Debug, Deserialize)]
struct RouteResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<Route>,
}

#[derive(Debug, Deserialize)]
struct Route {
    distance: f64, // metres
    duration: f64, // seconds
}

/// Router that queries `/route/v1/{profile}` for a two-point leg.
pub struct OsrmRouter {
    client: Client,
    base_url: String,
}

impl OsrmRouter {
    /// Create a router bound to the given HTTP client and base URL.
    #[must_use]
    pub fn new<S: Into<String>>(client: Client, base_url: S) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }

    fn route_url(&self, origin: LatLon, destination: LatLon, mode: TravelMode) -> String {
        // OSRM expects lon,lat pairs
        format!(
            "{}/route/v1/{}/{},{};{},{}",
            self.base_url,
            profile(mode),
            origin.lon,
            origin.lat,
            destination.lon,
            destination.lat
        )
    }
}

#[async_trait]
impl RoutePort for OsrmRouter {
    async fn route(
        &self,
        origin: LatLon,
        destination: LatLon,
        mode: TravelMode,
    ) -> Result<RoutedLeg, PortError> {
        let req = self
            .client
            .get(self.route_url(origin, destination, mode))
            .query(&[("overview", "false")]);

        let resp = fetch_json::<RouteResponse>(req).await?;
        let leg = first_leg(resp)?;
        debug!(
            %mode,
            distance_m = leg.distance_meters,
            duration_s = leg.duration_seconds,
            "OSRM route resolved"
        );
        Ok(leg)
    }
}

fn profile(mode: TravelMode) -> &'static str {
    match mode {
        TravelMode::Walking => "foot",
        TravelMode::Cycling => "bike",
        TravelMode::Driving => "car",
    }
}

fn first_leg(resp: RouteResponse) -> Result<RoutedLeg, PortError> {
    if resp.code != "Ok" {
        return Err(PortError::ProviderUnavailable(format!(
            "OSRM answered {}: {}",
            resp.code,
            resp.message.unwrap_or_default()
        )));
    }
    resp.routes
        .into_iter()
        .next()
        .map(|route| RoutedLeg {
            distance_meters: route.distance,
            duration_seconds: route.duration,
        })
        .ok_or_else(|| PortError::ProviderUnavailable("OSRM returned no routes".into()))
}

async fn fetch_json<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, PortError> {
    let resp = req.send().await.map_err(PortError::from)?;
    let status = resp.status();
    // OSRM reports NoRoute and friends as 400 with a JSON body; keep those decodable.
    if !status.is_success() && status != reqwest::StatusCode::BAD_REQUEST {
        return Err(PortError::Status(status.as_u16()));
    }
    resp.json().await.map_err(PortError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_route_becomes_the_leg() {
        let body = r#"{
            "code": "Ok",
            "routes": [
                {"distance": 3104.2, "duration": 541.7, "weight": 541.7},
                {"distance": 3500.0, "duration": 600.0, "weight": 600.0}
            ],
            "waypoints": []
        }"#;

        let resp: RouteResponse = serde_json::from_str(body).expect("valid fixture");
        let leg = first_leg(resp).expect("route present");

        assert_eq!(
            leg,
            RoutedLeg {
                distance_meters: 3104.2,
                duration_seconds: 541.7
            }
        );
    }

    #[test]
    fn no_route_is_unavailable() {
        let body = r#"{"code": "NoRoute", "message": "Impossible route between points"}"#;

        let resp: RouteResponse = serde_json::from_str(body).expect("valid fixture");

        assert!(matches!(
            first_leg(resp),
            Err(PortError::ProviderUnavailable(message)) if message.contains("NoRoute")
        ));
    }

    #[test]
    fn url_uses_lon_lat_order_and_mode_profile() {
        let router = OsrmRouter::new(Client::new(), "http://localhost:5000/");

        let url = router.route_url(
            LatLon::new(19.1, 72.9),
            LatLon::new(19.2, 72.8),
            TravelMode::Cycling,
        );

        assert_eq!(url, "http://localhost:5000/route/v1/bike/72.9,19.1;72.8,19.2");
    }
}
