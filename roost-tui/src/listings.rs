//! Listings collaborator backed by a local JSON file.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::info;

use roost_core::{
    model::Listing,
    ports::{ListingPort, ListingQuery, PortError},
};

/// Listings loaded once from a JSON array and filtered in memory.
pub(crate) struct FileListings {
    listings: Vec<Listing>,
}

impl FileListings {
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading listings from {}", path.display()))?;
        let listings = Self::parse(&raw)
            .with_context(|| format!("decoding listings in {}", path.display()))?;
        info!(path = %path.display(), count = listings.listings.len(), "Listings loaded");
        Ok(listings)
    }

    pub(crate) fn parse(raw: &str) -> Result<Self> {
        let listings = serde_json::from_str::<Vec<Listing>>(raw)?;
        Ok(Self { listings })
    }

    pub(crate) fn empty() -> Self {
        Self {
            listings: Vec::new(),
        }
    }
}

#[async_trait]
impl ListingPort for FileListings {
    async fn listings_within(&self, query: &ListingQuery) -> Result<Vec<Listing>, PortError> {
        let radius_km = f64::from(query.radius_m) / 1000.0;
        Ok(self
            .listings
            .iter()
            .filter(|listing| listing.position().planar_distance_km(query.center) <= radius_km)
            .filter(|listing| query.max_price.is_none_or(|max| listing.price <= max))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use roost_core::model::LatLon;

    use super::*;

    const FIXTURE: &str = r#"[
        {"id": "powai-1br", "title": "1BR near the lake", "coordinates": [72.9060, 19.1200], "price": 18000},
        {"id": "powai-pg", "title": "PG room", "coordinates": [72.9100, 19.1180], "price": 9000},
        {"id": "thane", "coordinates": [72.9780, 19.2180], "price": 12000}
    ]"#;

    fn query(max_price: Option<u32>) -> ListingQuery {
        ListingQuery {
            center: LatLon::new(19.1190, 72.9080),
            radius_m: 1500,
            max_price,
        }
    }

    #[tokio::test]
    async fn filters_by_radius() {
        let listings = FileListings::parse(FIXTURE).expect("valid fixture");

        let found = listings.listings_within(&query(None)).await.expect("in memory");

        let ids: Vec<&str> = found.iter().map(|listing| listing.id.0.as_str()).collect();
        assert_eq!(ids, ["powai-1br", "powai-pg"]);
    }

    #[tokio::test]
    async fn filters_by_budget() {
        let listings = FileListings::parse(FIXTURE).expect("valid fixture");

        let found = listings
            .listings_within(&query(Some(10_000)))
            .await
            .expect("in memory");

        assert_eq!(found.len(), 1);
        assert!(found.iter().all(|listing| listing.price <= 10_000));
    }

    #[test]
    fn missing_title_defaults_to_empty() {
        let listings = FileListings::parse(FIXTURE).expect("valid fixture");

        assert!(listings.listings.last().is_some_and(|listing| listing.title.is_empty()));
    }
}
