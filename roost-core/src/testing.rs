// In-memory stand-ins for every collaborator port, plus builders for model values.
//
// MockMirror (AmenitySource), MockGeocoder (GeocodePort), MockRouter (RoutePort) and
// MockListings (ListingPort) need no network, so timing-sensitive tests can run on a
// paused tokio clock.

#![expect(missing_docs, reason = "test scaffolding")]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::category::CategoryId;
use crate::model::{Element, LatLon, Listing, ListingId, Place, PlaceId, Suggestion, TravelMode};
use crate::ports::{
    AmenitySource, GeocodePort, ListingPort, ListingQuery, PortError, RoutePort, RoutedLeg,
};

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub fn element(kind: &str, id: i64, position: Option<(f64, f64)>, tags: &[(&str, &str)]) -> Element {
    Element {
        kind: kind.to_owned(),
        id,
        lat: position.map(|(lat, _lon)| lat),
        lon: position.map(|(_lat, lon)| lon),
        center: None,
        tags: tags
            .iter()
            .map(|&(key, value)| (key.to_owned(), value.to_owned()))
            .collect(),
    }
}

pub fn place(id: &str, category: &str, lat: f64, lon: f64) -> Place {
    Place {
        id: PlaceId(id.to_owned()),
        name: id.to_owned(),
        category: CategoryId::new(category),
        position: LatLon::new(lat, lon),
        raw_tags: BTreeMap::new(),
        opening_hours: None,
    }
}

/// Listing at `(lat, lon)`; stored lng-first like the real collaborator.
pub fn listing(id: &str, lat: f64, lon: f64, price: u32) -> Listing {
    Listing {
        id: ListingId(id.to_owned()),
        title: format!("Listing {id}"),
        coordinates: [lon, lat],
        price,
    }
}

pub fn suggestion(name: &str, lat: f64, lon: f64, importance: f64) -> Suggestion {
    Suggestion {
        display_name: name.to_owned(),
        position: LatLon::new(lat, lon),
        importance,
    }
}

#[derive(Debug, Clone, Default)]
pub struct CallCounter(Arc<AtomicUsize>);

impl CallCounter {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryLog(Arc<Mutex<Vec<String>>>);

impl QueryLog {
    pub fn recorded(&self) -> Vec<String> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn push(&self, query: &str) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(query.to_owned());
    }
}

// ---------------------------------------------------------------------------
// MockMirror
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum MirrorBehaviour {
    /// Answer immediately.
    Respond(Vec<Element>),
    /// Answer with an HTTP error status.
    Fail(u16),
    /// Never answer; relies on the attempt timeout.
    Hang,
    /// Pick the first route whose needle occurs in the query text.
    Scripted(Vec<ScriptedAnswer>),
}

#[derive(Debug, Clone)]
pub struct ScriptedAnswer {
    needle: String,
    delay: Duration,
    elements: Vec<Element>,
}

pub struct MockMirror {
    endpoint: String,
    behaviour: MirrorBehaviour,
    calls: CallCounter,
}

impl MockMirror {
    pub fn new(endpoint: &str, behaviour: MirrorBehaviour) -> Self {
        Self {
            endpoint: endpoint.to_owned(),
            behaviour,
            calls: CallCounter::default(),
        }
    }

    /// Mirror answering only the queries registered through [`Self::on_query`].
    pub fn scripted(endpoint: &str) -> Self {
        Self::new(endpoint, MirrorBehaviour::Scripted(Vec::new()))
    }

    pub fn on_query(mut self, needle: &str, delay: Duration, elements: Vec<Element>) -> Self {
        if let MirrorBehaviour::Scripted(answers) = &mut self.behaviour {
            answers.push(ScriptedAnswer {
                needle: needle.to_owned(),
                delay,
                elements,
            });
        }
        self
    }

    pub fn calls(&self) -> CallCounter {
        self.calls.clone()
    }
}

#[async_trait]
impl AmenitySource for MockMirror {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn execute(&self, query: &str) -> Result<Vec<Element>, PortError> {
        self.calls.bump();
        match &self.behaviour {
            MirrorBehaviour::Respond(elements) => Ok(elements.clone()),
            MirrorBehaviour::Fail(status) => Err(PortError::Status(*status)),
            MirrorBehaviour::Hang => std::future::pending().await,
            MirrorBehaviour::Scripted(answers) => {
                let answer = answers
                    .iter()
                    .find(|answer| query.contains(&answer.needle))
                    .ok_or(PortError::Status(404))?;
                tokio::time::sleep(answer.delay).await;
                Ok(answer.elements.clone())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// MockGeocoder
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockGeocoder {
    searches: HashMap<String, Vec<Suggestion>>,
    reverse_label: Option<String>,
    search_delay: Duration,
    queries: QueryLog,
}

impl MockGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_search(mut self, text: &str, suggestions: Vec<Suggestion>) -> Self {
        self.searches.insert(text.to_owned(), suggestions);
        self
    }

    pub fn with_reverse(mut self, label: &str) -> Self {
        self.reverse_label = Some(label.to_owned());
        self
    }

    /// Every search answers after `delay`.
    pub fn with_search_delay(mut self, delay: Duration) -> Self {
        self.search_delay = delay;
        self
    }

    pub fn queries(&self) -> QueryLog {
        self.queries.clone()
    }
}

#[async_trait]
impl GeocodePort for MockGeocoder {
    async fn search(&self, text: &str, limit: usize) -> Result<Vec<Suggestion>, PortError> {
        self.queries.push(text);
        if !self.search_delay.is_zero() {
            tokio::time::sleep(self.search_delay).await;
        }
        Ok(self
            .searches
            .get(text)
            .map(|found| found.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn reverse(&self, _point: LatLon) -> Result<String, PortError> {
        self.reverse_label
            .clone()
            .ok_or_else(|| PortError::ProviderUnavailable("MockGeocoder: no reverse label".into()))
    }
}

// ---------------------------------------------------------------------------
// MockRouter
// ---------------------------------------------------------------------------

pub struct MockRouter {
    leg: Option<RoutedLeg>,
    delay: Duration,
}

impl MockRouter {
    pub fn answering(distance_meters: f64, duration_seconds: f64) -> Self {
        Self {
            leg: Some(RoutedLeg {
                distance_meters,
                duration_seconds,
            }),
            delay: Duration::ZERO,
        }
    }

    pub fn unreachable() -> Self {
        Self {
            leg: None,
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl RoutePort for MockRouter {
    async fn route(
        &self,
        _origin: LatLon,
        _destination: LatLon,
        _mode: TravelMode,
    ) -> Result<RoutedLeg, PortError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.leg
            .ok_or_else(|| PortError::ProviderUnavailable("MockRouter: unreachable".into()))
    }
}

// ---------------------------------------------------------------------------
// MockListings
// ---------------------------------------------------------------------------

pub struct MockListings {
    listings: Option<Vec<Listing>>,
}

impl MockListings {
    pub fn new(listings: Vec<Listing>) -> Self {
        Self {
            listings: Some(listings),
        }
    }

    pub fn unavailable() -> Self {
        Self { listings: None }
    }
}

#[async_trait]
impl ListingPort for MockListings {
    async fn listings_within(&self, query: &ListingQuery) -> Result<Vec<Listing>, PortError> {
        let listings = self
            .listings
            .as_ref()
            .ok_or_else(|| PortError::ProviderUnavailable("MockListings: unavailable".into()))?;
        Ok(listings
            .iter()
            .filter(|listing| query.max_price.is_none_or(|max| listing.price <= max))
            .cloned()
            .collect())
    }
}
