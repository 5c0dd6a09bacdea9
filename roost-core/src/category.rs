//! Category filters used to query and classify amenities.

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Identifier of the institution category, which can never be disabled.
pub const INSTITUTION: &str = "institution";
/// Restaurants, cafes and fast food.
pub const FOOD: &str = "food";
/// Bus stops and stations.
pub const TRANSPORT: &str = "transport";
/// Hospitals and clinics.
pub const HOSPITAL: &str = "hospital";
/// Pharmacies.
pub const PHARMACY: &str = "pharmacy";
/// Supermarkets and convenience stores.
pub const GROCERY: &str = "grocery";
/// ATMs and banks.
pub const ATM: &str = "atm";
/// Police stations.
pub const POLICE: &str = "police";
/// Gyms and sports centres.
pub const GYM: &str = "gym";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
/// Identifier for an amenity category.
pub struct CategoryId(pub String);

impl CategoryId {
    /// Construct an identifier.
    #[must_use]
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the permanently enabled institution category.
    #[must_use]
    pub fn is_institution(&self) -> bool {
        self.0 == INSTITUTION
    }
}

impl Borrow<str> for CategoryId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Single `key=value` tag condition.
pub struct TagMatcher {
    /// Tag key, e.g. `amenity`.
    pub key: String,
    /// Required tag value, e.g. `restaurant`.
    pub value: String,
}

impl TagMatcher {
    /// Construct a matcher.
    #[must_use]
    pub fn new<K: Into<String>, V: Into<String>>(key: K, value: V) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Whether the tag set contains this exact key/value pair.
    #[must_use]
    pub fn matches(&self, tags: &BTreeMap<String, String>) -> bool {
        tags.get(&self.key).is_some_and(|value| *value == self.value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// A toggleable amenity category.
pub struct CategoryFilter {
    /// Unique identifier.
    pub id: CategoryId,
    /// Label shown to users.
    pub display_name: String,
    /// Tags that place an element in this category.
    pub tag_matchers: Vec<TagMatcher>,
    enabled: bool,
}

impl CategoryFilter {
    /// Build an enabled category from `(key, value)` pairs.
    #[must_use]
    pub fn new<I, D>(id: I, display_name: D, matchers: &[(&str, &str)]) -> Self
    where
        I: Into<String>,
        D: Into<String>,
    {
        Self {
            id: CategoryId::new(id),
            display_name: display_name.into(),
            tag_matchers: matchers
                .iter()
                .map(|&(key, value)| TagMatcher::new(key, value))
                .collect(),
            enabled: true,
        }
    }

    /// Whether the category is currently part of queries.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether any matcher accepts the given tags.
    #[must_use]
    pub fn matches(&self, tags: &BTreeMap<String, String>) -> bool {
        self.tag_matchers.iter().any(|matcher| matcher.matches(tags))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// Ordered set of categories. Declaration order is the classification tie-break.
pub struct CategorySet {
    filters: Vec<CategoryFilter>,
}

impl CategorySet {
    /// Build a set, forcing the institution category to stay enabled.
    #[must_use]
    pub fn new(mut filters: Vec<CategoryFilter>) -> Self {
        for filter in &mut filters {
            if filter.id.is_institution() {
                filter.enabled = true;
            }
        }
        Self { filters }
    }

    /// Default catalogue used by the engine.
    #[must_use]
    pub fn catalogue() -> Self {
        Self::new(vec![
            CategoryFilter::new(
                INSTITUTION,
                "Colleges & universities",
                &[
                    ("amenity", "university"),
                    ("amenity", "college"),
                    ("amenity", "school"),
                ],
            ),
            CategoryFilter::new(
                FOOD,
                "Food",
                &[
                    ("amenity", "restaurant"),
                    ("amenity", "cafe"),
                    ("amenity", "fast_food"),
                    ("amenity", "food_court"),
                ],
            ),
            CategoryFilter::new(
                TRANSPORT,
                "Transport",
                &[
                    ("highway", "bus_stop"),
                    ("railway", "station"),
                    ("railway", "halt"),
                    ("public_transport", "station"),
                    ("amenity", "bus_station"),
                ],
            ),
            CategoryFilter::new(
                HOSPITAL,
                "Hospitals",
                &[("amenity", "hospital"), ("amenity", "clinic")],
            ),
            CategoryFilter::new(PHARMACY, "Pharmacies", &[("amenity", "pharmacy")]),
            CategoryFilter::new(
                GROCERY,
                "Groceries",
                &[
                    ("shop", "supermarket"),
                    ("shop", "convenience"),
                    ("shop", "greengrocer"),
                ],
            ),
            CategoryFilter::new(ATM, "ATMs & banks", &[("amenity", "atm"), ("amenity", "bank")]),
            CategoryFilter::new(POLICE, "Police", &[("amenity", "police")]),
            CategoryFilter::new(
                GYM,
                "Gyms",
                &[("leisure", "fitness_centre"), ("leisure", "sports_centre")],
            ),
        ])
    }

    /// All categories in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &CategoryFilter> {
        self.filters.iter()
    }

    /// Enabled categories in declaration order.
    pub fn enabled(&self) -> impl Iterator<Item = &CategoryFilter> {
        self.filters.iter().filter(|filter| filter.enabled)
    }

    /// Look up a category by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&CategoryFilter> {
        self.filters.iter().find(|filter| filter.id.as_str() == id)
    }

    /// Number of categories, enabled or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Whether the set holds no categories.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Change whether a category is enabled. Returns `true` if anything changed.
    ///
    /// Requests to disable the institution category are refused.
    pub fn set_enabled(&mut self, id: &str, enabled: bool) -> bool {
        let Some(filter) = self.filters.iter_mut().find(|filter| filter.id.as_str() == id) else {
            return false;
        };
        if filter.id.is_institution() && !enabled {
            debug!(category = id, "Refusing to disable the institution category");
            return false;
        }
        let changed = filter.enabled != enabled;
        filter.enabled = enabled;
        changed
    }

    /// Flip a category. Returns `true` if anything changed.
    pub fn toggle(&mut self, id: &str) -> bool {
        let Some(current) = self.get(id).map(CategoryFilter::is_enabled) else {
            return false;
        };
        self.set_enabled(id, !current)
    }

    /// First enabled category whose matchers accept the tags.
    #[must_use]
    pub fn classify(&self, tags: &BTreeMap<String, String>) -> Option<&CategoryFilter> {
        self.enabled().find(|filter| filter.matches(tags))
    }
}

impl Default for CategorySet {
    fn default() -> Self {
        Self::catalogue()
    }
}
