//! Composite livability scoring. Pure: no I/O, no suspension.

use std::collections::BTreeMap;

use crate::category::{ATM, CategoryId, FOOD, GROCERY, GYM, HOSPITAL, PHARMACY, POLICE, TRANSPORT};
use crate::model::{CostEstimate, LocationInsights, Place, Scores};

/// Opening-hours values treated as round-the-clock service. Matched exactly after trimming;
/// this is a fixed table, not an opening-hours parser.
pub const ROUND_THE_CLOCK: &[&str] = &[
    "24/7",
    "Mo-Su 00:00-24:00",
    "Mo-Su 00:00-23:59",
    "00:00-24:00",
    "24 hours",
];

/// `internet_access` values that count towards the wifi score.
const INTERNET_ACCESS: &[&str] = &["wlan", "yes", "wifi", "wired"];

const FOOD_THRESHOLD: f64 = 10.0;
const TRANSPORT_THRESHOLD: f64 = 15.0;
const POLICE_THRESHOLD: f64 = 2.0;
const GYM_THRESHOLD: f64 = 3.0;
const HEALTH_THRESHOLD: f64 = 5.0;
const CONVENIENCE_THRESHOLD: f64 = 10.0;
const WALKABILITY_THRESHOLD: f64 = 30.0;
const NIGHT_THRESHOLD: f64 = 5.0;
const WIFI_THRESHOLD: f64 = 5.0;

const FOOD_BASE_COST: u32 = 6000;
const FOOD_DISCOUNT_PER_PLACE: u32 = 100;
const FOOD_MIN_COST: u32 = 3000;
const TRANSPORT_BASE_COST: u32 = 2000;
const TRANSPORT_DISCOUNT_PER_STOP: u32 = 50;
const TRANSPORT_MIN_COST: u32 = 800;
const MISC_COST: u32 = 1500;

/// Compute insights for a place set. Identical input always yields identical output.
#[must_use]
pub fn compute_insights(places: &[Place]) -> LocationInsights {
    let mut counts: BTreeMap<CategoryId, u32> = BTreeMap::new();
    let mut round_the_clock = 0_u32;
    let mut wifi = 0_u32;
    for place in places {
        *counts.entry(place.category.clone()).or_default() += 1;
        if place.opening_hours.as_deref().is_some_and(is_round_the_clock) {
            round_the_clock += 1;
        }
        if place
            .raw_tags
            .get("internet_access")
            .is_some_and(|value| INTERNET_ACCESS.contains(&value.as_str()))
        {
            wifi += 1;
        }
    }
    let count = |id: &str| counts.get(id).copied().unwrap_or(0);

    let food = count(FOOD);
    let transport = count(TRANSPORT);
    let hospital = count(HOSPITAL);
    let pharmacy = count(PHARMACY);
    let grocery = count(GROCERY);
    let police = count(POLICE);

    let mut scores = Scores {
        food: ramp(food, FOOD_THRESHOLD),
        health: ramp(hospital + pharmacy, HEALTH_THRESHOLD),
        connectivity: ramp(transport, TRANSPORT_THRESHOLD),
        safety: ramp(police, POLICE_THRESHOLD),
        convenience: ramp(grocery + count(ATM), CONVENIENCE_THRESHOLD),
        fitness: ramp(count(GYM), GYM_THRESHOLD),
        walkability: ramp(food + grocery + pharmacy + transport, WALKABILITY_THRESHOLD),
        night_safety: ramp(police + hospital + round_the_clock, NIGHT_THRESHOLD),
        wifi: ramp(wifi, WIFI_THRESHOLD),
        overall: 0,
    };
    scores.overall = overall(&scores);

    LocationInsights {
        cost_estimate: cost_estimate(food, transport),
        counts,
        scores,
        is_24x7_available: round_the_clock > 0,
    }
}

/// Whether an opening-hours string is one of the canonical round-the-clock encodings.
#[must_use]
pub fn is_round_the_clock(opening_hours: &str) -> bool {
    ROUND_THE_CLOCK.contains(&opening_hours.trim())
}

/// Saturating linear ramp: `min(100, count / threshold * 100)`, rounded.
#[must_use]
pub fn ramp(count: u32, threshold: f64) -> u8 {
    to_score(f64::from(count) / threshold * 100.0)
}

fn overall(scores: &Scores) -> u8 {
    let weighted = [
        (scores.food, 0.20),
        (scores.health, 0.10),
        (scores.connectivity, 0.20),
        (scores.safety, 0.15),
        (scores.convenience, 0.15),
        (scores.fitness, 0.05),
        (scores.walkability, 0.05),
        (scores.night_safety, 0.05),
        (scores.wifi, 0.05),
    ]
    .iter()
    .map(|&(score, weight)| f64::from(score) * weight)
    .sum::<f64>();
    to_score(weighted)
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "value is clamped to 0..=100 before the cast"
)]
fn to_score(value: f64) -> u8 {
    value.round().clamp(0.0, 100.0) as u8
}

fn cost_estimate(food_places: u32, transport_stops: u32) -> CostEstimate {
    let food = FOOD_BASE_COST
        .saturating_sub(food_places.saturating_mul(FOOD_DISCOUNT_PER_PLACE))
        .max(FOOD_MIN_COST);
    let transport = TRANSPORT_BASE_COST
        .saturating_sub(transport_stops.saturating_mul(TRANSPORT_DISCOUNT_PER_STOP))
        .max(TRANSPORT_MIN_COST);
    CostEstimate {
        food,
        transport,
        misc: MISC_COST,
        total: food + transport + MISC_COST,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::INSTITUTION;
    use crate::testing::place;

    fn places_of(category: &str, count: u32) -> Vec<Place> {
        (0..count)
            .map(|idx| place(&format!("{category}-{idx}"), category, 19.0, 72.0))
            .collect()
    }

    #[test]
    fn empty_input_scores_zero_with_base_costs() {
        let insights = compute_insights(&[]);

        assert_eq!(insights.scores, Scores::default());
        assert_eq!(
            insights.cost_estimate,
            CostEstimate {
                food: 6000,
                transport: 2000,
                misc: 1500,
                total: 9500
            }
        );
        assert!(!insights.is_24x7_available);
    }

    #[test]
    fn sub_scores_cap_at_one_hundred() {
        let mut places = places_of(FOOD, 25);
        places.extend(places_of(POLICE, 2));
        places.extend(places_of(GYM, 4));

        let insights = compute_insights(&places);

        assert_eq!(insights.scores.food, 100);
        assert_eq!(insights.scores.safety, 100);
        assert_eq!(insights.scores.fitness, 100);
        assert_eq!(insights.count(FOOD), 25);
    }

    #[test]
    fn ramp_is_monotonic() {
        let mut previous = 0;
        for count in 0..40 {
            let places = places_of(TRANSPORT, count);
            let score = compute_insights(&places).scores.connectivity;
            assert!(score >= previous, "score dropped at {count}");
            previous = score;
        }
        assert_eq!(previous, 100);
    }

    #[test]
    fn composite_sub_scores_combine_counts() {
        let mut places = places_of(HOSPITAL, 1);
        places.extend(places_of(PHARMACY, 1));
        places.extend(places_of(GROCERY, 3));
        places.extend(places_of(ATM, 2));

        let scores = compute_insights(&places).scores;

        assert_eq!(scores.health, 40);
        assert_eq!(scores.convenience, 50);
    }

    #[test]
    fn overall_uses_fixed_weights() {
        let mut places = places_of(FOOD, 10);
        places.extend(places_of(TRANSPORT, 15));

        let scores = compute_insights(&places).scores;

        // food 100 * .20 + connectivity 100 * .20 + walkability 83 * .05 = 44.15
        assert_eq!(scores.walkability, 83);
        assert_eq!(scores.overall, 44);
    }

    #[test]
    fn costs_are_discounted_and_floored() {
        let mut places = places_of(FOOD, 50);
        places.extend(places_of(TRANSPORT, 10));

        let cost = compute_insights(&places).cost_estimate;

        assert_eq!(cost.food, 3000);
        assert_eq!(cost.transport, 1500);
        assert_eq!(cost.total, 3000 + 1500 + 1500);
    }

    #[test]
    fn round_the_clock_uses_exact_table() {
        assert!(is_round_the_clock("24/7"));
        assert!(is_round_the_clock("  Mo-Su 00:00-24:00 "));
        assert!(!is_round_the_clock("Mo-Fr 09:00-18:00"));
        assert!(!is_round_the_clock("24/7; PH off"));

        let mut pharmacy = place("p-1", PHARMACY, 19.0, 72.0);
        pharmacy.opening_hours = Some("24/7".to_owned());
        let insights = compute_insights(&[pharmacy]);

        assert!(insights.is_24x7_available);
        assert_eq!(insights.scores.night_safety, 20);
    }

    #[test]
    fn wifi_counts_internet_access_tags() {
        let mut cafe = place("c-1", FOOD, 19.0, 72.0);
        cafe.raw_tags
            .insert("internet_access".to_owned(), "wlan".to_owned());
        let mut library = place("l-1", INSTITUTION, 19.0, 72.0);
        library
            .raw_tags
            .insert("internet_access".to_owned(), "no".to_owned());

        let insights = compute_insights(&[cafe, library]);

        assert_eq!(insights.scores.wifi, 20);
    }

    #[test]
    fn repeated_runs_are_identical() {
        let mut places = places_of(FOOD, 7);
        places.extend(places_of(GYM, 1));
        places.extend(places_of(INSTITUTION, 2));

        assert_eq!(compute_insights(&places), compute_insights(&places));
    }
}
