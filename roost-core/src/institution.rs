//! Nearest-institution resolution.

use crate::model::{LatLon, NearestInstitution, Place};

/// Closest place in the institution category to `point`, by planar distance.
///
/// Ties keep input order. The input slice is left untouched.
#[must_use]
pub fn nearest_institution(places: &[Place], point: LatLon) -> Option<NearestInstitution> {
    let mut candidates: Vec<(f64, &Place)> = places
        .iter()
        .filter(|place| place.category.is_institution())
        .map(|place| (place.position.planar_distance_km(point), place))
        .collect();
    candidates.sort_by(|left, right| left.0.total_cmp(&right.0));

    candidates
        .into_iter()
        .next()
        .map(|(distance_km, place)| NearestInstitution {
            place: place.clone(),
            distance_km,
        })
}
