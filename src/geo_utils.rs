//! Geographic utilities: haversine distance and distance over point runs.
//!
//! All distances are great-circle kilometers. These functions are pure and
//! have no failure modes; NaN coordinates propagate rather than reject.

use crate::Detection;

/// Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine great-circle distance in kilometers between two (lat, lon)
/// pairs in degrees. Callers filter missing coordinates before invoking.
pub fn distance_km(a: (f64, f64), b: (f64, f64)) -> f64 {
    let (lat1, lon1) = a;
    let (lat2, lon2) = b;

    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Total distance in kilometers over consecutive valid pairs of a point
/// sequence. A pair where either point lacks coordinates is skipped, not
/// treated as zero-length, so an invalid point breaks continuity without
/// bridging the runs around it.
pub fn total_distance_km<'a, I>(points: I) -> f64
where
    I: IntoIterator<Item = &'a Detection>,
{
    let mut total = 0.0;
    let mut prev: Option<Option<(f64, f64)>> = None;
    for p in points {
        let coords = p.coords();
        if let (Some(Some(a)), Some(b)) = (prev, coords) {
            total += distance_km(a, b);
        }
        prev = Some(coords);
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{normalize, FixedScorer, RawPoint, Severity};

    fn detections(raw: Vec<RawPoint>) -> Vec<Detection> {
        normalize(&raw, &FixedScorer(Severity::Critical))
    }

    #[test]
    fn test_distance_zero_for_same_point() {
        assert_eq!(distance_km((30.7, 76.7), (30.7, 76.7)), 0.0);
    }

    #[test]
    fn test_distance_known_pair() {
        // 0.01 degrees in both axes at ~30.7N is just under 1.5 km.
        let d = distance_km((30.70, 76.70), (30.71, 76.71));
        assert!(d > 1.40 && d < 1.53, "got {}", d);
    }

    #[test]
    fn test_distance_nan_propagates() {
        assert!(distance_km((f64::NAN, 0.0), (1.0, 1.0)).is_nan());
    }

    #[test]
    fn test_total_distance_consecutive_pairs() {
        let points = detections(vec![
            RawPoint::track(30.70, 76.70),
            RawPoint::track(30.71, 76.71),
            RawPoint::track(30.72, 76.72),
        ]);
        let total = total_distance_km(&points);
        let expected = distance_km((30.70, 76.70), (30.71, 76.71))
            + distance_km((30.71, 76.71), (30.72, 76.72));
        assert!((total - expected).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_point_breaks_continuity() {
        // A, B, X (no coords), C, D: distance is AB + CD, with no bridge
        // across the invalid point.
        let mut points = detections(vec![
            RawPoint::track(30.70, 76.70),
            RawPoint::track(30.71, 76.71),
            RawPoint::track(0.0, 0.0), // placeholder, coords removed below
            RawPoint::track(30.74, 76.74),
            RawPoint::track(30.75, 76.75),
        ]);
        points[2].lat = None;
        points[2].lon = None;

        let total = total_distance_km(&points);
        let expected = distance_km((30.70, 76.70), (30.71, 76.71))
            + distance_km((30.74, 76.74), (30.75, 76.75));
        assert!((total - expected).abs() < 1e-12);
    }

    #[test]
    fn test_total_distance_empty_and_single() {
        let empty: Vec<Detection> = Vec::new();
        assert_eq!(total_distance_km(&empty), 0.0);
        let one = detections(vec![RawPoint::track(30.7, 76.7)]);
        assert_eq!(total_distance_km(&one), 0.0);
    }
}
