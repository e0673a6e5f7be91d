//! Raw point normalization: converts backend [`RawPoint`]s into enriched
//! [`Detection`] records.
//!
//! Severity assignment goes through the [`SeverityScorer`] trait so tests
//! (and a future backend-provided score) can use a deterministic source;
//! the default [`DistributionScorer`] preserves the placeholder four-tier
//! distribution of the original scoring policy.

use chrono::Utc;
use log::debug;
use rand::Rng;

use crate::{Detection, RawPoint, Severity};

/// Source of severity scores for pothole points.
///
/// Only invoked for points flagged as potholes; non-potholes never carry
/// a severity.
pub trait SeverityScorer {
    fn score_of(&self, point: &RawPoint) -> Severity;
}

/// Map a uniform draw in `[0, 1)` onto the four-tier cumulative
/// distribution: critical 23%, high 34%, medium 28%, low 15%.
pub fn severity_from_unit(draw: f64) -> Severity {
    if draw < 0.23 {
        Severity::Critical
    } else if draw < 0.57 {
        Severity::High
    } else if draw < 0.85 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Default scorer: pseudo-random draw over the fixed tier distribution.
/// A placeholder until the backend emits real severity scores.
#[derive(Debug, Clone, Copy, Default)]
pub struct DistributionScorer;

impl SeverityScorer for DistributionScorer {
    fn score_of(&self, _point: &RawPoint) -> Severity {
        severity_from_unit(rand::thread_rng().gen::<f64>())
    }
}

/// Deterministic scorer that assigns the same tier to every pothole.
#[derive(Debug, Clone, Copy)]
pub struct FixedScorer(pub Severity);

impl SeverityScorer for FixedScorer {
    fn score_of(&self, _point: &RawPoint) -> Severity {
        self.0
    }
}

/// Derive a human-readable area label from coordinates.
///
/// Deterministic, so the same detection keeps its label across refreshes.
// TODO: resolve real place names via reverse geocoding (Nominatim) with a
// local cache instead of synthetic sector labels.
fn location_label(lat: Option<f64>, lon: Option<f64>) -> String {
    match (lat, lon) {
        (Some(lat), Some(lon)) => {
            let a = (lat * 10_000.0).abs() as u64;
            let b = (lon * 10_000.0).abs() as u64;
            let n = a.wrapping_mul(31).wrapping_add(b) % 90 + 10;
            format!("Sector {}", n)
        }
        _ => "Unknown".to_string(),
    }
}

fn coord_key(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{}", v),
        None => "unknown".to_string(),
    }
}

/// Normalize raw API points into detection records.
///
/// Output order equals input order. Points with missing coordinates are
/// still emitted (carrying `None` coordinates) and left for geometry and
/// table consumers to exclude. "Now" is captured once, so every defaulted
/// timestamp in one batch is identical.
pub fn normalize(points: &[RawPoint], scorer: &dyn SeverityScorer) -> Vec<Detection> {
    let now_ms = Utc::now().timestamp_millis();

    let detections: Vec<Detection> = points
        .iter()
        .map(|p| {
            let severity = if p.is_pothole {
                Some(scorer.score_of(p))
            } else {
                None
            };
            Detection {
                lat: p.lat,
                lon: p.lon,
                is_pothole: p.is_pothole,
                severity,
                timestamp: p.timestamp.unwrap_or(now_ms),
                file_path: p.file_path.clone(),
                location: location_label(p.lat, p.lon),
                id: format!("{}_{}", coord_key(p.lat), coord_key(p.lon)),
            }
        })
        .collect();

    debug!(
        "normalized {} points ({} potholes)",
        detections.len(),
        detections.iter().filter(|d| d.is_pothole).count()
    );

    detections
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_distribution_boundaries() {
        assert_eq!(severity_from_unit(0.0), Severity::Critical);
        assert_eq!(severity_from_unit(0.2299), Severity::Critical);
        assert_eq!(severity_from_unit(0.23), Severity::High);
        assert_eq!(severity_from_unit(0.5699), Severity::High);
        assert_eq!(severity_from_unit(0.57), Severity::Medium);
        assert_eq!(severity_from_unit(0.8499), Severity::Medium);
        assert_eq!(severity_from_unit(0.85), Severity::Low);
        assert_eq!(severity_from_unit(0.9999), Severity::Low);
    }

    #[test]
    fn test_severity_none_iff_not_pothole() {
        let raw = vec![
            RawPoint::track(30.70, 76.70),
            RawPoint::pothole(30.71, 76.71, None),
        ];
        let out = normalize(&raw, &FixedScorer(Severity::High));
        assert_eq!(out[0].severity, None);
        assert_eq!(out[1].severity, Some(Severity::High));
    }

    #[test]
    fn test_id_uses_natural_decimal_representation() {
        let out = normalize(&[RawPoint::pothole(30.7, 76.71, None)], &DistributionScorer);
        assert_eq!(out[0].id, "30.7_76.71");
    }

    #[test]
    fn test_missing_coordinates_still_emitted() {
        let raw = vec![RawPoint {
            lat: None,
            lon: Some(76.7),
            is_pothole: true,
            file_path: None,
            timestamp: Some(42),
        }];
        let out = normalize(&raw, &FixedScorer(Severity::Low));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].coords(), None);
        assert_eq!(out[0].location, "Unknown");
        assert_eq!(out[0].id, "unknown_76.7");
    }

    #[test]
    fn test_timestamp_defaults_to_capture_time() {
        let before = Utc::now().timestamp_millis();
        let out = normalize(
            &[RawPoint::track(30.7, 76.7), RawPoint::track(30.8, 76.8)],
            &DistributionScorer,
        );
        let after = Utc::now().timestamp_millis();

        assert!(out[0].timestamp >= before && out[0].timestamp <= after);
        // Capture-once: both defaulted timestamps are identical.
        assert_eq!(out[0].timestamp, out[1].timestamp);

        let explicit = normalize(
            &[RawPoint {
                timestamp: Some(1_700_000_000_000),
                ..RawPoint::track(30.7, 76.7)
            }],
            &DistributionScorer,
        );
        assert_eq!(explicit[0].timestamp, 1_700_000_000_000);
    }

    #[test]
    fn test_output_order_equals_input_order() {
        let raw: Vec<RawPoint> = (0..20)
            .map(|i| RawPoint::track(30.0 + i as f64 * 0.01, 76.0))
            .collect();
        let out = normalize(&raw, &DistributionScorer);
        for (i, d) in out.iter().enumerate() {
            assert_eq!(d.lat, Some(30.0 + i as f64 * 0.01));
        }
    }

    #[test]
    fn test_location_label_is_deterministic() {
        let a = location_label(Some(30.7), Some(76.7));
        let b = location_label(Some(30.7), Some(76.7));
        assert_eq!(a, b);
        assert!(a.starts_with("Sector "));
    }
}
