//! Summary metrics and time-bucketed analytics over the detection set.
//!
//! Everything here is derived and recomputed on demand; nothing is
//! persisted. The weekly series always spans exactly 7 calendar days
//! ending "today" in local time, with empty days zero-filled rather than
//! omitted.

use std::collections::HashMap;

use chrono::{Duration, Local, NaiveDate, TimeZone};
use serde::Serialize;

use crate::geo_utils::total_distance_km;
use crate::{Detection, Severity};

/// Headline metrics for the current detection snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_distance_km: f64,
    pub pothole_count: usize,
    pub point_count: usize,
    /// Mean pothole severity on the 10-point scale, formatted as
    /// `"{:.1}/10"`, or `"N/A"` when there are no potholes.
    pub average_severity: String,
}

/// Compute the headline metrics over a detection snapshot.
pub fn summary(detections: &[Detection]) -> Summary {
    let potholes: Vec<&Detection> = detections.iter().filter(|d| d.is_pothole).collect();
    Summary {
        total_distance_km: total_distance_km(detections),
        pothole_count: potholes.len(),
        point_count: detections.len(),
        average_severity: average_severity(&potholes),
    }
}

/// Mean severity score over the pothole subset. Never divides by zero:
/// an empty subset yields the `"N/A"` sentinel.
fn average_severity(potholes: &[&Detection]) -> String {
    if potholes.is_empty() {
        return "N/A".to_string();
    }
    let total: f64 = potholes
        .iter()
        .map(|p| p.severity.map(Severity::score).unwrap_or(0.0))
        .sum();
    format!("{:.1}/10", total / potholes.len() as f64)
}

/// Potholes per surveyed kilometer; 0 when no distance has been covered.
pub fn potholes_per_km(pothole_count: usize, distance_km: f64) -> f64 {
    if distance_km > 0.0 {
        pothole_count as f64 / distance_km
    } else {
        0.0
    }
}

/// Absolute pothole counts per severity tier, for the severity chart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeverityDistribution {
    pub critical: u32,
    pub high: u32,
    pub medium: u32,
    pub low: u32,
    pub total: u32,
}

impl SeverityDistribution {
    pub fn count(&self, tier: Severity) -> u32 {
        match tier {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
        }
    }

    /// Share of the pothole total in `[0, 1]`; 0 when there are no potholes.
    pub fn share(&self, tier: Severity) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.count(tier) as f64 / self.total as f64
        }
    }
}

/// Count potholes per severity tier.
pub fn severity_distribution(detections: &[Detection]) -> SeverityDistribution {
    let mut dist = SeverityDistribution::default();
    for d in detections.iter().filter(|d| d.is_pothole) {
        dist.total += 1;
        match d.severity {
            Some(Severity::Critical) => dist.critical += 1,
            Some(Severity::High) => dist.high += 1,
            Some(Severity::Medium) => dist.medium += 1,
            Some(Severity::Low) => dist.low += 1,
            None => {}
        }
    }
    dist
}

/// The most recent potholes, newest first. Ties keep insertion order
/// (stable sort), matching the "recent" ordering of the activity feed.
pub fn recent_potholes(detections: &[Detection], limit: usize) -> Vec<&Detection> {
    let mut potholes: Vec<&Detection> = detections.iter().filter(|d| d.is_pothole).collect();
    potholes.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    potholes.truncate(limit);
    potholes
}

/// 7 daily buckets, oldest to newest, index-aligned across all arrays.
///
/// `keys` are `YYYY-MM-DD` bucket identifiers; `labels` are the
/// human-readable day labels rendered under chart axes (e.g. "Aug 23").
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklySeries {
    pub keys: Vec<String>,
    pub labels: Vec<String>,
    pub distance_km: Vec<f64>,
    pub potholes: Vec<u32>,
    pub critical: Vec<u32>,
    pub high: Vec<u32>,
    pub medium: Vec<u32>,
    pub low: Vec<u32>,
}

/// Number of daily buckets in the analytics window.
pub const WEEKLY_BUCKETS: usize = 7;

impl WeeklySeries {
    /// Build the series for the 7 calendar days ending at `today`.
    ///
    /// Detections whose local calendar day falls outside the window are
    /// silently dropped from the series (they still count in [`summary`]).
    /// Per-bucket distance preserves the original relative point order.
    pub fn build(detections: &[Detection], today: NaiveDate) -> Self {
        let days: Vec<NaiveDate> = (0..WEEKLY_BUCKETS as i64)
            .map(|i| today - Duration::days(WEEKLY_BUCKETS as i64 - 1 - i))
            .collect();
        let index_of: HashMap<NaiveDate, usize> =
            days.iter().enumerate().map(|(i, d)| (*d, i)).collect();

        // Bucket in input order so per-day distance follows the survey path.
        let mut buckets: Vec<Vec<&Detection>> = vec![Vec::new(); WEEKLY_BUCKETS];
        for d in detections {
            let Some(day) = Local
                .timestamp_millis_opt(d.timestamp)
                .single()
                .map(|dt| dt.date_naive())
            else {
                continue;
            };
            if let Some(&i) = index_of.get(&day) {
                buckets[i].push(d);
            }
        }

        let mut series = WeeklySeries {
            keys: days.iter().map(|d| d.format("%Y-%m-%d").to_string()).collect(),
            labels: days.iter().map(|d| d.format("%b %-d").to_string()).collect(),
            distance_km: Vec::with_capacity(WEEKLY_BUCKETS),
            potholes: Vec::with_capacity(WEEKLY_BUCKETS),
            critical: Vec::with_capacity(WEEKLY_BUCKETS),
            high: Vec::with_capacity(WEEKLY_BUCKETS),
            medium: Vec::with_capacity(WEEKLY_BUCKETS),
            low: Vec::with_capacity(WEEKLY_BUCKETS),
        };

        for bucket in &buckets {
            series
                .distance_km
                .push(total_distance_km(bucket.iter().copied()));
            let mut dist = SeverityDistribution::default();
            for d in bucket.iter().filter(|d| d.is_pothole) {
                dist.total += 1;
                match d.severity {
                    Some(Severity::Critical) => dist.critical += 1,
                    Some(Severity::High) => dist.high += 1,
                    Some(Severity::Medium) => dist.medium += 1,
                    Some(Severity::Low) => dist.low += 1,
                    None => {}
                }
            }
            series.potholes.push(dist.total);
            series.critical.push(dist.critical);
            series.high.push(dist.high);
            series.medium.push(dist.medium);
            series.low.push(dist.low);
        }

        series
    }
}

/// Build the weekly series ending at today's local date.
pub fn weekly_series(detections: &[Detection]) -> WeeklySeries {
    WeeklySeries::build(detections, Local::now().date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_utils::distance_km;
    use crate::{normalize, FixedScorer, RawPoint, Severity};

    /// Epoch ms for noon (local time) on `today - days_ago`.
    fn local_noon_ms(today: NaiveDate, days_ago: i64) -> i64 {
        let naive = (today - Duration::days(days_ago)).and_hms_opt(12, 0, 0).unwrap();
        Local
            .from_local_datetime(&naive)
            .single()
            .unwrap()
            .timestamp_millis()
    }

    fn pothole_at(lat: f64, lon: f64, ts: i64, severity: Severity) -> Detection {
        let mut d = normalize(
            &[RawPoint::pothole(lat, lon, None)],
            &FixedScorer(severity),
        )
        .remove(0);
        d.timestamp = ts;
        d
    }

    fn track_at(lat: f64, lon: f64, ts: i64) -> Detection {
        let mut d = normalize(&[RawPoint::track(lat, lon)], &FixedScorer(Severity::Low)).remove(0);
        d.timestamp = ts;
        d
    }

    #[test]
    fn test_average_severity_empty_is_na() {
        let s = summary(&[]);
        assert_eq!(s.average_severity, "N/A");
        assert_eq!(s.pothole_count, 0);
        assert_eq!(s.point_count, 0);
    }

    #[test]
    fn test_summary_scenario() {
        // One track point plus one critical pothole ~1.5 km away.
        let detections = normalize(
            &[
                RawPoint::track(30.70, 76.70),
                RawPoint::pothole(30.71, 76.71, None),
            ],
            &FixedScorer(Severity::Critical),
        );
        let s = summary(&detections);
        assert_eq!(s.pothole_count, 1);
        assert_eq!(s.point_count, 2);
        assert_eq!(s.average_severity, "10.0/10");
        let expected = distance_km((30.70, 76.70), (30.71, 76.71));
        assert!((s.total_distance_km - expected).abs() < 1e-9);
    }

    #[test]
    fn test_average_severity_one_decimal() {
        // critical (10) + low (3) = 6.5
        let today = Local::now().date_naive();
        let ts = local_noon_ms(today, 0);
        let detections = vec![
            pothole_at(30.70, 76.70, ts, Severity::Critical),
            pothole_at(30.72, 76.72, ts, Severity::Low),
        ];
        assert_eq!(summary(&detections).average_severity, "6.5/10");
    }

    #[test]
    fn test_severity_distribution_counts_and_share() {
        let ts = 1_700_000_000_000;
        let detections = vec![
            pothole_at(30.70, 76.70, ts, Severity::Critical),
            pothole_at(30.71, 76.71, ts, Severity::Critical),
            pothole_at(30.72, 76.72, ts, Severity::Medium),
            pothole_at(30.73, 76.73, ts, Severity::Low),
            track_at(30.74, 76.74, ts),
        ];
        let dist = severity_distribution(&detections);
        assert_eq!(dist.total, 4);
        assert_eq!(dist.critical, 2);
        assert_eq!(dist.high, 0);
        assert_eq!(dist.medium, 1);
        assert_eq!(dist.low, 1);
        assert!((dist.share(Severity::Critical) - 0.5).abs() < 1e-12);
        assert_eq!(SeverityDistribution::default().share(Severity::High), 0.0);
    }

    #[test]
    fn test_potholes_per_km_guards_zero_distance() {
        assert_eq!(potholes_per_km(5, 0.0), 0.0);
        assert!((potholes_per_km(5, 2.5) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_recent_potholes_newest_first_stable() {
        let detections = vec![
            pothole_at(30.70, 76.70, 100, Severity::Low),
            pothole_at(30.71, 76.71, 300, Severity::Low),
            pothole_at(30.72, 76.72, 300, Severity::Low),
            pothole_at(30.73, 76.73, 200, Severity::Low),
            track_at(30.74, 76.74, 999),
        ];
        let recent = recent_potholes(&detections, 3);
        assert_eq!(recent.len(), 3);
        // Two ties at 300 keep insertion order, then 200.
        assert_eq!(recent[0].lat, Some(30.71));
        assert_eq!(recent[1].lat, Some(30.72));
        assert_eq!(recent[2].lat, Some(30.73));
    }

    #[test]
    fn test_weekly_series_always_seven_buckets() {
        let today = Local::now().date_naive();
        let series = WeeklySeries::build(&[], today);
        assert_eq!(series.keys.len(), 7);
        assert_eq!(series.labels.len(), 7);
        assert_eq!(series.distance_km, vec![0.0; 7]);
        assert_eq!(series.potholes, vec![0; 7]);
        assert_eq!(series.keys[6], today.format("%Y-%m-%d").to_string());
    }

    #[test]
    fn test_weekly_series_buckets_and_window() {
        let today = Local::now().date_naive();
        let detections = vec![
            // Two days ago: a run of three points with one critical pothole.
            track_at(30.70, 76.70, local_noon_ms(today, 2)),
            pothole_at(30.71, 76.71, local_noon_ms(today, 2), Severity::Critical),
            track_at(30.72, 76.72, local_noon_ms(today, 2)),
            // Today: one high pothole.
            pothole_at(30.80, 76.80, local_noon_ms(today, 0), Severity::High),
            // Outside the window: dropped from the series.
            pothole_at(30.90, 76.90, local_noon_ms(today, 10), Severity::Low),
        ];
        let series = WeeklySeries::build(&detections, today);

        assert_eq!(series.potholes[4], 1); // two days ago
        assert_eq!(series.critical[4], 1);
        assert_eq!(series.potholes[6], 1); // today
        assert_eq!(series.high[6], 1);
        assert_eq!(series.potholes.iter().sum::<u32>(), 2);

        // Distance for the two-days-ago bucket covers its three points.
        let expected = distance_km((30.70, 76.70), (30.71, 76.71))
            + distance_km((30.71, 76.71), (30.72, 76.72));
        assert!((series.distance_km[4] - expected).abs() < 1e-9);
        assert_eq!(series.distance_km[5], 0.0);
    }

    #[test]
    fn test_weekly_series_in_window_pothole_sum() {
        let today = Local::now().date_naive();
        let detections: Vec<Detection> = (0..5)
            .map(|i| {
                pothole_at(
                    30.70 + i as f64 * 0.01,
                    76.70,
                    local_noon_ms(today, i % 3),
                    Severity::Medium,
                )
            })
            .collect();
        let series = WeeklySeries::build(&detections, today);
        assert_eq!(series.potholes.iter().sum::<u32>(), 5);
    }
}
