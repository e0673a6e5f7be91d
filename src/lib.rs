//! # Roadscan
//!
//! Client-side data pipeline for road-survey telemetry: raw GPS points with
//! a pothole flag are fetched from a survey backend, normalized into
//! detection records, and served to presentation layers through pure
//! filter/sort/paginate and analytics computations, plus a batch export
//! that tolerates partial network failure.
//!
//! This library provides:
//! - Point normalization with an injectable severity scorer
//! - Haversine distance and per-day analytics bucketing
//! - A filterable/sortable/paginated table state machine over detections
//! - ZIP export (report + images) with partial-failure accounting
//! - A session that atomically replaces its detection snapshot on refresh
//!
//! ## Quick Start
//!
//! ```rust
//! use roadscan::{normalize, summary, FixedScorer, RawPoint, Severity};
//!
//! let raw = vec![
//!     RawPoint::track(30.70, 76.70),
//!     RawPoint::pothole(30.71, 76.71, Some("/images/p1.jpg".to_string())),
//! ];
//!
//! let detections = normalize(&raw, &FixedScorer(Severity::Critical));
//! let summary = summary(&detections);
//!
//! assert_eq!(summary.pothole_count, 1);
//! assert_eq!(summary.average_severity, "10.0/10");
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{Result, RoadscanError};

// Geographic utilities (haversine distance over valid coordinate runs)
pub mod geo_utils;
pub use geo_utils::{distance_km, total_distance_km};

// Raw point normalization and severity scoring
pub mod normalize;
pub use normalize::{normalize, DistributionScorer, FixedScorer, SeverityScorer};

// Summary metrics and 7-day bucketed series
pub mod analytics;
pub use analytics::{
    recent_potholes, severity_distribution, summary, weekly_series, SeverityDistribution, Summary,
    WeeklySeries,
};

// Table state machine (filter/sort/paginate/select)
pub mod table;
pub use table::{
    RenderedPage, SeverityFilter, SortColumn, SortDirection, TableEngine, TableRow, TableState,
};

// Export pipeline (report + image archive)
pub mod export;
pub use export::{
    assemble_archive, build_report, export_point, ExportArchive, ExportReport, ExportScope,
};

// Session orchestration (fetch -> normalize -> publish)
pub mod session;
pub use session::{DataSession, RouteSource};

// HTTP client for the survey backend
pub mod http;
pub use http::RouteClient;

// Credential store and pre-network validation
pub mod config;
pub use config::{validate_registration, CredentialStore, Credentials};

// ============================================================================
// Core Types
// ============================================================================

/// A raw telemetry point as received from the backend `/route` payload.
///
/// Coordinates and timestamp may be absent; such points are still carried
/// through normalization and only excluded by geometry and table consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPoint {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    #[serde(default)]
    pub is_pothole: bool,
    #[serde(default)]
    pub file_path: Option<String>,
    /// Epoch milliseconds, if the capture device recorded one.
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl RawPoint {
    /// A plain GPS track point (no pothole).
    pub fn track(lat: f64, lon: f64) -> Self {
        Self {
            lat: Some(lat),
            lon: Some(lon),
            is_pothole: false,
            file_path: None,
            timestamp: None,
        }
    }

    /// A pothole point with an optional image reference.
    pub fn pothole(lat: f64, lon: f64, file_path: Option<String>) -> Self {
        Self {
            lat: Some(lat),
            lon: Some(lon),
            is_pothole: true,
            file_path,
            timestamp: None,
        }
    }
}

/// Severity tier of a pothole detection, ranked `critical > high > medium > low`
/// for sorting and scoring. Non-potholes carry no severity at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    /// Rank used by the table's severity comparator (4 = most severe).
    pub fn rank(self) -> u8 {
        match self {
            Severity::Critical => 4,
            Severity::High => 3,
            Severity::Medium => 2,
            Severity::Low => 1,
        }
    }

    /// Score on the 10-point scale used for the average-severity metric.
    pub fn score(self) -> f64 {
        match self {
            Severity::Critical => 10.0,
            Severity::High => 7.0,
            Severity::Medium => 5.0,
            Severity::Low => 3.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized detection record, immutable once created.
///
/// `id` is the composite key `"{lat}_{lon}"`; it is unique within one fetch
/// but NOT guaranteed unique across re-fetches if the backend revises
/// coordinates, and two detections at identical coordinates collide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub is_pothole: bool,
    /// `Some` iff `is_pothole` is true.
    pub severity: Option<Severity>,
    /// Epoch milliseconds; defaulted to normalization time when absent.
    pub timestamp: i64,
    pub file_path: Option<String>,
    /// Human-readable area label derived from the coordinates.
    pub location: String,
    pub id: String,
}

impl Detection {
    /// Both coordinates, when present. Geometry and table consumers operate
    /// only on detections where this is `Some`; 0.0 is a valid coordinate.
    pub fn coords(&self) -> Option<(f64, f64)> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}

// ============================================================================
// Formatting Helpers
// ============================================================================

/// Format a coordinate pair as `"lat, lon"` with 4 decimal places.
pub fn format_coords(lat: f64, lon: f64) -> String {
    format!("{:.4}, {:.4}", lat, lon)
}

/// Human-readable age of a timestamp relative to `now` (both epoch ms):
/// "Just now", "N min ago", "N hr(s) ago", "N day(s) ago".
pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minutes = diff / 60_000;
    let hours = diff / 3_600_000;
    let days = diff / 86_400_000;

    if minutes < 1 {
        "Just now".to_string()
    } else if minutes < 60 {
        format!("{} min ago", minutes)
    } else if hours < 24 {
        format!("{} hr{} ago", hours, if hours > 1 { "s" } else { "" })
    } else {
        format!("{} day{} ago", days, if days > 1 { "s" } else { "" })
    }
}

// ============================================================================
// Tests
// ============================================================================
