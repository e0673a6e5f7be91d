//! Batch export: structured report plus fetched images, bundled into a
//! ZIP archive.
//!
//! The defining contract is partial-failure tolerance: one broken image
//! fetch must never lose the rest of the export. Failures are logged and
//! counted into the archive manifest; the report itself is always written,
//! even when zero images succeed. Archive entries are keyed by base
//! filename, so fetch completion order never affects archive contents.

use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::io::{Cursor, Write};

use chrono::Utc;
use futures::stream::{self, StreamExt};
use log::{info, warn};
use serde::Serialize;
use zip::write::{SimpleFileOptions, ZipWriter};
use zip::CompressionMethod;

use crate::error::Result;
use crate::geo_utils::total_distance_km;
use crate::{analytics, Detection, Severity};

/// Default bound on in-flight image fetches.
pub const DEFAULT_FETCH_CONCURRENCY: usize = 4;

/// DEFLATE level: balanced speed/size.
const COMPRESSION_LEVEL: i64 = 6;

/// Which detections an export covers.
#[derive(Debug, Clone)]
pub enum ExportScope {
    /// Every pothole in the snapshot, plus the full GPS track.
    AllPotholes,
    /// An explicit selection of pothole ids (from the table).
    Selection(HashSet<String>),
}

/// Immutable report snapshot written as `report.json`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportReport {
    /// RFC 3339 generation timestamp.
    pub generated: String,
    pub summary: ReportSummary,
    pub potholes: Vec<ReportItem>,
    /// Full GPS track; only present for [`ExportScope::AllPotholes`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_points: Option<Vec<TrackPoint>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total_potholes: usize,
    pub by_severity: SeverityCounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_distance_km: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_points: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_severity: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SeverityCounts {
    pub critical: u32,
    pub high: u32,
    pub medium: u32,
    pub low: u32,
}

/// One exported pothole record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportItem {
    pub location: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub severity: Option<Severity>,
    pub timestamp: i64,
    pub image_path: Option<String>,
}

/// One raw track point in the full-report variant.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackPoint {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub timestamp: i64,
    pub is_pothole: bool,
}

/// The assembled archive, ready for download.
#[derive(Debug, Clone)]
pub struct ExportArchive {
    /// Timestamped download name, e.g. `roadscan_report_1700000000000.zip`.
    pub file_name: String,
    /// ZIP bytes (DEFLATE).
    pub bytes: Vec<u8>,
    pub images_included: u32,
    pub images_failed: u32,
}

fn severity_counts(potholes: &[&Detection]) -> SeverityCounts {
    let mut counts = SeverityCounts::default();
    for p in potholes {
        match p.severity {
            Some(Severity::Critical) => counts.critical += 1,
            Some(Severity::High) => counts.high += 1,
            Some(Severity::Medium) => counts.medium += 1,
            Some(Severity::Low) => counts.low += 1,
            None => {}
        }
    }
    counts
}

fn item_of(d: &Detection) -> ReportItem {
    ReportItem {
        location: d.location.clone(),
        lat: d.lat,
        lon: d.lon,
        severity: d.severity,
        timestamp: d.timestamp,
        image_path: d.file_path.clone(),
    }
}

/// Build an export report over a detection snapshot.
///
/// [`ExportScope::AllPotholes`] produces the full-report variant with
/// headline metrics and the complete point track; a selection produces
/// the leaner per-selection variant with counts only.
pub fn build_report(detections: &[Detection], scope: &ExportScope) -> ExportReport {
    let generated = Utc::now().to_rfc3339();

    match scope {
        ExportScope::AllPotholes => {
            let potholes: Vec<&Detection> = detections.iter().filter(|d| d.is_pothole).collect();
            let summary = analytics::summary(detections);
            ExportReport {
                generated,
                summary: ReportSummary {
                    total_potholes: potholes.len(),
                    by_severity: severity_counts(&potholes),
                    total_distance_km: Some(total_distance_km(detections)),
                    total_points: Some(detections.len()),
                    average_severity: Some(summary.average_severity),
                },
                potholes: potholes.iter().map(|d| item_of(d)).collect(),
                all_points: Some(
                    detections
                        .iter()
                        .map(|d| TrackPoint {
                            lat: d.lat,
                            lon: d.lon,
                            timestamp: d.timestamp,
                            is_pothole: d.is_pothole,
                        })
                        .collect(),
                ),
            }
        }
        ExportScope::Selection(ids) => {
            let selected: Vec<&Detection> = detections
                .iter()
                .filter(|d| d.is_pothole && ids.contains(&d.id))
                .collect();
            ExportReport {
                generated,
                summary: ReportSummary {
                    total_potholes: selected.len(),
                    by_severity: severity_counts(&selected),
                    total_distance_km: None,
                    total_points: None,
                    average_severity: None,
                },
                potholes: selected.iter().map(|d| item_of(d)).collect(),
                all_points: None,
            }
        }
    }
}

/// Plain-text manifest written as `README.txt` inside the archive.
pub fn manifest_text(report: &ExportReport, images_included: u32, images_failed: u32) -> String {
    format!(
        "Roadscan Export Report\n\
         Generated: {}\n\
         \n\
         Summary:\n\
         - Total Potholes: {}\n\
         - Images Included: {}\n\
         - Failed Downloads: {}\n\
         \n\
         Contents:\n\
         - report.json: Complete data report with GPS coordinates and metadata\n\
         - images/: Folder containing {} pothole images\n\
         \n\
         Note: Image filenames correspond to the 'imagePath' field in report.json\n",
        report.generated, report.summary.total_potholes, images_included, images_failed,
        images_included
    )
}

/// Base filename of an image path, used as the archive entry key.
fn base_filename(path: &str, fallback_index: usize) -> String {
    match path.rsplit('/').next() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => format!("image_{}.jpg", fallback_index),
    }
}

/// Assemble the downloadable archive for a report.
///
/// `fetch_image` is the injected capability that retrieves one image by
/// its backend path (see [`crate::http::RouteClient::fetch_image`]).
/// Fetches run with at most `concurrency` in flight; per-item failures
/// are logged and counted, never fatal. The archive always contains
/// `report.json` and `README.txt`, plus one `images/` entry per
/// successful fetch.
pub async fn assemble_archive<F, Fut>(
    report: &ExportReport,
    fetch_image: F,
    concurrency: usize,
) -> Result<ExportArchive>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<Vec<u8>>>,
{
    let paths: Vec<(usize, String)> = report
        .potholes
        .iter()
        .filter_map(|item| item.image_path.clone())
        .enumerate()
        .collect();
    let total = paths.len();

    let fetch = &fetch_image;
    let outcomes: Vec<(String, Result<Vec<u8>>)> = stream::iter(paths)
        .map(|(i, path)| async move {
            let name = base_filename(&path, i);
            (name, fetch(path).await)
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    // Keyed by filename: completion order does not affect contents.
    let mut images: BTreeMap<String, Vec<u8>> = BTreeMap::new();
    let mut images_failed = 0u32;
    for (name, outcome) in outcomes {
        match outcome {
            Ok(bytes) => {
                images.insert(name, bytes);
            }
            Err(e) => {
                warn!("image fetch failed for {}: {}", name, e);
                images_failed += 1;
            }
        }
    }
    let images_included = images.len() as u32;

    info!(
        "export archive: {}/{} images fetched ({} failed)",
        images_included, total, images_failed
    );

    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(COMPRESSION_LEVEL));

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file("report.json", options)?;
    zip.write_all(&serde_json::to_vec_pretty(report)?)?;

    for (name, bytes) in &images {
        zip.start_file(format!("images/{}", name), options)?;
        zip.write_all(bytes)?;
    }

    zip.start_file("README.txt", options)?;
    zip.write_all(manifest_text(report, images_included, images_failed).as_bytes())?;

    let bytes = zip.finish()?.into_inner();

    Ok(ExportArchive {
        file_name: format!("roadscan_report_{}.zip", Utc::now().timestamp_millis()),
        bytes,
        images_included,
        images_failed,
    })
}

/// Lone-item export: pretty-printed JSON for a single detection, with its
/// download filename.
pub fn export_point(detection: &Detection) -> Result<(String, String)> {
    let name = format!("pothole_{}.json", detection.id);
    let json = serde_json::to_string_pretty(detection)?;
    Ok((name, json))
}
