//! Table state machine over the pothole subset of the detection snapshot.
//!
//! The engine owns session-scoped [`TableState`] (filters, sort, page,
//! selection) and renders pages as a pure function of
//! `(detections, state)`. Every transition goes through a single entry
//! point, so state mutations are serialized and re-clamping the page after
//! filter changes happens in exactly one place.

use std::collections::HashSet;

use serde::Serialize;

use crate::{format_coords, Detection, Severity};

/// Default page size.
pub const DEFAULT_ITEMS_PER_PAGE: usize = 10;

/// Column the table is sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortColumn {
    Location,
    Severity,
    Time,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Severity filter: everything, or one exact tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeverityFilter {
    All,
    Tier(Severity),
}

/// Session-scoped table state. Selection is keyed by [`Detection::id`] and
/// persists across filter/sort/page changes; ids no longer present in the
/// filtered set stay in the set but are inert until filters change again.
#[derive(Debug, Clone)]
pub struct TableState {
    pub search_query: String,
    pub severity_filter: SeverityFilter,
    pub sort_column: SortColumn,
    pub sort_direction: SortDirection,
    /// 1-based.
    pub current_page: usize,
    /// Page size; consumers treat 0 as 1 rather than dividing by it.
    pub items_per_page: usize,
    pub selected_ids: HashSet<String>,
}

impl Default for TableState {
    fn default() -> Self {
        Self {
            search_query: String::new(),
            severity_filter: SeverityFilter::All,
            sort_column: SortColumn::Time,
            sort_direction: SortDirection::Desc,
            current_page: 1,
            items_per_page: DEFAULT_ITEMS_PER_PAGE,
            selected_ids: HashSet::new(),
        }
    }
}

/// One rendered table row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRow {
    pub id: String,
    pub location: String,
    pub severity: Option<Severity>,
    /// Formatted `"lat, lon"` string shown in the coordinates column.
    pub coords: String,
    pub timestamp: i64,
    pub selected: bool,
}

/// A rendered page plus its pagination metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedPage {
    pub rows: Vec<TableRow>,
    pub filtered_count: usize,
    pub page_count: usize,
    pub current_page: usize,
    /// 1-based index of the first shown entry; 0 when the page is empty.
    pub showing_start: usize,
    /// 1-based index of the last shown entry; 0 when the page is empty.
    pub showing_end: usize,
    pub selected_count: usize,
}

/// Filter/sort/pagination/selection engine over a detection snapshot.
///
/// The snapshot is replaced wholesale via [`TableEngine::set_detections`];
/// the engine never mutates detections.
#[derive(Debug, Default)]
pub struct TableEngine {
    detections: Vec<Detection>,
    state: TableState,
}

impl TableEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &TableState {
        &self.state
    }

    /// Replace the detection snapshot. Filters, sort and selection are
    /// kept; the current page is re-clamped against the new filtered set.
    pub fn set_detections(&mut self, detections: Vec<Detection>) {
        self.detections = detections;
        self.clamp_page();
    }

    /// Set the free-text search query and reset to the first page.
    pub fn set_search(&mut self, query: impl Into<String>) {
        self.state.search_query = query.into();
        self.state.current_page = 1;
    }

    /// Set the severity filter and reset to the first page.
    pub fn set_severity_filter(&mut self, filter: SeverityFilter) {
        self.state.severity_filter = filter;
        self.state.current_page = 1;
    }

    /// Sort by `column`. Selecting the current column flips the direction;
    /// a new column starts descending.
    pub fn set_sort(&mut self, column: SortColumn) {
        if self.state.sort_column == column {
            self.state.sort_direction = match self.state.sort_direction {
                SortDirection::Asc => SortDirection::Desc,
                SortDirection::Desc => SortDirection::Asc,
            };
        } else {
            self.state.sort_column = column;
            self.state.sort_direction = SortDirection::Desc;
        }
    }

    /// Go to page `n`, clamped to `[1, page_count]`. No-op when the
    /// filtered set is empty.
    pub fn set_page(&mut self, n: usize) {
        let pages = self.page_count();
        if pages == 0 {
            return;
        }
        self.state.current_page = n.clamp(1, pages);
    }

    /// Toggle selection of one id. Never touches filters or pagination.
    pub fn toggle_select(&mut self, id: &str) {
        if !self.state.selected_ids.remove(id) {
            self.state.selected_ids.insert(id.to_string());
        }
    }

    /// Select every row on the current page.
    pub fn select_all_on_page(&mut self) {
        let ids: Vec<String> = self.page().rows.into_iter().map(|r| r.id).collect();
        self.state.selected_ids.extend(ids);
    }

    /// Deselect every row on the current page.
    pub fn deselect_all_on_page(&mut self) {
        let ids: Vec<String> = self.page().rows.into_iter().map(|r| r.id).collect();
        for id in ids {
            self.state.selected_ids.remove(&id);
        }
    }

    pub fn clear_selection(&mut self) {
        self.state.selected_ids.clear();
    }

    /// Ids currently selected (including inert ones filtered out of view).
    pub fn selected_ids(&self) -> &HashSet<String> {
        &self.state.selected_ids
    }

    /// Render the current page. Pure with respect to the engine's state:
    /// calling this repeatedly yields identical output.
    pub fn page(&self) -> RenderedPage {
        render(&self.detections, &self.state)
    }

    fn page_count(&self) -> usize {
        let count = filtered(&self.detections, &self.state).len();
        count.div_ceil(self.state.items_per_page.max(1))
    }

    fn clamp_page(&mut self) {
        let pages = self.page_count().max(1);
        self.state.current_page = self.state.current_page.clamp(1, pages);
    }
}

/// Filter pipeline over the pothole-only subset: free-text match against
/// location label, severity name and formatted coordinates
/// (case-insensitive substring), then exact severity tier. Detections
/// without coordinates are excluded. The sort is stable, so ties keep
/// insertion order.
fn filtered<'a>(detections: &'a [Detection], state: &TableState) -> Vec<&'a Detection> {
    let query = state.search_query.to_lowercase();

    let mut rows: Vec<&Detection> = detections
        .iter()
        .filter(|d| d.is_pothole && d.coords().is_some())
        .filter(|d| {
            if query.is_empty() {
                return true;
            }
            let (lat, lon) = d.coords().unwrap_or_default();
            d.location.to_lowercase().contains(&query)
                || d.severity
                    .map(|s| s.as_str().contains(&query))
                    .unwrap_or(false)
                || format_coords(lat, lon).contains(&query)
        })
        .filter(|d| match state.severity_filter {
            SeverityFilter::All => true,
            SeverityFilter::Tier(tier) => d.severity == Some(tier),
        })
        .collect();

    rows.sort_by(|a, b| {
        let ord = match state.sort_column {
            SortColumn::Location => a.location.cmp(&b.location),
            SortColumn::Severity => {
                let rank = |d: &Detection| d.severity.map(Severity::rank).unwrap_or(0);
                rank(a).cmp(&rank(b))
            }
            SortColumn::Time => a.timestamp.cmp(&b.timestamp),
        };
        match state.sort_direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });

    rows
}

/// Pure page rendering: `(detections, state) -> RenderedPage`.
pub fn render(detections: &[Detection], state: &TableState) -> RenderedPage {
    let rows = filtered(detections, state);
    let total = rows.len();
    // A zero page size from a hand-built state is treated as 1.
    let per_page = state.items_per_page.max(1);
    let page_count = total.div_ceil(per_page);

    // Re-clamp rather than trusting the stored page; filters may have
    // shrunk the set since the last explicit navigation.
    let current_page = state.current_page.clamp(1, page_count.max(1));
    let start = (current_page - 1) * per_page;
    let end = (start + per_page).min(total);

    let page_rows: Vec<TableRow> = rows[start.min(total)..end]
        .iter()
        .map(|d| {
            let (lat, lon) = d.coords().unwrap_or_default();
            TableRow {
                id: d.id.clone(),
                location: d.location.clone(),
                severity: d.severity,
                coords: format_coords(lat, lon),
                timestamp: d.timestamp,
                selected: state.selected_ids.contains(&d.id),
            }
        })
        .collect();

    RenderedPage {
        rows: page_rows,
        filtered_count: total,
        page_count,
        current_page,
        showing_start: if total == 0 { 0 } else { start + 1 },
        showing_end: end,
        selected_count: state.selected_ids.len(),
    }
}
