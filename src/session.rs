//! Session orchestration: fetch, normalize, publish.
//!
//! [`DataSession`] owns the current detection snapshot and the table
//! engine fed from it. A refresh cycle pulls the route payload from an
//! injected [`RouteSource`], normalizes it, and replaces the snapshot
//! atomically; readers never observe a half-updated set. A failed fetch
//! retains the prior snapshot and moves the session into an explicit
//! error state instead of clearing data. The session performs no
//! automatic retry; any periodic re-fetch policy belongs to the caller.

use std::future::Future;

use log::{debug, info, warn};

use crate::analytics::{self, Summary, WeeklySeries};
use crate::error::Result;
use crate::normalize::{normalize, SeverityScorer};
use crate::table::TableEngine;
use crate::{Detection, RawPoint};

/// Capability that produces the raw route payload. Implemented by
/// [`crate::http::RouteClient`] and by test stubs.
pub trait RouteSource {
    fn fetch_route(&self) -> impl Future<Output = Result<Vec<RawPoint>>>;
}

/// A survey data session with an explicit lifecycle: create, refresh,
/// teardown.
///
/// Concurrent refreshes are sequenced: every refresh is issued a
/// monotonically increasing sequence number, and a completion is only
/// applied if no later-issued refresh has been applied already
/// (last-completing-wins, with stale completions discarded).
pub struct DataSession<S> {
    source: S,
    scorer: Box<dyn SeverityScorer>,
    snapshot: Vec<Detection>,
    table: TableEngine,
    last_error: Option<String>,
    issued_seq: u64,
    applied_seq: u64,
}

impl<S: RouteSource> DataSession<S> {
    pub fn new(source: S, scorer: Box<dyn SeverityScorer>) -> Self {
        Self {
            source,
            scorer,
            snapshot: Vec::new(),
            table: TableEngine::new(),
            last_error: None,
            issued_seq: 0,
            applied_seq: 0,
        }
    }

    /// Run one full refresh cycle.
    pub async fn refresh(&mut self) -> Result<()> {
        let seq = self.begin_refresh();
        let outcome = self.source.fetch_route().await;
        self.complete_refresh(seq, outcome).map(|_| ())
    }

    /// Issue a sequence number for a refresh about to start.
    pub fn begin_refresh(&mut self) -> u64 {
        self.issued_seq += 1;
        self.issued_seq
    }

    /// Apply the outcome of a refresh issued as `seq`.
    ///
    /// Returns `Ok(true)` when the snapshot was replaced, `Ok(false)` when
    /// the completion was stale (a later-issued refresh already applied)
    /// and was discarded. Stale outcomes are discarded even when they are
    /// errors: they neither set the error state nor propagate.
    pub fn complete_refresh(
        &mut self,
        seq: u64,
        outcome: Result<Vec<RawPoint>>,
    ) -> Result<bool> {
        match outcome {
            // Stale completions are discarded whether they succeeded or
            // failed; a late failure must not shadow a newer snapshot.
            _ if seq <= self.applied_seq => {
                debug!(
                    "discarding stale route fetch (seq {} <= applied {})",
                    seq, self.applied_seq
                );
                Ok(false)
            }
            Err(e) => {
                warn!("route fetch failed (seq {}): {}", seq, e);
                self.last_error = Some(e.to_string());
                Err(e)
            }
            Ok(points) => {
                let detections = normalize(&points, self.scorer.as_ref());
                info!(
                    "snapshot replaced: {} detections (seq {})",
                    detections.len(),
                    seq
                );
                self.table.set_detections(detections.clone());
                self.snapshot = detections;
                self.applied_seq = seq;
                self.last_error = None;
                Ok(true)
            }
        }
    }

    /// The current detection snapshot.
    pub fn snapshot(&self) -> &[Detection] {
        &self.snapshot
    }

    pub fn table(&self) -> &TableEngine {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut TableEngine {
        &mut self.table
    }

    /// Headline metrics over the current snapshot.
    pub fn summary(&self) -> Summary {
        analytics::summary(&self.snapshot)
    }

    /// 7-day analytics series over the current snapshot.
    pub fn weekly_series(&self) -> WeeklySeries {
        analytics::weekly_series(&self.snapshot)
    }

    /// Message of the last failed refresh, cleared by the next success.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Drop all session data and state.
    pub fn teardown(&mut self) {
        self.snapshot.clear();
        self.table = TableEngine::new();
        self.last_error = None;
    }
}
