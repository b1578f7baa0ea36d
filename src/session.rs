//! Process-wide accumulation of results across successive fields of the
//! same specimen.
//!
//! The session is an explicit object with a documented lifecycle: created
//! empty, mutated only through `add`/`clear`, alive until the process
//! exits or the caller clears it. Append and total-update happen under
//! one lock, so a reader never observes a result without its totals or
//! vice versa.

use crate::analysis::AnalysisResult;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

/// Running totals over every result in the session.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CumulativeTotals {
    pub result_count: u64,
    pub feature_count: u64,
    /// Sum of feature areas in measurement units (calibrated when the
    /// contributing results were calibrated).
    pub area_sum: f64,
    /// Per-size-range feature counts, summed over classified results;
    /// empty until the first nodularity result arrives.
    pub size_range_counts: Vec<u64>,
}

impl CumulativeTotals {
    fn absorb(&mut self, result: &AnalysisResult) {
        self.result_count += 1;
        self.feature_count += result.features.len() as u64;
        self.area_sum += result.total_feature_area();
        if let Some(nodularity) = &result.nodularity {
            if self.size_range_counts.is_empty() {
                self.size_range_counts = vec![0; nodularity.size_range_counts.len()];
            }
            for (total, &count) in self
                .size_range_counts
                .iter_mut()
                .zip(&nodularity.size_range_counts)
            {
                *total += count;
            }
        }
    }
}

/// Ordered sequence of analysis results with running totals.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CumulativeSession {
    pub started_at: DateTime<Utc>,
    pub results: Vec<AnalysisResult>,
    pub totals: CumulativeTotals,
}

impl CumulativeSession {
    fn empty() -> Self {
        Self {
            started_at: Utc::now(),
            results: Vec::new(),
            totals: CumulativeTotals::default(),
        }
    }
}

/// Shared store of the current cumulative session.
pub struct CumulativeResultStore {
    inner: Mutex<CumulativeSession>,
}

impl Default for CumulativeResultStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CumulativeResultStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(CumulativeSession::empty()),
        }
    }

    /// Append a result and update the running totals in one step.
    pub fn add(&self, result: AnalysisResult) {
        let mut session = self.inner.lock();
        session.totals.absorb(&result);
        session.results.push(result);
    }

    /// Snapshot of the current session.
    pub fn get(&self) -> CumulativeSession {
        self.inner.lock().clone()
    }

    /// Reset to an empty session.
    pub fn clear(&self) {
        *self.inner.lock() = CumulativeSession::empty();
    }
}
