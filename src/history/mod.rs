//! In-memory history of completed pipeline runs


use std::collections::VecDeque;
use std::sync::{PoisonError, RwLock};

use log::debug;
use serde::Serialize;

use crate::constants::DEFAULT_HISTORY_LIMIT;
use crate::models::{PipelineRun, RunId, RunStatus};

/// Counts of runs by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HistorySummary {
    pub total: usize,
    pub success: usize,
    pub warning: usize,
    pub error: usize,
}

impl HistorySummary {
    /// Percentage of runs with `success` status, or `None` when empty.
    pub fn success_rate(&self) -> Option<f64> {
        if self.total == 0 {
            None
        } else {
            Some(self.success as f64 * 100.0 / self.total as f64)
        }
    }
}

/// Bounded, most-recent-first record of completed runs.
///
/// Shared between the coordinator and the presentation layer behind an
/// `Arc`. Writers are serialized; the lock is never held across an await.
/// Nothing is persisted: history is gone when the process exits.
#[derive(Debug)]
pub struct ResultStore {
    runs: RwLock<VecDeque<PipelineRun>>,
    max_retained: usize,
}

impl Default for ResultStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultStore {
    /// Store keeping the default number of runs.
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }

    /// Store keeping at most `max_retained` runs (at least one).
    pub fn with_limit(max_retained: usize) -> Self {
        let max_retained = max_retained.max(1);
        Self {
            runs: RwLock::new(VecDeque::with_capacity(max_retained.min(DEFAULT_HISTORY_LIMIT))),
            max_retained,
        }
    }

    pub fn max_retained(&self) -> usize {
        self.max_retained
    }

    /// Record a run as the most recent, evicting the oldest past the limit.
    pub fn append(&self, run: PipelineRun) {
        let mut runs = self.runs.write().unwrap_or_else(PoisonError::into_inner);
        debug!("Recording run {} ({})", run.id(), run.status());
        runs.push_front(run);
        while runs.len() > self.max_retained {
            if let Some(evicted) = runs.pop_back() {
                debug!("Evicted run {} from history", evicted.id());
            }
        }
    }

    /// Drop every recorded run.
    pub fn clear(&self) {
        let mut runs = self.runs.write().unwrap_or_else(PoisonError::into_inner);
        debug!("Clearing {} runs from history", runs.len());
        runs.clear();
    }

    /// Snapshot of the history, most recent first.
    pub fn list(&self) -> Vec<PipelineRun> {
        let runs = self.runs.read().unwrap_or_else(PoisonError::into_inner);
        runs.iter().cloned().collect()
    }

    pub fn get(&self, id: &RunId) -> Option<PipelineRun> {
        let runs = self.runs.read().unwrap_or_else(PoisonError::into_inner);
        runs.iter().find(|run| run.id() == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.runs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn summary(&self) -> HistorySummary {
        let runs = self.runs.read().unwrap_or_else(PoisonError::into_inner);
        summarize(runs.iter())
    }
}

/// Tally runs by status.
pub fn summarize<'a>(runs: impl IntoIterator<Item = &'a PipelineRun>) -> HistorySummary {
    let mut summary = HistorySummary::default();
    for run in runs {
        summary.total += 1;
        match run.status() {
            RunStatus::Success => summary.success += 1,
            RunStatus::Warning => summary.warning += 1,
            RunStatus::Error => summary.error += 1,
        }
    }
    summary
}
