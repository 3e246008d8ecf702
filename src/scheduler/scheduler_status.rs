use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};

/// What the most recent loop iteration did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerPhase {
    /// Not yet run, or stopped.
    Idle,
    /// The instrument set resolved to nothing; the iteration slept.
    NoInstruments,
    /// Off-market and no refresh was due; no quotes were fetched.
    OutsideTrading,
    /// Normal in-market samples were appended.
    Sampled,
    /// An off-market change-driven refresh ran.
    Refreshed,
    /// Close markers were appended (or found already present).
    CloseMarked,
    /// A settlement attempt ran and nothing else happened afterwards.
    Settling,
    /// The iteration aborted on an error; see `last_error`.
    Error,
}

/// Heartbeat snapshot of the sampling loop. Counters are cumulative over the
/// scheduler's lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStatus {
    pub running: bool,
    pub phase: SchedulerPhase,
    pub sample_date: Option<NaiveDate>,
    pub instrument_count: usize,
    pub samples_written: u64,
    pub markers_written: u64,
    pub rows_settled: u64,
    pub last_error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Default for SchedulerStatus {
    fn default() -> Self {
        Self {
            running: false,
            phase: SchedulerPhase::Idle,
            sample_date: None,
            instrument_count: 0,
            samples_written: 0,
            markers_written: 0,
            rows_settled: 0,
            last_error: None,
            updated_at: Utc::now(),
        }
    }
}

/// Shared handle to the heartbeat. Reads never block the loop for longer
/// than a clone.
#[derive(Debug, Clone, Default)]
pub struct StatusHandle {
    inner: Arc<RwLock<SchedulerStatus>>,
}

impl StatusHandle {
    pub fn snapshot(&self) -> SchedulerStatus {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Applies a mutation and stamps `updated_at`. A poisoned lock is taken
    /// over; the status is plain data and stays usable.
    pub(crate) fn update(&self, apply: impl FnOnce(&mut SchedulerStatus)) {
        let mut status = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        apply(&mut status);
        status.updated_at = Utc::now();
    }
}
