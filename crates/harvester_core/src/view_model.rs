use serde::{Deserialize, Serialize};

use crate::{JobId, JobStatus};

/// Read-only view of a job handed to status queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub id: JobId,
    pub status: JobStatus,
    pub current: usize,
    pub total: usize,
    pub ok: usize,
    pub error: Option<String>,
    pub logs: Vec<String>,
}

impl JobSnapshot {
    /// Counters respect `ok <= current <= total`.
    pub fn counters_consistent(&self) -> bool {
        self.ok <= self.current && self.current <= self.total
    }

    /// Log lines after the first `seen`, for incremental tailing.
    pub fn logs_since(&self, seen: usize) -> &[String] {
        self.logs.get(seen..).unwrap_or_default()
    }
}
