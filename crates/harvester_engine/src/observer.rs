use std::sync::Arc;

use harvester_core::{JobId, JobMsg};

use crate::registry::JobRegistry;

/// What a harvest loop may tell, and ask, the outside world.
pub trait JobObserver: Send + Sync {
    fn report_progress(&self, current: usize, total: usize, ok: usize);
    fn log(&self, line: &str);
    fn is_cancelled(&self) -> bool;
}

/// Observer that writes straight into a job's registry entry.
#[derive(Debug, Clone)]
pub struct RegistryObserver {
    registry: Arc<JobRegistry>,
    job_id: JobId,
}

impl RegistryObserver {
    pub fn new(registry: Arc<JobRegistry>, job_id: JobId) -> Self {
        Self { registry, job_id }
    }
}

impl JobObserver for RegistryObserver {
    fn report_progress(&self, current: usize, _total: usize, ok: usize) {
        // Total is fixed by `Started`; a rejected update is already logged.
        let _ = self.registry.update(&self.job_id, JobMsg::Progress { current, ok });
    }

    fn log(&self, line: &str) {
        self.registry.append_log(&self.job_id, line);
    }

    fn is_cancelled(&self) -> bool {
        self.registry.is_cancel_requested(&self.job_id)
    }
}
