use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use engine_logging::{engine_debug, engine_warn};
use harvester_core::{update, Job, JobId, JobMsg, JobSnapshot, JobStatus, TransitionError};

/// Answer to a cancellation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelReply {
    /// The flag is set; the worker stops before its next identifier.
    Accepted,
    /// The job already finished with this status.
    Conflict(JobStatus),
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("job {0} already exists")]
    Duplicate(JobId),
}

/// A job removed by [`JobRegistry::evict_stale`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvictedJob {
    pub id: JobId,
    pub job_dir: PathBuf,
}

/// All known jobs, shared between the request surface, workers and the
/// reaper. Every operation takes the lock briefly and never does IO while
/// holding it.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: Mutex<HashMap<JobId, Job>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<JobId, Job>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a new job. Ids are random, so a duplicate means a bug.
    pub fn create(&self, job: Job) -> Result<(), RegistryError> {
        let mut jobs = self.lock();
        if jobs.contains_key(job.id()) {
            return Err(RegistryError::Duplicate(job.id().clone()));
        }
        jobs.insert(job.id().clone(), job);
        Ok(())
    }

    pub fn get(&self, id: &JobId) -> Option<JobSnapshot> {
        self.lock().get(id).map(Job::snapshot)
    }

    pub fn status(&self, id: &JobId) -> Option<JobStatus> {
        self.lock().get(id).map(Job::status)
    }

    pub fn contains(&self, id: &JobId) -> bool {
        self.lock().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Applies `msg` to the job. Unknown ids are ignored; rejected
    /// transitions are logged and returned.
    pub fn update(&self, id: &JobId, msg: JobMsg) -> Result<(), TransitionError> {
        let mut jobs = self.lock();
        let Some(job) = jobs.get_mut(id) else {
            engine_debug!("dropping update for unknown job {}", id.short());
            return Ok(());
        };
        let result = update(job, msg);
        drop(jobs);
        if let Err(err) = &result {
            engine_warn!("job {}: rejected transition: {}", id.short(), err);
        }
        result
    }

    pub fn append_log(&self, id: &JobId, line: impl Into<String>) {
        // Log lines are accepted in every state.
        let _ = self.update(id, JobMsg::Log(line.into()));
    }

    /// Flags a running job for cancellation.
    pub fn request_cancel(&self, id: &JobId) -> CancelReply {
        let mut jobs = self.lock();
        let Some(job) = jobs.get_mut(id) else {
            return CancelReply::Missing;
        };
        if job.status().is_terminal() {
            return CancelReply::Conflict(job.status());
        }
        match update(job, JobMsg::CancelRequested) {
            Ok(()) => CancelReply::Accepted,
            Err(_) => CancelReply::Conflict(job.status()),
        }
    }

    pub fn is_cancel_requested(&self, id: &JobId) -> bool {
        self.lock().get(id).is_some_and(Job::cancel_requested)
    }

    /// Archive of a `done` job.
    pub fn archive_path(&self, id: &JobId) -> Option<PathBuf> {
        self.lock()
            .get(id)
            .and_then(|job| job.archive_path().map(|p| p.to_path_buf()))
    }

    /// Removes finished jobs older than `cutoff` and returns them so the
    /// caller can delete their directories.
    ///
    /// A `done` job ages by its archive's modification time and goes as soon
    /// as the archive is missing. `error` and `cancelled` jobs age by the time
    /// they finished. Running jobs are never evicted.
    pub fn evict_stale(&self, cutoff: SystemTime) -> Vec<EvictedJob> {
        let candidates: Vec<(JobId, JobStatus, Option<PathBuf>, Option<SystemTime>)> = self
            .lock()
            .values()
            .filter(|job| job.status().is_terminal())
            .map(|job| {
                (
                    job.id().clone(),
                    job.status(),
                    job.archive_path().map(|p| p.to_path_buf()),
                    job.finished_at(),
                )
            })
            .collect();

        let stale: Vec<JobId> = candidates
            .into_iter()
            .filter_map(|(id, status, archive, finished_at)| {
                let expired = match (status, archive) {
                    (JobStatus::Done, Some(archive)) => {
                        match fs::metadata(&archive).and_then(|m| m.modified()) {
                            Ok(modified) => modified < cutoff,
                            Err(err) if err.kind() == io::ErrorKind::NotFound => true,
                            Err(err) => {
                                engine_debug!("job {}: cannot stat archive: {}", id.short(), err);
                                false
                            }
                        }
                    }
                    _ => finished_at.is_some_and(|at| at < cutoff),
                };
                expired.then_some(id)
            })
            .collect();

        let mut jobs = self.lock();
        stale
            .into_iter()
            .filter_map(|id| {
                // Terminal states are final, so the earlier check still holds.
                let job = jobs.remove(&id)?;
                Some(EvictedJob {
                    id,
                    job_dir: job.job_dir().to_path_buf(),
                })
            })
            .collect()
    }
}
