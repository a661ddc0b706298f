use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use engine_logging::{engine_info, engine_warn};
use harvester_core::{Job, JobId, JobSnapshot, JobStatus, RunConfiguration};

use crate::config::EngineConfig;
use crate::driver::{HttpDriver, RetrievalDriver};
use crate::error::EngineError;
use crate::input::InputError;
use crate::reaper::{reap_once, ReapReport, Reaper, ReaperHandle, RUN_DIR_PREFIX};
use crate::registry::{CancelReply, JobRegistry};
use crate::worker::{run_job, JobPaths};

/// Answer to a result download request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultReply {
    Ready(Vec<u8>),
    /// The job exists but has no archive to hand out.
    NotReady(JobStatus),
    NotFound,
}

/// Request surface of the harvester: accepts jobs, runs each on its own task
/// and answers status, cancel and result queries without blocking on them.
pub struct HarvestService {
    runtime: tokio::runtime::Runtime,
    registry: Arc<JobRegistry>,
    driver: Arc<dyn RetrievalDriver>,
    config: EngineConfig,
}

impl HarvestService {
    pub fn new(config: EngineConfig, driver: Arc<dyn RetrievalDriver>) -> Result<Self, EngineError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("harvester-worker")
            .build()
            .map_err(|err| EngineError::Runtime(err.to_string()))?;
        Ok(Self {
            runtime,
            registry: Arc::new(JobRegistry::new()),
            driver,
            config,
        })
    }

    /// Service retrieving over plain HTTP with the configured profile.
    pub fn with_http_driver(config: EngineConfig) -> Result<Self, EngineError> {
        let driver = HttpDriver::new(config.profile.clone(), config.http.clone());
        Self::new(config, Arc::new(driver))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> Arc<JobRegistry> {
        Arc::clone(&self.registry)
    }

    /// Stores the raw identifier list in a fresh job directory and starts
    /// the job. Returns as soon as the job is registered.
    pub fn submit(&self, raw_input: &[u8], run: RunConfiguration) -> Result<JobId, EngineError> {
        let run = run.sanitized();
        let job_id = JobId::generate();
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let job_dir = self
            .config
            .runs_dir
            .join(format!("{RUN_DIR_PREFIX}{stamp}_{}", job_id.short()));
        fs::create_dir_all(&job_dir)?;

        let paths = JobPaths::under(&job_dir);
        fs::write(&paths.input_path, raw_input)?;
        self.registry.create(Job::new(job_id.clone(), job_dir))?;
        engine_info!(
            "accepted job {} (delay {}s, timeout {}ms)",
            job_id.short(),
            run.delay_secs,
            run.timeout_ms
        );

        self.runtime.spawn(run_job(
            job_id.clone(),
            paths,
            run,
            Arc::clone(&self.driver),
            Arc::clone(&self.registry),
        ));
        Ok(job_id)
    }

    /// Like [`HarvestService::submit`], reading the list from a file.
    pub fn submit_file(&self, path: &Path, run: RunConfiguration) -> Result<JobId, EngineError> {
        let raw = fs::read(path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                InputError::NotFound(path.to_path_buf())
            } else {
                InputError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        self.submit(&raw, run)
    }

    pub fn status(&self, id: &JobId) -> Option<JobSnapshot> {
        self.registry.get(id)
    }

    pub fn cancel(&self, id: &JobId) -> CancelReply {
        let reply = self.registry.request_cancel(id);
        if reply == CancelReply::Accepted {
            engine_info!("cancellation requested for job {}", id.short());
        }
        reply
    }

    /// Archive bytes of a `done` job whose archive is still on disk.
    pub fn fetch_result(&self, id: &JobId) -> ResultReply {
        let Some(status) = self.registry.status(id) else {
            return ResultReply::NotFound;
        };
        if status != JobStatus::Done {
            return ResultReply::NotReady(status);
        }
        let Some(path) = self.registry.archive_path(id) else {
            return ResultReply::NotFound;
        };
        match fs::read(&path) {
            Ok(bytes) => ResultReply::Ready(bytes),
            Err(err) => {
                if err.kind() != io::ErrorKind::NotFound {
                    engine_warn!("cannot read archive {:?}: {}", path, err);
                }
                ResultReply::NotFound
            }
        }
    }

    /// Starts periodic cleanup of expired runs. Stop it through the handle.
    pub fn start_reaper(&self) -> ReaperHandle {
        Reaper::start(
            self.runtime.handle(),
            self.config.reaper_settings(),
            self.registry(),
        )
    }

    /// One cleanup pass on the calling thread.
    pub fn reap_now(&self) -> ReapReport {
        reap_once(&self.config.runs_dir, &self.registry, self.config.retention())
    }

    /// Polls until the job is terminal, handing every snapshot to
    /// `on_update`. Returns `None` when the job is unknown or got evicted.
    pub fn wait_until_terminal(
        &self,
        id: &JobId,
        poll_interval: Duration,
        mut on_update: impl FnMut(&JobSnapshot),
    ) -> Option<JobSnapshot> {
        loop {
            let snapshot = self.status(id)?;
            on_update(&snapshot);
            if snapshot.status.is_terminal() {
                return Some(snapshot);
            }
            std::thread::sleep(poll_interval);
        }
    }
}
