use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use engine_logging::{engine_error, engine_info};
use futures_util::FutureExt;
use harvester_core::{Identifier, JobId, JobMsg, JobStatus, RunConfiguration};

use crate::archive::create_archive;
use crate::driver::{RetrievalDriver, RetrievalSession};
use crate::error::EngineError;
use crate::input::read_identifiers;
use crate::observer::{JobObserver, RegistryObserver};
use crate::registry::JobRegistry;
use crate::types::RetrievalOutcome;

pub const INPUT_FILE_NAME: &str = "suppliers.csv";
pub const DOWNLOADS_DIR_NAME: &str = "downloads";
pub const ARCHIVE_FILE_NAME: &str = "traces_pdfs.zip";

pub const NO_IDENTIFIERS_MESSAGE: &str = "No suppliers found in the input.";
pub const NO_DOWNLOADS_MESSAGE: &str = "No downloads were created.";
pub const CANCELLED_LINE: &str = "Cancellation requested; stopping.";

/// Locations owned by one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPaths {
    pub job_dir: PathBuf,
    pub input_path: PathBuf,
    pub out_dir: PathBuf,
    pub archive_path: PathBuf,
}

impl JobPaths {
    /// Standard layout inside `job_dir`.
    pub fn under(job_dir: impl Into<PathBuf>) -> Self {
        let job_dir = job_dir.into();
        Self {
            input_path: job_dir.join(INPUT_FILE_NAME),
            out_dir: job_dir.join(DOWNLOADS_DIR_NAME),
            archive_path: job_dir.join(ARCHIVE_FILE_NAME),
            job_dir,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarvestSummary {
    pub total: usize,
    /// Identifiers actually attempted.
    pub processed: usize,
    pub ok: usize,
    pub cancelled: bool,
}

/// Retrieves every identifier in order over one session.
///
/// Cancellation is checked before each identifier only; a retrieval in
/// flight always runs to its outcome. Per-item failures, panics included,
/// are logged and counted as not downloaded.
pub async fn run_harvest(
    identifiers: &[Identifier],
    out_dir: &Path,
    config: RunConfiguration,
    session: &mut dyn RetrievalSession,
    observer: &dyn JobObserver,
) -> HarvestSummary {
    let total = identifiers.len();
    let delay = config.delay();
    let mut ok = 0;
    let mut processed = 0;

    for (index, identifier) in identifiers.iter().enumerate() {
        let position = index + 1;
        if observer.is_cancelled() {
            observer.log(CANCELLED_LINE);
            return HarvestSummary {
                total,
                processed,
                ok,
                cancelled: true,
            };
        }

        observer.log(&format!("[{position}/{total}] {identifier}"));
        let outcome = AssertUnwindSafe(session.fetch_one(identifier, out_dir, config.timeout()))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| RetrievalOutcome::Failed(panic_message(payload.as_ref())));

        if outcome.is_downloaded() {
            ok += 1;
        }
        processed = position;
        engine_info!("[{}/{}] {}: {}", position, total, identifier, outcome);
        observer.log(&outcome.log_line());
        observer.report_progress(position, total, ok);

        if !delay.is_zero() && position < total {
            tokio::time::sleep(delay).await;
        }
    }

    observer.log(&format!("Done. Downloaded {ok} of {total}."));
    HarvestSummary {
        total,
        processed,
        ok,
        cancelled: false,
    }
}

/// Runs a registered job to a terminal state and returns that state.
///
/// Errors and panics anywhere in the job become an `error` status carrying
/// the message; the job never stays `running` once this returns.
pub async fn run_job(
    job_id: JobId,
    paths: JobPaths,
    config: RunConfiguration,
    driver: Arc<dyn RetrievalDriver>,
    registry: Arc<JobRegistry>,
) -> JobStatus {
    engine_info!("job {} started in {:?}", job_id.short(), paths.job_dir);
    let result = AssertUnwindSafe(drive_job(&job_id, &paths, config, driver.as_ref(), &registry))
        .catch_unwind()
        .await;

    let failure = match result {
        Ok(Ok(())) => None,
        Ok(Err(err)) => Some(err.to_string()),
        Err(payload) => Some(panic_message(payload.as_ref())),
    };
    if let Some(message) = failure {
        engine_error!("job {} failed: {}", job_id.short(), message);
        transition(&registry, &job_id, JobMsg::Failed { message });
    }

    let status = registry.status(&job_id).unwrap_or(JobStatus::Error);
    if status == JobStatus::Running {
        transition(
            &registry,
            &job_id,
            JobMsg::Failed {
                message: "worker stopped without a result".to_string(),
            },
        );
        return JobStatus::Error;
    }
    engine_info!("job {} finished: {}", job_id.short(), status);
    status
}

async fn drive_job(
    job_id: &JobId,
    paths: &JobPaths,
    config: RunConfiguration,
    driver: &dyn RetrievalDriver,
    registry: &Arc<JobRegistry>,
) -> Result<(), EngineError> {
    let identifiers = read_identifiers(&paths.input_path)?;
    if identifiers.is_empty() {
        transition(
            registry,
            job_id,
            JobMsg::Failed {
                message: NO_IDENTIFIERS_MESSAGE.to_string(),
            },
        );
        return Ok(());
    }
    transition(
        registry,
        job_id,
        JobMsg::Started {
            total: identifiers.len(),
        },
    );

    let mut session = driver
        .open_session()
        .await
        .map_err(|err| EngineError::Session(err.to_string()))?;
    let observer = RegistryObserver::new(Arc::clone(registry), job_id.clone());
    let summary = run_harvest(
        &identifiers,
        &paths.out_dir,
        config,
        session.as_mut(),
        &observer,
    )
    .await;
    session.close().await;

    if summary.cancelled {
        transition(registry, job_id, JobMsg::Cancelled);
        return Ok(());
    }
    if !paths.out_dir.is_dir() {
        transition(
            registry,
            job_id,
            JobMsg::Failed {
                message: NO_DOWNLOADS_MESSAGE.to_string(),
            },
        );
        return Ok(());
    }

    let out_dir = paths.out_dir.clone();
    let archive_path = paths.archive_path.clone();
    let archived = tokio::task::spawn_blocking(move || create_archive(&out_dir, &archive_path))
        .await
        .map_err(|err| EngineError::Runtime(err.to_string()))??;
    transition(
        registry,
        job_id,
        JobMsg::Completed {
            archive: archived.archive_path,
        },
    );
    Ok(())
}

fn transition(registry: &JobRegistry, job_id: &JobId, msg: JobMsg) {
    // Rejections are logged by the registry.
    let _ = registry.update(job_id, msg);
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return (*message).to_string();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    "worker panicked".to_string()
}
