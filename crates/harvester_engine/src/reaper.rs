use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use engine_logging::{engine_debug, engine_info, engine_warn};
use harvester_core::JobId;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::registry::JobRegistry;

/// Job directories are named `run_<timestamp>_<short id>`; nothing else
/// under the runs directory is touched.
pub const RUN_DIR_PREFIX: &str = "run_";

/// Shortest accepted pass interval.
const MIN_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaperSettings {
    pub runs_dir: PathBuf,
    /// Maximum age of a job directory or registry entry.
    pub retention: Duration,
    pub interval: Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReapReport {
    pub removed_dirs: Vec<PathBuf>,
    pub evicted_jobs: Vec<JobId>,
}

impl ReapReport {
    pub fn is_empty(&self) -> bool {
        self.removed_dirs.is_empty() && self.evicted_jobs.is_empty()
    }
}

/// One cleanup pass: deletes `run_*` directories under `runs_dir` last modified
/// before the retention window and evicts stale registry entries.
///
/// Best effort. A candidate that cannot be inspected or removed is skipped
/// until the next pass.
pub fn reap_once(runs_dir: &Path, registry: &JobRegistry, retention: Duration) -> ReapReport {
    let cutoff = SystemTime::now()
        .checked_sub(retention)
        .unwrap_or(SystemTime::UNIX_EPOCH);

    let removed_dirs = remove_stale_dirs(runs_dir, cutoff);
    let evicted_jobs = registry
        .evict_stale(cutoff)
        .into_iter()
        .map(|evicted| {
            engine_info!("evicted job {}", evicted.id.short());
            evicted.id
        })
        .collect();

    ReapReport {
        removed_dirs,
        evicted_jobs,
    }
}

fn remove_stale_dirs(runs_dir: &Path, cutoff: SystemTime) -> Vec<PathBuf> {
    let entries = match fs::read_dir(runs_dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Vec::new(),
        Err(err) => {
            engine_debug!("cannot list {:?}: {}", runs_dir, err);
            return Vec::new();
        }
    };

    let mut removed = Vec::new();
    for entry in entries {
        let Ok(entry) = entry else {
            continue;
        };
        if !entry.file_name().to_string_lossy().starts_with(RUN_DIR_PREFIX) {
            continue;
        }
        let path = entry.path();
        let modified = entry
            .metadata()
            .and_then(|meta| if meta.is_dir() { meta.modified().map(Some) } else { Ok(None) });
        match modified {
            Ok(Some(modified)) if modified < cutoff => match fs::remove_dir_all(&path) {
                Ok(()) => {
                    engine_info!("removed expired run directory {:?}", path);
                    removed.push(path);
                }
                Err(err) => engine_debug!("cannot remove {:?}: {}", path, err),
            },
            Ok(_) => {}
            Err(err) => engine_debug!("cannot inspect {:?}: {}", path, err),
        }
    }
    removed.sort();
    removed
}

/// Periodic cleanup task. Does nothing until started.
pub struct Reaper;

impl Reaper {
    /// Spawns the cleanup loop on `runtime`. The first pass runs right away.
    pub fn start(runtime: &Handle, settings: ReaperSettings, registry: Arc<JobRegistry>) -> ReaperHandle {
        let token = CancellationToken::new();
        let cancel_token = token.clone();
        let interval = settings.interval.max(MIN_INTERVAL);

        let task = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let runs_dir = settings.runs_dir.clone();
                        let retention = settings.retention;
                        let registry = Arc::clone(&registry);
                        let pass = tokio::task::spawn_blocking(move || {
                            reap_once(&runs_dir, &registry, retention)
                        });
                        match pass.await {
                            Ok(report) if !report.is_empty() => engine_info!(
                                "reaper removed {} directories, evicted {} jobs",
                                report.removed_dirs.len(),
                                report.evicted_jobs.len()
                            ),
                            Ok(_) => {}
                            Err(err) => engine_warn!("reaper pass failed: {}", err),
                        }
                    }
                    _ = cancel_token.cancelled() => {
                        break;
                    }
                }
            }
            engine_debug!("reaper stopped");
        });

        ReaperHandle { token, task }
    }
}

/// Owner of a running reaper. Dropping the handle leaves the task running.
pub struct ReaperHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl ReaperHandle {
    pub fn stop(&self) {
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.task.is_finished()
    }

    /// Stops the task and waits for the pass in progress, if any.
    pub async fn shutdown(self) {
        self.token.cancel();
        if let Err(err) = self.task.await {
            engine_warn!("reaper task ended abnormally: {}", err);
        }
    }
}
