use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::view_model::JobSnapshot;

/// Opaque, unguessable job token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// 128 random bits as 32 lowercase hex characters.
    pub fn generate() -> Self {
        Self(format!("{:032x}", rand::random::<u128>()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight characters, used in directory names.
    pub fn short(&self) -> &str {
        let end = self.0.char_indices().nth(8).map_or(self.0.len(), |(i, _)| i);
        &self.0[..end]
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Running,
    Done,
    Error,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Running)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Running => "running",
            JobStatus::Done => "done",
            JobStatus::Error => "error",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One supervised harvest run. Mutated only through [`crate::update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub(crate) id: JobId,
    pub(crate) status: JobStatus,
    pub(crate) total: usize,
    pub(crate) current: usize,
    pub(crate) ok: usize,
    pub(crate) logs: Vec<String>,
    pub(crate) error: Option<String>,
    pub(crate) cancel_requested: bool,
    pub(crate) job_dir: PathBuf,
    pub(crate) archive_path: Option<PathBuf>,
    pub(crate) created_at: SystemTime,
    pub(crate) finished_at: Option<SystemTime>,
}

impl Job {
    /// A fresh job in `running` state.
    pub fn new(id: JobId, job_dir: impl Into<PathBuf>) -> Self {
        Self {
            id,
            status: JobStatus::Running,
            total: 0,
            current: 0,
            ok: 0,
            logs: Vec::new(),
            error: None,
            cancel_requested: false,
            job_dir: job_dir.into(),
            archive_path: None,
            created_at: SystemTime::now(),
            finished_at: None,
        }
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn ok(&self) -> usize {
        self.ok
    }

    pub fn logs(&self) -> &[String] {
        &self.logs
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn cancel_requested(&self) -> bool {
        self.cancel_requested
    }

    pub fn job_dir(&self) -> &Path {
        &self.job_dir
    }

    /// Set once the job reaches `done`.
    pub fn archive_path(&self) -> Option<&Path> {
        self.archive_path.as_deref()
    }

    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// Set on entry into any terminal state.
    pub fn finished_at(&self) -> Option<SystemTime> {
        self.finished_at
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            id: self.id.clone(),
            status: self.status,
            current: self.current,
            total: self.total,
            ok: self.ok,
            error: self.error.clone(),
            logs: self.logs.clone(),
        }
    }
}
