use std::path::PathBuf;
use std::time::Duration;

use harvester_core::RunConfiguration;
use serde::{Deserialize, Serialize};

use crate::http_page::HttpSettings;
use crate::matcher::TargetProfile;
use crate::reaper::ReaperSettings;

pub const DEFAULT_RUNS_DIR: &str = "./web_runs";
pub const DEFAULT_RETENTION_SECS: u64 = 24 * 60 * 60;
pub const DEFAULT_REAP_INTERVAL_SECS: u64 = 60 * 60;

/// Service-wide settings. Every field has a default, so a partial file is
/// enough.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Root for per-job directories.
    pub runs_dir: PathBuf,
    pub retention_secs: u64,
    pub reap_interval_secs: u64,
    /// Used when a submission carries no run parameters of its own.
    pub default_run: RunConfiguration,
    pub profile: TargetProfile,
    pub http: HttpSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            runs_dir: PathBuf::from(DEFAULT_RUNS_DIR),
            retention_secs: DEFAULT_RETENTION_SECS,
            reap_interval_secs: DEFAULT_REAP_INTERVAL_SECS,
            default_run: RunConfiguration::default(),
            profile: TargetProfile::default(),
            http: HttpSettings::default(),
        }
    }
}

impl EngineConfig {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    pub fn reap_interval(&self) -> Duration {
        Duration::from_secs(self.reap_interval_secs)
    }

    pub fn reaper_settings(&self) -> ReaperSettings {
        ReaperSettings {
            runs_dir: self.runs_dir.clone(),
            retention: self.retention(),
            interval: self.reap_interval(),
        }
    }
}
