use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_DELAY_SECS: u64 = 10;
pub const DEFAULT_TIMEOUT_MS: u64 = 45_000;

/// Per-job parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfiguration {
    /// Pause between two identifiers, in seconds.
    pub delay_secs: u64,
    /// Upper bound for each wait inside one retrieval, in milliseconds. Never zero.
    pub timeout_ms: u64,
}

impl Default for RunConfiguration {
    fn default() -> Self {
        Self {
            delay_secs: DEFAULT_DELAY_SECS,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl RunConfiguration {
    /// Builds a configuration from untrusted text (form fields, CLI strings).
    /// Anything missing, unparsable, negative or a zero timeout falls back to
    /// that field of `fallback`.
    pub fn from_raw(delay: Option<&str>, timeout: Option<&str>, fallback: Self) -> Self {
        let fallback = fallback.sanitized();
        let delay_secs = delay
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .unwrap_or(fallback.delay_secs);
        let timeout_ms = timeout
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .unwrap_or(fallback.timeout_ms);
        Self {
            delay_secs,
            timeout_ms,
        }
    }

    /// Replaces a zero timeout with the default.
    pub fn sanitized(self) -> Self {
        Self {
            timeout_ms: if self.timeout_ms == 0 {
                DEFAULT_TIMEOUT_MS
            } else {
                self.timeout_ms
            },
            ..self
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
