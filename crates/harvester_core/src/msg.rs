use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobMsg {
    /// Input parsed; the worker knows how many identifiers it will process.
    Started { total: usize },
    /// One identifier finished. Counters are absolute, not deltas.
    Progress { current: usize, ok: usize },
    /// Append a human-readable progress line.
    Log(String),
    /// A caller asked the job to stop at the next identifier boundary.
    CancelRequested,
    /// All identifiers handled and the archive written.
    Completed { archive: PathBuf },
    /// Job-fatal failure.
    Failed { message: String },
    /// The worker observed the cancellation request and stopped.
    Cancelled,
}
