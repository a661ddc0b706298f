use std::fmt;
use std::path::PathBuf;

/// Result of one retrieval attempt. Always one of these four; a retrieval
/// never fails past this boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrievalOutcome {
    Downloaded(PathBuf),
    NotFound,
    TimedOut,
    Failed(String),
}

impl RetrievalOutcome {
    pub fn is_downloaded(&self) -> bool {
        matches!(self, RetrievalOutcome::Downloaded(_))
    }

    /// Progress line appended to the job log after an identifier is handled.
    pub fn log_line(&self) -> String {
        format!("  -> {self}")
    }
}

impl fmt::Display for RetrievalOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetrievalOutcome::Downloaded(_) => write!(f, "downloaded"),
            RetrievalOutcome::NotFound => write!(f, "not found"),
            RetrievalOutcome::TimedOut => write!(f, "timeout"),
            RetrievalOutcome::Failed(reason) => write!(f, "error: {reason}"),
        }
    }
}

/// A file transfer captured from a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    /// Name proposed by the server, if any.
    pub suggested_name: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PageError {
    #[error("timed out while {0}")]
    Timeout(String),
    #[error("navigation failed: {0}")]
    Navigation(String),
    #[error("http status {status} for {url}")]
    HttpStatus { status: u16, url: String },
    #[error("{0}")]
    Element(String),
    #[error("download too large (max {max_bytes} bytes)")]
    TooLarge { max_bytes: u64 },
    #[error("no page loaded")]
    NoPage,
}

impl PageError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, PageError::Timeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_lines_match_progress_vocabulary() {
        assert_eq!(
            RetrievalOutcome::Downloaded(PathBuf::from("x.pdf")).log_line(),
            "  -> downloaded"
        );
        assert_eq!(RetrievalOutcome::NotFound.log_line(), "  -> not found");
        assert_eq!(RetrievalOutcome::TimedOut.log_line(), "  -> timeout");
        assert_eq!(
            RetrievalOutcome::Failed("search input not found".into()).log_line(),
            "  -> error: search input not found"
        );
    }
}
