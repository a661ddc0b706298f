#![allow(dead_code)]

use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use harvester_core::{Identifier, JobSnapshot};
use harvester_engine::{
    download_filename, PageError, ARCHIVE_FILE_NAME, RetrievalDriver, RetrievalOutcome, RetrievalSession,
};

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

/// What the scripted session does for one identifier.
#[derive(Debug, Clone)]
pub enum Step {
    Download,
    /// Downloads, then occupies the job's archive path with a directory.
    DownloadBlockingArchive,
    NotFound,
    Timeout,
    Fail(&'static str),
    Panic(&'static str),
}

pub type Probe = Arc<dyn Fn() -> Option<JobSnapshot> + Send + Sync>;

/// Driver whose sessions replay a fixed list of steps, one per identifier.
/// Extra identifiers are answered with `NotFound`.
pub struct ScriptedDriver {
    steps: Vec<Step>,
    open_error: Option<String>,
    panic_on_open: bool,
    /// Called at the start of every retrieval; the snapshots it returns are
    /// collected in `observed`.
    probe: Mutex<Option<Probe>>,
    pub observed: Arc<Mutex<Vec<JobSnapshot>>>,
    pub seen: Arc<Mutex<Vec<String>>>,
    pub closed: Arc<Mutex<usize>>,
}

impl ScriptedDriver {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps,
            open_error: None,
            panic_on_open: false,
            probe: Mutex::new(None),
            observed: Arc::default(),
            seen: Arc::default(),
            closed: Arc::default(),
        }
    }

    pub fn all(step: Step, count: usize) -> Self {
        Self::new(vec![step; count])
    }

    pub fn failing_open(message: &str) -> Self {
        Self {
            open_error: Some(message.to_string()),
            ..Self::new(Vec::new())
        }
    }

    pub fn panicking_open() -> Self {
        Self {
            panic_on_open: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn set_probe(&self, probe: Probe) {
        *self.probe.lock().unwrap() = Some(probe);
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl RetrievalDriver for ScriptedDriver {
    async fn open_session(&self) -> Result<Box<dyn RetrievalSession>, PageError> {
        if self.panic_on_open {
            panic!("browser crashed");
        }
        if let Some(message) = &self.open_error {
            return Err(PageError::Navigation(message.clone()));
        }
        Ok(Box::new(ScriptedSession {
            steps: self.steps.iter().cloned().collect(),
            probe: self.probe.lock().unwrap().clone(),
            observed: Arc::clone(&self.observed),
            seen: Arc::clone(&self.seen),
            closed: Arc::clone(&self.closed),
        }))
    }
}

pub struct ScriptedSession {
    steps: VecDeque<Step>,
    probe: Option<Probe>,
    observed: Arc<Mutex<Vec<JobSnapshot>>>,
    seen: Arc<Mutex<Vec<String>>>,
    closed: Arc<Mutex<usize>>,
}

impl ScriptedSession {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: steps.into(),
            probe: None,
            observed: Arc::default(),
            seen: Arc::default(),
            closed: Arc::default(),
        }
    }
}

#[async_trait::async_trait]
impl RetrievalSession for ScriptedSession {
    async fn fetch_one(
        &mut self,
        identifier: &Identifier,
        out_dir: &Path,
        _timeout: Duration,
    ) -> RetrievalOutcome {
        if let Some(snapshot) = self.probe.as_ref().and_then(|probe| probe()) {
            self.observed.lock().unwrap().push(snapshot);
        }
        self.seen.lock().unwrap().push(identifier.to_string());
        match self.steps.pop_front().unwrap_or(Step::NotFound) {
            Step::Download => RetrievalOutcome::Downloaded(write_download(identifier, out_dir)),
            Step::DownloadBlockingArchive => {
                let path = write_download(identifier, out_dir);
                fs::create_dir_all(out_dir.parent().unwrap().join(ARCHIVE_FILE_NAME)).unwrap();
                RetrievalOutcome::Downloaded(path)
            }
            Step::NotFound => RetrievalOutcome::NotFound,
            Step::Timeout => RetrievalOutcome::TimedOut,
            Step::Fail(reason) => RetrievalOutcome::Failed(reason.to_string()),
            Step::Panic(message) => panic!("{}", message),
        }
    }

    async fn close(&mut self) {
        *self.closed.lock().unwrap() += 1;
    }
}

fn write_download(identifier: &Identifier, out_dir: &Path) -> std::path::PathBuf {
    fs::create_dir_all(out_dir).unwrap();
    let path = out_dir.join(download_filename(identifier.as_str(), None));
    fs::write(&path, format!("%PDF {identifier}")).unwrap();
    path
}

pub fn write_input(dir: &Path, content: &str) -> std::path::PathBuf {
    let path = dir.join("suppliers.csv");
    fs::write(&path, content).unwrap();
    path
}
