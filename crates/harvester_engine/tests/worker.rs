mod common;

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use common::{init_logging, write_input, ScriptedDriver, ScriptedSession, Step};
use harvester_core::{parse_identifiers, Job, JobId, JobStatus, RunConfiguration};
use harvester_engine::{
    list_archive_entries, run_harvest, run_job, JobObserver, JobPaths, JobRegistry,
    CANCELLED_LINE, NO_DOWNLOADS_MESSAGE, NO_IDENTIFIERS_MESSAGE,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const NO_DELAY: RunConfiguration = RunConfiguration {
    delay_secs: 0,
    timeout_ms: 1_000,
};

#[derive(Default)]
struct Recorder {
    lines: Mutex<Vec<String>>,
    progress: Mutex<Vec<(usize, usize, usize)>>,
    /// Report cancellation once this many identifiers are done.
    cancel_after: Option<usize>,
}

impl Recorder {
    fn cancelling_after(done: usize) -> Self {
        Self {
            cancel_after: Some(done),
            ..Self::default()
        }
    }

    fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl JobObserver for Recorder {
    fn report_progress(&self, current: usize, total: usize, ok: usize) {
        self.progress.lock().unwrap().push((current, total, ok));
    }

    fn log(&self, line: &str) {
        self.lines.lock().unwrap().push(line.to_string());
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_after
            .is_some_and(|limit| self.progress.lock().unwrap().len() >= limit)
    }
}

#[tokio::test]
async fn harvest_logs_each_identifier_and_counts_downloads() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let identifiers = parse_identifiers("name\nAlpha\nBeta\nGamma\n");
    let mut session = ScriptedSession::new(vec![Step::Download; 3]);
    let observer = Recorder::default();

    let summary = run_harvest(&identifiers, temp.path(), NO_DELAY, &mut session, &observer).await;

    assert_eq!((summary.total, summary.processed, summary.ok), (3, 3, 3));
    assert!(!summary.cancelled);
    assert_eq!(
        observer.lines(),
        vec![
            "[1/3] Alpha",
            "  -> downloaded",
            "[2/3] Beta",
            "  -> downloaded",
            "[3/3] Gamma",
            "  -> downloaded",
            "Done. Downloaded 3 of 3.",
        ]
    );
    assert_eq!(
        *observer.progress.lock().unwrap(),
        vec![(1, 3, 1), (2, 3, 2), (3, 3, 3)]
    );
}

#[tokio::test]
async fn per_item_failures_do_not_stop_the_batch() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let identifiers = parse_identifiers("a\nb\nc\nd\ne\n");
    let mut session = ScriptedSession::new(vec![
        Step::NotFound,
        Step::Timeout,
        Step::Fail("boom"),
        Step::Panic("driver exploded"),
        Step::Download,
    ]);
    let observer = Recorder::default();

    let summary = run_harvest(&identifiers, temp.path(), NO_DELAY, &mut session, &observer).await;

    assert_eq!((summary.processed, summary.ok), (5, 1));
    let outcomes: Vec<String> = observer
        .lines()
        .into_iter()
        .filter(|line| line.starts_with("  -> "))
        .collect();
    assert_eq!(
        outcomes,
        vec![
            "  -> not found",
            "  -> timeout",
            "  -> error: boom",
            "  -> error: driver exploded",
            "  -> downloaded",
        ]
    );
    assert_eq!(observer.lines().last().unwrap(), "Done. Downloaded 1 of 5.");
}

#[tokio::test]
async fn cancellation_is_observed_between_identifiers() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let identifiers = parse_identifiers("a\nb\nc\n");
    let mut session = ScriptedSession::new(vec![Step::Download; 3]);
    let observer = Recorder::cancelling_after(1);

    let summary = run_harvest(&identifiers, temp.path(), NO_DELAY, &mut session, &observer).await;

    assert!(summary.cancelled);
    assert_eq!((summary.processed, summary.ok), (1, 1));
    assert_eq!(
        observer.lines(),
        vec!["[1/3] a", "  -> downloaded", CANCELLED_LINE]
    );
}

#[tokio::test]
async fn delay_applies_between_items_only() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let identifiers = parse_identifiers("a\nb\n");
    let mut session = ScriptedSession::new(vec![Step::NotFound; 2]);
    let observer = Recorder::default();
    let config = RunConfiguration {
        delay_secs: 1,
        timeout_ms: 1_000,
    };

    let started = Instant::now();
    run_harvest(&identifiers, temp.path(), config, &mut session, &observer).await;
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_secs(1), "{elapsed:?}");
    assert!(elapsed < Duration::from_secs(2), "{elapsed:?}");
}

fn registered_job(registry: &JobRegistry, temp: &TempDir) -> (JobId, JobPaths) {
    let id = JobId::generate();
    let paths = JobPaths::under(temp.path());
    registry
        .create(Job::new(id.clone(), paths.job_dir.clone()))
        .unwrap();
    (id, paths)
}

#[tokio::test]
async fn successful_job_ends_done_with_archive() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let registry = Arc::new(JobRegistry::new());
    let (id, paths) = registered_job(&registry, &temp);
    write_input(temp.path(), "Supplier\nAcme\nBio Hof\nZeta\n");

    let driver = ScriptedDriver::all(Step::Download, 3);
    let probe_registry = Arc::clone(&registry);
    let probe_id = id.clone();
    driver.set_probe(Arc::new(move || probe_registry.get(&probe_id)));
    let driver = Arc::new(driver);

    let status = run_job(
        id.clone(),
        paths.clone(),
        NO_DELAY,
        driver.clone(),
        Arc::clone(&registry),
    )
    .await;

    assert_eq!(status, JobStatus::Done);
    let snapshot = registry.get(&id).unwrap();
    assert_eq!((snapshot.current, snapshot.total, snapshot.ok), (3, 3, 3));
    assert_eq!(snapshot.error, None);
    assert_eq!(registry.archive_path(&id), Some(paths.archive_path.clone()));

    let observed = driver.observed.lock().unwrap().clone();
    assert_eq!(observed.len(), 3);
    assert!(observed.iter().all(|s| s.counters_consistent()));
    assert_eq!(
        observed.iter().map(|s| s.current).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );

    assert_eq!(driver.seen(), vec!["Acme", "Bio Hof", "Zeta"]);
    assert_eq!(*driver.closed.lock().unwrap(), 1);

    let entries: Vec<String> = list_archive_entries(&paths.out_dir)
        .unwrap()
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    assert_eq!(
        entries,
        vec![
            "acme__certificate.pdf",
            "bio_hof__certificate.pdf",
            "zeta__certificate.pdf",
        ]
    );
    assert!(paths.archive_path.is_file());
}

#[tokio::test]
async fn cancel_before_start_ends_cancelled() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let registry = Arc::new(JobRegistry::new());
    let (id, paths) = registered_job(&registry, &temp);
    write_input(temp.path(), "a\nb\nc\n");
    registry.request_cancel(&id);

    let driver = Arc::new(ScriptedDriver::all(Step::Download, 3));
    let status = run_job(id.clone(), paths.clone(), NO_DELAY, driver.clone(), Arc::clone(&registry)).await;

    assert_eq!(status, JobStatus::Cancelled);
    let snapshot = registry.get(&id).unwrap();
    assert_eq!(snapshot.total, 3);
    assert!(snapshot.current < snapshot.total);
    assert!(driver.seen().is_empty());
    assert_eq!(snapshot.logs.last().map(String::as_str), Some(CANCELLED_LINE));
    assert!(!paths.archive_path.exists());
}

#[tokio::test]
async fn empty_input_is_a_job_error() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let registry = Arc::new(JobRegistry::new());
    let (id, paths) = registered_job(&registry, &temp);
    write_input(temp.path(), "name\n\n   \n");

    let driver = Arc::new(ScriptedDriver::all(Step::Download, 1));
    let status = run_job(id.clone(), paths, NO_DELAY, driver.clone(), Arc::clone(&registry)).await;

    assert_eq!(status, JobStatus::Error);
    assert_eq!(
        registry.get(&id).unwrap().error.as_deref(),
        Some(NO_IDENTIFIERS_MESSAGE)
    );
    assert!(driver.seen().is_empty());
}

#[tokio::test]
async fn missing_input_file_is_a_job_error() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let registry = Arc::new(JobRegistry::new());
    let (id, paths) = registered_job(&registry, &temp);

    let driver = Arc::new(ScriptedDriver::all(Step::Download, 1));
    let status = run_job(id.clone(), paths, NO_DELAY, driver, Arc::clone(&registry)).await;

    assert_eq!(status, JobStatus::Error);
    let error = registry.get(&id).unwrap().error.unwrap();
    assert!(error.starts_with("Suppliers file not found"), "{error}");
}

#[tokio::test]
async fn job_without_downloads_is_an_error() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let registry = Arc::new(JobRegistry::new());
    let (id, paths) = registered_job(&registry, &temp);
    write_input(temp.path(), "a\nb\n");

    let driver = Arc::new(ScriptedDriver::new(vec![Step::NotFound, Step::Timeout]));
    let status = run_job(id.clone(), paths, NO_DELAY, driver, Arc::clone(&registry)).await;

    assert_eq!(status, JobStatus::Error);
    let snapshot = registry.get(&id).unwrap();
    assert_eq!(snapshot.error.as_deref(), Some(NO_DOWNLOADS_MESSAGE));
    assert_eq!((snapshot.current, snapshot.ok), (2, 0));
    assert!(snapshot
        .logs
        .contains(&"Done. Downloaded 0 of 2.".to_string()));
}

#[tokio::test]
async fn session_failure_is_a_job_error() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let registry = Arc::new(JobRegistry::new());
    let (id, paths) = registered_job(&registry, &temp);
    write_input(temp.path(), "a\n");

    let driver = Arc::new(ScriptedDriver::failing_open("no browser"));
    let status = run_job(id.clone(), paths, NO_DELAY, driver, Arc::clone(&registry)).await;

    assert_eq!(status, JobStatus::Error);
    let error = registry.get(&id).unwrap().error.unwrap();
    assert!(error.contains("no browser"), "{error}");
}

#[tokio::test]
async fn panics_outside_retrieval_are_caught_at_the_job_boundary() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let registry = Arc::new(JobRegistry::new());
    let (id, paths) = registered_job(&registry, &temp);
    write_input(temp.path(), "a\n");

    let driver = Arc::new(ScriptedDriver::panicking_open());
    let status = run_job(id.clone(), paths, NO_DELAY, driver, Arc::clone(&registry)).await;

    assert_eq!(status, JobStatus::Error);
    assert_eq!(
        registry.get(&id).unwrap().error.as_deref(),
        Some("browser crashed")
    );
}

#[tokio::test]
async fn archive_failure_is_a_job_error() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let registry = Arc::new(JobRegistry::new());
    let (id, paths) = registered_job(&registry, &temp);
    write_input(temp.path(), "Acme\n");
    std::fs::create_dir_all(&paths.archive_path).unwrap();

    let driver = Arc::new(ScriptedDriver::all(Step::Download, 1));
    let status = run_job(id.clone(), paths, NO_DELAY, driver, Arc::clone(&registry)).await;

    assert_eq!(status, JobStatus::Error);
    let snapshot = registry.get(&id).unwrap();
    assert_eq!((snapshot.current, snapshot.ok), (1, 1));
    let error = snapshot.error.unwrap();
    assert!(error.starts_with("cannot create archive"), "{error}");
    assert!(error.contains("traces_pdfs.zip"), "{error}");
    assert_eq!(registry.archive_path(&id), None);
}
