use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use engine_logging::{engine_info, engine_warn};
use harvester_core::{JobStatus, RunConfiguration};
use harvester_engine::{EngineConfig, HarvestService};

const STATUS_POLL: Duration = Duration::from_millis(250);

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Identifier list, one per line; only the first comma-separated field counts
    #[arg(long, default_value = "suppliers.csv")]
    pub suppliers: PathBuf,

    /// Directory that receives the run folder (overrides `runs_dir`)
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Seconds to wait between two identifiers
    #[arg(long, allow_hyphen_values = true)]
    pub delay: Option<String>,

    /// Per-step timeout in milliseconds
    #[arg(long, allow_hyphen_values = true)]
    pub timeout: Option<String>,
}

impl RunArgs {
    /// Run parameters with flags taking precedence over the config file.
    /// A malformed flag keeps the config file's value.
    pub fn run_configuration(&self, defaults: RunConfiguration) -> RunConfiguration {
        for (flag, raw) in [("--delay", &self.delay), ("--timeout", &self.timeout)] {
            if let Some(raw) = raw.as_deref().filter(|raw| raw.trim().parse::<u64>().is_err()) {
                engine_warn!("ignoring {} {:?}: not a whole number", flag, raw);
            }
        }
        RunConfiguration::from_raw(self.delay.as_deref(), self.timeout.as_deref(), defaults)
    }
}

/// Runs one harvest in the foreground, echoing the job log.
pub fn run(args: RunArgs, mut config: EngineConfig) -> Result<ExitCode> {
    if let Some(out) = &args.out {
        config.runs_dir = out.clone();
    }
    let run_config = args.run_configuration(config.default_run);
    let service = HarvestService::with_http_driver(config)?;

    let id = service.submit_file(&args.suppliers, run_config)?;
    engine_info!("Submitted job {} for {:?}", id, args.suppliers);

    let mut printed = 0;
    let Some(snapshot) = service.wait_until_terminal(&id, STATUS_POLL, |snapshot| {
        for line in snapshot.logs_since(printed) {
            println!("{line}");
        }
        printed = snapshot.logs.len();
    }) else {
        anyhow::bail!("job {id} disappeared before finishing");
    };

    match snapshot.status {
        JobStatus::Done => {
            if let Some(archive) = service.registry().archive_path(&id) {
                println!("Archive: {}", archive.display());
            }
            Ok(ExitCode::SUCCESS)
        }
        JobStatus::Cancelled => {
            eprintln!("Job was cancelled.");
            Ok(ExitCode::FAILURE)
        }
        JobStatus::Error | JobStatus::Running => {
            let reason = snapshot.error.as_deref().unwrap_or("unknown error");
            eprintln!("Job failed: {reason}");
            Ok(ExitCode::FAILURE)
        }
    }
}
