//! harvester - downloads organic-operator certificates for a list of names
//! and bundles them into one zip archive.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use engine_logging::LogDestination;
use harvester_engine::{reap_once, JobRegistry};
use log::LevelFilter;

mod config;
mod run;

#[derive(Parser)]
#[command(name = "harvester")]
#[command(about = "Harvest organic-operator certificates into a zip archive")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file (default: ./harvester.ron when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Run one harvest and wait for it to finish
    Run(run::RunArgs),
    /// Remove expired run directories once
    Reap,
    /// Print the effective configuration as RON
    Config,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let level = if cli.debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let destination = match cli.log_file {
        Some(path) => LogDestination::Both(path),
        None => LogDestination::Terminal,
    };
    engine_logging::initialize(destination, level);

    let config = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Run(args) => run::run(args, config),
        Command::Reap => {
            // A fresh process knows no jobs; only directories are reaped.
            let registry = JobRegistry::new();
            let report = reap_once(&config.runs_dir, &registry, config.retention());
            for dir in &report.removed_dirs {
                println!("removed {}", dir.display());
            }
            println!("{} run directories removed", report.removed_dirs.len());
            Ok(ExitCode::SUCCESS)
        }
        Command::Config => {
            println!("{}", config::render_config(&config)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}
