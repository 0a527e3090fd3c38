mod cli;
mod clock;
mod config;
mod demo;
mod domain;
mod error;
mod job;
mod store;
mod telemetry;
mod ui;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::error;

use cli::{Cli, Command};
use clock::{Clock, FixedClock, SystemClock};
use config::AutoCloseConfig;
use job::{RunReport, run_auto_close};
use store::FrappeStore;
use ui::ReportPrinter;

// Single-threaded by construction: every store call is awaited in turn.
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    telemetry::setup_tracing(cli.verbose);

    match execute(&cli).await {
        Ok(report) => {
            let printer = ReportPrinter::default();
            if cli.json {
                printer.print_json(&report);
            } else {
                printer.print_summary(&report);
            }
            ExitCode::from(report.exit_code())
        }
        Err(e) => {
            error!(error = format!("{e:#}"), "Auto-close could not start");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn execute(cli: &Cli) -> Result<RunReport> {
    let config = AutoCloseConfig::load(cli.config.as_deref())?;
    let mut settings = config.job_settings();
    let clock = SystemClock;

    match &cli.command {
        Command::Run(args) => {
            args.apply(&mut settings);
            if !settings.dry_run {
                config.check_close_policy(settings.close_policy)?;
            }
            let store = FrappeStore::new(&config.frappe).context("failed to set up Frappe client")?;
            Ok(run_auto_close(&store, &store, &clock, &settings).await)
        }
        Command::Demo(args) => {
            args.apply(&mut settings);
            // Pin the date so seeded ages and the cutoff agree across midnight.
            let today = FixedClock(clock.today());
            let store = demo::seed_store(&settings, today.today());
            Ok(run_auto_close(&store, &store, &today, &settings).await)
        }
    }
}
