//! Structured logging setup.
//!
//! Log lines are the job's primary observability surface: every decision
//! (candidates, skips with the blocking doctype, closures, failures, commit)
//! is emitted as a `tracing` event with structured fields, inside an
//! `autoclose` span carrying the run id and acting principal.
//!
//! Verbosity follows `RUST_LOG` when set; otherwise `info`, or `debug` with
//! `--verbose`. Output goes to stderr so stdout stays reserved for the run
//! report.
//!
//! ```text
//! INFO autoclose: Running auto-close run_id=... principal=Administrator policy=force
//! INFO autoclose: Cutoff date cutoff=2025-05-01 days=60
//! WARN autoclose: Skipped, linked documents exist order=SO-0002 doctype=Delivery Note
//! INFO autoclose: Closed order=SO-0001 policy=force
//! ```

use tracing_subscriber::EnvFilter;

pub fn setup_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
