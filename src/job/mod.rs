//! The auto-close job: eligibility scan, link guard, close executor.
//!
//! One run walks the pipeline once:
//!
//! 1. [`scan`] computes `cutoff = today - days` and queries the store for
//!    opted-in, submitted, open orders dated on or before it.
//! 2. [`guard`] drops candidates that a delivery note, invoice, work order or
//!    stock entry references.
//! 3. [`close`] moves each remaining order to Closed with the configured
//!    [`ClosePolicy`] and appends an audit comment.
//! 4. The store is committed once.
//!
//! Errors never escape [`AutoCloser::run`]: per-kind lookup failures and
//! per-order close failures are logged and the run continues, anything else
//! ends the run and is recorded in the returned [`RunReport`]. Skips and
//! failures are also written to the ERP's Error Log through
//! [`AuditTrail::log_error`]. Re-running is safe because Closed orders are no
//! longer candidates.

mod close;
mod guard;
mod report;
mod scan;

pub use close::ClosePolicy;
pub use report::{RunOutcome, RunReport, SkippedOrder};

use report::CloseFailure;

use tracing::{Instrument, error, info, info_span, warn};

use crate::clock::Clock;
use crate::domain::{ErrorLogEntry, LinkKind};
use crate::error::{AutoCloseError, CloseStage};
use crate::store::{AuditTrail, RecordStore};

/// Inputs of one run.
#[derive(Debug, Clone)]
pub struct JobSettings {
    /// Inactivity window in days.
    pub days: u32,
    /// Principal the job acts as; recorded on audit comments.
    pub acting_principal: String,
    pub close_policy: ClosePolicy,
    pub order_doctype: String,
    /// Custom check field holding the per-order opt-in.
    pub autoclose_field: String,
    /// Downstream kinds checked by the link guard, in check order.
    pub link_kinds: Vec<LinkKind>,
    /// Scan and guard only; write nothing.
    pub dry_run: bool,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            days: 60,
            acting_principal: "Administrator".to_string(),
            close_policy: ClosePolicy::default(),
            order_doctype: "Sales Order".to_string(),
            autoclose_field: "autoclose_after_60_days".to_string(),
            link_kinds: LinkKind::defaults(),
            dry_run: false,
        }
    }
}

/// Copies skips and failures into the ERP's Error Log.
///
/// Silent in dry runs. A failed write is logged and otherwise ignored.
pub(crate) struct ErrorReporter<'a, A> {
    audit: &'a A,
    enabled: bool,
}

impl<'a, A: AuditTrail> ErrorReporter<'a, A> {
    pub(crate) fn new(audit: &'a A, settings: &JobSettings) -> Self {
        Self {
            audit,
            enabled: !settings.dry_run,
        }
    }

    pub(crate) async fn report(&self, entry: ErrorLogEntry) {
        if !self.enabled {
            return;
        }
        if let Err(e) = self.audit.log_error(&entry).await {
            warn!(title = %entry.title, error = %e, "Could not write Error Log entry");
        }
    }
}

/// Runs the auto-close pipeline against a store.
pub struct AutoCloser<'a, S, A, C> {
    store: &'a S,
    audit: &'a A,
    clock: &'a C,
    settings: &'a JobSettings,
}

impl<'a, S, A, C> AutoCloser<'a, S, A, C>
where
    S: RecordStore,
    A: AuditTrail,
    C: Clock,
{
    pub fn new(store: &'a S, audit: &'a A, clock: &'a C, settings: &'a JobSettings) -> Self {
        Self {
            store,
            audit,
            clock,
            settings,
        }
    }

    /// Execute one run. Never fails; the outcome is in the report.
    pub async fn run(&self) -> RunReport {
        let cutoff = scan::cutoff_date(self.clock.today(), self.settings.days);
        let mut report = RunReport::new(self.settings, cutoff);
        let span = info_span!(
            "autoclose",
            run_id = %report.run_id,
            principal = %self.settings.acting_principal,
        );

        async {
            match self.execute(&mut report).await {
                Ok(()) => {
                    report.finish(RunOutcome::Completed);
                    info!(
                        candidates = report.candidates.len(),
                        skipped = report.skipped.len(),
                        closed = report.closed.len(),
                        failed = report.failures.len(),
                        "Run finished"
                    );
                }
                Err(e) => {
                    error!(error = %e, cutoff = %cutoff, "Job failed");
                    self.errors().report(ErrorLogEntry::job_failed(&e)).await;
                    report.finish(RunOutcome::Failed(e.to_string()));
                }
            }
        }
        .instrument(span)
        .await;
        report
    }

    fn errors(&self) -> ErrorReporter<'a, A> {
        ErrorReporter::new(self.audit, self.settings)
    }

    async fn execute(&self, report: &mut RunReport) -> Result<(), AutoCloseError> {
        let settings = self.settings;
        info!(principal = %settings.acting_principal, policy = %settings.close_policy, "Running auto-close");
        info!(cutoff = %report.cutoff, days = settings.days, "Cutoff date");

        let candidates = scan::find_candidates(self.store, settings, report.cutoff).await?;
        report.candidates = candidates.iter().map(|c| c.name.clone()).collect();
        info!(candidates = ?report.candidates, "Candidates");

        if candidates.is_empty() {
            info!("No eligible sales orders found");
            return Ok(());
        }

        let errors = self.errors();
        for candidate in &candidates {
            match guard::find_blocking_link(self.store, &errors, &settings.link_kinds, &candidate.name).await {
                Some(kind) => {
                    warn!(
                        order = %candidate.name,
                        doctype = %kind.doctype,
                        transaction_date = %candidate.transaction_date,
                        customer = candidate.customer.as_deref().unwrap_or(""),
                        "Skipped, linked documents exist"
                    );
                    errors
                        .report(ErrorLogEntry::skipped(&candidate.name, &kind.doctype))
                        .await;
                    report.skipped.push(SkippedOrder {
                        name: candidate.name.clone(),
                        blocking_doctype: kind.doctype.clone(),
                    });
                }
                None => report.to_close.push(candidate.name.clone()),
            }
        }
        info!(to_close = ?report.to_close, "Final to-close list");

        if report.to_close.is_empty() {
            info!("No orders to close");
            return Ok(());
        }

        if settings.dry_run {
            info!(would_close = ?report.to_close, "Dry run, nothing written");
            return Ok(());
        }

        let to_close = report.to_close.clone();
        close::close_orders(
            self.store,
            self.audit,
            &settings.close_policy,
            settings,
            &to_close,
            report,
        )
        .await;

        if let Err(e) = self.store.commit().await {
            // Nothing was published, so none of the staged closes took effect.
            for name in std::mem::take(&mut report.closed) {
                error!(order = %name, stage = %CloseStage::Commit, error = %e, "Close failed");
                report.failures.push(CloseFailure::new(&name, CloseStage::Commit, &e));
            }
            return Err(e.into());
        }
        info!(closed = ?report.closed, "Committed");
        Ok(())
    }
}

/// Convenience wrapper around [`AutoCloser::run`].
pub async fn run_auto_close<S, A, C>(store: &S, audit: &A, clock: &C, settings: &JobSettings) -> RunReport
where
    S: RecordStore,
    A: AuditTrail,
    C: Clock,
{
    AutoCloser::new(store, audit, clock, settings).run().await
}
