use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::JobSettings;
use super::close::ClosePolicy;
use crate::error::{CloseStage, StoreError};

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason")]
pub enum RunOutcome {
    /// Still running.
    Pending,
    /// Ran to the end. Individual orders may still have failed.
    Completed,
    /// Aborted by a job-level error.
    Failed(String),
}

/// A candidate left open because a downstream document references it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedOrder {
    pub name: String,
    pub blocking_doctype: String,
}

/// An order whose close attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseFailure {
    pub name: String,
    pub stage: CloseStage,
    pub cause: String,
}

impl CloseFailure {
    pub fn new(name: &str, stage: CloseStage, cause: &StoreError) -> Self {
        Self {
            name: name.to_string(),
            stage,
            cause: cause.to_string(),
        }
    }
}

/// Structured record of one auto-close run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub acting_principal: String,
    pub close_policy: ClosePolicy,
    pub days: u32,
    pub cutoff: NaiveDate,
    pub dry_run: bool,
    pub candidates: Vec<String>,
    pub skipped: Vec<SkippedOrder>,
    /// Candidates that passed the link guard.
    pub to_close: Vec<String>,
    /// Orders whose status write succeeded.
    pub closed: Vec<String>,
    pub failures: Vec<CloseFailure>,
    pub outcome: RunOutcome,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunReport {
    pub fn new(settings: &JobSettings, cutoff: NaiveDate) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            acting_principal: settings.acting_principal.clone(),
            close_policy: settings.close_policy,
            days: settings.days,
            cutoff,
            dry_run: settings.dry_run,
            candidates: Vec::new(),
            skipped: Vec::new(),
            to_close: Vec::new(),
            closed: Vec::new(),
            failures: Vec::new(),
            outcome: RunOutcome::Pending,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn finish(&mut self, outcome: RunOutcome) {
        self.outcome = outcome;
        self.finished_at = Some(Utc::now());
    }

    /// Process exit code for the run.
    ///
    /// - `0`: completed with no per-order failures (including "nothing to do")
    /// - `1`: job-level failure
    /// - `2`: completed, but some orders failed to close
    pub fn exit_code(&self) -> u8 {
        match self.outcome {
            RunOutcome::Completed if self.failures.is_empty() => 0,
            RunOutcome::Completed => 2,
            RunOutcome::Pending | RunOutcome::Failed(_) => 1,
        }
    }

    pub fn duration_ms(&self) -> Option<i64> {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds())
    }
}
