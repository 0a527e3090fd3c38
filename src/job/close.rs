use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};

use super::report::{CloseFailure, RunReport};
use super::{ErrorReporter, JobSettings};
use crate::domain::{AuditComment, ErrorLogEntry, OrderStatus};
use crate::error::{CloseStage, StoreError};
use crate::store::{AuditTrail, RecordStore};

/// How an order's status is moved to Closed.
#[allow(async_fn_in_trait)]
pub trait CloseStrategy {
    fn name(&self) -> &'static str;

    async fn close<S: RecordStore>(&self, store: &S, doctype: &str, name: &str) -> Result<(), StoreError>;
}

/// Writes `status = Closed` straight to storage, skipping validation and workflow.
///
/// Used where the platform's own close routine is blocked by hosting restrictions.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForceClose;

impl CloseStrategy for ForceClose {
    fn name(&self) -> &'static str {
        "force"
    }

    async fn close<S: RecordStore>(&self, store: &S, doctype: &str, name: &str) -> Result<(), StoreError> {
        store
            .update_field(doctype, name, "status", Value::from(OrderStatus::Closed.as_str()), true)
            .await
    }
}

/// Sets the status through the store's validated update path, so the
/// platform's workflow and downstream status hooks run.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkflowClose;

impl CloseStrategy for WorkflowClose {
    fn name(&self) -> &'static str {
        "workflow"
    }

    async fn close<S: RecordStore>(&self, store: &S, doctype: &str, name: &str) -> Result<(), StoreError> {
        store
            .update_field(doctype, name, "status", Value::from(OrderStatus::Closed.as_str()), false)
            .await
    }
}

/// Configured choice between [`ForceClose`] and [`WorkflowClose`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClosePolicy {
    #[default]
    Force,
    Workflow,
}

impl fmt::Display for ClosePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl CloseStrategy for ClosePolicy {
    fn name(&self) -> &'static str {
        match self {
            ClosePolicy::Force => ForceClose.name(),
            ClosePolicy::Workflow => WorkflowClose.name(),
        }
    }

    async fn close<S: RecordStore>(&self, store: &S, doctype: &str, name: &str) -> Result<(), StoreError> {
        match self {
            ClosePolicy::Force => ForceClose.close(store, doctype, name).await,
            ClosePolicy::Workflow => WorkflowClose.close(store, doctype, name).await,
        }
    }
}

/// Close each order independently and record the result in `report`.
///
/// A failure is logged, written to the Error Log and recorded, then the next
/// order is processed. No
/// comment is appended when the status write failed. An order whose status
/// was written but whose comment failed is listed both as closed and as a
/// failure. Does not commit.
pub async fn close_orders<S, A, P>(
    store: &S,
    audit: &A,
    strategy: &P,
    settings: &JobSettings,
    names: &[String],
    report: &mut RunReport,
) where
    S: RecordStore,
    A: AuditTrail,
    P: CloseStrategy,
{
    let errors = ErrorReporter::new(audit, settings);
    for name in names {
        if let Err(e) = strategy.close(store, &settings.order_doctype, name).await {
            error!(order = %name, stage = %CloseStage::StatusUpdate, error = %e, "Close failed");
            errors
                .report(ErrorLogEntry::close_failed(name, CloseStage::StatusUpdate, &e))
                .await;
            report.failures.push(CloseFailure::new(name, CloseStage::StatusUpdate, &e));
            continue;
        }
        report.closed.push(name.clone());

        let comment = AuditComment::auto_closed(
            settings.order_doctype.as_str(),
            name.as_str(),
            settings.days,
            settings.acting_principal.as_str(),
        );
        if let Err(e) = audit.append_comment(&comment).await {
            error!(order = %name, stage = %CloseStage::Comment, error = %e, "Close failed");
            errors
                .report(ErrorLogEntry::close_failed(name, CloseStage::Comment, &e))
                .await;
            report.failures.push(CloseFailure::new(name, CloseStage::Comment, &e));
            continue;
        }

        info!(order = %name, policy = strategy.name(), "Closed");
    }
}
