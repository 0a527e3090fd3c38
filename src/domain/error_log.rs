use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Operator-facing entry for the ERP's Error Log.
///
/// The job has no UI of its own, so skips and failures are surfaced where
/// site administrators already look.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorLogEntry {
    pub title: String,
    pub error: String,
}

impl ErrorLogEntry {
    pub fn skipped(order: &str, blocking_doctype: &str) -> Self {
        Self {
            title: "AutoClose Skip".to_string(),
            error: format!("SO {order} skipped, linked {blocking_doctype} exists."),
        }
    }

    pub fn link_check_failed(doctype: &str, order: &str, cause: impl Display) -> Self {
        Self {
            title: format!("[AutoClose] Error checking link for {doctype}"),
            error: format!("Looking up {doctype} for {order}: {cause}"),
        }
    }

    /// `stage` names the step that failed ("status update", "comment", "commit").
    pub fn close_failed(order: &str, stage: impl Display, cause: impl Display) -> Self {
        Self {
            title: format!("[AutoClose] Force-close failed for {order}"),
            error: format!("{stage} failed: {cause}"),
        }
    }

    pub fn job_failed(cause: impl Display) -> Self {
        Self {
            title: "[AutoClose] Job Failed".to_string(),
            error: cause.to_string(),
        }
    }
}
