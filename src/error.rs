use thiserror::Error;

/// Errors raised by a [`RecordStore`](crate::store::RecordStore) or
/// [`AuditTrail`](crate::store::AuditTrail) backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Unknown doctype: {0}")]
    UnknownDoctype(String),

    #[error("{doctype} {name} not found")]
    NotFound { doctype: String, name: String },

    #[error("API returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to decode store response: {0}")]
    Decode(String),

    #[error("Store backend error: {0}")]
    Backend(String),

    #[error("No force-update method configured; set frappe.force_update_method")]
    ForceWriteUnavailable,
}

/// Failures that end an auto-close run.
#[derive(Debug, Error)]
pub enum AutoCloseError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Malformed {doctype} record: {reason}")]
    MalformedRecord { doctype: String, reason: String },
}

/// Which step of closing a single order failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CloseStage {
    /// Writing `status = Closed` to the store.
    StatusUpdate,
    /// Appending the audit comment.
    Comment,
    /// Publishing the run's writes.
    Commit,
}

impl std::fmt::Display for CloseStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloseStage::StatusUpdate => write!(f, "status update"),
            CloseStage::Comment => write!(f, "comment"),
            CloseStage::Commit => write!(f, "commit"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display() {
        let err = StoreError::Api {
            status: 417,
            message: "Unknown column".into(),
        };
        assert_eq!(err.to_string(), "API returned status 417: Unknown column");
    }

    #[test]
    fn store_error_converts_into_job_error() {
        let err: AutoCloseError = StoreError::UnknownDoctype("Work Order".into()).into();
        assert_eq!(err.to_string(), "Store error: Unknown doctype: Work Order");
    }

    #[test]
    fn close_stage_display() {
        assert_eq!(CloseStage::StatusUpdate.to_string(), "status update");
        assert_eq!(CloseStage::Comment.to_string(), "comment");
        assert_eq!(CloseStage::Commit.to_string(), "commit");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<StoreError>();
        assert_send_sync::<AutoCloseError>();
    }
}
