use serde::{Deserialize, Serialize};

/// Comment type used for audit notes, matching the ERP's "Comment" comment type.
pub const COMMENT_TYPE: &str = "Comment";

/// Append-only note attached to a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditComment {
    pub reference_doctype: String,
    pub reference_name: String,
    pub content: String,
    /// Principal the job ran as.
    pub author: String,
}

impl AuditComment {
    /// The note recorded when an order is closed for inactivity.
    pub fn auto_closed(
        doctype: impl Into<String>,
        name: impl Into<String>,
        days: u32,
        author: impl Into<String>,
    ) -> Self {
        Self {
            reference_doctype: doctype.into(),
            reference_name: name.into(),
            content: format!(
                "Auto-closed by Sales Order Autoclose App (no activity for {days} days)."
            ),
            author: author.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_closed_text_states_window() {
        let c = AuditComment::auto_closed("Sales Order", "SO-0001", 60, "Administrator");
        assert_eq!(
            c.content,
            "Auto-closed by Sales Order Autoclose App (no activity for 60 days)."
        );
        assert_eq!(c.reference_name, "SO-0001");
        assert_eq!(c.author, "Administrator");
    }
}
