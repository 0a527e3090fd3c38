use tracing::{debug, warn};

use super::ErrorReporter;
use crate::domain::{ErrorLogEntry, LinkKind};
use crate::store::{AuditTrail, Filter, RecordStore};

/// First link kind, in `kinds` order, with a document referencing `order`.
///
/// Stops at the first match. A failed lookup is reported to `errors`, counts
/// as "no match" for that kind, and the scan moves on to the next one.
pub async fn find_blocking_link<'k, S: RecordStore, A: AuditTrail>(
    store: &S,
    errors: &ErrorReporter<'_, A>,
    kinds: &'k [LinkKind],
    order: &str,
) -> Option<&'k LinkKind> {
    for kind in kinds {
        let filters = [Filter::eq(kind.link_field.as_str(), order)];
        match store.exists(&kind.doctype, &filters).await {
            Ok(true) => return Some(kind),
            Ok(false) => debug!(order, doctype = %kind.doctype, "No linked documents"),
            Err(e) => {
                warn!(
                    order,
                    doctype = %kind.doctype,
                    error = %e,
                    "Link lookup failed, treating as no match"
                );
                errors
                    .report(ErrorLogEntry::link_check_failed(&kind.doctype, order, &e))
                    .await;
            }
        }
    }
    None
}
