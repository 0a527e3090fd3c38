mod comment;
mod error_log;
mod link;
mod order;

pub use comment::{AuditComment, COMMENT_TYPE};
pub use error_log::ErrorLogEntry;
pub use link::LinkKind;
pub use order::{Candidate, DocStatus, OrderStatus, SalesOrder};
