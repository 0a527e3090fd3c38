//! Record store seams consumed by the auto-close job.
//!
//! [`RecordStore`] covers querying and mutating documents, [`AuditTrail`]
//! covers appending comments. Two backends implement both:
//! [`FrappeStore`] over the Frappe REST API and [`MemoryStore`] for tests and
//! the demo.

mod frappe;
mod memory;

pub use frappe::{FrappeSettings, FrappeStore};
pub use memory::MemoryStore;

use serde_json::Value;

use crate::domain::{AuditComment, ErrorLogEntry};
use crate::error::StoreError;

/// A document as returned by the store: field name to JSON value.
pub type Record = serde_json::Map<String, Value>;

/// Comparison applied by a [`Filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    NotIn,
    Le,
}

impl FilterOp {
    /// Operator token in Frappe's filter syntax.
    pub fn as_frappe(&self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::NotIn => "not in",
            FilterOp::Le => "<=",
        }
    }
}

/// One `field op value` predicate. A query is the conjunction of its filters.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::Eq,
            value: value.into(),
        }
    }

    pub fn not_in<V: Into<Value>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::NotIn,
            value: Value::Array(values.into_iter().map(Into::into).collect()),
        }
    }

    pub fn le(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::Le,
            value: value.into(),
        }
    }

    /// `[field, op, value]` triple as Frappe expects in `filters=`.
    pub fn to_frappe(&self) -> Value {
        Value::Array(vec![
            Value::from(self.field.clone()),
            Value::from(self.op.as_frappe()),
            self.value.clone(),
        ])
    }

    /// Evaluate against a record. Missing fields never match.
    pub fn matches(&self, record: &Record) -> bool {
        let Some(actual) = record.get(&self.field) else {
            return false;
        };
        match self.op {
            FilterOp::Eq => loosely_equal(actual, &self.value),
            FilterOp::NotIn => match &self.value {
                Value::Array(excluded) => !excluded.iter().any(|v| loosely_equal(actual, v)),
                single => !loosely_equal(actual, single),
            },
            FilterOp::Le => match (actual, &self.value) {
                (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
                    (Some(a), Some(b)) => a <= b,
                    _ => false,
                },
                // ISO dates compare correctly as strings.
                (Value::String(a), Value::String(b)) => a <= b,
                _ => false,
            },
        }
    }
}

// Check fields are stored as 0/1 but callers may filter with booleans.
fn loosely_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Bool(x), Value::Number(n)) | (Value::Number(n), Value::Bool(x)) => {
            n.as_i64() == Some(i64::from(*x))
        }
        _ => a == b,
    }
}

/// Query and mutation interface of the document store.
///
/// Writes become durable only after [`RecordStore::commit`].
#[allow(async_fn_in_trait)]
pub trait RecordStore {
    /// All records of `doctype` matching every filter, projected to `fields`.
    async fn find_all(
        &self,
        doctype: &str,
        filters: &[Filter],
        fields: &[&str],
    ) -> Result<Vec<Record>, StoreError>;

    /// Whether at least one record of `doctype` matches every filter.
    async fn exists(&self, doctype: &str, filters: &[Filter]) -> Result<bool, StoreError>;

    /// Set one field on one record.
    ///
    /// With `force_write` the value is written straight to storage, skipping
    /// validation, workflow and permission checks. Without it the store's
    /// normal update path runs.
    async fn update_field(
        &self,
        doctype: &str,
        name: &str,
        field: &str,
        value: Value,
        force_write: bool,
    ) -> Result<(), StoreError>;

    async fn commit(&self) -> Result<(), StoreError>;
}

/// Append-only records for people: comments on documents and the site's
/// Error Log.
#[allow(async_fn_in_trait)]
pub trait AuditTrail {
    async fn append_comment(&self, comment: &AuditComment) -> Result<(), StoreError>;

    /// Write an Error Log entry. Entries are not part of the job's
    /// transaction and persist even if the run later fails.
    async fn log_error(&self, entry: &ErrorLogEntry) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(v: Value) -> Record {
        match v {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn frappe_filter_triple() {
        let f = Filter::not_in("status", ["Closed", "Cancelled", "On Hold"]);
        assert_eq!(
            f.to_frappe(),
            json!(["status", "not in", ["Closed", "Cancelled", "On Hold"]])
        );
        assert_eq!(Filter::le("transaction_date", "2025-01-01").to_frappe(), json!(["transaction_date", "<=", "2025-01-01"]));
    }

    #[test]
    fn eq_treats_check_fields_as_booleans() {
        let r = record(json!({"autoclose_after_60_days": 1}));
        assert!(Filter::eq("autoclose_after_60_days", 1).matches(&r));
        assert!(Filter::eq("autoclose_after_60_days", true).matches(&r));
        assert!(!Filter::eq("autoclose_after_60_days", false).matches(&r));
    }

    #[test]
    fn not_in_excludes_listed_values() {
        let closed = record(json!({"status": "Closed"}));
        let open = record(json!({"status": "To Bill"}));
        let f = Filter::not_in("status", ["Closed", "Cancelled"]);
        assert!(!f.matches(&closed));
        assert!(f.matches(&open));
    }

    #[test]
    fn le_compares_iso_dates_inclusively() {
        let f = Filter::le("transaction_date", "2025-03-01");
        assert!(f.matches(&record(json!({"transaction_date": "2025-02-28"}))));
        assert!(f.matches(&record(json!({"transaction_date": "2025-03-01"}))));
        assert!(!f.matches(&record(json!({"transaction_date": "2025-03-02"}))));
    }

    #[test]
    fn missing_field_never_matches() {
        let r = record(json!({"name": "SO-1"}));
        assert!(!Filter::eq("docstatus", 1).matches(&r));
        assert!(!Filter::not_in("status", ["Closed"]).matches(&r));
    }
}
