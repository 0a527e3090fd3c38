use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use super::{AuditTrail, Filter, Record, RecordStore};
use crate::domain::{AuditComment, ErrorLogEntry, SalesOrder};
use crate::error::StoreError;

/// Documents and comments at one point in time.
#[derive(Debug, Clone, Default)]
struct Tables {
    /// doctype -> name -> record. BTreeMap keeps query results sorted by name.
    docs: BTreeMap<String, BTreeMap<String, Record>>,
    comments: Vec<AuditComment>,
}

/// A write observed by the store, in call order. Only inspected by tests.
#[cfg_attr(not(test), allow(dead_code))]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedWrite {
    pub doctype: String,
    pub name: String,
    pub field: String,
    pub value: Value,
    pub force_write: bool,
}

#[derive(Debug, Default)]
struct MemoryState {
    committed: Tables,
    working: Tables,
    lookups: Vec<String>,
    writes: Vec<RecordedWrite>,
    /// Written outside the transaction, like the ERP's Error Log.
    error_log: Vec<ErrorLogEntry>,
    failing_updates: HashSet<String>,
    failing_comments: HashSet<String>,
    queries_fail: bool,
    commit_fails: bool,
    error_log_fails: bool,
    commits: u32,
}

/// In-process store with a single open transaction.
///
/// Writes and comments land in a working copy that [`RecordStore::commit`]
/// publishes. Seeded data is committed immediately. Doctypes must be
/// registered (explicitly or by inserting a record) before they can be
/// queried, mirroring a deployment where an app is not installed.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // No invariant spans a panic here; keep serving after one.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register_doctype(&self, doctype: &str) {
        let mut state = self.lock();
        state.committed.docs.entry(doctype.to_string()).or_default();
        state.working.docs.entry(doctype.to_string()).or_default();
    }

    /// Seed a committed record. The record must carry a string `name`.
    pub fn insert(&self, doctype: &str, record: Record) {
        let Some(name) = record.get("name").and_then(Value::as_str).map(str::to_string) else {
            return;
        };
        let mut guard = self.lock();
        let state = &mut *guard;
        for tables in [&mut state.committed, &mut state.working] {
            tables
                .docs
                .entry(doctype.to_string())
                .or_default()
                .insert(name.clone(), record.clone());
        }
    }

    pub fn insert_order(&self, doctype: &str, order: &SalesOrder, autoclose_field: &str) {
        self.insert(doctype, order.to_record(autoclose_field));
    }

    /// Seed a downstream document linking to `order_name` through `link_field`.
    pub fn insert_link(&self, doctype: &str, name: &str, link_field: &str, order_name: &str) {
        let mut record = Record::new();
        record.insert("name".into(), Value::from(name));
        record.insert(link_field.into(), Value::from(order_name));
        record.insert("docstatus".into(), Value::from(1));
        self.insert(doctype, record);
    }

    /// Reject every `update_field` targeting `name`.
    pub fn fail_updates_for(&self, name: &str) {
        self.lock().failing_updates.insert(name.to_string());
    }
}

/// Fault injection and inspection for tests.
#[cfg(test)]
impl MemoryStore {
    /// Reject every comment referencing `name`.
    pub fn fail_comments_for(&self, name: &str) {
        self.lock().failing_comments.insert(name.to_string());
    }

    /// Make `find_all` and `exists` fail as if the connection dropped.
    pub fn fail_queries(&self) {
        self.lock().queries_fail = true;
    }

    pub fn fail_commit(&self) {
        self.lock().commit_fails = true;
    }

    pub fn fail_error_log(&self) {
        self.lock().error_log_fails = true;
    }

    /// Error Log entries, oldest first.
    pub fn error_log(&self) -> Vec<ErrorLogEntry> {
        self.lock().error_log.clone()
    }

    /// Committed value of one field.
    pub fn committed_field(&self, doctype: &str, name: &str, field: &str) -> Option<Value> {
        self.lock()
            .committed
            .docs
            .get(doctype)
            .and_then(|docs| docs.get(name))
            .and_then(|record| record.get(field))
            .cloned()
    }

    /// Committed comments referencing `name`, oldest first.
    pub fn committed_comments(&self, name: &str) -> Vec<AuditComment> {
        self.lock()
            .committed
            .comments
            .iter()
            .filter(|c| c.reference_name == name)
            .cloned()
            .collect()
    }

    /// Doctypes queried by `exists`, in call order.
    pub fn lookups(&self) -> Vec<String> {
        self.lock().lookups.clone()
    }

    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.lock().writes.clone()
    }

    pub fn commit_count(&self) -> u32 {
        self.lock().commits
    }
}

fn project(record: &Record, fields: &[&str]) -> Record {
    if fields.is_empty() {
        return record.clone();
    }
    fields
        .iter()
        .filter_map(|f| record.get(*f).map(|v| (f.to_string(), v.clone())))
        .collect()
}

impl RecordStore for MemoryStore {
    async fn find_all(
        &self,
        doctype: &str,
        filters: &[Filter],
        fields: &[&str],
    ) -> Result<Vec<Record>, StoreError> {
        let state = self.lock();
        if state.queries_fail {
            return Err(StoreError::Backend("connection lost".into()));
        }
        let docs = state
            .working
            .docs
            .get(doctype)
            .ok_or_else(|| StoreError::UnknownDoctype(doctype.to_string()))?;
        Ok(docs
            .values()
            .filter(|record| filters.iter().all(|f| f.matches(record)))
            .map(|record| project(record, fields))
            .collect())
    }

    async fn exists(&self, doctype: &str, filters: &[Filter]) -> Result<bool, StoreError> {
        let mut state = self.lock();
        state.lookups.push(doctype.to_string());
        if state.queries_fail {
            return Err(StoreError::Backend("connection lost".into()));
        }
        let docs = state
            .working
            .docs
            .get(doctype)
            .ok_or_else(|| StoreError::UnknownDoctype(doctype.to_string()))?;
        Ok(docs
            .values()
            .any(|record| filters.iter().all(|f| f.matches(record))))
    }

    async fn update_field(
        &self,
        doctype: &str,
        name: &str,
        field: &str,
        value: Value,
        force_write: bool,
    ) -> Result<(), StoreError> {
        let mut state = self.lock();
        state.writes.push(RecordedWrite {
            doctype: doctype.to_string(),
            name: name.to_string(),
            field: field.to_string(),
            value: value.clone(),
            force_write,
        });
        if state.failing_updates.contains(name) {
            return Err(StoreError::Backend(format!("update rejected for {name}")));
        }
        let record = state
            .working
            .docs
            .get_mut(doctype)
            .ok_or_else(|| StoreError::UnknownDoctype(doctype.to_string()))?
            .get_mut(name)
            .ok_or_else(|| StoreError::NotFound {
                doctype: doctype.to_string(),
                name: name.to_string(),
            })?;
        record.insert(field.to_string(), value);
        Ok(())
    }

    async fn commit(&self) -> Result<(), StoreError> {
        let mut state = self.lock();
        if state.commit_fails {
            // Roll back so the staged writes are not visible to later reads.
            state.working = state.committed.clone();
            return Err(StoreError::Backend("commit failed".into()));
        }
        state.committed = state.working.clone();
        state.commits += 1;
        Ok(())
    }
}

impl AuditTrail for MemoryStore {
    async fn append_comment(&self, comment: &AuditComment) -> Result<(), StoreError> {
        let mut state = self.lock();
        if state.failing_comments.contains(&comment.reference_name) {
            return Err(StoreError::Backend(format!(
                "comment rejected for {}",
                comment.reference_name
            )));
        }
        state.working.comments.push(comment.clone());
        Ok(())
    }

    async fn log_error(&self, entry: &ErrorLogEntry) -> Result<(), StoreError> {
        let mut state = self.lock();
        if state.error_log_fails {
            return Err(StoreError::Backend("error log unavailable".into()));
        }
        state.error_log.push(entry.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    const SO: &str = "Sales Order";
    const FLAG: &str = "autoclose_after_60_days";

    fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        let date = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        store.insert_order(SO, &SalesOrder::submitted("SO-0002", date), FLAG);
        store.insert_order(SO, &SalesOrder::submitted("SO-0001", date).with_customer("Acme"), FLAG);
        store
    }

    #[tokio::test]
    async fn find_all_filters_projects_and_sorts() {
        let store = seeded();
        let rows = store
            .find_all(SO, &[Filter::eq(FLAG, 1)], &["name", "customer"])
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["name"], "SO-0001");
        assert_eq!(rows[0]["customer"], "Acme");
        assert!(!rows[0].contains_key("status"));
        assert!(!rows[1].contains_key("customer"));
    }

    #[tokio::test]
    async fn unknown_doctype_errors() {
        let store = seeded();
        let err = store.exists("Work Order", &[]).await.unwrap_err();
        assert!(matches!(err, StoreError::UnknownDoctype(d) if d == "Work Order"));
        assert_eq!(store.lookups(), vec!["Work Order"]);
    }

    #[tokio::test]
    async fn registered_empty_doctype_has_no_matches() {
        let store = seeded();
        store.register_doctype("Stock Entry");
        assert!(!store.exists("Stock Entry", &[Filter::eq("sales_order", "SO-0001")]).await.unwrap());
    }

    #[tokio::test]
    async fn writes_are_invisible_until_commit() {
        let store = seeded();
        store
            .update_field(SO, "SO-0001", "status", json!("Closed"), true)
            .await
            .unwrap();
        assert_eq!(store.committed_field(SO, "SO-0001", "status"), Some(json!("To Deliver and Bill")));

        // Same-transaction reads see the write.
        let open = store
            .find_all(SO, &[Filter::not_in("status", ["Closed"])], &["name"])
            .await
            .unwrap();
        assert_eq!(open.len(), 1);

        store.commit().await.unwrap();
        assert_eq!(store.committed_field(SO, "SO-0001", "status"), Some(json!("Closed")));
        assert_eq!(store.commit_count(), 1);
    }

    #[tokio::test]
    async fn comments_are_staged_until_commit() {
        let store = seeded();
        let comment = AuditComment::auto_closed(SO, "SO-0001", 60, "Administrator");
        store.append_comment(&comment).await.unwrap();
        assert!(store.committed_comments("SO-0001").is_empty());
        store.commit().await.unwrap();
        assert_eq!(store.committed_comments("SO-0001"), vec![comment]);
    }

    #[tokio::test]
    async fn injected_failures() {
        let store = seeded();
        store.fail_updates_for("SO-0001");
        store.fail_comments_for("SO-0002");

        assert!(store.update_field(SO, "SO-0001", "status", json!("Closed"), true).await.is_err());
        let comment = AuditComment::auto_closed(SO, "SO-0002", 60, "Administrator");
        assert!(store.append_comment(&comment).await.is_err());

        store.fail_commit();
        assert!(store.commit().await.is_err());
        assert_eq!(store.commit_count(), 0);
    }

    #[tokio::test]
    async fn failed_commit_discards_staged_writes() {
        let store = seeded();
        store
            .update_field(SO, "SO-0001", "status", json!("Closed"), true)
            .await
            .unwrap();
        store.fail_commit();
        assert!(store.commit().await.is_err());

        // A retry in the same process sees the order open again.
        let open = store
            .find_all(SO, &[Filter::not_in("status", ["Closed"])], &["name"])
            .await
            .unwrap();
        assert_eq!(open.len(), 2);
        assert_eq!(store.committed_field(SO, "SO-0001", "status"), Some(json!("To Deliver and Bill")));
    }

    #[tokio::test]
    async fn error_log_survives_failed_commit() {
        let store = seeded();
        store.log_error(&ErrorLogEntry::job_failed("boom")).await.unwrap();
        store.fail_commit();
        assert!(store.commit().await.is_err());
        assert_eq!(store.error_log(), vec![ErrorLogEntry::job_failed("boom")]);

        store.fail_error_log();
        assert!(store.log_error(&ErrorLogEntry::job_failed("again")).await.is_err());
    }

    #[tokio::test]
    async fn update_of_missing_record_is_not_found() {
        let store = seeded();
        let err = store
            .update_field(SO, "SO-9999", "status", json!("Closed"), true)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }
}
