use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use super::{AuditTrail, Filter, Record, RecordStore};
use crate::domain::{AuditComment, COMMENT_TYPE, ErrorLogEntry};
use crate::error::StoreError;

/// Connection settings for a Frappe/ERPNext site, read from the `[frappe]` table.
///
/// Every request runs as the user owning `api_key`. The acting principal of a
/// run only labels the audit comments (`comment_by`); permissions and the
/// document's `modified_by` follow the API key's user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrappeSettings {
    /// Site root, e.g. `https://erp.example.com`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default)]
    pub api_secret: String,

    /// Whitelisted server method used for force writes. It receives
    /// `doctype`, `name`, `fieldname` and `value` and must write with
    /// `frappe.db.set_value` or `doc.db_set`. `frappe.client.set_value` does
    /// not qualify: it saves the document and runs validation.
    ///
    /// No default. Without it only the validated write path is available.
    #[serde(default)]
    pub force_update_method: Option<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for FrappeSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            api_secret: String::new(),
            force_update_method: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    data: Vec<Record>,
}

/// [`RecordStore`] and [`AuditTrail`] over the Frappe REST API.
///
/// Every REST call is committed by the server when it returns, so
/// [`RecordStore::commit`] has nothing left to flush.
pub struct FrappeStore {
    client: Client,
    base_url: Url,
    token: String,
    force_update_method: Option<String>,
}

impl FrappeStore {
    pub fn new(settings: &FrappeSettings) -> Result<Self, StoreError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        let base_url = Url::parse(&settings.base_url)
            .map_err(|e| StoreError::Backend(format!("invalid base_url {}: {e}", settings.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::Backend(format!(
                "base_url {} cannot carry a path",
                settings.base_url
            )));
        }
        Ok(Self {
            client,
            base_url,
            token: format!("token {}:{}", settings.api_key, settings.api_secret),
            force_update_method: settings
                .force_update_method
                .clone()
                .filter(|m| !m.trim().is_empty()),
        })
    }

    /// Site URL with `segments` appended, each percent-encoded.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        let response = request.header(AUTHORIZATION, &self.token).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(StoreError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    async fn list(
        &self,
        doctype: &str,
        filters: &[Filter],
        fields: &[&str],
        limit: u32,
    ) -> Result<Vec<Record>, StoreError> {
        let filters = Value::Array(filters.iter().map(Filter::to_frappe).collect()).to_string();
        let fields = Value::from(fields.to_vec()).to_string();
        let request = self
            .client
            .get(self.url(&["api", "resource", doctype]))
            .query(&[
                ("filters", filters),
                ("fields", fields),
                ("limit_page_length", limit.to_string()),
            ]);

        let response = self.send(request).await.map_err(|e| match e {
            StoreError::Api { status: 404, .. } => StoreError::UnknownDoctype(doctype.to_string()),
            other => other,
        })?;
        let body = response
            .json::<ListResponse>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(body.data)
    }
}

impl RecordStore for FrappeStore {
    async fn find_all(
        &self,
        doctype: &str,
        filters: &[Filter],
        fields: &[&str],
    ) -> Result<Vec<Record>, StoreError> {
        // limit_page_length=0 lifts Frappe's default page size of 20.
        self.list(doctype, filters, fields, 0).await
    }

    async fn exists(&self, doctype: &str, filters: &[Filter]) -> Result<bool, StoreError> {
        let rows = self.list(doctype, filters, &["name"], 1).await?;
        Ok(!rows.is_empty())
    }

    async fn update_field(
        &self,
        doctype: &str,
        name: &str,
        field: &str,
        value: Value,
        force_write: bool,
    ) -> Result<(), StoreError> {
        let request = if force_write {
            let method = self
                .force_update_method
                .as_deref()
                .ok_or(StoreError::ForceWriteUnavailable)?;
            self.client
                .post(self.url(&["api", "method", method]))
                .json(&json!({
                    "doctype": doctype,
                    "name": name,
                    "fieldname": field,
                    "value": value,
                }))
        } else {
            let mut body = Record::new();
            body.insert(field.to_string(), value);
            self.client
                .put(self.url(&["api", "resource", doctype, name]))
                .json(&body)
        };

        self.send(request).await.map_err(|e| match e {
            StoreError::Api { status: 404, .. } => StoreError::NotFound {
                doctype: doctype.to_string(),
                name: name.to_string(),
            },
            other => other,
        })?;
        Ok(())
    }

    async fn commit(&self) -> Result<(), StoreError> {
        debug!("REST writes already committed per request");
        Ok(())
    }
}

impl AuditTrail for FrappeStore {
    async fn append_comment(&self, comment: &AuditComment) -> Result<(), StoreError> {
        let request = self
            .client
            .post(self.url(&["api", "resource", "Comment"]))
            .json(&json!({
                "comment_type": COMMENT_TYPE,
                "reference_doctype": comment.reference_doctype,
                "reference_name": comment.reference_name,
                "content": comment.content,
                "comment_by": comment.author,
            }));
        self.send(request).await?;
        Ok(())
    }

    async fn log_error(&self, entry: &ErrorLogEntry) -> Result<(), StoreError> {
        // Error Log keeps the title in its `method` field.
        let request = self
            .client
            .post(self.url(&["api", "resource", "Error Log"]))
            .json(&json!({
                "method": entry.title,
                "error": entry.error,
            }));
        self.send(request).await?;
        Ok(())
    }
}
