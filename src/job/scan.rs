use chrono::{Days, NaiveDate};
use serde_json::Value;

use super::JobSettings;
use crate::domain::{Candidate, DocStatus, OrderStatus};
use crate::error::AutoCloseError;
use crate::store::{Filter, RecordStore};

/// Fields fetched for each candidate.
const CANDIDATE_FIELDS: [&str; 3] = ["name", "transaction_date", "customer"];

/// Latest transaction date that counts as inactive: `today - days`.
pub fn cutoff_date(today: NaiveDate, days: u32) -> NaiveDate {
    today
        .checked_sub_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MIN)
}

/// Opted in, submitted, not closed/cancelled/on hold, dated on or before the cutoff.
pub fn eligibility_filters(settings: &JobSettings, cutoff: NaiveDate) -> Vec<Filter> {
    vec![
        Filter::eq(settings.autoclose_field.as_str(), 1),
        Filter::eq("docstatus", u8::from(DocStatus::Submitted)),
        Filter::not_in("status", OrderStatus::EXCLUDED.iter().map(OrderStatus::as_str)),
        Filter::le("transaction_date", cutoff.to_string()),
    ]
}

/// Query the store for orders eligible for auto-close.
///
/// Results keep the store's order.
pub async fn find_candidates<S: RecordStore>(
    store: &S,
    settings: &JobSettings,
    cutoff: NaiveDate,
) -> Result<Vec<Candidate>, AutoCloseError> {
    let filters = eligibility_filters(settings, cutoff);
    let records = store
        .find_all(&settings.order_doctype, &filters, &CANDIDATE_FIELDS)
        .await?;

    records
        .into_iter()
        .map(|record| {
            serde_json::from_value::<Candidate>(Value::Object(record)).map_err(|e| {
                AutoCloseError::MalformedRecord {
                    doctype: settings.order_doctype.clone(),
                    reason: e.to_string(),
                }
            })
        })
        .collect()
}
