use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Tri-state submission lifecycle flag, stored as 0/1/2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum DocStatus {
    Draft,
    Submitted,
    Cancelled,
}

impl From<DocStatus> for u8 {
    fn from(status: DocStatus) -> Self {
        match status {
            DocStatus::Draft => 0,
            DocStatus::Submitted => 1,
            DocStatus::Cancelled => 2,
        }
    }
}

impl TryFrom<u8> for DocStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(DocStatus::Draft),
            1 => Ok(DocStatus::Submitted),
            2 => Ok(DocStatus::Cancelled),
            other => Err(format!("invalid docstatus {other}")),
        }
    }
}

/// Business status of a sales order.
///
/// Serialized as the ERP's display string ("On Hold", "To Bill", ...).
/// Statuses this job has no opinion on round-trip through [`OrderStatus::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    Draft,
    Submitted,
    ToDeliverAndBill,
    ToBill,
    ToDeliver,
    Completed,
    Closed,
    Cancelled,
    OnHold,
    Other(String),
}

impl OrderStatus {
    /// Statuses that are never auto-close candidates.
    pub const EXCLUDED: [OrderStatus; 3] =
        [OrderStatus::Closed, OrderStatus::Cancelled, OrderStatus::OnHold];

    pub fn as_str(&self) -> &str {
        match self {
            OrderStatus::Draft => "Draft",
            OrderStatus::Submitted => "Submitted",
            OrderStatus::ToDeliverAndBill => "To Deliver and Bill",
            OrderStatus::ToBill => "To Bill",
            OrderStatus::ToDeliver => "To Deliver",
            OrderStatus::Completed => "Completed",
            OrderStatus::Closed => "Closed",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::OnHold => "On Hold",
            OrderStatus::Other(s) => s,
        }
    }
}

impl From<&str> for OrderStatus {
    fn from(s: &str) -> Self {
        match s {
            "Draft" => OrderStatus::Draft,
            "Submitted" => OrderStatus::Submitted,
            "To Deliver and Bill" => OrderStatus::ToDeliverAndBill,
            "To Bill" => OrderStatus::ToBill,
            "To Deliver" => OrderStatus::ToDeliver,
            "Completed" => OrderStatus::Completed,
            "Closed" => OrderStatus::Closed,
            "Cancelled" => OrderStatus::Cancelled,
            "On Hold" => OrderStatus::OnHold,
            other => OrderStatus::Other(other.to_string()),
        }
    }
}

impl From<String> for OrderStatus {
    fn from(s: String) -> Self {
        OrderStatus::from(s.as_str())
    }
}

impl From<OrderStatus> for String {
    fn from(status: OrderStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sales order as stored by the ERP, limited to the fields this job reads.
///
/// The opt-in flag is persisted under the configured custom field name, so it
/// is not part of the serialized shape; [`SalesOrder::to_record`] places it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesOrder {
    pub name: String,
    pub transaction_date: NaiveDate,
    pub docstatus: DocStatus,
    pub status: OrderStatus,
    #[serde(skip)]
    pub autoclose: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<String>,
}

impl SalesOrder {
    /// A submitted order with the opt-in flag set.
    pub fn submitted(name: impl Into<String>, transaction_date: NaiveDate) -> Self {
        Self {
            name: name.into(),
            transaction_date,
            docstatus: DocStatus::Submitted,
            status: OrderStatus::ToDeliverAndBill,
            autoclose: true,
            customer: None,
        }
    }

    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_autoclose(mut self, autoclose: bool) -> Self {
        self.autoclose = autoclose;
        self
    }

    pub fn with_customer(mut self, customer: impl Into<String>) -> Self {
        self.customer = Some(customer.into());
        self
    }

    /// Render as a store record, writing the opt-in flag as 0/1 under `autoclose_field`.
    pub fn to_record(&self, autoclose_field: &str) -> serde_json::Map<String, serde_json::Value> {
        let mut record = match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        };
        record.insert(
            autoclose_field.to_string(),
            serde_json::Value::from(u8::from(self.autoclose)),
        );
        record
    }
}

/// An order that passed the eligibility scan and awaits the link guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub name: String,
    pub transaction_date: NaiveDate,
    #[serde(default)]
    pub customer: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn status_parses_display_strings() {
        assert_eq!(OrderStatus::from("On Hold"), OrderStatus::OnHold);
        assert_eq!(OrderStatus::from("To Deliver and Bill"), OrderStatus::ToDeliverAndBill);
        assert_eq!(
            OrderStatus::from("Partially Delivered"),
            OrderStatus::Other("Partially Delivered".into())
        );
        assert_eq!(OrderStatus::OnHold.to_string(), "On Hold");
    }

    #[test]
    fn excluded_statuses() {
        let excluded = OrderStatus::EXCLUDED;
        assert!(excluded.contains(&OrderStatus::Closed));
        assert!(excluded.contains(&OrderStatus::Cancelled));
        assert!(excluded.contains(&OrderStatus::OnHold));
        assert!(!excluded.contains(&OrderStatus::Submitted));
        assert!(!excluded.contains(&OrderStatus::Other("Closed ".into())));
    }

    #[test]
    fn docstatus_serializes_as_integer() {
        assert_eq!(serde_json::to_value(DocStatus::Submitted).unwrap(), 1);
        let parsed: DocStatus = serde_json::from_value(serde_json::json!(2)).unwrap();
        assert_eq!(parsed, DocStatus::Cancelled);
        assert!(serde_json::from_value::<DocStatus>(serde_json::json!(7)).is_err());
    }

    #[test]
    fn to_record_writes_erp_shape() {
        let order = SalesOrder::submitted("SO-0001", date(2025, 1, 15))
            .with_status(OrderStatus::OnHold)
            .with_customer("Acme");
        let record = order.to_record("autoclose_after_60_days");

        assert_eq!(record["name"], "SO-0001");
        assert_eq!(record["transaction_date"], "2025-01-15");
        assert_eq!(record["docstatus"], 1);
        assert_eq!(record["status"], "On Hold");
        assert_eq!(record["customer"], "Acme");
        assert_eq!(record["autoclose_after_60_days"], 1);
    }

    #[test]
    fn opted_out_order_writes_zero_flag() {
        let order = SalesOrder::submitted("SO-0002", date(2025, 1, 15)).with_autoclose(false);
        let record = order.to_record("autoclose_after_60_days");
        assert_eq!(record["autoclose_after_60_days"], 0);
        assert!(!record.contains_key("customer"));
    }
}
