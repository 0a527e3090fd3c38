use serde::{Deserialize, Serialize};

/// A downstream document kind whose existence blocks auto-close.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkKind {
    /// Doctype of the downstream document (e.g. "Delivery Note").
    pub doctype: String,
    /// Field on that doctype holding the sales order name.
    pub link_field: String,
}

impl LinkKind {
    pub fn new(doctype: impl Into<String>, link_field: impl Into<String>) -> Self {
        Self {
            doctype: doctype.into(),
            link_field: link_field.into(),
        }
    }

    /// The four linked kinds in check order: delivery note, invoice, work order, stock entry.
    ///
    /// The order decides which kind is reported when several block the same order.
    pub fn defaults() -> Vec<LinkKind> {
        vec![
            LinkKind::new("Delivery Note", "against_sales_order"),
            LinkKind::new("Sales Invoice", "sales_order"),
            LinkKind::new("Work Order", "sales_order"),
            LinkKind::new("Stock Entry", "sales_order"),
        ]
    }
}
