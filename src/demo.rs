//! Built-in demonstration against an in-memory store.
//!
//! Seeds one order per interesting case and runs the real job over it.

use chrono::{Days, NaiveDate};

use crate::domain::{OrderStatus, SalesOrder};
use crate::job::JobSettings;
use crate::store::MemoryStore;

/// Store with sample orders dated relative to `today`.
///
/// - `SO-DEMO-001`, `SO-DEMO-002`: inactive and unlinked, closed
/// - `SO-DEMO-003`: has a delivery note, skipped
/// - `SO-DEMO-004`: inside the window
/// - `SO-DEMO-005`: not opted in
/// - `SO-DEMO-006`: on hold
/// - `SO-DEMO-007`: eligible, but the store rejects its update
///
/// "Work Order" is left unregistered so every link guard pass logs a failed
/// lookup and carries on.
pub fn seed_store(settings: &JobSettings, today: NaiveDate) -> MemoryStore {
    let ago = |days: u32| {
        today
            .checked_sub_days(Days::new(u64::from(days)))
            .unwrap_or(today)
    };
    let stale = ago(settings.days.saturating_add(15));

    let orders = [
        SalesOrder::submitted("SO-DEMO-001", stale).with_customer("Acme Corp"),
        SalesOrder::submitted("SO-DEMO-002", ago(settings.days))
            .with_status(OrderStatus::ToBill)
            .with_customer("Globex"),
        SalesOrder::submitted("SO-DEMO-003", stale).with_customer("Initech"),
        SalesOrder::submitted("SO-DEMO-004", ago(settings.days.saturating_sub(1))),
        SalesOrder::submitted("SO-DEMO-005", stale).with_autoclose(false),
        SalesOrder::submitted("SO-DEMO-006", stale).with_status(OrderStatus::OnHold),
        SalesOrder::submitted("SO-DEMO-007", stale).with_customer("Umbrella"),
    ];

    let store = MemoryStore::new();
    for order in &orders {
        store.insert_order(&settings.order_doctype, order, &settings.autoclose_field);
    }
    for kind in &settings.link_kinds {
        if kind.doctype != "Work Order" {
            store.register_doctype(&kind.doctype);
        }
    }
    if let Some(first) = settings.link_kinds.first() {
        store.insert_link(&first.doctype, "DN-DEMO-001", &first.link_field, "SO-DEMO-003");
    }
    store.fail_updates_for("SO-DEMO-007");
    store
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::job::{RunOutcome, run_auto_close};

    #[tokio::test]
    async fn demo_covers_each_case() {
        let settings = JobSettings::default();
        let today = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();
        let store = seed_store(&settings, today);

        let report = run_auto_close(&store, &store, &FixedClock(today), &settings).await;

        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(report.candidates, vec!["SO-DEMO-001", "SO-DEMO-002", "SO-DEMO-003", "SO-DEMO-007"]);
        assert_eq!(report.closed, vec!["SO-DEMO-001", "SO-DEMO-002"]);
        assert_eq!(report.skipped[0].name, "SO-DEMO-003");
        assert_eq!(report.failures[0].name, "SO-DEMO-007");
        assert_eq!(report.exit_code(), 2);
    }
}
