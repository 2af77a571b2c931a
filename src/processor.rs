//! Runs one comparison over a snapshot of calls and orders.

use crate::error::Result;
use crate::extract::{ContactSet, extract_call_contacts, extract_order_contacts, order_in_window};
use crate::matcher::{MatchRecord, compare};
use crate::records::{RawOrderRecord, project_calls, project_orders};
use crate::window::DateRange;
use serde::Serialize;
use serde_json::Value;

/// How the date window applies to orders on the matching path.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub(crate) enum OrderWindow {
    /// Orders outside the window are dropped before matching.
    Filtered,
    /// Every fetched order is matched; the window only shapes the contact set.
    Legacy,
}

impl OrderWindow {
    pub(crate) fn from_legacy_flag(legacy: bool) -> Self {
        if legacy { Self::Legacy } else { Self::Filtered }
    }
}

/// Everything one comparison run produced.
#[derive(Serialize, Debug, Clone)]
pub(crate) struct ComparisonReport {
    pub date_range: DateRange,
    pub order_window: OrderWindow,
    pub calls_fetched: usize,
    pub calls_in_range: usize,
    /// In-range calls whose email or phone appears anywhere in `order_contacts`.
    pub calls_with_known_contact: usize,
    pub orders_fetched: usize,
    pub orders_matched_against: usize,
    pub order_contacts: ContactSet,
    pub matches: Vec<MatchRecord>,
}

/// Projects the raw snapshots, extracts contacts, and matches them.
///
/// Fails only if a record is not a JSON object.
pub(crate) fn run_comparison(
    raw_calls: &[Value],
    raw_orders: &[Value],
    range: &DateRange,
    order_window: OrderWindow,
) -> Result<ComparisonReport> {
    let calls = project_calls(raw_calls)?;
    let orders = project_orders(raw_orders)?;

    tracing::info!(target: "compare_task",
        "Comparing {} calls with {} orders for {} ..= {}",
        calls.len(), orders.len(), range.start(), range.end()
    );

    let call_contacts = extract_call_contacts(&calls, range);
    let order_contacts = extract_order_contacts(&orders, range);

    let calls_with_known_contact = call_contacts
        .iter()
        .filter(|c| {
            c.email.as_deref().is_some_and(|e| order_contacts.contains_email(e))
                || c.phone.as_deref().is_some_and(|p| order_contacts.contains_phone(p))
        })
        .count();

    let candidates: Vec<RawOrderRecord> = match order_window {
        OrderWindow::Filtered => orders
            .iter()
            .filter(|o| order_in_window(o, range))
            .cloned()
            .collect(),
        OrderWindow::Legacy => orders.clone(),
    };

    let matches = compare(&call_contacts, &candidates);

    if matches.is_empty() {
        tracing::warn!(target: "compare_task",
            "No matching data found. Double-check the API responses or the date range."
        );
    } else {
        tracing::info!(target: "compare_task", "Found {} matches", matches.len());
    }

    Ok(ComparisonReport {
        date_range: *range,
        order_window,
        calls_fetched: calls.len(),
        calls_in_range: call_contacts.len(),
        calls_with_known_contact,
        orders_fetched: orders.len(),
        orders_matched_against: candidates.len(),
        order_contacts,
        matches,
    })
}
