//! Contact extraction from projected call and order records.

use crate::normalize::{normalize_email, normalize_phone};
use crate::records::{RawCallRecord, RawOrderRecord, non_empty};
use crate::window::DateRange;
use serde::Serialize;
use std::collections::BTreeSet;

/// Normalized contact identifiers of one call.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub(crate) struct CallContact {
    pub call_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Normalized contact identifiers of one order, used directly for matching.
///
/// Missing values are empty strings; the matcher never treats an empty value
/// as a match target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OrderContact {
    pub email: String,
    pub phone: String,
}

/// Union of normalized identifiers across a set of orders.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ContactSet {
    pub emails: BTreeSet<String>,
    pub phones: BTreeSet<String>,
}

impl OrderContact {
    /// Email from `email` then `contact_email`; phone from the order `phone`
    /// then the customer's phone.
    pub(crate) fn from_record(order: &RawOrderRecord) -> Self {
        let phone = non_empty(order.phone.as_deref()).or_else(|| non_empty(order.customer_phone()));
        Self {
            email: normalize_email(order.primary_email()).unwrap_or_default(),
            phone: normalize_phone(phone).unwrap_or_default(),
        }
    }
}

impl ContactSet {
    pub(crate) fn contains_email(&self, email: &str) -> bool {
        self.emails.contains(email)
    }

    pub(crate) fn contains_phone(&self, phone: &str) -> bool {
        self.phones.contains(phone)
    }
}

/// Returns whether an order falls in the window. Orders without `created_at`
/// are kept.
pub(crate) fn order_in_window(order: &RawOrderRecord, range: &DateRange) -> bool {
    match non_empty(order.created_at.as_deref()) {
        Some(created_at) => range.date_in_range(Some(created_at)),
        None => true,
    }
}

/// Returns whether a call falls in the window. Calls without a start
/// timestamp are kept.
pub(crate) fn call_in_window(call: &RawCallRecord, range: &DateRange) -> bool {
    match call.start_timestamp {
        Some(ts) => range.timestamp_in_range(ts),
        None => true,
    }
}

/// Maps in-window calls to their normalized contacts, preserving input order.
pub(crate) fn extract_call_contacts(calls: &[RawCallRecord], range: &DateRange) -> Vec<CallContact> {
    let contacts: Vec<CallContact> = calls
        .iter()
        .filter(|call| call_in_window(call, range))
        .map(|call| CallContact {
            call_id: call.call_id.clone(),
            email: normalize_email(call.dynamic_email.as_deref()),
            phone: normalize_phone(call.to_number.as_deref()),
        })
        .collect();

    tracing::debug!(
        "Extracted {} of {} calls inside {} ..= {}",
        contacts.len(),
        calls.len(),
        range.start(),
        range.end()
    );
    contacts
}

/// Collects every normalized email and phone found on in-window orders,
/// including the nested customer fields.
pub(crate) fn extract_order_contacts(orders: &[RawOrderRecord], range: &DateRange) -> ContactSet {
    let mut set = ContactSet::default();
    for order in orders.iter().filter(|o| order_in_window(o, range)) {
        if let Some(email) = normalize_email(order.primary_email()) {
            set.emails.insert(email);
        }
        if let Some(phone) = normalize_phone(order.phone.as_deref()) {
            set.phones.insert(phone);
        }
        if let Some(email) = normalize_email(order.customer_email()) {
            set.emails.insert(email);
        }
        if let Some(phone) = normalize_phone(order.customer_phone()) {
            set.phones.insert(phone);
        }
    }
    tracing::debug!(
        "Order contact set holds {} emails and {} phones",
        set.emails.len(),
        set.phones.len()
    );
    set
}
