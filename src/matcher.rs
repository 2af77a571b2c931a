//! Cross-references call contacts against orders.

use crate::extract::{CallContact, OrderContact};
use crate::records::RawOrderRecord;
use serde::Serialize;

/// Which identifier linked a call to an order.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub(crate) enum MatchedOn {
    Email,
    Phone,
    EmailAndPhone,
}

impl MatchedOn {
    fn from_flags(email: bool, phone: bool) -> Option<Self> {
        match (email, phone) {
            (true, true) => Some(Self::EmailAndPhone),
            (true, false) => Some(Self::Email),
            (false, true) => Some(Self::Phone),
            (false, false) => None,
        }
    }

    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Phone => "phone",
            Self::EmailAndPhone => "email_and_phone",
        }
    }
}

/// One (call, order) pair sharing a non-empty normalized email or phone.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub(crate) struct MatchRecord {
    pub call_id: Option<String>,
    pub call_email: Option<String>,
    pub call_phone: Option<String>,
    pub order_id: Option<String>,
    pub order_email: String,
    pub order_phone: String,
    pub customer_name: String,
    pub matched_on: MatchedOn,
}

/// Matches every call against every order.
///
/// Output is grouped by order in input order, then by call in input order.
/// A call or order may appear in several records; nothing is deduplicated.
pub(crate) fn compare(calls: &[CallContact], orders: &[RawOrderRecord]) -> Vec<MatchRecord> {
    let mut matches = Vec::new();

    for order in orders {
        let contact = OrderContact::from_record(order);

        for call in calls {
            let email_hit = call
                .email
                .as_deref()
                .is_some_and(|email| !email.is_empty() && email == contact.email);
            let phone_hit = call
                .phone
                .as_deref()
                .is_some_and(|phone| !phone.is_empty() && phone == contact.phone);

            let Some(matched_on) = MatchedOn::from_flags(email_hit, phone_hit) else {
                continue;
            };

            tracing::trace!(
                "Call {:?} matched order {:?} on {}",
                call.call_id,
                order.name,
                matched_on.as_str()
            );
            matches.push(MatchRecord {
                call_id: call.call_id.clone(),
                call_email: call.email.clone(),
                call_phone: call.phone.clone(),
                order_id: order.name.clone(),
                order_email: contact.email.clone(),
                order_phone: contact.phone.clone(),
                customer_name: order.customer_name(),
                matched_on,
            });
        }
    }

    matches
}
