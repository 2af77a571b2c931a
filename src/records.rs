//! Typed projections of the raw call and order records.
//!
//! Platform payloads are loosely shaped JSON. Each record is projected once,
//! here, into a struct of optional fields; a field that is missing, `null`, or of
//! the wrong JSON type is treated as absent. Only a record that is not an object
//! at all is rejected.

use crate::error::{AppError, Result};
use serde_json::{Map, Value};

/// Key of the call-level map holding variables injected into the voice agent.
const DYNAMIC_VARIABLES_KEY: &str = "retell_llm_dynamic_variables";

/// The fields of a calling-platform record that matching consumes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct RawCallRecord {
    pub call_id: Option<String>,
    /// Milliseconds since the Unix epoch.
    pub start_timestamp: Option<i64>,
    pub to_number: Option<String>,
    /// The `email` entry of the dynamic-variables map.
    pub dynamic_email: Option<String>,
}

/// Nested customer object of an order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct RawCustomer {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// The fields of a storefront order that matching consumes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct RawOrderRecord {
    /// Display id such as `#1001`.
    pub name: Option<String>,
    pub created_at: Option<String>,
    pub email: Option<String>,
    pub contact_email: Option<String>,
    pub phone: Option<String>,
    pub customer: Option<RawCustomer>,
}

impl RawCallRecord {
    pub(crate) fn from_value(value: &Value, index: usize) -> Result<Self> {
        let obj = as_object(value, "call", index)?;
        let dynamic_email = obj
            .get(DYNAMIC_VARIABLES_KEY)
            .and_then(Value::as_object)
            .and_then(|vars| text_field(vars, "email"));

        Ok(Self {
            call_id: text_field(obj, "call_id"),
            start_timestamp: obj.get("start_timestamp").and_then(epoch_millis),
            to_number: text_field(obj, "to_number"),
            dynamic_email,
        })
    }
}

impl RawCustomer {
    fn from_map(obj: &Map<String, Value>) -> Self {
        Self {
            email: text_field(obj, "email"),
            phone: text_field(obj, "phone"),
            first_name: text_field(obj, "first_name"),
            last_name: text_field(obj, "last_name"),
        }
    }
}

impl RawOrderRecord {
    pub(crate) fn from_value(value: &Value, index: usize) -> Result<Self> {
        let obj = as_object(value, "order", index)?;
        Ok(Self {
            name: text_field(obj, "name"),
            created_at: text_field(obj, "created_at"),
            email: text_field(obj, "email"),
            contact_email: text_field(obj, "contact_email"),
            phone: text_field(obj, "phone"),
            customer: obj
                .get("customer")
                .and_then(Value::as_object)
                .map(RawCustomer::from_map),
        })
    }

    /// The order-level email, falling back to `contact_email` when the primary
    /// field is absent or empty.
    pub(crate) fn primary_email(&self) -> Option<&str> {
        non_empty(self.email.as_deref()).or_else(|| non_empty(self.contact_email.as_deref()))
    }

    pub(crate) fn customer_email(&self) -> Option<&str> {
        self.customer.as_ref().and_then(|c| c.email.as_deref())
    }

    pub(crate) fn customer_phone(&self) -> Option<&str> {
        self.customer.as_ref().and_then(|c| c.phone.as_deref())
    }

    /// First and last name joined by a single space; missing parts are empty.
    pub(crate) fn customer_name(&self) -> String {
        let (first, last) = match &self.customer {
            Some(c) => (
                c.first_name.as_deref().unwrap_or(""),
                c.last_name.as_deref().unwrap_or(""),
            ),
            None => ("", ""),
        };
        format!("{} {}", first, last)
    }
}

/// Projects a list of raw call values, failing on the first non-object entry.
pub(crate) fn project_calls(values: &[Value]) -> Result<Vec<RawCallRecord>> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| RawCallRecord::from_value(v, i))
        .collect()
}

/// Projects a list of raw order values, failing on the first non-object entry.
pub(crate) fn project_orders(values: &[Value]) -> Result<Vec<RawOrderRecord>> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| RawOrderRecord::from_value(v, i))
        .collect()
}

pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

fn as_object<'a>(
    value: &'a Value,
    kind: &'static str,
    index: usize,
) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or(AppError::InvalidRecordShape { kind, index })
}

fn text_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Accepts integer or float epoch values; anything else is absent.
fn epoch_millis(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_call_projection_reads_nested_email() {
        let raw = json!({
            "call_id": "c1",
            "start_timestamp": 1_704_067_200_000_i64,
            "to_number": "98-765-43210",
            "retell_llm_dynamic_variables": { "email": "jane@shop.com" },
            "transcript": "ignored"
        });
        let call = RawCallRecord::from_value(&raw, 0).unwrap();
        assert_eq!(call.call_id.as_deref(), Some("c1"));
        assert_eq!(call.start_timestamp, Some(1_704_067_200_000));
        assert_eq!(call.to_number.as_deref(), Some("98-765-43210"));
        assert_eq!(call.dynamic_email.as_deref(), Some("jane@shop.com"));
    }

    #[test]
    fn test_call_projection_tolerates_missing_and_mistyped_fields() {
        let raw = json!({
            "start_timestamp": null,
            "to_number": 5550100,
            "retell_llm_dynamic_variables": null
        });
        let call = RawCallRecord::from_value(&raw, 0).unwrap();
        assert_eq!(call, RawCallRecord::default());

        let float_ts = json!({ "start_timestamp": 1_704_067_200_000.0 });
        assert_eq!(
            RawCallRecord::from_value(&float_ts, 0).unwrap().start_timestamp,
            Some(1_704_067_200_000)
        );
    }

    #[test]
    fn test_order_projection_and_accessors() {
        let raw = json!({
            "name": "#1001",
            "created_at": "2024-01-02T10:00:00-05:00",
            "email": "",
            "contact_email": "Jane@Shop.com",
            "customer": { "phone": "555 0100", "first_name": "Jane", "last_name": null }
        });
        let order = RawOrderRecord::from_value(&raw, 0).unwrap();
        assert_eq!(order.name.as_deref(), Some("#1001"));
        assert_eq!(order.primary_email(), Some("Jane@Shop.com"));
        assert_eq!(order.customer_phone(), Some("555 0100"));
        assert_eq!(order.customer_email(), None);
        assert_eq!(order.customer_name(), "Jane ");
    }

    #[test]
    fn test_order_customer_null_is_absent() {
        let order = RawOrderRecord::from_value(&json!({ "customer": null }), 0).unwrap();
        assert!(order.customer.is_none());
        assert_eq!(order.customer_name(), " ");
    }

    #[test]
    fn test_non_object_record_is_rejected() {
        let err = project_orders(&[json!({}), json!("oops")]).unwrap_err();
        assert!(matches!(
            err,
            AppError::InvalidRecordShape { kind: "order", index: 1 }
        ));
        assert!(project_calls(&[json!([1, 2])]).is_err());
        assert!(project_calls(&[]).unwrap().is_empty());
    }
}
