//! Fetches call and order snapshots from the two platforms.

use crate::config::Config;
use crate::error::{AppError, FetchError, Result};
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;

const RETELL: &str = "Retell";
const SHOPIFY: &str = "Shopify";

/// Credentials and endpoints for a live fetch, all present.
#[derive(Clone)]
struct Endpoints {
    retell_url: String,
    retell_key: String,
    shopify_url: String,
    shopify_key: String,
    shopify_password: String,
}

/// HTTP client for the calling platform and the storefront.
#[derive(Clone)]
pub(crate) struct PlatformClient {
    http_client: Arc<Client>,
    endpoints: Endpoints,
}

/// One fetched pair of raw snapshots.
#[derive(Debug, Clone, Default)]
pub(crate) struct Snapshot {
    pub calls: Vec<Value>,
    pub orders: Vec<Value>,
}

impl PlatformClient {
    /// Builds a client from the configuration, failing when an endpoint or
    /// credential needed for a live fetch is missing.
    pub(crate) fn from_config(config: &Config) -> Result<Self> {
        let mut missing = Vec::new();
        if config.retell_api_key.is_none() {
            missing.push("retell api key");
        }
        if config.shopify_orders_url.is_none() {
            missing.push("shopify orders url");
        }
        if config.shopify_api_key.is_none() {
            missing.push("shopify api key");
        }
        if config.shopify_password.is_none() {
            missing.push("shopify password");
        }
        if !missing.is_empty() {
            return Err(AppError::Config(format!("Missing {}", missing.join(", "))));
        }

        let http_client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AppError::HttpClient(e.to_string()))?;

        Ok(Self {
            http_client: Arc::new(http_client),
            endpoints: Endpoints {
                retell_url: config.retell_api_url.clone(),
                retell_key: config.retell_api_key.clone().unwrap_or_default(),
                shopify_url: config.shopify_orders_url.clone().unwrap_or_default(),
                shopify_key: config.shopify_api_key.clone().unwrap_or_default(),
                shopify_password: config.shopify_password.clone().unwrap_or_default(),
            },
        })
    }

    /// Lists calls: `POST` with a bearer token and an empty JSON body.
    pub(crate) async fn fetch_calls(&self) -> std::result::Result<Vec<Value>, FetchError> {
        tracing::debug!(target: "fetch_task", "POST {}", self.endpoints.retell_url);
        let response = self
            .http_client
            .post(&self.endpoints.retell_url)
            .bearer_auth(&self.endpoints.retell_key)
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|source| FetchError::Request { platform: RETELL, source })?;

        let body = read_json(RETELL, response).await?;
        let calls = calls_from_payload(body)?;
        tracing::info!(target: "fetch_task", "Fetched {} calls", calls.len());
        Ok(calls)
    }

    /// Lists orders: `GET` with basic auth.
    pub(crate) async fn fetch_orders(&self) -> std::result::Result<Vec<Value>, FetchError> {
        tracing::debug!(target: "fetch_task", "GET {}", self.endpoints.shopify_url);
        let response = self
            .http_client
            .get(&self.endpoints.shopify_url)
            .basic_auth(
                &self.endpoints.shopify_key,
                Some(&self.endpoints.shopify_password),
            )
            .send()
            .await
            .map_err(|source| FetchError::Request { platform: SHOPIFY, source })?;

        let body = read_json(SHOPIFY, response).await?;
        let orders = orders_from_payload(body)?;
        tracing::info!(target: "fetch_task", "Fetched {} orders", orders.len());
        Ok(orders)
    }

    /// Fetches both platforms concurrently.
    pub(crate) async fn fetch_snapshot(&self) -> std::result::Result<Snapshot, FetchError> {
        let (calls, orders) = futures::try_join!(self.fetch_calls(), self.fetch_orders())?;
        Ok(Snapshot { calls, orders })
    }
}

async fn read_json(
    platform: &'static str,
    response: reqwest::Response,
) -> std::result::Result<Value, FetchError> {
    let status = response.status();
    if !status.is_success() {
        tracing::warn!(target: "fetch_task", "{} answered HTTP {}", platform, status);
        return Err(FetchError::Status { platform, status });
    }
    response
        .json::<Value>()
        .await
        .map_err(|source| FetchError::Parse { platform, source })
}

/// Accepts a bare array of calls or an object carrying a `calls` array.
/// An object without `calls` is an empty snapshot.
pub(crate) fn calls_from_payload(payload: Value) -> std::result::Result<Vec<Value>, FetchError> {
    match payload {
        Value::Array(calls) => Ok(calls),
        Value::Object(mut obj) => list_field(RETELL, obj.remove("calls"), "calls"),
        other => Err(FetchError::UnexpectedPayload {
            platform: RETELL,
            detail: format!("expected an array or object, got {}", json_kind(&other)),
        }),
    }
}

/// Accepts an object carrying an `orders` array. An object without `orders`
/// is an empty snapshot.
pub(crate) fn orders_from_payload(payload: Value) -> std::result::Result<Vec<Value>, FetchError> {
    match payload {
        Value::Object(mut obj) => list_field(SHOPIFY, obj.remove("orders"), "orders"),
        other => Err(FetchError::UnexpectedPayload {
            platform: SHOPIFY,
            detail: format!("expected an object, got {}", json_kind(&other)),
        }),
    }
}

fn list_field(
    platform: &'static str,
    field: Option<Value>,
    key: &str,
) -> std::result::Result<Vec<Value>, FetchError> {
    match field {
        None | Some(Value::Null) => {
            tracing::warn!(target: "fetch_task", "{} response has no '{}' list", platform, key);
            Ok(Vec::new())
        }
        Some(Value::Array(items)) => Ok(items),
        Some(other) => Err(FetchError::UnexpectedPayload {
            platform,
            detail: format!("'{}' should be an array, got {}", key, json_kind(&other)),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
