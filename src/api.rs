//! API server for call-order-matcher.

use crate::config::Config;
use crate::error::AppError;
use crate::fetch::PlatformClient;
use crate::processor::{ComparisonReport, OrderWindow, run_comparison};
use crate::window::range_from_args;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::Semaphore;
use warp::{Filter, Rejection, Reply, http::StatusCode};

/// Upper bound on request bodies carrying raw snapshots.
const MAX_BODY_BYTES: u64 = 16 * 1024 * 1024;

/// Live comparisons allowed to run at once.
const MAX_LIVE_COMPARISONS: usize = 4;

/// API response structure
#[derive(Serialize)]
struct ApiResponse {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<ComparisonReport>,
}

/// Offline matching request: snapshots are supplied in the body.
#[derive(Deserialize)]
struct MatchRequest {
    #[serde(default)]
    calls: Vec<Value>,
    #[serde(default)]
    orders: Vec<Value>,
    from: Option<String>,
    to: Option<String>,
    legacy_order_window: Option<bool>,
}

/// Live comparison request: snapshots are fetched from the platforms.
#[derive(Deserialize, Default)]
struct CompareRequest {
    from: Option<String>,
    to: Option<String>,
    legacy_order_window: Option<bool>,
}

/// Custom rejection carrying the status and message to report.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl warp::reject::Reject for ApiError {}

fn reject(err: AppError) -> Rejection {
    let status = match &err {
        AppError::InvalidDate(_)
        | AppError::InvalidDateRange { .. }
        | AppError::InvalidRecordShape { .. } => StatusCode::BAD_REQUEST,
        AppError::Fetch(_) => StatusCode::BAD_GATEWAY,
        AppError::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    tracing::warn!(target: "api_task", "Request failed ({}): {}", status, err);
    warp::reject::custom(ApiError {
        status,
        message: err.to_string(),
    })
}

/// Builds the route tree.
pub(crate) fn routes(
    config: Arc<Config>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let config_filter = warp::any().map(move || config.clone());

    let semaphore = Arc::new(Semaphore::new(MAX_LIVE_COMPARISONS));
    let semaphore_filter = warp::any().map(move || semaphore.clone());

    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| {
            warp::reply::json(&ApiResponse {
                success: true,
                message: "Call/order matcher API is running".to_string(),
                report: None,
            })
        });

    let match_route = warp::path("match")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(config_filter.clone())
        .and_then(handle_match);

    let compare = warp::path("compare")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(config_filter)
        .and(semaphore_filter)
        .and_then(handle_compare);

    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["GET", "POST"])
        .allow_header("content-type");

    health
        .or(match_route)
        .or(compare)
        .with(cors)
        .recover(handle_rejection)
}

/// Start the API server
pub(crate) async fn start_api_server(port: u16, config: Config) {
    tracing::info!(target: "api_task", "Starting API server on port {}", port);
    warp::serve(routes(Arc::new(config)))
        .run(([0, 0, 0, 0], port))
        .await;
}

fn success(report: ComparisonReport) -> warp::reply::Json {
    warp::reply::json(&ApiResponse {
        success: true,
        message: format!("Found {} matches", report.matches.len()),
        report: Some(report),
    })
}

/// Handle an offline matching request
async fn handle_match(req: MatchRequest, config: Arc<Config>) -> Result<impl Reply, Rejection> {
    tracing::info!(target: "api_task",
        "Matching {} supplied calls against {} supplied orders",
        req.calls.len(), req.orders.len()
    );
    let range =
        range_from_args(req.from.as_deref(), req.to.as_deref(), config.days_back).map_err(reject)?;
    let window = OrderWindow::from_legacy_flag(
        req.legacy_order_window.unwrap_or(config.legacy_order_window),
    );
    let report = run_comparison(&req.calls, &req.orders, &range, window).map_err(reject)?;
    Ok(success(report))
}

/// Handle a live comparison request
async fn handle_compare(
    req: CompareRequest,
    config: Arc<Config>,
    semaphore: Arc<Semaphore>,
) -> Result<impl Reply, Rejection> {
    let range =
        range_from_args(req.from.as_deref(), req.to.as_deref(), config.days_back).map_err(reject)?;
    let client = PlatformClient::from_config(&config).map_err(reject)?;

    let _permit = semaphore.acquire().await.map_err(|_| {
        reject(AppError::Generic(anyhow::anyhow!("comparison limiter closed")))
    })?;

    tracing::info!(target: "api_task", "Processing live comparison request");
    let snapshot = client
        .fetch_snapshot()
        .await
        .map_err(|e| reject(AppError::Fetch(e)))?;
    let window = OrderWindow::from_legacy_flag(
        req.legacy_order_window.unwrap_or(config.legacy_order_window),
    );
    let report =
        run_comparison(&snapshot.calls, &snapshot.orders, &range, window).map_err(reject)?;
    Ok(success(report))
}

fn error_reply(status: StatusCode, message: String) -> warp::reply::WithStatus<warp::reply::Json> {
    warp::reply::with_status(
        warp::reply::json(&ApiResponse {
            success: false,
            message,
            report: None,
        }),
        status,
    )
}

/// Handle API rejections
async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    if err.is_not_found() {
        Ok(error_reply(StatusCode::NOT_FOUND, "Not Found".to_string()))
    } else if let Some(api_error) = err.find::<ApiError>() {
        Ok(error_reply(api_error.status, api_error.message.clone()))
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        Ok(error_reply(StatusCode::BAD_REQUEST, format!("Invalid request body: {}", e)))
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        Ok(error_reply(
            StatusCode::PAYLOAD_TOO_LARGE,
            "Request body too large".to_string(),
        ))
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        Ok(error_reply(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Expected an application/json body".to_string(),
        ))
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        Ok(error_reply(
            StatusCode::METHOD_NOT_ALLOWED,
            "Method not allowed".to_string(),
        ))
    } else {
        Ok(error_reply(StatusCode::BAD_REQUEST, "Bad request".to_string()))
    }
}
