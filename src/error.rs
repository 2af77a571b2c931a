//! Defines the custom error types for the call-order-matcher application.

use std::io;
use thiserror::Error;

/// The primary error type for a comparison run.
#[derive(Error, Debug)]
pub(crate) enum AppError {
    /// Error occurring during configuration loading or validation.
    #[error("Configuration Error: {0}")]
    Config(String),

    /// Error related to file input/output operations.
    #[error("IO Error: {0}")]
    Io(#[from] io::Error),

    /// Error during JSON serialization or deserialization.
    #[error("JSON Error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error building the shared HTTP client.
    #[error("HTTP Client Error: {0}")]
    HttpClient(String),

    /// One of the platform fetches failed.
    #[error("Fetch Error: {0}")]
    Fetch(#[from] FetchError),

    /// A record in an input list was not a JSON object.
    #[error("Invalid {kind} record shape at index {index}: expected a JSON object")]
    InvalidRecordShape {
        /// Which list the record came from ("call" or "order").
        kind: &'static str,
        /// Position of the offending record in its list.
        index: usize,
    },

    /// The lower bound of a date range is after its upper bound.
    #[error("Invalid date range: {start} is after {end}")]
    InvalidDateRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    /// A date argument could not be parsed as YYYY-MM-DD.
    #[error("Invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),

    /// An underlying error that doesn't fit other categories, using anyhow.
    #[error("Generic Error: {0}")]
    Generic(#[from] anyhow::Error),
}

/// Outcome of a failed platform fetch.
///
/// An empty snapshot is not an error: a well-formed response without records
/// comes back as `Ok(vec![])`.
#[derive(Error, Debug)]
pub(crate) enum FetchError {
    /// The request could not be sent or the connection failed.
    #[error("{platform} request failed: {source}")]
    Request {
        platform: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The platform answered with a non-success status.
    #[error("{platform} returned HTTP {status}")]
    Status {
        platform: &'static str,
        status: reqwest::StatusCode,
    },

    /// The response body was not valid JSON.
    #[error("{platform} response could not be parsed: {source}")]
    Parse {
        platform: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The response was JSON but not in a recognised shape.
    #[error("{platform} response had an unexpected shape: {detail}")]
    UnexpectedPayload {
        platform: &'static str,
        detail: String,
    },
}

pub(crate) type Result<T> = std::result::Result<T, AppError>;
