//! Error types for listen-harvest
//!
//! Every failure the pipeline can surface is a variant of [`Error`]. Throttling
//! (HTTP 429) never shows up here: the fetcher absorbs it by sleeping and
//! resubmitting the request.

use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde_json::Value;
use thiserror::Error;

/// Result type alias for listen-harvest operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for listen-harvest
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "pipeline.batch_size")
        key: Option<String>,
    },

    /// The API answered with a non-success status while strict checking was on
    #[error("HTTP {status} from {url}: {body}")]
    Status {
        /// Response status code
        status: StatusCode,
        /// URL of the request that failed
        url: String,
        /// Response headers, kept for diagnosing the failure
        headers: HeaderMap,
        /// Response body as text
        body: String,
    },

    /// A 429 response did not carry a usable integer `retry-after` header
    #[error("unusable retry-after header: {0}")]
    RetryAfter(String),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A response or record did not have the expected structure
    #[error("unexpected shape: {message}")]
    Shape {
        /// What was expected and what was found instead
        message: String,
        /// The offending payload
        payload: Value,
    },

    /// A feature lookup returned a different number of vectors than ids submitted
    #[error("feature batch misaligned: submitted {expected} ids, received {actual} vectors")]
    Misaligned {
        /// Number of records in the batch
        expected: usize,
        /// Number of feature vectors returned
        actual: usize,
    },

    /// Authorization error (bad token, missing access_token, unknown scope)
    #[error("authorization error: {0}")]
    Auth(String),
}

impl Error {
    /// Build a [`Error::Shape`] from a message and the payload that violated it
    pub fn shape(message: impl Into<String>, payload: Value) -> Self {
        Error::Shape {
            message: message.into(),
            payload,
        }
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Status { status, .. } => Some(*status),
            Error::Network(e) => e.status(),
            _ => None,
        }
    }
}
