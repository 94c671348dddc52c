//! Bounded HTTP fetch and response normalization
//!
//! Every upstream call in the application goes through this module: a single
//! attempt with a hard timeout and optional external cancellation
//! ([`bounded_fetch`]), wrapped by [`fetch_json`] which turns every possible
//! outcome (success, HTTP error, transport failure, timeout) into a uniform
//! [`ApiResponse`] so callers never see raw transport errors.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Default hard timeout for a single upstream request
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Errors that can terminate a bounded fetch
#[derive(Debug, Error)]
pub enum FetchError {
    /// The internal timeout fired before any response arrived
    #[error("request timed out")]
    TimedOut,

    /// The caller-supplied cancellation token fired first
    #[error("request cancelled")]
    Cancelled,

    /// DNS, connection or other transport-level failure
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Structured error carried by a normalized response.
///
/// Upstream error bodies keep their individual field messages; flattening to
/// a single comma-separated string happens only at the display boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The bounded fetch was cancelled, by timeout or external signal (504)
    Timeout,
    /// Transport-level failure distinct from timeout (500)
    Network,
    /// A 2xx body that did not match the expected schema (500)
    Decode(String),
    /// Non-2xx upstream status, with the error body's field values
    Upstream(Vec<String>),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Timeout => write!(f, "Request Timeout"),
            ApiError::Network => write!(f, "Network error"),
            ApiError::Decode(message) => write!(f, "Invalid response body: {message}"),
            ApiError::Upstream(messages) => write!(f, "{}", messages.join(", ")),
        }
    }
}

/// Uniform tri-field result of a normalized upstream call.
///
/// Exactly one of `data` / `error` is populated for any terminal state, and
/// `status` always reflects the outcome class (2xx success, upstream status
/// on HTTP errors, 500 for transport failures, 504 for timeouts).
///
/// Serializes to the wire shape `{ data?: T, error: string | null, status }`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(serialize_with = "error_as_text")]
    pub error: Option<ApiError>,
    pub status: u16,
}

impl<T> ApiResponse<T> {
    /// Successful response carrying decoded data
    pub fn success(data: T, status: u16) -> Self {
        Self {
            data: Some(data),
            error: None,
            status,
        }
    }

    /// Failed response carrying a structured error
    pub fn failure(error: ApiError, status: u16) -> Self {
        Self {
            data: None,
            error: Some(error),
            status,
        }
    }

    /// True if the upstream explicitly signalled "no such resource"
    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    /// The flattened error message, if this response failed
    pub fn error_text(&self) -> Option<String> {
        self.error.as_ref().map(ApiError::to_string)
    }
}

/// Serializes the structured error as the flat `string | null` wire field
fn error_as_text<S: Serializer>(error: &Option<ApiError>, serializer: S) -> Result<S::Ok, S::Error> {
    match error {
        Some(error) => serializer.serialize_some(&error.to_string()),
        None => serializer.serialize_none(),
    }
}

/// Issues a single request, guaranteed to terminate within `timeout`.
///
/// Two independent triggers can cancel the in-flight call: the internal
/// timer and the optional caller-supplied `cancel` token. Whichever fires
/// first wins; the losing futures (including the request itself) are dropped
/// on every exit path, which aborts the underlying connection and releases
/// the timer. No retry is attempted.
pub async fn bounded_fetch(
    client: &Client,
    request: reqwest::Request,
    timeout: Duration,
    cancel: Option<&CancellationToken>,
) -> Result<reqwest::Response, FetchError> {
    let call = client.execute(request);
    tokio::pin!(call);

    let external = async {
        match cancel {
            Some(token) => token.cancelled().await,
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        result = &mut call => Ok(result?),
        _ = tokio::time::sleep(timeout) => Err(FetchError::TimedOut),
        _ = external => Err(FetchError::Cancelled),
    }
}

/// Fetches `url` and normalizes every outcome into an [`ApiResponse`].
///
/// This function never fails: timeouts and cancellations map to 504, other
/// transport errors to 500, non-2xx statuses to an [`ApiError::Upstream`]
/// built from the JSON error body's field values (falling back to
/// `HTTP <status>` when the body is not a JSON object), and a 2xx body is
/// decoded as `T`, with decode failures flagged instead of propagated.
pub async fn fetch_json<T: DeserializeOwned>(
    client: &Client,
    url: &str,
    timeout: Duration,
    cancel: Option<&CancellationToken>,
) -> ApiResponse<T> {
    let request = match client.get(url).build() {
        Ok(request) => request,
        Err(_) => return ApiResponse::failure(ApiError::Network, 500),
    };

    let response = match bounded_fetch(client, request, timeout, cancel).await {
        Ok(response) => response,
        Err(FetchError::TimedOut | FetchError::Cancelled) => {
            return ApiResponse::failure(ApiError::Timeout, 504);
        }
        Err(FetchError::Transport(_)) => {
            return ApiResponse::failure(ApiError::Network, 500);
        }
    };

    let status = response.status().as_u16();

    if !response.status().is_success() {
        let messages = match response.json::<Value>().await {
            Ok(Value::Object(body)) => body.values().map(value_text).collect(),
            _ => vec![format!("HTTP {status}")],
        };
        return ApiResponse::failure(ApiError::Upstream(messages), status);
    }

    match response.json::<T>().await {
        Ok(data) => ApiResponse::success(data, status),
        Err(error) => ApiResponse::failure(ApiError::Decode(error.to_string()), 500),
    }
}

/// Renders a JSON error-body field value as plain text (strings unquoted)
fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
