//! REST Plumbing
//!
//! Shared `reqwest` client construction and status handling for the
//! token, listen-key and keep-alive endpoints.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};

/// HTTP request failures.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// Transport, timeout or body decode failure.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-2xx response.
    #[error("unexpected status {status}: {body}")]
    Status {
        /// Response status.
        status: StatusCode,
        /// Response body, possibly empty.
        body: String,
    },
}

/// Build the HTTP client used by an ingestor.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialized.
pub fn build_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("market-feed/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Turn non-2xx responses into [`HttpError::Status`].
///
/// # Errors
///
/// Returns [`HttpError::Status`] with the response body for non-2xx.
pub async fn ensure_success(response: Response) -> Result<Response, HttpError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(HttpError::Status { status, body })
}
