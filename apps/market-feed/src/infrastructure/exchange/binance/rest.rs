//! Binance REST Client
//!
//! User-data-stream listen keys: created once per session and refreshed
//! by the session's keep-alive task.

use reqwest::Client;
use serde::Deserialize;

use crate::infrastructure::exchange::http::{HttpError, ensure_success};

const USER_DATA_STREAM_PATH: &str = "/api/v3/userDataStream";
const API_KEY_HEADER: &str = "X-MBX-APIKEY";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListenKeyResponse {
    listen_key: String,
}

/// Listen-key endpoints.
#[derive(Clone)]
pub struct BinanceRestClient {
    http: Client,
    endpoint: String,
    api_key: String,
}

impl std::fmt::Debug for BinanceRestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinanceRestClient")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl BinanceRestClient {
    /// Create a client for `hostname` (scheme included).
    #[must_use]
    pub fn new(http: Client, hostname: &str, api_key: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: format!("{}{USER_DATA_STREAM_PATH}", hostname.trim_end_matches('/')),
            api_key: api_key.into(),
        }
    }

    /// Create a listen key.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-2xx, or a malformed body.
    pub async fn create_listen_key(&self) -> Result<String, HttpError> {
        let response = self
            .http
            .post(&self.endpoint)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        let body: ListenKeyResponse = ensure_success(response).await?.json().await?;
        Ok(body.listen_key)
    }

    /// Extend a listen key's validity.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or non-2xx.
    pub async fn keep_alive(&self, listen_key: &str) -> Result<(), HttpError> {
        let response = self
            .http
            .put(&self.endpoint)
            .query(&[("listenKey", listen_key)])
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        ensure_success(response).await?;
        Ok(())
    }
}
