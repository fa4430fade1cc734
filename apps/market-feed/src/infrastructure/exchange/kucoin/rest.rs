//! KuCoin REST Client

use reqwest::Client;
use serde::Deserialize;

use crate::infrastructure::exchange::http::{HttpError, ensure_success};

const BULLET_PUBLIC_PATH: &str = "/api/v1/bullet-public";

/// WebSocket endpoint offered by the bullet response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceServer {
    /// `wss://` endpoint.
    pub endpoint: String,
    /// Expected ping period in milliseconds.
    pub ping_interval: u64,
}

/// Connection token and endpoints for one session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulletToken {
    /// Token appended to the endpoint.
    pub token: String,
    /// Candidate endpoints, preferred first.
    #[serde(default)]
    pub instance_servers: Vec<InstanceServer>,
}

#[derive(Debug, Deserialize)]
struct BulletResponse {
    data: BulletToken,
}

/// Public token endpoint.
#[derive(Debug, Clone)]
pub struct KucoinRestClient {
    http: Client,
    endpoint: String,
}

impl KucoinRestClient {
    /// Create a client for `hostname` (scheme included).
    #[must_use]
    pub fn new(http: Client, hostname: &str) -> Self {
        Self {
            http,
            endpoint: format!("{}{BULLET_PUBLIC_PATH}", hostname.trim_end_matches('/')),
        }
    }

    /// Request a public connection token.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-2xx, or a malformed body.
    pub async fn bullet_public(&self) -> Result<BulletToken, HttpError> {
        let response = self.http.post(&self.endpoint).send().await?;
        let body: BulletResponse = ensure_success(response).await?.json().await?;
        Ok(body.data)
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn parses_bullet_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/bullet-public"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": "200000",
                "data": {
                    "token": "tok",
                    "instanceServers": [{
                        "endpoint": "wss://ws-api-spot.kucoin.com/",
                        "encrypt": true,
                        "protocol": "websocket",
                        "pingInterval": 18000,
                        "pingTimeout": 10000
                    }]
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let bullet = KucoinRestClient::new(Client::new(), &server.uri())
            .bullet_public()
            .await
            .unwrap();

        assert_eq!(bullet.token, "tok");
        assert_eq!(
            bullet.instance_servers,
            vec![InstanceServer {
                endpoint: "wss://ws-api-spot.kucoin.com/".to_string(),
                ping_interval: 18_000,
            }]
        );
    }

    #[tokio::test]
    async fn non_success_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let err = KucoinRestClient::new(Client::new(), &server.uri())
            .bullet_public()
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::Status { body, .. } if body == "maintenance"));
    }
}
