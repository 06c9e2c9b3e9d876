//! HTTP implementation of the notification gateway port.
//!
//! Posts message payloads to the messaging front-end's delivery endpoint and
//! classifies failures for the dispatcher: 408/429/5xx and transport errors
//! are transient (retryable), the remaining 4xx are permanent (e.g. a
//! recipient that blocked the bot).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use roundtable_core::NotificationGateway;
use roundtable_domain::{DeliveryError, GatewayConfig, Result, RoundtableError, UserId};
use serde::Serialize;
use tracing::debug;

/// Connection settings for the gateway client.
#[derive(Debug, Clone)]
pub struct HttpNotificationGatewayConfig {
    pub base_url: String,
    pub auth_token: Option<String>,
    pub timeout: Duration,
}

impl From<&GatewayConfig> for HttpNotificationGatewayConfig {
    fn from(config: &GatewayConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
            timeout: Duration::from_secs(config.timeout_seconds),
        }
    }
}

#[derive(Serialize)]
struct MessagePayload<'a> {
    user_id: UserId,
    text: &'a str,
}

pub struct HttpNotificationGateway {
    client: reqwest::Client,
    config: HttpNotificationGatewayConfig,
}

impl HttpNotificationGateway {
    pub fn new(config: HttpNotificationGatewayConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| RoundtableError::Config(format!("failed to build HTTP client: {err}")))?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/messages", self.config.base_url)
    }
}

#[async_trait]
impl NotificationGateway for HttpNotificationGateway {
    async fn deliver(
        &self,
        user_id: UserId,
        text: &str,
    ) -> std::result::Result<(), DeliveryError> {
        let mut request =
            self.client.post(self.endpoint()).json(&MessagePayload { user_id, text });
        if let Some(token) = &self.config.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|err| DeliveryError::Transient(format!("request failed: {err}")))?;

        let status = response.status();
        if status.is_success() {
            debug!(user_id, "notification delivered");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let reason = format!("gateway returned {status}: {body}");
        match status {
            StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
                Err(DeliveryError::Transient(reason))
            }
            status if status.is_client_error() => Err(DeliveryError::Permanent(reason)),
            _ => Err(DeliveryError::Transient(reason)),
        }
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_json_string, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    async fn gateway_for(server: &MockServer) -> HttpNotificationGateway {
        HttpNotificationGateway::new(HttpNotificationGatewayConfig {
            base_url: server.uri(),
            auth_token: None,
            timeout: Duration::from_secs(2),
        })
        .expect("client built")
    }

    #[tokio::test]
    async fn success_returns_ok() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(body_json_string(r#"{"user_id":42,"text":"see you tomorrow"}"#))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let gateway = gateway_for(&server).await;
        gateway.deliver(42, "see you tomorrow").await.expect("delivery succeeds");
    }

    #[tokio::test]
    async fn forbidden_is_permanent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("recipient blocked the bot"))
            .mount(&server)
            .await;

        let gateway = gateway_for(&server).await;
        let err = gateway.deliver(1, "hello").await.expect_err("403 must fail");
        assert!(matches!(err, DeliveryError::Permanent(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn server_errors_and_rate_limits_are_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let gateway = gateway_for(&server).await;
        let err = gateway.deliver(1, "hello").await.expect_err("500 must fail");
        assert!(err.is_retryable());

        let err = gateway.deliver(1, "hello").await.expect_err("429 must fail");
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn connection_failure_is_transient() {
        // Nothing listens on this port.
        let gateway = HttpNotificationGateway::new(HttpNotificationGatewayConfig {
            base_url: "http://127.0.0.1:1".into(),
            auth_token: None,
            timeout: Duration::from_millis(500),
        })
        .unwrap();

        let err = gateway.deliver(1, "hello").await.expect_err("connect must fail");
        assert!(matches!(err, DeliveryError::Transient(_)));
    }
}
