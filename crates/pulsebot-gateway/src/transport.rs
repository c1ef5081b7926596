//! HTTP transport — the production `ActionTransport` implementation.
//!
//! Maps each supported platform to its API base URL and performs one
//! POST per attempt. Failure classification happens here: reqwest
//! timeouts become `Timeout`, connect failures become `Connection`,
//! and any non-2xx response becomes `Remote` (never retried upstream).

use async_trait::async_trait;
use std::time::Duration;

use pulsebot_core::config::GatewayConfig;
use pulsebot_core::traits::{ActionTransport, PlatformResponse, TransportError};
use pulsebot_core::types::ActionRequest;

/// reqwest-backed transport with a per-attempt timeout.
pub struct HttpTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }

    /// API base URL for a platform, or `None` if unsupported.
    fn endpoint(platform: &str) -> Option<&'static str> {
        match platform {
            "facebook" => Some("https://graph.facebook.com/v19.0"),
            "instagram" => Some("https://graph.instagram.com/v19.0"),
            "twitter" => Some("https://api.twitter.com/2"),
            _ => None,
        }
    }

    fn classify(e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout
        } else {
            TransportError::Connection(e.to_string())
        }
    }
}

#[async_trait]
impl ActionTransport for HttpTransport {
    async fn perform(
        &self,
        request: &ActionRequest,
    ) -> Result<PlatformResponse, TransportError> {
        let base = Self::endpoint(&request.platform)
            .ok_or_else(|| TransportError::UnsupportedPlatform(request.platform.clone()))?;
        let url = format!("{base}/{}", request.action_type);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&request.credential)
            .json(&serde_json::json!({ "target": request.target }))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(Self::classify)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TransportError::Remote {
                status: status.as_u16(),
                message,
            });
        }

        let body: serde_json::Value = response.json().await.unwrap_or(serde_json::Value::Null);
        let id = body
            .get("id")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        Ok(PlatformResponse { id, body })
    }

    async fn probe(&self, platform: &str) -> Result<(), TransportError> {
        let base = Self::endpoint(platform)
            .ok_or_else(|| TransportError::UnsupportedPlatform(platform.to_string()))?;

        // Any HTTP answer counts as reachable; only transport-level
        // failures mark the platform unhealthy.
        self.client
            .get(base)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(Self::classify)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_mapping() {
        assert!(HttpTransport::endpoint("facebook").is_some());
        assert!(HttpTransport::endpoint("instagram").is_some());
        assert!(HttpTransport::endpoint("twitter").is_some());
        assert!(HttpTransport::endpoint("myspace").is_none());
    }

    #[tokio::test]
    async fn test_unsupported_platform_is_permanent() {
        let transport = HttpTransport::new(&GatewayConfig::default());
        let request = ActionRequest::new("myspace", "like", "profile/1", "token");
        let err = transport.perform(&request).await.unwrap_err();
        assert!(matches!(err, TransportError::UnsupportedPlatform(_)));
        assert!(!err.is_transient());
    }
}
