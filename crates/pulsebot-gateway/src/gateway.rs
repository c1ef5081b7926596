//! The Action Gateway — executes one logical action with retry and
//! exponential backoff, and batches of actions with randomized pacing.
//!
//! Failures never escape as errors: every logical request produces
//! exactly one `ActionOutcome`, success or not, whose latency spans the
//! full attempt sequence including backoff waits.

use std::sync::Arc;
use std::time::Duration;

use pulsebot_core::config::GatewayConfig;
use pulsebot_core::traits::ActionTransport;
use pulsebot_core::types::{ActionOutcome, ActionRequest, ErrorKind, HealthStatus};

/// Backoff never exceeds this, whatever the attempt count.
const MAX_BACKOFF_SECS: u64 = 60;

pub struct ActionGateway {
    transport: Arc<dyn ActionTransport>,
    config: GatewayConfig,
}

impl ActionGateway {
    pub fn new(transport: Arc<dyn ActionTransport>, config: GatewayConfig) -> Self {
        Self { transport, config }
    }

    /// Execute one logical request with up to `max_retries` attempts.
    ///
    /// Transient failures (timeout, connection) back off `2^attempt`
    /// seconds and retry; anything else returns immediately as a failed
    /// outcome. Exhaustion reports the last transient kind observed.
    pub async fn execute(&self, request: &ActionRequest, max_retries: u32) -> ActionOutcome {
        let max_retries = max_retries.max(1);
        let started = tokio::time::Instant::now();
        let mut last_kind = ErrorKind::ConnectionError;

        for attempt in 0..max_retries {
            match self.transport.perform(request).await {
                Ok(response) => {
                    tracing::debug!(
                        platform = %request.platform,
                        action = %request.action_type,
                        id = %response.id,
                        attempt,
                        "action succeeded"
                    );
                    return ActionOutcome::success(request, started.elapsed().as_secs_f64());
                }
                Err(e) if e.is_transient() => {
                    last_kind = e.kind();
                    if attempt + 1 < max_retries {
                        let delay = 2u64.saturating_pow(attempt).min(MAX_BACKOFF_SECS);
                        tracing::debug!(
                            platform = %request.platform,
                            attempt,
                            delay_secs = delay,
                            "transient failure ({e}), backing off"
                        );
                        tokio::time::sleep(Duration::from_secs(delay)).await;
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        platform = %request.platform,
                        action = %request.action_type,
                        "permanent failure: {e}"
                    );
                    return ActionOutcome::failure(
                        request,
                        e.kind(),
                        started.elapsed().as_secs_f64(),
                    );
                }
            }
        }

        tracing::warn!(
            platform = %request.platform,
            action = %request.action_type,
            retries = max_retries,
            "retries exhausted"
        );
        ActionOutcome::failure(request, last_kind, started.elapsed().as_secs_f64())
    }

    /// Execute requests strictly sequentially, pausing a randomized
    /// interval between consecutive requests to avoid bursty shapes.
    /// Output order matches input order; one failure never aborts the
    /// batch.
    pub async fn execute_batch(&self, requests: &[ActionRequest]) -> Vec<ActionOutcome> {
        let mut outcomes = Vec::with_capacity(requests.len());
        for (i, request) in requests.iter().enumerate() {
            outcomes.push(self.execute(request, self.config.max_retries).await);

            if i + 1 < requests.len() {
                let pause = {
                    use rand::Rng;
                    let (lo, hi) = self.config.batch_pause_range();
                    let mut rng = rand::thread_rng();
                    rng.gen_range(lo..=hi)
                };
                tokio::time::sleep(Duration::from_secs_f64(pause)).await;
            }
        }
        outcomes
    }

    /// Operator-facing health probe. Not consulted by the scheduler.
    pub async fn check_health(&self, platform: &str) -> HealthStatus {
        let started = tokio::time::Instant::now();
        let healthy = match self.transport.probe(platform).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(platform, "health probe failed: {e}");
                false
            }
        };
        HealthStatus {
            platform: platform.to_string(),
            healthy,
            latency_seconds: started.elapsed().as_secs_f64(),
            checked_at: chrono::Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pulsebot_core::traits::{PlatformResponse, TransportError};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Scripted transport: pops one result per attempt, defaulting to
    /// success when the script runs dry.
    struct FakeTransport {
        script: Mutex<VecDeque<Result<(), TransportError>>>,
        attempts: AtomicU32,
    }

    impl FakeTransport {
        fn new(script: Vec<Result<(), TransportError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                attempts: AtomicU32::new(0),
            })
        }

        fn attempts(&self) -> u32 {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ActionTransport for FakeTransport {
        async fn perform(
            &self,
            _request: &ActionRequest,
        ) -> Result<PlatformResponse, TransportError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(Ok(())) | None => Ok(PlatformResponse {
                    id: "fake-1".into(),
                    body: serde_json::Value::Null,
                }),
                Some(Err(e)) => Err(e),
            }
        }

        async fn probe(&self, platform: &str) -> Result<(), TransportError> {
            if platform == "facebook" {
                Ok(())
            } else {
                Err(TransportError::Connection("down".into()))
            }
        }
    }

    fn request(platform: &str) -> ActionRequest {
        ActionRequest::new(platform, "like", "post/1", "token")
    }

    fn gateway(transport: Arc<FakeTransport>) -> ActionGateway {
        ActionGateway::new(transport, GatewayConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_first_attempt() {
        let transport = FakeTransport::new(vec![Ok(())]);
        let gw = gateway(transport.clone());
        let outcome = gw.execute(&request("facebook"), 3).await;
        assert!(outcome.success);
        assert!(outcome.error_kind.is_none());
        assert_eq!(transport.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_retries_then_succeeds() {
        let transport = FakeTransport::new(vec![Err(TransportError::Timeout), Ok(())]);
        let gw = gateway(transport.clone());
        let outcome = gw.execute(&request("facebook"), 3).await;
        assert!(outcome.success);
        assert_eq!(transport.attempts(), 2);
        // Latency covers the 2^0 = 1s backoff between the attempts.
        assert!(outcome.latency_seconds >= 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_failure_short_circuits() {
        let transport = FakeTransport::new(vec![Err(TransportError::Remote {
            status: 403,
            message: "forbidden".into(),
        })]);
        let gw = gateway(transport.clone());
        let outcome = gw.execute(&request("facebook"), 5).await;
        assert!(!outcome.success);
        assert_eq!(outcome.error_kind, Some(ErrorKind::RemoteError));
        assert_eq!(transport.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_never_exceed_max() {
        let transport = FakeTransport::new(vec![
            Err(TransportError::Timeout),
            Err(TransportError::Timeout),
            Err(TransportError::Timeout),
            Err(TransportError::Timeout),
        ]);
        let gw = gateway(transport.clone());
        let outcome = gw.execute(&request("facebook"), 3).await;
        assert!(!outcome.success);
        assert_eq!(outcome.error_kind, Some(ErrorKind::Timeout));
        assert_eq!(transport.attempts(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_reports_last_failure_kind() {
        let transport = FakeTransport::new(vec![
            Err(TransportError::Timeout),
            Err(TransportError::Connection("reset".into())),
        ]);
        let gw = gateway(transport.clone());
        let outcome = gw.execute(&request("facebook"), 2).await;
        assert!(!outcome.success);
        assert_eq!(outcome.error_kind, Some(ErrorKind::ConnectionError));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_retries_clamped_to_one_attempt() {
        let transport = FakeTransport::new(vec![Ok(())]);
        let gw = gateway(transport.clone());
        let outcome = gw.execute(&request("facebook"), 0).await;
        assert!(outcome.success);
        assert_eq!(transport.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_preserves_length_and_order() {
        // Second request fails permanently; batch must continue.
        let transport = FakeTransport::new(vec![
            Ok(()),
            Err(TransportError::UnsupportedPlatform("myspace".into())),
            Ok(()),
        ]);
        let gw = gateway(transport.clone());
        let requests = vec![request("facebook"), request("myspace"), request("twitter")];
        let outcomes = gw.execute_batch(&requests).await;

        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].platform, "facebook");
        assert_eq!(outcomes[1].platform, "myspace");
        assert_eq!(outcomes[2].platform, "twitter");
        assert!(outcomes[0].success);
        assert!(!outcomes[1].success);
        assert_eq!(outcomes[1].error_kind, Some(ErrorKind::UnsupportedPlatform));
        assert!(outcomes[2].success);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_survives_inverted_pause_bounds() {
        let transport = FakeTransport::new(vec![Ok(()), Ok(())]);
        let config = GatewayConfig {
            batch_pause_min_secs: 2.0,
            batch_pause_max_secs: 1.0,
            ..GatewayConfig::default()
        };
        let gw = ActionGateway::new(transport, config);
        let requests = vec![request("facebook"), request("twitter")];
        let outcomes = gw.execute_batch(&requests).await;
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.success));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_batch() {
        let transport = FakeTransport::new(vec![]);
        let gw = gateway(transport.clone());
        let outcomes = gw.execute_batch(&[]).await;
        assert!(outcomes.is_empty());
        assert_eq!(transport.attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_health() {
        let transport = FakeTransport::new(vec![]);
        let gw = gateway(transport.clone());

        let up = gw.check_health("facebook").await;
        assert!(up.healthy);
        assert_eq!(up.platform, "facebook");

        let down = gw.check_health("instagram").await;
        assert!(!down.healthy);
    }
}
