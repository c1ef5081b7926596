//! Capability traits at the system's seams.
//!
//! The transport is injectable so tests substitute deterministic fakes
//! and production supplies the real HTTP client. The sink is the
//! fire-and-forget collaborator that receives outcome/anomaly records.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{ActionOutcome, ActionRequest, ErrorKind, SuspiciousEvent};

/// What a platform answered on success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformResponse {
    /// Platform-assigned id of the created resource, if any.
    pub id: String,
    pub body: serde_json::Value,
}

/// A single attempt's failure, before outcome normalization.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("platform returned {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),
}

impl TransportError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransportError::Timeout => ErrorKind::Timeout,
            TransportError::Connection(_) => ErrorKind::ConnectionError,
            TransportError::Remote { .. } => ErrorKind::RemoteError,
            TransportError::UnsupportedPlatform(_) => ErrorKind::UnsupportedPlatform,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind().is_transient()
    }
}

/// Performs one attempt of an engagement action. The gateway owns
/// retries and backoff; implementations only do a single call.
#[async_trait]
pub trait ActionTransport: Send + Sync {
    /// Perform the action once.
    async fn perform(&self, request: &ActionRequest)
        -> Result<PlatformResponse, TransportError>;

    /// Cheap reachability probe for a platform.
    async fn probe(&self, platform: &str) -> Result<(), TransportError>;
}

/// A record handed to the persistence/analytics collaborator.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SinkEvent {
    Outcome(ActionOutcome),
    Suspicious(SuspiciousEvent),
}

/// Fire-and-forget event sink. Implementations must never block the
/// caller on I/O for long and must swallow their own failures — no
/// return value is consulted for control flow.
pub trait EventSink: Send + Sync {
    fn record(&self, event: &SinkEvent);
}
