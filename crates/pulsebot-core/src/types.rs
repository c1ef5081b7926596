//! Shared data model: action requests/outcomes, activity records,
//! and safety reporting types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One logical engagement action against an external platform.
/// Immutable once built; the gateway consumes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRequest {
    /// Target platform ("facebook", "instagram", "twitter", ...).
    pub platform: String,
    /// Action to perform ("like", "comment", "follow", ...).
    pub action_type: String,
    /// What the action applies to (post URL, profile id, ...).
    pub target: String,
    /// Opaque credential reference — the transport decides what it means.
    pub credential: String,
}

impl ActionRequest {
    pub fn new(platform: &str, action_type: &str, target: &str, credential: &str) -> Self {
        Self {
            platform: platform.to_string(),
            action_type: action_type.to_string(),
            target: target.to_string(),
            credential: credential.to_string(),
        }
    }
}

/// Normalized failure classification for an action outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Timeout,
    ConnectionError,
    RemoteError,
    UnsupportedPlatform,
}

impl ErrorKind {
    /// Transient failures are worth retrying; everything else is final.
    pub fn is_transient(&self) -> bool {
        matches!(self, ErrorKind::Timeout | ErrorKind::ConnectionError)
    }
}

/// The single record produced per logical `ActionRequest` — one per
/// request, never one per retry attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub platform: String,
    pub action_type: String,
    pub success: bool,
    /// Wall time from first attempt to final outcome, backoff included.
    pub latency_seconds: f64,
    pub error_kind: Option<ErrorKind>,
    pub timestamp: DateTime<Utc>,
}

impl ActionOutcome {
    pub fn success(request: &ActionRequest, latency_seconds: f64) -> Self {
        Self {
            platform: request.platform.clone(),
            action_type: request.action_type.clone(),
            success: true,
            latency_seconds,
            error_kind: None,
            timestamp: Utc::now(),
        }
    }

    pub fn failure(request: &ActionRequest, kind: ErrorKind, latency_seconds: f64) -> Self {
        Self {
            platform: request.platform.clone(),
            action_type: request.action_type.clone(),
            success: false,
            latency_seconds,
            error_kind: Some(kind),
            timestamp: Utc::now(),
        }
    }
}

/// Result of an operator-facing platform health probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub platform: String,
    pub healthy: bool,
    pub latency_seconds: f64,
    pub checked_at: DateTime<Utc>,
}

/// One entry in the safety monitor's bounded activity window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub timestamp: DateTime<Utc>,
    /// Activity kind — usually the action type ("like", "comment").
    pub kind: String,
    pub platform: String,
    /// Freeform context (outcome details, target, ...).
    pub details: serde_json::Value,
}

/// What kind of anomaly was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuspicionKind {
    HighFrequency,
}

/// An anomaly detection record. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuspiciousEvent {
    /// Unique id for operator correlation across sinks.
    pub id: String,
    pub detected_at: DateTime<Utc>,
    pub kind: SuspicionKind,
    /// Trailing-window activity count observed at detection time.
    pub count_observed: u32,
    pub recommendation: String,
}

/// Overall safety posture, in ascending order of severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyStatus {
    Normal,
    HighActivity,
    AttentionRequired,
}

/// Snapshot produced by `SafetyMonitor::report`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyReport {
    pub generated_at: DateTime<Utc>,
    /// Total activities observed since construction or last reset.
    pub total_observed: u64,
    pub suspicious_count: usize,
    /// Most recent suspicious events (up to 5).
    pub recent_suspicious: Vec<SuspiciousEvent>,
    pub status: SafetyStatus,
    pub recommendations: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_transience() {
        assert!(ErrorKind::Timeout.is_transient());
        assert!(ErrorKind::ConnectionError.is_transient());
        assert!(!ErrorKind::RemoteError.is_transient());
        assert!(!ErrorKind::UnsupportedPlatform.is_transient());
    }

    #[test]
    fn test_outcome_from_request() {
        let req = ActionRequest::new("facebook", "like", "post/123", "token");
        let ok = ActionOutcome::success(&req, 1.5);
        assert!(ok.success);
        assert_eq!(ok.platform, "facebook");
        assert!(ok.error_kind.is_none());

        let failed = ActionOutcome::failure(&req, ErrorKind::Timeout, 7.0);
        assert!(!failed.success);
        assert_eq!(failed.error_kind, Some(ErrorKind::Timeout));
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let s = serde_json::to_string(&SafetyStatus::AttentionRequired).unwrap();
        assert_eq!(s, "\"attention_required\"");
        let s = serde_json::to_string(&SafetyStatus::HighActivity).unwrap();
        assert_eq!(s, "\"high_activity\"");
    }
}
