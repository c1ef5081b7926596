//! PulseBot error taxonomy.

use thiserror::Error;

/// Errors that can cross a crate boundary inside PulseBot.
///
/// Note that most failure modes deliberately do NOT surface here:
/// the gateway reports failed actions as `ActionOutcome` records, and
/// missing configuration degrades to defaults with a warning.
#[derive(Debug, Error)]
pub enum PulseError {
    /// Configuration was present but unusable.
    #[error("config error: {0}")]
    Config(String),

    /// Transport-level failure surfaced to a caller (e.g. a task body).
    #[error("transport error: {0}")]
    Transport(String),

    /// Scheduler misuse (duplicate task name, bad interval, ...).
    #[error("scheduler error: {0}")]
    Scheduler(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PulseError>;
