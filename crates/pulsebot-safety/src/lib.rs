//! # PulseBot Safety
//!
//! Anomaly detection over the action outcome stream. The monitor keeps
//! a bounded recent-activity window, detects rate anomalies, and is the
//! sole producer of the suspension signal the scheduler gates on.
//! Sinks forward outcome/anomaly records to the persistence and
//! alerting collaborators.

pub mod alert;
pub mod monitor;
pub mod sink;

pub use alert::WebhookAlerter;
pub use monitor::SafetyMonitor;
pub use sink::{FanoutSink, JsonlSink, NullSink};
