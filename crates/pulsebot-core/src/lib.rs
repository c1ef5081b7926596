//! # PulseBot Core
//!
//! Shared foundation for the PulseBot engagement automation system:
//! typed configuration with documented defaults, the error taxonomy,
//! outcome/activity data types, and the injectable capability traits
//! (transport + event sink) the other crates implement.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::{BreakRule, GatewayConfig, OperationalWindow, SafetyRules, ScheduleConfig};
pub use error::{PulseError, Result};
pub use traits::{ActionTransport, EventSink, PlatformResponse, SinkEvent, TransportError};
pub use types::{
    ActionOutcome, ActionRequest, ActivityEntry, ErrorKind, HealthStatus, SafetyReport,
    SafetyStatus, SuspicionKind, SuspiciousEvent,
};
