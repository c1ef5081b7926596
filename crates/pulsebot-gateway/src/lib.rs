//! # PulseBot Gateway
//!
//! The resilient action executor. Wraps an injectable transport with
//! per-attempt timeouts, exponential-backoff retries for transient
//! failures, sequential batch execution with randomized pacing, and a
//! normalized outcome record per logical request.

pub mod gateway;
pub mod transport;

pub use gateway::ActionGateway;
pub use transport::HttpTransport;
