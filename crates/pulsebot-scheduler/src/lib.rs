//! # PulseBot Scheduler
//!
//! The run/break/operational-window state machine. One control loop
//! advances the machine on a fixed cadence; registered tasks run
//! synchronously within a tick, in registration order.
//!
//! ## Tick order
//! ```text
//! tick
//!   ├── outside operational window? → WaitingForWindow (coarse poll)
//!   ├── OnBreak? → count down, then Running
//!   ├── break rule due? → BreakPending → OnBreak
//!   ├── safety suspension signaled? → forced 30-minute recovery break
//!   └── dispatch due tasks → outcomes flow to the SafetyMonitor
//! ```

pub mod engine;
pub mod tasks;

pub use engine::{spawn, Scheduler, SchedulerHandle, SchedulerState, SchedulerStatus};
pub use tasks::Task;
