//! Scheduler engine — the state machine and its control loop.
//!
//! States: `Stopped → Running → (BreakPending → OnBreak → Running)* →
//! Stopped`, with `Running ↔ WaitingForWindow` around the operational
//! window. A stop request is checked at the top of every tick and
//! interrupts the inter-tick sleep, so it is honored within one tick
//! even during multi-minute breaks.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use pulsebot_core::config::{BreakRule, ScheduleConfig};
use pulsebot_core::{PulseError, Result};
use pulsebot_safety::SafetyMonitor;

use crate::tasks::Task;

/// Recovery break entered when the safety monitor signals suspension,
/// independent of the configured break rules.
pub const SUSPENSION_BREAK_MINUTES: i64 = 30;

/// Tick cadence while running or on break.
const RUN_TICK_SECS: u64 = 60;
/// Coarser poll cadence while waiting for the operational window.
const WINDOW_POLL_SECS: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Stopped,
    Running,
    WaitingForWindow,
    BreakPending,
    OnBreak,
}

impl std::fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchedulerState::Stopped => write!(f, "stopped"),
            SchedulerState::Running => write!(f, "running"),
            SchedulerState::WaitingForWindow => write!(f, "waiting_for_window"),
            SchedulerState::BreakPending => write!(f, "break_pending"),
            SchedulerState::OnBreak => write!(f, "on_break"),
        }
    }
}

/// Re-reads the schedule config at the top of each tick; the result is
/// immutable within the tick.
pub type ConfigSource = Box<dyn Fn() -> ScheduleConfig + Send + Sync>;

/// Operator-facing snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub state: SchedulerState,
    pub task_count: usize,
    pub cycle_start: Option<DateTime<Utc>>,
    pub last_break_end: Option<DateTime<Utc>>,
    pub break_until: Option<DateTime<Utc>>,
}

pub struct Scheduler {
    config: ScheduleConfig,
    config_source: Option<ConfigSource>,
    tasks: Vec<Task>,
    state: SchedulerState,
    cycle_start: Option<DateTime<Utc>>,
    last_break_end: Option<DateTime<Utc>>,
    break_until: Option<DateTime<Utc>>,
    monitor: Arc<Mutex<SafetyMonitor>>,
}

impl Scheduler {
    /// The safety monitor is injected — no globals, fresh state per
    /// instance.
    pub fn new(config: ScheduleConfig, monitor: Arc<Mutex<SafetyMonitor>>) -> Self {
        Self {
            config,
            config_source: None,
            tasks: Vec::new(),
            state: SchedulerState::Stopped,
            cycle_start: None,
            last_break_end: None,
            break_until: None,
            monitor,
        }
    }

    /// Reload the schedule config from `source` once per tick.
    pub fn with_config_source(mut self, source: ConfigSource) -> Self {
        self.config_source = Some(source);
        self
    }

    /// Register a task. Rejected when the name is taken or the
    /// interval is not positive.
    pub fn add_task(&mut self, task: Task) -> Result<()> {
        if task.interval_minutes <= 0 {
            return Err(PulseError::Scheduler(format!(
                "task '{}': interval must be positive, got {}",
                task.name, task.interval_minutes
            )));
        }
        if self.tasks.iter().any(|t| t.name == task.name) {
            return Err(PulseError::Scheduler(format!(
                "task '{}' already registered",
                task.name
            )));
        }
        tracing::info!(
            task = %task.name,
            interval_minutes = task.interval_minutes,
            "task registered"
        );
        self.tasks.push(task);
        Ok(())
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn monitor(&self) -> Arc<Mutex<SafetyMonitor>> {
        self.monitor.clone()
    }

    pub fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            state: self.state,
            task_count: self.tasks.len(),
            cycle_start: self.cycle_start,
            last_break_end: self.last_break_end,
            break_until: self.break_until,
        }
    }

    /// Enter `Running` and anchor the cycle at `now`.
    pub fn begin_run(&mut self, now: DateTime<Utc>) {
        tracing::info!("scheduler starting");
        self.state = SchedulerState::Running;
        self.cycle_start = Some(now);
        self.last_break_end = None;
        self.break_until = None;
    }

    pub fn mark_stopped(&mut self) {
        tracing::info!("scheduler stopped");
        self.state = SchedulerState::Stopped;
    }

    /// One logical iteration of the state machine.
    pub async fn tick_at(&mut self, now: DateTime<Utc>) {
        if self.state == SchedulerState::Stopped {
            return;
        }
        if let Some(source) = &self.config_source {
            self.config = source();
        }

        if !self.within_window(now) {
            if self.state != SchedulerState::WaitingForWindow {
                tracing::info!("outside operational window, waiting");
                self.state = SchedulerState::WaitingForWindow;
            }
            return;
        }
        if self.state == SchedulerState::WaitingForWindow {
            tracing::info!("operational window open, resuming");
            self.state = SchedulerState::Running;
            // Time spent waiting is not running time, and any break that
            // was interrupted by the window closing is abandoned.
            self.cycle_start = Some(now);
            self.last_break_end = None;
            self.break_until = None;
        }

        if self.state == SchedulerState::OnBreak {
            match self.break_until {
                Some(until) if now < until => return,
                _ => {
                    tracing::info!("break completed, resuming");
                    self.break_until = None;
                    self.last_break_end = Some(now);
                    self.state = SchedulerState::Running;
                }
            }
        }

        if let Some(rule) = self.due_break_rule(now) {
            tracing::info!(
                after_minutes = rule.after_minutes,
                break_minutes = rule.break_minutes,
                "scheduled break due"
            );
            self.begin_break(now, rule.break_minutes);
            return;
        }

        if self.monitor.lock().await.take_suspension() {
            tracing::warn!(
                minutes = SUSPENSION_BREAK_MINUTES,
                "safety suspension signaled, entering recovery break"
            );
            self.begin_break(now, SUSPENSION_BREAK_MINUTES);
            return;
        }

        self.run_due_tasks(now).await;
    }

    /// Inside the configured daily window? Malformed window times fail
    /// closed — never inside — because treating them as "always open"
    /// would silently disable rate protection.
    fn within_window(&self, now: DateTime<Utc>) -> bool {
        let window = &self.config.operational_hours;
        if !window.enabled {
            return true;
        }
        match window.parse() {
            Some((start, end)) => {
                let t = now.time();
                start <= t && t <= end
            }
            None => {
                tracing::error!(
                    start = %window.start_time,
                    end = %window.end_time,
                    "malformed operational window times, refusing to dispatch"
                );
                false
            }
        }
    }

    /// First enabled rule whose running-time threshold is met. Running
    /// time is anchored at the end of the previous break (which also
    /// satisfies the spacing requirement between breaks), or at cycle
    /// start before any break has happened.
    fn due_break_rule(&self, now: DateTime<Utc>) -> Option<BreakRule> {
        let anchor = self.last_break_end.or(self.cycle_start)?;
        let running_minutes = (now - anchor).num_minutes();
        self.config
            .break_schedule
            .iter()
            .find(|rule| rule.enabled && running_minutes >= rule.after_minutes)
            .cloned()
    }

    fn begin_break(&mut self, now: DateTime<Utc>, minutes: i64) {
        self.state = SchedulerState::BreakPending;
        self.break_until = Some(now + Duration::minutes(minutes));
        self.state = SchedulerState::OnBreak;
    }

    /// Dispatch every due task in registration order. A task failure is
    /// logged and never aborts the tick; `last_run` advances regardless
    /// of success (at-most-once-per-interval, not guaranteed-success).
    async fn run_due_tasks(&mut self, now: DateTime<Utc>) {
        for task in self.tasks.iter_mut() {
            if !task.due(now) {
                continue;
            }
            tracing::info!(task = %task.name, "running task");
            if let Err(e) = task.run().await {
                tracing::warn!(task = %task.name, "task failed: {e}");
            }
            task.last_run = Some(now);
        }
    }
}

/// Handle owned by whoever started the scheduler. `stop` is idempotent
/// and observable within one tick; `join` awaits the loop so no work is
/// orphaned.
pub struct SchedulerHandle {
    stop: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl SchedulerHandle {
    pub fn stop(&self) {
        self.stop.send_replace(true);
    }

    pub async fn join(self) -> Result<()> {
        self.join
            .await
            .map_err(|e| PulseError::Scheduler(format!("control loop panicked: {e}")))
    }
}

/// Spawn the control loop as a background tokio task.
///
/// The scheduler stays shared behind the mutex so operators can query
/// `status()` while it runs: the loop locks per tick and sleeps
/// unlocked.
pub fn spawn(scheduler: Arc<Mutex<Scheduler>>) -> SchedulerHandle {
    let (stop_tx, mut stop_rx) = watch::channel(false);

    let join = tokio::spawn(async move {
        scheduler.lock().await.begin_run(Utc::now());

        loop {
            if *stop_rx.borrow() {
                break;
            }
            let cadence = {
                let mut sched = scheduler.lock().await;
                sched.tick_at(Utc::now()).await;
                if sched.state() == SchedulerState::WaitingForWindow {
                    WINDOW_POLL_SECS
                } else {
                    RUN_TICK_SECS
                }
            };
            tokio::select! {
                _ = stop_rx.changed() => {}
                _ = tokio::time::sleep(StdDuration::from_secs(cadence)) => {}
            }
        }

        scheduler.lock().await.mark_stopped();
    });

    SchedulerHandle {
        stop: stop_tx,
        join,
    }
}
