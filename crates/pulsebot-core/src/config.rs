//! PulseBot configuration system.
//!
//! Every struct is fully serde-defaulted: a missing file or a missing
//! field never fails, it substitutes the documented default and logs a
//! warning. Only a present-but-malformed operational window is treated
//! specially — the scheduler fails closed on it (see `OperationalWindow`).

use chrono::NaiveTime;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn bool_true() -> bool {
    true
}

/// PulseBot home directory (~/.pulsebot).
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".pulsebot")
}

/// Read a TOML config, degrading to defaults on any failure.
fn load_or_default<T: DeserializeOwned + Default>(path: &Path, what: &str) -> T {
    if !path.exists() {
        tracing::warn!("{what} config not found at {}, using defaults", path.display());
        return T::default();
    }
    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("failed to parse {what} config: {e}, using defaults");
                T::default()
            }
        },
        Err(e) => {
            tracing::warn!("failed to read {what} config: {e}, using defaults");
            T::default()
        }
    }
}

/// Scheduler configuration: operational window + break rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default)]
    pub operational_hours: OperationalWindow,
    #[serde(default = "default_break_schedule")]
    pub break_schedule: Vec<BreakRule>,
}

fn default_break_schedule() -> Vec<BreakRule> {
    vec![BreakRule::default()]
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            operational_hours: OperationalWindow::default(),
            break_schedule: default_break_schedule(),
        }
    }
}

impl ScheduleConfig {
    pub fn load(path: &Path) -> Self {
        load_or_default(path, "schedule")
    }

    pub fn default_path() -> PathBuf {
        config_dir().join("schedule.toml")
    }
}

/// Daily hours inside which the scheduler is allowed to dispatch work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationalWindow {
    /// "HH:MM", inclusive. Default 06:00.
    #[serde(default = "default_start_time")]
    pub start_time: String,
    /// "HH:MM", inclusive. Default 23:00.
    #[serde(default = "default_end_time")]
    pub end_time: String,
    /// Disabled means "always inside the window".
    #[serde(default = "bool_true")]
    pub enabled: bool,
}

fn default_start_time() -> String {
    "06:00".into()
}
fn default_end_time() -> String {
    "23:00".into()
}

impl Default for OperationalWindow {
    fn default() -> Self {
        Self {
            start_time: default_start_time(),
            end_time: default_end_time(),
            enabled: true,
        }
    }
}

impl OperationalWindow {
    /// Parse the window bounds. `None` means the times are malformed —
    /// callers must fail closed (treat as never inside the window),
    /// since treating it as "always open" would silently disable rate
    /// protection.
    pub fn parse(&self) -> Option<(NaiveTime, NaiveTime)> {
        let start = NaiveTime::parse_from_str(&self.start_time, "%H:%M").ok()?;
        let end = NaiveTime::parse_from_str(&self.end_time, "%H:%M").ok()?;
        Some((start, end))
    }
}

/// A mandatory rest break: after `after_minutes` of continuous running,
/// pause for `break_minutes`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakRule {
    #[serde(default = "default_after_minutes")]
    pub after_minutes: i64,
    #[serde(default = "default_break_minutes")]
    pub break_minutes: i64,
    #[serde(default = "bool_true")]
    pub enabled: bool,
}

fn default_after_minutes() -> i64 {
    60
}
fn default_break_minutes() -> i64 {
    15
}

impl Default for BreakRule {
    fn default() -> Self {
        Self {
            after_minutes: default_after_minutes(),
            break_minutes: default_break_minutes(),
            enabled: true,
        }
    }
}

/// Safety monitor rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SafetyRules {
    #[serde(default)]
    pub operation_limits: OperationLimits,
    #[serde(default)]
    pub safety_measures: SafetyMeasures,
}

impl SafetyRules {
    pub fn load(path: &Path) -> Self {
        load_or_default(path, "safety rules")
    }

    pub fn default_path() -> PathBuf {
        config_dir().join("safety_rules.toml")
    }
}

/// Hard operation caps advertised to operators and tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationLimits {
    #[serde(default = "default_max_posts_per_day")]
    pub max_posts_per_day: u32,
    #[serde(default = "default_min_delay")]
    pub min_delay_between_actions: u64,
    #[serde(default = "default_max_actions_per_hour")]
    pub max_actions_per_hour: u32,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_actions: u32,
}

fn default_max_posts_per_day() -> u32 {
    50
}
fn default_min_delay() -> u64 {
    30
}
fn default_max_actions_per_hour() -> u32 {
    20
}
fn default_max_concurrent() -> u32 {
    5
}

impl Default for OperationLimits {
    fn default() -> Self {
        Self {
            max_posts_per_day: default_max_posts_per_day(),
            min_delay_between_actions: default_min_delay(),
            max_actions_per_hour: default_max_actions_per_hour(),
            max_concurrent_actions: default_max_concurrent(),
        }
    }
}

/// Anomaly detection knobs.
///
/// `suspicious_activity_threshold` (detection) and
/// `high_activity_threshold` (reporting) are intentionally independent —
/// there is no derived relationship between the two numbers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyMeasures {
    #[serde(default = "default_suspicious_threshold")]
    pub suspicious_activity_threshold: u32,
    #[serde(default = "bool_true")]
    pub auto_suspend_on_detection: bool,
    #[serde(default = "bool_true")]
    pub rate_limiting: bool,
    #[serde(default = "default_high_activity_threshold")]
    pub high_activity_threshold: u32,
}

fn default_suspicious_threshold() -> u32 {
    10
}
fn default_high_activity_threshold() -> u32 {
    50
}

impl Default for SafetyMeasures {
    fn default() -> Self {
        Self {
            suspicious_activity_threshold: default_suspicious_threshold(),
            auto_suspend_on_detection: true,
            rate_limiting: true,
            high_activity_threshold: default_high_activity_threshold(),
        }
    }
}

/// Action gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Per-attempt timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Total attempts per logical request (>= 1).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Randomized inter-request pause range for batch execution.
    #[serde(default = "default_batch_pause_min")]
    pub batch_pause_min_secs: f64,
    #[serde(default = "default_batch_pause_max")]
    pub batch_pause_max_secs: f64,
}

fn default_request_timeout() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}
fn default_batch_pause_min() -> f64 {
    1.0
}
fn default_batch_pause_max() -> f64 {
    2.0
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout(),
            max_retries: default_max_retries(),
            batch_pause_min_secs: default_batch_pause_min(),
            batch_pause_max_secs: default_batch_pause_max(),
        }
    }
}

impl GatewayConfig {
    pub fn load(path: &Path) -> Self {
        load_or_default(path, "gateway")
    }

    /// Batch pause bounds in ascending order. A file that inverts the
    /// pair must not turn into a sampling panic downstream.
    pub fn batch_pause_range(&self) -> (f64, f64) {
        if self.batch_pause_min_secs <= self.batch_pause_max_secs {
            (self.batch_pause_min_secs, self.batch_pause_max_secs)
        } else {
            tracing::warn!(
                min = self.batch_pause_min_secs,
                max = self.batch_pause_max_secs,
                "batch pause bounds inverted, swapping"
            );
            (self.batch_pause_max_secs, self.batch_pause_min_secs)
        }
    }

    pub fn default_path() -> PathBuf {
        config_dir().join("gateway.toml")
    }
}

/// Declarative task list loaded by the operator binary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TasksConfig {
    #[serde(default)]
    pub tasks: Vec<TaskSpec>,
}

/// One declared engagement task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSpec {
    pub name: String,
    pub interval_minutes: i64,
    pub platform: String,
    pub action_type: String,
    pub target: String,
    #[serde(default)]
    pub credential: String,
}

impl TasksConfig {
    pub fn load(path: &Path) -> Self {
        load_or_default(path, "tasks")
    }

    pub fn default_path() -> PathBuf {
        config_dir().join("tasks.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let schedule = ScheduleConfig::default();
        assert_eq!(schedule.operational_hours.start_time, "06:00");
        assert_eq!(schedule.operational_hours.end_time, "23:00");
        assert!(schedule.operational_hours.enabled);
        assert_eq!(schedule.break_schedule.len(), 1);
        assert_eq!(schedule.break_schedule[0].after_minutes, 60);
        assert_eq!(schedule.break_schedule[0].break_minutes, 15);

        let rules = SafetyRules::default();
        assert_eq!(rules.operation_limits.max_posts_per_day, 50);
        assert_eq!(rules.operation_limits.min_delay_between_actions, 30);
        assert_eq!(rules.operation_limits.max_actions_per_hour, 20);
        assert_eq!(rules.safety_measures.suspicious_activity_threshold, 10);
        assert_eq!(rules.safety_measures.high_activity_threshold, 50);
        assert!(rules.safety_measures.auto_suspend_on_detection);

        let gateway = GatewayConfig::default();
        assert_eq!(gateway.request_timeout_secs, 30);
        assert_eq!(gateway.max_retries, 3);
    }

    #[test]
    fn test_missing_file_degrades_to_defaults() {
        let rules = SafetyRules::load(Path::new("/nonexistent/safety_rules.toml"));
        assert_eq!(rules.safety_measures.suspicious_activity_threshold, 10);

        let schedule = ScheduleConfig::load(Path::new("/nonexistent/schedule.toml"));
        assert!(schedule.operational_hours.enabled);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let toml_str = r#"
            [operational_hours]
            start_time = "08:00"
        "#;
        let config: ScheduleConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.operational_hours.start_time, "08:00");
        assert_eq!(config.operational_hours.end_time, "23:00");
        assert_eq!(config.break_schedule.len(), 1);
    }

    #[test]
    fn test_window_parse() {
        let window = OperationalWindow::default();
        let (start, end) = window.parse().unwrap();
        assert_eq!(start, NaiveTime::from_hms_opt(6, 0, 0).unwrap());
        assert_eq!(end, NaiveTime::from_hms_opt(23, 0, 0).unwrap());

        let bad = OperationalWindow {
            start_time: "6am".into(),
            ..OperationalWindow::default()
        };
        assert!(bad.parse().is_none());
    }

    #[test]
    fn test_inverted_batch_pause_bounds_reordered() {
        let config = GatewayConfig {
            batch_pause_min_secs: 2.0,
            batch_pause_max_secs: 1.0,
            ..GatewayConfig::default()
        };
        assert_eq!(config.batch_pause_range(), (1.0, 2.0));

        let config = GatewayConfig::default();
        assert_eq!(config.batch_pause_range(), (1.0, 2.0));
    }

    #[test]
    fn test_tasks_config() {
        let toml_str = r#"
            [[tasks]]
            name = "like-sweep"
            interval_minutes = 30
            platform = "facebook"
            action_type = "like"
            target = "https://facebook.com/post/1"
        "#;
        let config: TasksConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.tasks.len(), 1);
        assert_eq!(config.tasks[0].name, "like-sweep");
        assert!(config.tasks[0].credential.is_empty());
    }
}
