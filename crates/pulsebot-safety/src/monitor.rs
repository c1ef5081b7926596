//! The safety monitor.
//!
//! `observe` is synchronous and I/O-free: appending to the ring and
//! running detection complete in bounded time, so it is safe to call
//! from the scheduler's control loop. Sink writes go through the
//! fire-and-forget `EventSink` contract.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use pulsebot_core::config::SafetyRules;
use pulsebot_core::traits::{EventSink, SinkEvent};
use pulsebot_core::types::{
    ActionOutcome, ActivityEntry, SafetyReport, SafetyStatus, SuspicionKind, SuspiciousEvent,
};

/// Activity ring capacity. Oldest entries are evicted first.
const ACTIVITY_RING_CAP: usize = 1000;

/// How many suspicious events a report includes.
const REPORT_RECENT_LIMIT: usize = 5;

pub struct SafetyMonitor {
    rules: SafetyRules,
    activity: VecDeque<ActivityEntry>,
    suspicious: Vec<SuspiciousEvent>,
    total_observed: u64,
    /// Latched while the trailing-hour count sits above the threshold,
    /// so one breach produces one event rather than one per entry.
    over_threshold: bool,
    suspension_pending: bool,
    sink: Option<Arc<dyn EventSink>>,
}

impl SafetyMonitor {
    pub fn new(rules: SafetyRules) -> Self {
        Self {
            rules,
            activity: VecDeque::new(),
            suspicious: Vec::new(),
            total_observed: 0,
            over_threshold: false,
            suspension_pending: false,
            sink: None,
        }
    }

    /// Attach a sink that receives outcome and anomaly records.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Append an activity entry (evicting the oldest beyond capacity)
    /// and run anomaly detection.
    pub fn observe(&mut self, entry: ActivityEntry) {
        self.activity.push_back(entry);
        self.total_observed += 1;
        while self.activity.len() > ACTIVITY_RING_CAP {
            self.activity.pop_front();
        }
        self.detect_anomaly();
    }

    /// Convenience: record a gateway outcome to the sink and observe it
    /// as activity.
    pub fn observe_outcome(&mut self, outcome: &ActionOutcome) {
        if let Some(sink) = &self.sink {
            sink.record(&SinkEvent::Outcome(outcome.clone()));
        }
        self.observe(ActivityEntry {
            timestamp: outcome.timestamp,
            kind: outcome.action_type.clone(),
            platform: outcome.platform.clone(),
            details: serde_json::json!({
                "success": outcome.success,
                "latency_seconds": outcome.latency_seconds,
                "error_kind": outcome.error_kind,
            }),
        });
    }

    fn trailing_hour_count(&self, now: DateTime<Utc>) -> usize {
        let cutoff = now - Duration::hours(1);
        self.activity.iter().filter(|e| e.timestamp > cutoff).count()
    }

    /// Detect high-frequency anomalies. One `SuspiciousEvent` per
    /// breach crossing: the latch resets only once the trailing count
    /// falls back under the threshold.
    fn detect_anomaly(&mut self) {
        let now = Utc::now();
        let count = self.trailing_hour_count(now);
        let threshold = self.rules.safety_measures.suspicious_activity_threshold as usize;

        if count <= threshold {
            self.over_threshold = false;
            return;
        }
        if self.over_threshold {
            return;
        }
        self.over_threshold = true;

        let event = SuspiciousEvent {
            id: uuid::Uuid::new_v4().to_string(),
            detected_at: now,
            kind: SuspicionKind::HighFrequency,
            count_observed: count as u32,
            recommendation: "Suspend operations temporarily".to_string(),
        };
        tracing::warn!(
            count,
            threshold,
            "suspicious activity detected: high-frequency"
        );
        if let Some(sink) = &self.sink {
            sink.record(&SinkEvent::Suspicious(event.clone()));
        }
        self.suspicious.push(event);

        if self.rules.safety_measures.auto_suspend_on_detection {
            self.suspension_pending = true;
            tracing::warn!("auto-suspension raised");
        }
    }

    /// Consume the suspension signal. Only the scheduler's gate check
    /// should call this; it clears the flag.
    pub fn take_suspension(&mut self) -> bool {
        std::mem::take(&mut self.suspension_pending)
    }

    pub fn suspension_pending(&self) -> bool {
        self.suspension_pending
    }

    /// Current safety posture. `attention_required` takes precedence
    /// over `high_activity`.
    pub fn report(&self) -> SafetyReport {
        let now = Utc::now();
        let trailing = self.trailing_hour_count(now);
        let high_threshold = self.rules.safety_measures.high_activity_threshold as usize;

        let status = if !self.suspicious.is_empty() {
            SafetyStatus::AttentionRequired
        } else if trailing > high_threshold {
            SafetyStatus::HighActivity
        } else {
            SafetyStatus::Normal
        };

        let mut recommendations = Vec::new();
        if !self.suspicious.is_empty() {
            recommendations.push("Review recent suspicious activities".to_string());
        }
        if trailing > high_threshold {
            recommendations.push("Consider increasing delay between actions".to_string());
        }

        let recent_suspicious = self
            .suspicious
            .iter()
            .rev()
            .take(REPORT_RECENT_LIMIT)
            .rev()
            .cloned()
            .collect();

        SafetyReport {
            generated_at: now,
            total_observed: self.total_observed,
            suspicious_count: self.suspicious.len(),
            recent_suspicious,
            status,
            recommendations,
        }
    }

    /// Clear all monitoring state. Operator/test use only — never
    /// called automatically.
    pub fn reset(&mut self) {
        tracing::info!("safety monitor reset");
        self.activity.clear();
        self.suspicious.clear();
        self.total_observed = 0;
        self.over_threshold = false;
        self.suspension_pending = false;
    }

    /// Entries currently held in the activity ring.
    pub fn activity_len(&self) -> usize {
        self.activity.len()
    }

    /// Oldest entry still in the ring.
    pub fn oldest_entry(&self) -> Option<&ActivityEntry> {
        self.activity.front()
    }
}
