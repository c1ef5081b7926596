//! File-based event sinks — lightweight persistence.
//! One JSON line per record, human-readable and grep-friendly.
//! Failures are logged and swallowed: sinks never affect control flow.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use pulsebot_core::traits::{EventSink, SinkEvent};

/// Appends events as JSON lines under a data directory:
/// outcomes to `outcomes.jsonl`, anomalies to `safety_events.jsonl`.
pub struct JsonlSink {
    dir: PathBuf,
}

impl JsonlSink {
    pub fn new(dir: &Path) -> Self {
        std::fs::create_dir_all(dir).ok();
        Self {
            dir: dir.to_path_buf(),
        }
    }

    fn append(&self, file: &str, line: &str) -> std::io::Result<()> {
        let path = self.dir.join(file);
        let mut f = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(f, "{line}")
    }
}

impl EventSink for JsonlSink {
    fn record(&self, event: &SinkEvent) {
        let file = match event {
            SinkEvent::Outcome(_) => "outcomes.jsonl",
            SinkEvent::Suspicious(_) => "safety_events.jsonl",
        };
        match serde_json::to_string(event) {
            Ok(line) => {
                if let Err(e) = self.append(file, &line) {
                    tracing::warn!("failed to append to {file}: {e}");
                }
            }
            Err(e) => tracing::warn!("failed to serialize sink event: {e}"),
        }
    }
}

/// Discards everything. Test and dry-run use.
pub struct NullSink;

impl EventSink for NullSink {
    fn record(&self, _event: &SinkEvent) {}
}

/// Forwards each event to every registered sink.
pub struct FanoutSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        Self { sinks }
    }
}

impl EventSink for FanoutSink {
    fn record(&self, event: &SinkEvent) {
        for sink in &self.sinks {
            sink.record(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulsebot_core::types::{ActionOutcome, ActionRequest};

    #[test]
    fn test_jsonl_sink_writes_parseable_lines() {
        let dir = std::env::temp_dir().join("pulsebot-test-sink");
        std::fs::remove_dir_all(&dir).ok();
        let sink = JsonlSink::new(&dir);

        let request = ActionRequest::new("facebook", "like", "post/1", "token");
        sink.record(&SinkEvent::Outcome(ActionOutcome::success(&request, 0.5)));
        sink.record(&SinkEvent::Outcome(ActionOutcome::success(&request, 0.7)));

        let content = std::fs::read_to_string(dir.join("outcomes.jsonl")).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed["event"], "outcome");
        assert_eq!(parsed["platform"], "facebook");
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_fanout_reaches_all_sinks() {
        use std::sync::atomic::{AtomicU32, Ordering};

        struct Counter(AtomicU32);
        impl EventSink for Counter {
            fn record(&self, _event: &SinkEvent) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let a = Arc::new(Counter(AtomicU32::new(0)));
        let b = Arc::new(Counter(AtomicU32::new(0)));
        let fanout = FanoutSink::new(vec![a.clone(), b.clone()]);

        let request = ActionRequest::new("twitter", "like", "t/1", "token");
        fanout.record(&SinkEvent::Outcome(ActionOutcome::success(&request, 0.1)));

        assert_eq!(a.0.load(Ordering::SeqCst), 1);
        assert_eq!(b.0.load(Ordering::SeqCst), 1);
    }
}
