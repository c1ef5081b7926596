//! Operator alerting — pushes anomaly detections to an HTTP webhook.
//!
//! `record` only enqueues; the actual POST happens on a background
//! task so the monitor stays free of suspension points.

use tokio::sync::mpsc;

use pulsebot_core::traits::{EventSink, SinkEvent};
use pulsebot_core::types::SuspiciousEvent;

pub struct WebhookAlerter {
    tx: mpsc::UnboundedSender<SuspiciousEvent>,
}

impl WebhookAlerter {
    /// Spawn the sender loop. Must be called inside a tokio runtime.
    pub fn spawn(url: String) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<SuspiciousEvent>();

        tokio::spawn(async move {
            let client = reqwest::Client::new();
            while let Some(event) = rx.recv().await {
                let resp = client
                    .post(&url)
                    .json(&serde_json::json!({
                        "title": "PulseBot anomaly detected",
                        "kind": event.kind,
                        "count_observed": event.count_observed,
                        "recommendation": event.recommendation,
                        "detected_at": event.detected_at.to_rfc3339(),
                        "id": event.id,
                    }))
                    .timeout(std::time::Duration::from_secs(10))
                    .send()
                    .await;
                match resp {
                    Ok(r) if r.status().is_success() => {
                        tracing::info!("anomaly alert delivered to webhook");
                    }
                    Ok(r) => {
                        tracing::warn!("alert webhook returned {}", r.status());
                    }
                    Err(e) => {
                        tracing::warn!("alert webhook send failed: {e}");
                    }
                }
            }
            tracing::debug!("alert loop exited (sender dropped)");
        });

        Self { tx }
    }
}

impl EventSink for WebhookAlerter {
    fn record(&self, event: &SinkEvent) {
        if let SinkEvent::Suspicious(ev) = event {
            // Receiver gone means shutdown — nothing useful to do.
            self.tx.send(ev.clone()).ok();
        }
    }
}
