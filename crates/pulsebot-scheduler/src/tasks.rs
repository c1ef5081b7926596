//! Task definitions — named, interval-bound units of work.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use pulsebot_core::Result;

pub type TaskFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;
pub type TaskFn = Arc<dyn Fn() -> TaskFuture + Send + Sync>;

/// A registered unit of periodic work. Identity is the name; `last_run`
/// is mutated only by the scheduler after a completed execution.
pub struct Task {
    pub name: String,
    pub interval_minutes: i64,
    pub last_run: Option<DateTime<Utc>>,
    action: TaskFn,
}

impl Task {
    pub fn new(name: &str, interval_minutes: i64, action: TaskFn) -> Self {
        Self {
            name: name.to_string(),
            interval_minutes,
            last_run: None,
            action,
        }
    }

    /// Build a task from an async closure.
    pub fn from_fn<F, Fut>(name: &str, interval_minutes: i64, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self::new(name, interval_minutes, Arc::new(move || Box::pin(f())))
    }

    /// Due when never run, or when the interval has elapsed since the
    /// last completed run.
    pub fn due(&self, now: DateTime<Utc>) -> bool {
        match self.last_run {
            None => true,
            Some(last) => now - last >= Duration::minutes(self.interval_minutes),
        }
    }

    pub async fn run(&self) -> Result<()> {
        (self.action)().await
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("interval_minutes", &self.interval_minutes)
            .field("last_run", &self.last_run)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_task(interval: i64) -> Task {
        Task::from_fn("noop", interval, || async { Ok(()) })
    }

    #[test]
    fn test_never_run_is_due() {
        let task = noop_task(30);
        assert!(task.due(Utc::now()));
    }

    #[test]
    fn test_due_after_interval() {
        let now = Utc::now();
        let mut task = noop_task(30);
        task.last_run = Some(now);
        assert!(!task.due(now + Duration::minutes(29)));
        assert!(task.due(now + Duration::minutes(30)));
    }

    #[tokio::test]
    async fn test_run_invokes_action() {
        use std::sync::atomic::{AtomicU32, Ordering};
        let counter = Arc::new(AtomicU32::new(0));
        let c = counter.clone();
        let task = Task::from_fn("count", 1, move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });
        task.run().await.unwrap();
        task.run().await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }
}
