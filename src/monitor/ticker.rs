//! Background tick task for the resource monitor.
//!
//! Spawn shape mirrors `enterprise::audit::logger::AuditLogger::new`, which
//! hands a clone of its shared state to a `tokio::spawn`'d loop and flips an
//! `is_running` flag on exit; here the loop calls [`ResourceMonitor::tick`]
//! on a fixed `tokio::time::interval` instead of draining a channel.

use crate::monitor::monitor::ResourceMonitor;
use crate::monitor::violation::Violation;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

/// Handle to a running ticker task. Dropping it does not stop the task;
/// call [`TickerHandle::stop`] for a graceful shutdown.
pub struct TickerHandle {
    is_running: Arc<RwLock<bool>>,
    task: tokio::task::JoinHandle<()>,
}

impl TickerHandle {
    pub fn stop(&self) {
        *self.is_running.write() = false;
    }

    pub fn is_running(&self) -> bool {
        *self.is_running.read()
    }

    pub fn abort(&self) {
        self.task.abort();
    }
}

/// Spawn a ticker that calls `monitor.tick()` every `period` and forwards
/// any violations to `on_violations`. The callback runs on the ticker's own
/// task; it must not block for long or it will delay subsequent ticks.
pub fn spawn_ticker<F>(monitor: Arc<ResourceMonitor>, period: Duration, on_violations: F) -> TickerHandle
where
    F: Fn(Vec<Violation>) + Send + 'static,
{
    let is_running = Arc::new(RwLock::new(true));
    let worker_is_running = is_running.clone();

    let task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            if !*worker_is_running.read() {
                break;
            }
            let violations = monitor.tick();
            if !violations.is_empty() {
                on_violations(violations);
            }
        }
    });

    TickerHandle { is_running, task }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_ticker_reports_violations_then_stops() {
        let monitor = Arc::new(ResourceMonitor::new());
        let session_id = uuid::Uuid::new_v4();
        monitor.register(session_id, "m1", 1, 5000, false, false);
        monitor.update_memory(session_id, "m1", 1000);

        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = seen.clone();
        let handle = spawn_ticker(monitor, Duration::from_millis(5), move |violations| {
            seen_clone.fetch_add(violations.len(), Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(30)).await;
        handle.stop();
        handle.abort();

        assert!(seen.load(Ordering::SeqCst) > 0);
    }
}
