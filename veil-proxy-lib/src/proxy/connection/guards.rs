use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

use crate::telemetry::Metrics;

/// Guard to decrement active connections counter when dropped
/// Also notifies when the last connection closes (for graceful shutdown)
pub struct ConnectionGuard {
    counter: Arc<AtomicUsize>,
    notifier: watch::Sender<()>,
    metrics: Option<Arc<Metrics>>,
}

impl ConnectionGuard {
    /// Count a newly accepted connection.
    pub fn accept(counter: Arc<AtomicUsize>, notifier: watch::Sender<()>, metrics: Option<Arc<Metrics>>) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        if let Some(ref m) = metrics {
            m.connections_total.add(1, &[]);
            m.connections_active.add(1, &[]);
        }
        Self { counter, notifier, metrics }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let remaining = self.counter.fetch_sub(1, Ordering::Relaxed);
        if let Some(ref m) = self.metrics {
            m.connections_active.add(-1, &[]);
        }
        // Notify when the last connection closes
        if remaining == 1 {
            let _ = self.notifier.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_and_notifies_on_last_close() {
        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(());

        let first = ConnectionGuard::accept(counter.clone(), tx.clone(), None);
        let second = ConnectionGuard::accept(counter.clone(), tx.clone(), None);
        assert_eq!(counter.load(Ordering::Relaxed), 2);

        drop(first);
        assert!(!rx.has_changed().unwrap_or(true));
        drop(second);
        assert_eq!(counter.load(Ordering::Relaxed), 0);
        assert!(rx.has_changed().unwrap_or(false));
    }
}
