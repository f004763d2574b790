//! Shutdown fan-out.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;

/// One-shot stop signal shared by the HTTP server, the registry pruner and
/// the rate limiter janitor.
///
/// Clones share the same signal. Only the first `trigger` sends; later calls
/// are no-ops, so the signal handler and test teardown can both call it.
#[derive(Debug, Clone)]
pub struct Shutdown {
    sender: broadcast::Sender<()>,
    fired: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self {
            sender,
            fired: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A receiver for a task that must stop on shutdown.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.sender.subscribe()
    }

    /// Signal every subscriber. Returns `false` if shutdown was already
    /// signalled.
    pub fn trigger(&self) -> bool {
        if self.fired.swap(true, Ordering::SeqCst) {
            return false;
        }
        let listeners = self.sender.send(()).unwrap_or(0);
        tracing::info!(listeners, "Shutdown signalled");
        true
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_clones_share_one_signal() {
        let shutdown = Shutdown::new();
        let mut server = shutdown.subscribe();
        let mut pruner = shutdown.clone().subscribe();

        assert!(shutdown.clone().trigger());
        assert!(server.recv().await.is_ok());
        assert!(pruner.recv().await.is_ok());
        assert!(!shutdown.trigger());
    }

    #[test]
    fn test_second_trigger_is_a_noop() {
        let shutdown = Shutdown::default();
        assert!(shutdown.trigger());
        assert!(!shutdown.trigger());
    }
}
