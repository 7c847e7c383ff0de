//! Shutdown coordination.

use tokio::sync::watch;

/// Latching stop flag shared by the signal listener and the server.
///
/// Backed by a `watch` channel, so a stop requested while the cache is still
/// being built is seen by a server that subscribes afterwards.
#[derive(Debug)]
pub struct Shutdown {
    stopped: watch::Sender<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (stopped, _) = watch::channel(false);
        Self { stopped }
    }

    /// Signal that resolves once [`Shutdown::trigger`] has been called.
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal(self.stopped.subscribe())
    }

    /// Request a stop. Later calls are no-ops.
    pub fn trigger(&self) {
        self.stopped.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.stopped.borrow()
    }

    /// Number of signals still held.
    pub fn receiver_count(&self) -> usize {
        self.stopped.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// One subscriber's view of the stop flag.
#[derive(Debug)]
pub struct ShutdownSignal(watch::Receiver<bool>);

impl ShutdownSignal {
    /// Wait for the stop request. Also returns if the coordinator is dropped.
    pub async fn recv(mut self) {
        let _ = self.0.wait_for(|stopped| *stopped).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_trigger_reaches_subscribers() {
        let shutdown = Shutdown::new();
        let signal = shutdown.subscribe();
        assert_eq!(shutdown.receiver_count(), 1);
        assert!(!shutdown.is_triggered());

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(1), signal.recv()).await.unwrap();
        assert_eq!(shutdown.receiver_count(), 0);
        assert!(shutdown.is_triggered());
    }

    #[tokio::test]
    async fn test_late_subscriber_sees_earlier_trigger() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        shutdown.trigger();

        let signal = shutdown.subscribe();
        tokio::time::timeout(Duration::from_secs(1), signal.recv()).await.unwrap();
    }

    #[tokio::test]
    async fn test_untriggered_signal_stays_pending() {
        let shutdown = Shutdown::new();
        let signal = shutdown.subscribe();
        assert!(tokio::time::timeout(Duration::from_millis(50), signal.recv()).await.is_err());
    }
}
