//! Handle-based subscriptions for externally delivered signals
//!
//! Script load notifications and widget response events arrive from the host.
//! Each listener holds a `Subscription`; dropping it detaches the listener, so
//! nothing can fire into a deactivated component.

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::warn;

const DEFAULT_CAPACITY: usize = 64;

/// Broadcast point for one kind of external signal
pub struct Signal<T> {
    tx: broadcast::Sender<T>,
}

impl<T: Clone + Send + 'static> Signal<T> {
    /// Create a signal with the default buffer capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a signal that buffers up to `capacity` undelivered values per subscriber
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Deliver a value to every live subscription
    ///
    /// Returns the number of subscriptions that will observe it.
    pub fn emit(&self, value: T) -> usize {
        self.tx.send(value).unwrap_or(0)
    }

    /// Attach a new listener
    pub fn subscribe(&self) -> Subscription<T> {
        Subscription {
            rx: self.tx.subscribe(),
        }
    }

    /// Number of attached listeners
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl<T: Clone + Send + 'static> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

/// A live listener on a `Signal`; dropping it unsubscribes
pub struct Subscription<T> {
    rx: broadcast::Receiver<T>,
}

impl<T: Clone> Subscription<T> {
    /// Wait for the next value, or `None` once every emitter is gone
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            match self.rx.recv().await {
                Ok(value) => return Some(value),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Subscription lagged, {} signals skipped", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next value if one is already buffered
    pub fn try_recv(&mut self) -> Option<T> {
        loop {
            match self.rx.try_recv() {
                Ok(value) => return Some(value),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!("Subscription lagged, {} signals skipped", skipped);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_receives_emitted_value() {
        let signal = Signal::new();
        let mut sub = signal.subscribe();

        assert_eq!(signal.emit(7u32), 1);
        assert_eq!(sub.recv().await, Some(7));
    }

    #[test]
    fn test_emit_without_subscribers_is_dropped() {
        let signal: Signal<u32> = Signal::new();
        assert_eq!(signal.emit(1), 0);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let signal: Signal<u32> = Signal::new();
        let sub = signal.subscribe();
        assert_eq!(signal.subscriber_count(), 1);

        drop(sub);
        assert_eq!(signal.subscriber_count(), 0);
        assert_eq!(signal.emit(1), 0);
    }

    #[test]
    fn test_values_before_subscribe_are_not_seen() {
        let signal = Signal::new();
        let _early = signal.subscribe();
        signal.emit("before");

        let mut late = signal.subscribe();
        assert_eq!(late.try_recv(), None);

        signal.emit("after");
        assert_eq!(late.try_recv(), Some("after"));
    }

    #[tokio::test]
    async fn test_recv_ends_when_signal_dropped() {
        let signal: Signal<u32> = Signal::new();
        let mut sub = signal.subscribe();
        drop(signal);
        assert_eq!(sub.recv().await, None);
    }
}
