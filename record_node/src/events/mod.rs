//! Cross-view refresh signalling
//!
//! An explicit publish/subscribe channel passed through the component tree.
//! Views subscribe instead of polling or listening on ambient events.

use tokio::sync::broadcast;

/// "New data available" notification. Carries the timestamp that acts as the
/// change token; it is not an ordering guarantee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshSignal {
    pub at: String,
}

#[derive(Clone)]
pub struct RefreshBus {
    tx: broadcast::Sender<RefreshSignal>,
}

impl RefreshBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Notify subscribers that new data exists. Lagging or absent
    /// subscribers are not an error.
    pub fn publish(&self, at: &str) {
        let _ = self.tx.send(RefreshSignal { at: at.to_string() });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RefreshSignal> {
        self.tx.subscribe()
    }
}

impl Default for RefreshBus {
    fn default() -> Self {
        Self::new(16)
    }
}
