//! Extension lifecycle notifications.
//!
//! Every state transition is broadcast to all subscribers over unbounded
//! channels. Delivery never blocks the orchestrator; subscribers whose
//! receiver was dropped are pruned on the next notification.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use crate::extension::{ExtensionId, ExtensionState};

/// One extension state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleEvent {
    pub extension: ExtensionId,
    /// The state the extension just entered
    pub state: ExtensionState,
    /// Timestamp when the transition happened
    pub timestamp: DateTime<Utc>,
}

impl LifecycleEvent {
    /// Create a new event with the current timestamp
    pub fn new(extension: ExtensionId, state: ExtensionState) -> Self {
        Self {
            extension,
            state,
            timestamp: Utc::now(),
        }
    }
}

pub type LifecycleSender = mpsc::UnboundedSender<LifecycleEvent>;

pub type LifecycleReceiver = mpsc::UnboundedReceiver<LifecycleEvent>;

/// Fan-out of lifecycle events. Clones share the subscriber list.
#[derive(Clone, Default)]
pub struct LifecycleNotifier {
    subscribers: Arc<Mutex<Vec<LifecycleSender>>>,
}

impl LifecycleNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive every event emitted after this call.
    pub fn subscribe(&self) -> LifecycleReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(tx);
        rx
    }

    /// Send to every live subscriber, auto-pruning dead senders.
    pub fn notify(&self, event: LifecycleEvent) {
        let mut subs = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        subs.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

#[cfg(test)]
mod tests;
