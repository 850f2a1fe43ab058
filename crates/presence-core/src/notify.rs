//! Presence state-change notification

use crate::types::{PresenceChange, PresenceState};
use chrono::Utc;
use tokio::sync::broadcast;
use tracing::trace;

/// Receiver of presence state changes.
///
/// Publishing is synchronous and fire-and-forget: implementations must not
/// block on subscribers and have no way to report failure back.
pub trait PresenceNotifier: Send + Sync {
    fn publish(&self, state: PresenceState, subtype: &str, note: &str, device: &str);
}

/// Fans presence changes out over a tokio broadcast channel
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<PresenceChange>,
}

impl BroadcastNotifier {
    /// Create a notifier whose subscribers may lag by up to `capacity` changes
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PresenceChange> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(64)
    }
}

impl PresenceNotifier for BroadcastNotifier {
    fn publish(&self, state: PresenceState, subtype: &str, note: &str, device: &str) {
        let change = PresenceChange {
            state,
            subtype: subtype.to_string(),
            note: note.to_string(),
            device: device.to_string(),
            timestamp: Utc::now(),
        };

        // No receivers is not an error
        if self.sender.send(change).is_err() {
            trace!("No presence subscribers for {}", device);
        }
    }
}
