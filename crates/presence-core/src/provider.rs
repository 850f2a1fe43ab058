//! CustomPresence state provider
//!
//! Answers "what is the presence of `CustomPresence:PJSIP/alice`?" from the
//! values the interpreter persisted.

use crate::error::Result;
use crate::store::PresenceStore;
use crate::types::{DeviceKey, PresenceSnapshot, PresenceState};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct CustomPresenceProvider<S: ?Sized> {
    store: Arc<S>,
    family: String,
}

impl<S: PresenceStore + ?Sized> CustomPresenceProvider<S> {
    pub fn new(store: Arc<S>, family: impl Into<String>) -> Self {
        Self {
            store,
            family: family.into(),
        }
    }

    /// Current presence of a fully prefixed device.
    ///
    /// Devices outside this provider's family, devices never published, and
    /// stored values that name no known state all report `NotSet`.
    pub fn current_state(&self, device: &str) -> Result<PresenceSnapshot> {
        let Some(key) = DeviceKey::parse(&self.family, device) else {
            debug!("{} is not a {} device", device, self.family);
            return Ok(PresenceSnapshot {
                device: device.to_string(),
                state: PresenceState::NotSet,
                stored: None,
            });
        };

        let stored = self.store.get(&self.family, &key.store_key())?;
        let state = match stored.as_deref() {
            None => PresenceState::NotSet,
            Some(value) => value.parse().unwrap_or_else(|e| {
                warn!("Stored presence for {} is unusable: {}", device, e);
                PresenceState::NotSet
            }),
        };

        Ok(PresenceSnapshot {
            device: device.to_string(),
            state,
            stored,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn provider() -> (CustomPresenceProvider<MemoryStore>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (CustomPresenceProvider::new(store.clone(), "CustomPresence"), store)
    }

    #[test]
    fn test_reads_stored_state() {
        let (provider, store) = provider();
        store.put("CustomPresence", "PJSIP/alice", "Available").unwrap();

        let snapshot = provider.current_state("CustomPresence:PJSIP/alice").unwrap();
        assert_eq!(snapshot.state, PresenceState::Available);
        assert_eq!(snapshot.stored.as_deref(), Some("Available"));
    }

    #[test]
    fn test_unknown_device_is_not_set() {
        let (provider, _store) = provider();
        let snapshot = provider.current_state("CustomPresence:PJSIP/nobody").unwrap();
        assert_eq!(snapshot.state, PresenceState::NotSet);
        assert!(snapshot.stored.is_none());
    }

    #[test]
    fn test_foreign_device_is_not_set() {
        let (provider, store) = provider();
        store.put("CustomPresence", "PJSIP/alice", "Available").unwrap();

        let snapshot = provider.current_state("PJSIP/alice").unwrap();
        assert_eq!(snapshot.state, PresenceState::NotSet);
    }

    #[test]
    fn test_garbage_value_is_not_set() {
        let (provider, store) = provider();
        store.put("CustomPresence", "PJSIP/alice", "sleeping").unwrap();

        let snapshot = provider.current_state("CustomPresence:PJSIP/alice").unwrap();
        assert_eq!(snapshot.state, PresenceState::NotSet);
        assert_eq!(snapshot.stored.as_deref(), Some("sleeping"));
    }
}
