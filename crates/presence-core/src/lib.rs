//! # Presence-Core
//!
//! PIDF presence publication handling for PJSIP endpoints.
//!
//! An endpoint PUBLISHes an `application/pidf+xml` body; this crate reads the
//! `<basic>` status and optional `<note>` of its first tuple, maps them onto
//! the host presence states, stores the result under
//! `CustomPresence/PJSIP/<endpoint>` and tells presence subscribers about it.
//!
//! ## Architecture
//!
//! - `xml`: owned document tree behind a small read-only query trait
//! - `pidf`: PIDF structure checks and field extraction
//! - `interpreter`: parse, persist, notify
//! - `store` / `notify`: injected sinks (in-memory, JSON file, tokio broadcast)
//! - `provider`: reads stored presence back for a device
//! - `publish`: Content-Type gate in front of the interpreter
//!
//! ## Example
//!
//! ```rust
//! use rvoip_presence_core::{PresenceConfig, PresenceService, PresenceState};
//!
//! let service = PresenceService::new(PresenceConfig::default()).unwrap();
//! let body = b"<presence><tuple><status><basic>open</basic></status></tuple></presence>";
//!
//! let outcome = service.handler().handle_publish("alice", Some("application/pidf+xml"), body);
//! assert_eq!(outcome.status(), 200);
//!
//! let snapshot = service.provider().current_state("CustomPresence:PJSIP/alice").unwrap();
//! assert_eq!(snapshot.state, PresenceState::Available);
//! ```

pub mod config;
pub mod error;
pub mod interpreter;
pub mod notify;
pub mod pidf;
pub mod provider;
pub mod publish;
pub mod store;
pub mod types;
pub mod xml;

pub use config::PresenceConfig;
pub use error::{ErrorKind, PresenceError, Result, StoreError};
pub use interpreter::PresenceInterpreter;
pub use notify::{BroadcastNotifier, PresenceNotifier};
pub use pidf::{BasicStatus, PidfUpdate};
pub use provider::CustomPresenceProvider;
pub use publish::{MediaType, PublishHandler, PublishOutcome};
pub use store::{FileStore, MemoryStore, PresenceStore};
pub use types::{DeviceKey, PresenceChange, PresenceRecord, PresenceSnapshot, PresenceState};

use std::sync::Arc;
use tracing::info;

/// Presence publication handler, state provider and change feed wired
/// together from a [`PresenceConfig`].
pub struct PresenceService {
    handler: PublishHandler<dyn PresenceStore, BroadcastNotifier>,
    provider: CustomPresenceProvider<dyn PresenceStore>,
    notifier: Arc<BroadcastNotifier>,
}

impl PresenceService {
    pub fn new(config: PresenceConfig) -> Result<Self> {
        let store: Arc<dyn PresenceStore> = match &config.store_path {
            Some(path) => {
                info!("Using presence store file {}", path.display());
                Arc::new(FileStore::open(path)?)
            }
            None => {
                info!("Using in-memory presence store");
                Arc::new(MemoryStore::new())
            }
        };

        Ok(Self::with_store(store, config))
    }

    /// Build the service around an existing store
    pub fn with_store(store: Arc<dyn PresenceStore>, config: PresenceConfig) -> Self {
        let notifier = Arc::new(BroadcastNotifier::new(config.notifier_capacity));
        let provider = CustomPresenceProvider::new(store.clone(), config.family.clone());
        let interpreter = PresenceInterpreter::new(store, notifier.clone(), config);

        Self {
            handler: PublishHandler::new(interpreter),
            provider,
            notifier,
        }
    }

    pub fn handler(&self) -> &PublishHandler<dyn PresenceStore, BroadcastNotifier> {
        &self.handler
    }

    pub fn provider(&self) -> &CustomPresenceProvider<dyn PresenceStore> {
        &self.provider
    }

    /// Subscribe to presence changes
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<PresenceChange> {
        self.notifier.subscribe()
    }
}
