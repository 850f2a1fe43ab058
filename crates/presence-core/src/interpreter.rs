//! PIDF presence interpreter
//!
//! Turns one `application/pidf+xml` body into a stored presence state and a
//! state-change notification for the publishing endpoint. All validation
//! happens before either side effect; a rejected document changes nothing.
//!
//! Calls are independent. Two updates racing for the same endpoint are not
//! ordered against each other: whichever store write lands last wins.

use crate::config::PresenceConfig;
use crate::error::Result;
use crate::notify::PresenceNotifier;
use crate::pidf::PidfUpdate;
use crate::store::PresenceStore;
use crate::types::{DeviceKey, PresenceRecord};
use crate::xml::XmlDocument;
use std::sync::Arc;
use tracing::{debug, info_span, warn};

pub struct PresenceInterpreter<S: ?Sized, N: ?Sized> {
    store: Arc<S>,
    notifier: Arc<N>,
    config: PresenceConfig,
}

impl<S, N> PresenceInterpreter<S, N>
where
    S: PresenceStore + ?Sized,
    N: PresenceNotifier + ?Sized,
{
    pub fn new(store: Arc<S>, notifier: Arc<N>, config: PresenceConfig) -> Self {
        Self {
            store,
            notifier,
            config,
        }
    }

    fn device_key(&self, endpoint: &str) -> DeviceKey {
        DeviceKey::new(&self.config.family, &self.config.technology, endpoint)
    }

    /// Parse a PIDF body published by `endpoint`, persist the resulting state
    /// and notify presence subscribers.
    pub fn parse_and_publish(&self, xml: &[u8], endpoint: &str) -> Result<PresenceRecord> {
        let span = info_span!("pidf_publish", endpoint = %endpoint);
        let _enter = span.enter();

        let update = {
            // The tree is dropped at the end of this block on every path
            let doc = XmlDocument::parse(xml).inspect_err(|e| {
                warn!("Ignoring presence update from {}: {}", endpoint, e);
            })?;
            PidfUpdate::from_tree(&doc, self.config.note_limit)?
        };

        let device_key = self.device_key(endpoint);
        let state = update.presence_state();

        self.store
            .put(&self.config.family, &device_key.store_key(), state.as_str())
            .inspect_err(|e| {
                warn!("Failed to persist presence for {}: {}", device_key, e);
            })?;

        self.notifier
            .publish(state, "", &update.note, &device_key.to_string());

        debug!(
            "Presence for {} is now {} (basic={}, note={:?})",
            device_key, state, update.basic, update.note
        );

        Ok(PresenceRecord {
            endpoint: endpoint.to_string(),
            device_key,
            state,
            note: update.note,
        })
    }
}
