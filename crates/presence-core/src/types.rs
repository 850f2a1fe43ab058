//! Core presence types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Namespace under which custom presence is persisted and published
pub const CUSTOM_PRESENCE_FAMILY: &str = "CustomPresence";

/// Channel technology prefix used for SIP endpoints
pub const PJSIP_TECHNOLOGY: &str = "PJSIP";

/// Presence state as understood by the host's presence-subscription machinery.
///
/// The PIDF path only ever yields `Available` or `Unavailable`; the remaining
/// values exist so that state written by other providers can be read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PresenceState {
    NotSet,
    Unavailable,
    Available,
    Away,
    Xa,
    Chat,
    Dnd,
}

impl PresenceState {
    /// Textual form written to the presence store
    pub fn as_str(&self) -> &'static str {
        match self {
            PresenceState::NotSet => "Not_Set",
            PresenceState::Unavailable => "Unavailable",
            PresenceState::Available => "Available",
            PresenceState::Away => "Away",
            PresenceState::Xa => "XA",
            PresenceState::Chat => "Chat",
            PresenceState::Dnd => "DND",
        }
    }
}

impl fmt::Display for PresenceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a stored value names no known presence state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPresenceState(pub String);

impl fmt::Display for UnknownPresenceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown presence state '{}'", self.0)
    }
}

impl std::error::Error for UnknownPresenceState {}

impl FromStr for PresenceState {
    type Err = UnknownPresenceState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "not_set" => Ok(PresenceState::NotSet),
            "unavailable" => Ok(PresenceState::Unavailable),
            "available" => Ok(PresenceState::Available),
            "away" => Ok(PresenceState::Away),
            "xa" => Ok(PresenceState::Xa),
            "chat" => Ok(PresenceState::Chat),
            "dnd" => Ok(PresenceState::Dnd),
            _ => Err(UnknownPresenceState(s.to_string())),
        }
    }
}

/// Identifier under which an endpoint's presence is stored and published,
/// e.g. `CustomPresence:PJSIP/alice`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceKey {
    pub family: String,
    pub technology: String,
    pub endpoint: String,
}

impl DeviceKey {
    pub fn new(
        family: impl Into<String>,
        technology: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            family: family.into(),
            technology: technology.into(),
            endpoint: endpoint.into(),
        }
    }

    /// Key inside the family, i.e. the device key with `<family>:` stripped
    pub fn store_key(&self) -> String {
        format!("{}/{}", self.technology, self.endpoint)
    }

    /// Parse a fully prefixed device key (`<family>:<tech>/<endpoint>`).
    ///
    /// Returns `None` if the family prefix or the technology separator is
    /// missing, or if the endpoint part is empty.
    pub fn parse(family: &str, device: &str) -> Option<Self> {
        let rest = device.strip_prefix(family)?.strip_prefix(':')?;
        let (technology, endpoint) = rest.split_once('/')?;
        if technology.is_empty() || endpoint.is_empty() {
            return None;
        }
        Some(Self::new(family, technology, endpoint))
    }
}

impl fmt::Display for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.family, self.technology, self.endpoint)
    }
}

/// Presence derived from one accepted PIDF publication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceRecord {
    pub endpoint: String,
    pub device_key: DeviceKey,
    pub state: PresenceState,
    pub note: String,
}

/// Payload of a presence state-change notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceChange {
    pub state: PresenceState,
    pub subtype: String,
    pub note: String,
    /// Fully prefixed device key, e.g. `CustomPresence:PJSIP/alice`
    pub device: String,
    pub timestamp: DateTime<Utc>,
}

/// Presence as read back from the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceSnapshot {
    pub device: String,
    pub state: PresenceState,
    /// Raw stored value, if any
    pub stored: Option<String>,
}
