//! Configuration for presence-core

use crate::error::Result;
use crate::pidf::DEFAULT_NOTE_LIMIT;
use crate::types::{CUSTOM_PRESENCE_FAMILY, PJSIP_TECHNOLOGY};
use rvoip_infra_common::LoggingConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable prefix, e.g. `RVOIP_PRESENCE__NOTE_LIMIT=63`
pub const ENV_PREFIX: &str = "RVOIP_PRESENCE";

/// Main configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PresenceConfig {
    /// Store family and device-key prefix
    pub family: String,
    /// Technology segment of the device key
    pub technology: String,
    /// Longest note carried through, in bytes
    pub note_limit: usize,
    /// JSON store file; in-memory store when unset
    pub store_path: Option<PathBuf>,
    /// Broadcast buffer for state-change subscribers
    pub notifier_capacity: usize,
    pub logging: LoggingConfig,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            family: CUSTOM_PRESENCE_FAMILY.to_string(),
            technology: PJSIP_TECHNOLOGY.to_string(),
            note_limit: DEFAULT_NOTE_LIMIT,
            store_path: None,
            notifier_capacity: 64,
            logging: LoggingConfig::default(),
        }
    }
}

impl PresenceConfig {
    /// Load configuration from an optional TOML file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Ok(rvoip_infra_common::config::load_config(path, ENV_PREFIX)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = PresenceConfig::default();
        assert_eq!(config.family, "CustomPresence");
        assert_eq!(config.technology, "PJSIP");
        assert_eq!(config.note_limit, 31);
        assert!(config.store_path.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
note_limit = 63
store_path = "/var/lib/rvoip/presence.json"

[logging]
level = "debug"
"#
        )
        .unwrap();

        let config = PresenceConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.note_limit, 63);
        assert_eq!(config.family, "CustomPresence");
        assert_eq!(
            config.store_path.as_deref(),
            Some(Path::new("/var/lib/rvoip/presence.json"))
        );
        assert_eq!(config.logging.level, "debug");
    }
}
