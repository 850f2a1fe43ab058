//! Layered configuration loading
//!
//! Sources, lowest to highest precedence:
//! 1. `Default` of the target type (via `#[serde(default)]`)
//! 2. an optional TOML file
//! 3. environment variables `<PREFIX>__SECTION__KEY`

use crate::errors::types::Result;
use ::config::{Config, Environment, File, FileFormat};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Load a configuration struct from an optional file plus the environment.
///
/// A `path` that is given but missing is an error; pass `None` to rely on
/// defaults and environment only.
pub fn load_config<T: DeserializeOwned>(path: Option<&Path>, env_prefix: &str) -> Result<T> {
    let mut builder = Config::builder();

    if let Some(path) = path {
        tracing::debug!("Loading configuration from {}", path.display());
        builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix(env_prefix)
            .prefix_separator("__")
            .separator("__"),
    );

    let settings = builder.build()?;
    Ok(settings.try_deserialize()?)
}
