//! Error types for presence publication handling

use thiserror::Error;

/// Coarse classification of a failed presence update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The body was not well-formed XML
    MalformedXml,
    /// An expected element (presence, tuple, status, basic) was missing
    StructureError,
    /// The basic status text was not exactly `open` or `closed`
    UnexpectedValue,
    /// The persistence sink refused the write
    Store,
    /// The configuration could not be loaded
    Config,
}

#[derive(Debug, Error)]
pub enum PresenceError {
    #[error("Malformed XML: {0}")]
    MalformedXml(String),

    #[error("Unexpected PIDF structure: {0}")]
    Structure(String),

    #[error("Unexpected value: {0}")]
    UnexpectedValue(String),

    #[error("Presence store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(#[from] rvoip_infra_common::Error),
}

impl PresenceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PresenceError::MalformedXml(_) => ErrorKind::MalformedXml,
            PresenceError::Structure(_) => ErrorKind::StructureError,
            PresenceError::UnexpectedValue(_) => ErrorKind::UnexpectedValue,
            PresenceError::Store(_) => ErrorKind::Store,
            PresenceError::Config(_) => ErrorKind::Config,
        }
    }
}

/// Errors raised by a [`PresenceStore`](crate::store::PresenceStore) backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt store file {path}: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, PresenceError>;
