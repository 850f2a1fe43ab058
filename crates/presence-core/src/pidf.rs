//! PIDF (RFC 3863) presence extraction
//!
//! Only the subset needed to drive a two-valued presence state is read:
//!
//! ```xml
//! <presence xmlns="urn:ietf:params:xml:ns:pidf" entity="sip:alice@example.com">
//!   <tuple id="t1">
//!     <status>
//!       <basic>open</basic>
//!     </status>
//!     <note>Idle</note>
//!   </tuple>
//! </presence>
//! ```
//!
//! The `tuple` may sit anywhere below `presence`; `status`, `note` and `basic`
//! must be direct children of their parents. Namespaces are ignored.

use crate::error::{PresenceError, Result};
use crate::types::PresenceState;
use crate::xml::XmlTree;
use std::fmt;
use tracing::warn;

/// Longest note, in bytes, carried through to the store and notification
pub const DEFAULT_NOTE_LIMIT: usize = 31;

/// Basic presence status values as defined in RFC 3863
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasicStatus {
    Open,
    Closed,
}

impl BasicStatus {
    /// Exact, case-sensitive match on the `<basic>` text
    pub fn from_pidf_text(text: &str) -> Result<Self> {
        match text {
            "open" => Ok(BasicStatus::Open),
            "closed" => Ok(BasicStatus::Closed),
            other => Err(PresenceError::UnexpectedValue(format!(
                "<basic> must be 'open' or 'closed', got {:?}",
                other
            ))),
        }
    }

    pub fn presence_state(&self) -> PresenceState {
        match self {
            BasicStatus::Open => PresenceState::Available,
            BasicStatus::Closed => PresenceState::Unavailable,
        }
    }
}

impl fmt::Display for BasicStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BasicStatus::Open => write!(f, "open"),
            BasicStatus::Closed => write!(f, "closed"),
        }
    }
}

/// The fields of a PIDF document that drive a presence update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PidfUpdate {
    pub basic: BasicStatus,
    /// Note text, already truncated; empty when the tuple has no `<note>`
    pub note: String,
}

impl PidfUpdate {
    /// Walk a parsed document and pull out the basic status and note.
    pub fn from_tree<T: XmlTree>(doc: &T, note_limit: usize) -> Result<Self> {
        let root = doc
            .root()
            .ok_or_else(|| structure_error("document has no root element"))?;

        if doc.name(root) != "presence" {
            return Err(structure_error(&format!(
                "root element is <{}>, expected <presence>",
                doc.name(root)
            )));
        }

        let tuple = doc
            .find_descendant(root, "tuple")
            .ok_or_else(|| structure_error("no <tuple> element under <presence>"))?;

        let note = doc
            .find_child(tuple, "note")
            .map(|node| truncate_note(doc.text(node), note_limit))
            .unwrap_or_default();

        let status = doc
            .find_child(tuple, "status")
            .ok_or_else(|| structure_error("no <status> element in <tuple>"))?;

        let basic = doc
            .find_child(status, "basic")
            .ok_or_else(|| structure_error("no <basic> element in <status>"))?;

        let basic = BasicStatus::from_pidf_text(&doc.text(basic)).inspect_err(|e| {
            warn!("PIDF presence update rejected: {}", e);
        })?;

        Ok(Self { basic, note })
    }

    pub fn presence_state(&self) -> PresenceState {
        self.basic.presence_state()
    }
}

fn structure_error(what: &str) -> PresenceError {
    warn!("PIDF presence update rejected: {}", what);
    PresenceError::Structure(what.to_string())
}

/// Cut `note` to at most `limit` bytes without splitting a character.
pub fn truncate_note(mut note: String, limit: usize) -> String {
    if note.len() > limit {
        let mut end = limit;
        while !note.is_char_boundary(end) {
            end -= 1;
        }
        note.truncate(end);
    }
    note
}
