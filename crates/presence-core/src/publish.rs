//! PUBLISH acceptance for the `presence` event package
//!
//! A publication is accepted or refused on its Content-Type alone. Once a
//! PIDF body is accepted the sender gets a 200 whatever the interpreter makes
//! of it; a document that fails to parse is logged and dropped.

use crate::error::ErrorKind;
use crate::interpreter::PresenceInterpreter;
use crate::notify::PresenceNotifier;
use crate::store::PresenceStore;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// MIME media type of a message body: `type/subtype;param=value`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    pub typ: String,
    pub subtype: String,
    pub parameters: HashMap<String, String>,
}

impl MediaType {
    pub fn new(typ: &str, subtype: &str) -> Self {
        MediaType {
            typ: typ.to_lowercase(),
            subtype: subtype.to_lowercase(),
            parameters: HashMap::new(),
        }
    }

    /// `application/pidf+xml`
    pub fn pidf() -> Self {
        MediaType::new("application", "pidf+xml")
    }

    pub fn is_pidf(&self) -> bool {
        self.typ == "application" && self.subtype == "pidf+xml"
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.typ, self.subtype)?;
        for (name, value) in &self.parameters {
            write!(f, ";{}={}", name, value)?;
        }
        Ok(())
    }
}

impl FromStr for MediaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(';');
        let essence = parts.next().unwrap_or_default().trim();

        let (typ, subtype) = essence
            .split_once('/')
            .map(|(t, st)| (t.trim(), st.trim()))
            .filter(|(t, st)| !t.is_empty() && !st.is_empty())
            .ok_or_else(|| format!("invalid media type: {:?}", s))?;

        let mut media = MediaType::new(typ, subtype);
        for param in parts {
            if let Some((name, value)) = param.split_once('=') {
                media.parameters.insert(
                    name.trim().to_lowercase(),
                    value.trim().trim_matches('"').to_string(),
                );
            }
        }
        Ok(media)
    }
}

/// Transport-level answer to a PUBLISH
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The publication was accepted. `applied` tells whether the body
    /// produced a presence update; `error` names why it did not.
    Accepted {
        status: u16,
        applied: bool,
        error: Option<ErrorKind>,
    },
    /// The publication was refused before looking at the body
    Rejected { status: u16, reason: String },
}

impl PublishOutcome {
    pub fn status(&self) -> u16 {
        match self {
            PublishOutcome::Accepted { status, .. } | PublishOutcome::Rejected { status, .. } => {
                *status
            }
        }
    }
}

/// Entry point for presence publications from SIP endpoints
pub struct PublishHandler<S: ?Sized, N: ?Sized> {
    interpreter: PresenceInterpreter<S, N>,
}

impl<S, N> PublishHandler<S, N>
where
    S: PresenceStore + ?Sized,
    N: PresenceNotifier + ?Sized,
{
    pub fn new(interpreter: PresenceInterpreter<S, N>) -> Self {
        Self { interpreter }
    }

    /// Handle a PUBLISH from `endpoint` carrying `body` of `content_type`.
    ///
    /// A missing Content-Type is only acceptable together with an empty body
    /// (a refresh that carries no new state).
    pub fn handle_publish(
        &self,
        endpoint: &str,
        content_type: Option<&str>,
        body: &[u8],
    ) -> PublishOutcome {
        if body.is_empty() {
            debug!("Presence refresh from {} without body", endpoint);
            return PublishOutcome::Accepted {
                status: 200,
                applied: false,
                error: None,
            };
        }

        let media = match content_type.map(str::parse::<MediaType>) {
            Some(Ok(media)) if media.is_pidf() => media,
            Some(Ok(media)) => {
                info!("Rejecting presence publication from {} with body type {}", endpoint, media);
                return PublishOutcome::Rejected {
                    status: 415,
                    reason: format!("Unsupported body type {}/{}", media.typ, media.subtype),
                };
            }
            Some(Err(e)) => {
                info!("Rejecting presence publication from {}: {}", endpoint, e);
                return PublishOutcome::Rejected {
                    status: 415,
                    reason: e,
                };
            }
            None => {
                info!("Rejecting presence publication from {} without Content-Type", endpoint);
                return PublishOutcome::Rejected {
                    status: 415,
                    reason: "Missing Content-Type".to_string(),
                };
            }
        };

        if let Some(charset) = media.parameters.get("charset") {
            if !charset.eq_ignore_ascii_case("utf-8") {
                warn!("PIDF from {} declares charset {}, parsing as UTF-8", endpoint, charset);
            }
        }

        match self.interpreter.parse_and_publish(body, endpoint) {
            Ok(_) => PublishOutcome::Accepted {
                status: 200,
                applied: true,
                error: None,
            },
            Err(e) => {
                debug!("Accepted publication from {} but dropped its body: {}", endpoint, e);
                PublishOutcome::Accepted {
                    status: 200,
                    applied: false,
                    error: Some(e.kind()),
                }
            }
        }
    }
}
