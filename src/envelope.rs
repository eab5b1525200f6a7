//! Shared envelope model (C5): the tagged union carried on the wire in both
//! directions.

use serde::{Deserialize, Serialize};

/// An opaque, server-assigned-by-convention identity string. The server never
/// validates its structure; clients typically populate it with a UUID.
pub type OwnerId = String;

/// The reserved sentinel id denoting the noop sink (§3).
pub const NOOP_OWNER_ID: &str = "ffffffff-ffff-ffff-ffff-ffffffffffff";

/// A tagged union with exactly two arms, identical on request and response
/// paths. The tag selects interpretation; an envelope carries exactly one
/// variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Envelope {
    /// A message submitted by `from`, destined for a server-chosen random peer.
    Message {
        /// The sender's owner id.
        from: OwnerId,
        /// Opaque payload.
        content: String,
    },
    /// A recipient's confirmation of a message, addressed back to `to`.
    Ack {
        /// The id of whoever is acknowledging the message.
        from: OwnerId,
        /// The original sender's owner id; this envelope is routed to them.
        to: OwnerId,
        /// The original content, verbatim.
        content: String,
    },
}

impl Envelope {
    /// Returns the envelope's sender, regardless of variant.
    pub fn from(&self) -> &str {
        match self {
            Envelope::Message { from, .. } => from,
            Envelope::Ack { from, .. } => from,
        }
    }
}
