//! JSON frames exchanged between connected peers through the hub.
//!
//! The hub itself only routes bytes; these types describe the reference
//! acceptor's line protocol. `body` is carried verbatim.

use serde::{Deserialize, Serialize};

/// A frame sent by a peer, addressed to another peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundFrame {
    /// Target peer identifier.
    pub to: String,
    /// Application payload. Structure is opaque to the hub.
    pub body: serde_json::Value,
}

/// What the target peer receives: the body plus the sender's identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub from: String,
    pub body: serde_json::Value,
}

impl InboundFrame {
    /// Parse one line of input. Surrounding whitespace is ignored.
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line.trim())
    }
}
