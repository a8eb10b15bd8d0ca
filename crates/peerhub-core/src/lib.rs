//! peerhub-core — configuration, wire envelope, and peer identifier rules.
//! The services and daemon crates both depend on this one.

pub mod config;
pub mod envelope;
pub mod peer_id;

pub use envelope::{Envelope, InboundFrame};
pub use peer_id::{validate_peer_id, PeerIdError};
