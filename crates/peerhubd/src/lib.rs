//! peerhubd — reference daemon around the peerhub registry.
//!
//! Exposed as a library so the integration tests can drive the acceptor
//! and status handlers in-process.

pub mod acceptor;
pub mod status;
