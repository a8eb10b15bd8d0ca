//! Dispatcher — encodes a value and delivers it to one peer.
//!
//! Every failure is absorbed here. The caller gets a [`Delivery`] value
//! describing what happened and may ignore it; nothing is retried and
//! one peer's trouble never reaches another peer or the caller.

use bytes::Bytes;
use serde::Serialize;

use peerhub_core::Envelope;

use crate::directory::ClientDirectory;
use crate::handle::{ConnectionError, PeerHandle};

/// Outcome of a single dispatch. Informational, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Payload is in the peer's outbound queue.
    Queued,
    /// No peer is registered under that id.
    NotConnected,
    /// The value could not be encoded; nothing was sent.
    EncodeFailed,
    /// The peer was unregistered while the payload was in flight.
    Aborted,
    /// The peer's connection refused the payload.
    Failed,
}

#[derive(Debug, thiserror::Error)]
#[error("failed to encode payload: {0}")]
pub struct EncodeError(#[from] serde_json::Error);

/// Encode a value to the JSON bytes sent on the wire.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Bytes, EncodeError> {
    Ok(Bytes::from(serde_json::to_vec(value)?))
}

/// Read-only view over the directory that routes payloads to peers.
#[derive(Clone)]
pub struct Dispatcher {
    directory: ClientDirectory,
}

impl Dispatcher {
    pub fn new(directory: ClientDirectory) -> Self {
        Self { directory }
    }

    /// Encode `value` as JSON and queue it for `peer_id`.
    pub fn send_to_peer<T: Serialize + ?Sized>(&self, peer_id: &str, value: &T) -> Delivery {
        let payload = match encode(value) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(peer = %peer_id, error = %e, "payload encoding failed");
                return Delivery::EncodeFailed;
            }
        };
        self.send_bytes_to_peer(peer_id, payload)
    }

    /// Queue an already-encoded payload for `peer_id`.
    pub fn send_bytes_to_peer(&self, peer_id: &str, payload: Bytes) -> Delivery {
        match self.directory.get(peer_id) {
            Some(handle) => deliver(&handle, payload),
            None => Delivery::NotConnected,
        }
    }

    /// Wrap `body` in an [`Envelope`] stamped with the sender and deliver it.
    pub fn send_envelope(&self, from: &str, to: &str, body: serde_json::Value) -> Delivery {
        let envelope = Envelope {
            from: from.to_string(),
            body,
        };
        self.send_to_peer(to, &envelope)
    }

    /// Encode once and offer the payload to every registered peer.
    ///
    /// Returns how many peers accepted it.
    pub fn broadcast<T: Serialize + ?Sized>(&self, value: &T) -> usize {
        let payload = match encode(value) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(error = %e, "broadcast encoding failed");
                return 0;
            }
        };

        let handles = self.directory.handles();
        let targets = handles.len();
        let delivered = handles
            .iter()
            .filter(|h| deliver(h, payload.clone()) == Delivery::Queued)
            .count();

        tracing::debug!(targets, delivered, "broadcast dispatched");
        delivered
    }
}

fn deliver(handle: &PeerHandle, payload: Bytes) -> Delivery {
    let len = payload.len();
    match handle.send(payload) {
        Ok(()) => {
            tracing::trace!(peer = %handle.peer_id(), bytes = len, "payload queued");
            Delivery::Queued
        }
        Err(ConnectionError::Closed) => {
            tracing::warn!(peer = %handle.peer_id(), "delivery aborted, peer unregistered mid-send");
            Delivery::Aborted
        }
        Err(e) => {
            tracing::error!(peer = %handle.peer_id(), error = %e, "delivery failed");
            Delivery::Failed
        }
    }
}
