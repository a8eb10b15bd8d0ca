//! Peer handle — the in-process face of one connected peer.

use std::fmt;
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Why a payload could not be queued for a peer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionError {
    /// The registry closed this handle's outbound queue.
    #[error("outbound queue closed")]
    Closed,
    /// The connection's writer is not keeping up.
    #[error("outbound queue full ({capacity} messages)")]
    QueueFull { capacity: usize },
    /// The connection's writer dropped its end of the queue.
    #[error("connection writer has gone away")]
    Disconnected,
}

struct Inner {
    peer_id: String,
    remote_addr: Option<SocketAddr>,
    capacity: usize,
    connected_at: Instant,
    // None once closed. Taking the sender out is what closes the queue.
    outbound: RwLock<Option<mpsc::Sender<Bytes>>>,
}

/// Shared handle for one connected peer.
///
/// Clones refer to the same peer and the same outbound queue. The
/// connection task owns the receiving half returned by [`PeerHandle::new`]
/// and drains it onto the transport; it learns that delivery must stop
/// when `recv()` returns `None`.
#[derive(Clone)]
pub struct PeerHandle {
    inner: Arc<Inner>,
}

impl PeerHandle {
    /// Create a handle and its outbound queue. `capacity` is clamped to at least 1.
    pub fn new(
        peer_id: impl Into<String>,
        remote_addr: Option<SocketAddr>,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<Bytes>) {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        let handle = Self {
            inner: Arc::new(Inner {
                peer_id: peer_id.into(),
                remote_addr,
                capacity,
                connected_at: Instant::now(),
                outbound: RwLock::new(Some(tx)),
            }),
        };
        (handle, rx)
    }

    pub fn peer_id(&self) -> &str {
        &self.inner.peer_id
    }

    /// Remote transport address, when the connection has one.
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.inner.remote_addr
    }

    pub fn connected_for(&self) -> Duration {
        self.inner.connected_at.elapsed()
    }

    /// Queue a payload for the connection writer. Never blocks.
    pub fn send(&self, payload: Bytes) -> Result<(), ConnectionError> {
        let guard = self
            .inner
            .outbound
            .read()
            .unwrap_or_else(|e| e.into_inner());
        let tx = guard.as_ref().ok_or(ConnectionError::Closed)?;
        tx.try_send(payload).map_err(|e| match e {
            TrySendError::Full(_) => ConnectionError::QueueFull {
                capacity: self.inner.capacity,
            },
            TrySendError::Closed(_) => ConnectionError::Disconnected,
        })
    }

    /// Close the outbound queue. Returns false if it was already closed.
    ///
    /// Payloads queued before the close are still drained by the writer.
    pub fn close_outbound(&self) -> bool {
        self.inner
            .outbound
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.inner
            .outbound
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_none()
    }

    /// True if both handles refer to the same registration.
    pub fn same_handle(&self, other: &PeerHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for PeerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerHandle")
            .field("peer_id", &self.inner.peer_id)
            .field("remote_addr", &self.inner.remote_addr)
            .field("closed", &self.is_closed())
            .finish()
    }
}
