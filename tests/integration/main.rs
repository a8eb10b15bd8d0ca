//! peerhub integration test harness.
//!
//! Everything runs in-process: a hub with its controller spawned on the
//! test runtime, and for the daemon tests a real TCP acceptor bound to
//! an ephemeral loopback port.

mod dispatch;

use bytes::Bytes;
use tokio::sync::mpsc;

use peerhub_services::{Hub, PeerHandle};

// ── Harness ───────────────────────────────────────────────────────────────────

/// Outbound queue depth used by test peers.
pub const QUEUE: usize = 16;

/// A test peer: its handle plus the receiving end a connection writer would own.
pub struct TestPeer {
    pub handle: PeerHandle,
    pub outbound: mpsc::Receiver<Bytes>,
}

impl TestPeer {
    pub fn new(id: &str) -> Self {
        let (handle, outbound) = PeerHandle::new(id, None, QUEUE);
        Self { handle, outbound }
    }

    /// Drain everything currently queued, decoded as JSON.
    pub fn drain_json(&mut self) -> Vec<serde_json::Value> {
        let mut out = Vec::new();
        while let Ok(payload) = self.outbound.try_recv() {
            out.push(serde_json::from_slice(&payload).expect("payload is JSON"));
        }
        out
    }

    /// True once the registry has closed the queue and it is drained.
    pub fn is_closed(&mut self) -> bool {
        matches!(
            self.outbound.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        )
    }
}

/// Start a hub and register the given peers, waiting until they are applied.
pub async fn hub_with(ids: &[&str]) -> (Hub, Vec<TestPeer>) {
    let (hub, _task) = Hub::start();
    let peers: Vec<TestPeer> = ids.iter().map(|id| TestPeer::new(id)).collect();
    for p in &peers {
        hub.registrar().submit_register(p.handle.clone());
    }
    hub.registrar().settled().await;
    (hub, peers)
}
