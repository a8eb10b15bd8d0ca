//! Client directory — which peers are currently reachable.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::handle::PeerHandle;

/// Concurrent map from peer id to handle, plus a live-peer gauge.
///
/// Cloning is cheap and every clone sees the same table. Reads are open to
/// anyone; `put` and `remove` are crate-private so only the registry
/// controller mutates it.
#[derive(Clone, Default)]
pub struct ClientDirectory {
    peers: Arc<DashMap<String, PeerHandle>>,
    live: Arc<AtomicUsize>,
}

impl ClientDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the handle currently registered for `peer_id`.
    pub fn get(&self, peer_id: &str) -> Option<PeerHandle> {
        self.peers.get(peer_id).map(|e| e.value().clone())
    }

    pub fn contains(&self, peer_id: &str) -> bool {
        self.peers.contains_key(peer_id)
    }

    /// Number of registered peers. Does not touch the map.
    pub fn count(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    /// Sorted snapshot of registered peer ids.
    pub fn peer_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.peers.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Snapshot of every registered handle. No map locks are held afterwards.
    pub fn handles(&self) -> Vec<PeerHandle> {
        self.peers.iter().map(|e| e.value().clone()).collect()
    }

    /// Insert or replace. Returns the displaced handle, if any.
    pub(crate) fn put(&self, peer_id: String, handle: PeerHandle) -> Option<PeerHandle> {
        let previous = self.peers.insert(peer_id, handle);
        if previous.is_none() {
            self.live.fetch_add(1, Ordering::AcqRel);
        }
        previous
    }

    /// Remove and return the entry for `peer_id`, if present.
    pub(crate) fn remove(&self, peer_id: &str) -> Option<PeerHandle> {
        let removed = self.peers.remove(peer_id).map(|(_, h)| h);
        if removed.is_some() {
            self.live.fetch_sub(1, Ordering::AcqRel);
        }
        removed
    }
}
