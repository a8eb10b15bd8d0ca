//! Registry controller — the single writer of the client directory.
//!
//! Connections never touch the directory directly. They submit events
//! through a [`Registrar`]; the controller drains one intake channel and
//! applies each event before taking the next, so joins and leaves are
//! linearized and the live count stays in step with the table.

use tokio::sync::{broadcast, mpsc, oneshot};

use crate::directory::ClientDirectory;
use crate::handle::PeerHandle;

/// One unit of work for the controller loop.
#[derive(Debug)]
pub(crate) enum RegistryEvent {
    Register(PeerHandle),
    Unregister(PeerHandle),
    /// Acknowledged once every event submitted before it has been applied.
    Settle(oneshot::Sender<()>),
}

/// Cloneable intake for registry events. Submitting never blocks.
#[derive(Clone)]
pub struct Registrar {
    events: mpsc::UnboundedSender<RegistryEvent>,
}

impl Registrar {
    pub fn submit_register(&self, handle: PeerHandle) {
        self.submit(RegistryEvent::Register(handle));
    }

    pub fn submit_unregister(&self, handle: PeerHandle) {
        self.submit(RegistryEvent::Unregister(handle));
    }

    /// Wait until everything this registrar submitted so far has been applied.
    ///
    /// Returns immediately if the controller has stopped.
    pub async fn settled(&self) {
        let (tx, rx) = oneshot::channel();
        self.submit(RegistryEvent::Settle(tx));
        let _ = rx.await;
    }

    fn submit(&self, event: RegistryEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("registry controller stopped, event dropped");
        }
    }
}

pub struct RegistryController {
    directory: ClientDirectory,
    events: mpsc::UnboundedReceiver<RegistryEvent>,
    shutdown: broadcast::Receiver<()>,
}

impl RegistryController {
    /// Build a controller over `directory` and the registrar that feeds it.
    pub fn new(
        directory: ClientDirectory,
        shutdown: broadcast::Receiver<()>,
    ) -> (Registrar, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        let controller = Self {
            directory,
            events: rx,
            shutdown,
        };
        (Registrar { events: tx }, controller)
    }

    /// Process events until shutdown fires or every registrar is dropped.
    pub async fn run(mut self) -> anyhow::Result<()> {
        loop {
            tokio::select! {
                _ = self.shutdown.recv() => {
                    tracing::info!(live = self.directory.count(), "registry controller shutting down");
                    return Ok(());
                }

                event = self.events.recv() => {
                    match event {
                        Some(event) => self.apply(event),
                        None => {
                            tracing::info!("all registrars dropped, registry controller exiting");
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    fn apply(&self, event: RegistryEvent) {
        match event {
            RegistryEvent::Register(handle) => self.register(handle),
            RegistryEvent::Unregister(handle) => self.unregister(handle),
            RegistryEvent::Settle(ack) => {
                let _ = ack.send(());
            }
        }
    }

    fn register(&self, handle: PeerHandle) {
        if handle.peer_id().is_empty() {
            return;
        }
        let peer_id = handle.peer_id().to_string();
        let addr = handle.remote_addr();
        if self.directory.put(peer_id.clone(), handle).is_some() {
            tracing::debug!(peer = %peer_id, "stale registration replaced");
        }
        tracing::info!(
            peer = %peer_id,
            addr = ?addr,
            live = self.directory.count(),
            "peer registered"
        );
    }

    fn unregister(&self, handle: PeerHandle) {
        let peer_id = handle.peer_id();
        if peer_id.is_empty() {
            return;
        }
        // Removing first means no later event can reach the same handle.
        let Some(current) = self.directory.remove(peer_id) else {
            tracing::trace!(peer = %peer_id, "unregister for absent peer ignored");
            return;
        };
        current.close_outbound();
        tracing::info!(
            peer = %peer_id,
            connected_secs = current.connected_for().as_secs(),
            live = self.directory.count(),
            "peer unregistered"
        );
    }
}
