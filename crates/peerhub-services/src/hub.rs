//! Hub — process-scoped owner of the directory and its controller.

use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::controller::{Registrar, RegistryController};
use crate::directory::ClientDirectory;
use crate::dispatcher::Dispatcher;

/// Everything a connection or application task needs to reach the registry.
///
/// Construct once per process and share by cloning its parts. The
/// controller stops when [`Hub::shutdown`] is called or the hub is dropped.
pub struct Hub {
    directory: ClientDirectory,
    registrar: Registrar,
    dispatcher: Dispatcher,
    shutdown: broadcast::Sender<()>,
    started_at: Instant,
}

impl Hub {
    /// Build a hub and the controller that must be run for it to make progress.
    pub fn new() -> (Self, RegistryController) {
        let directory = ClientDirectory::new();
        let (shutdown, shutdown_rx) = broadcast::channel(1);
        let (registrar, controller) = RegistryController::new(directory.clone(), shutdown_rx);
        let hub = Self {
            dispatcher: Dispatcher::new(directory.clone()),
            directory,
            registrar,
            shutdown,
            started_at: Instant::now(),
        };
        (hub, controller)
    }

    /// Build a hub and spawn its controller on the current runtime.
    pub fn start() -> (Self, JoinHandle<anyhow::Result<()>>) {
        let (hub, controller) = Self::new();
        let task = tokio::spawn(controller.run());
        (hub, task)
    }

    pub fn registrar(&self) -> &Registrar {
        &self.registrar
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn directory(&self) -> &ClientDirectory {
        &self.directory
    }

    /// Current number of registered peers.
    pub fn live_count(&self) -> usize {
        self.directory.count()
    }

    /// When this hub was constructed.
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Ask the controller to stop. Events submitted afterwards are dropped.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(());
    }
}
