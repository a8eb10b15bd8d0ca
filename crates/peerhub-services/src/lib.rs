//! peerhub-services — the registry and dispatch engine.
//!
//! Connections register and unregister through a [`Registrar`]; a single
//! [`RegistryController`] task applies those events to the
//! [`ClientDirectory`]; the [`Dispatcher`] reads the directory to deliver
//! payloads to one peer at a time.

pub mod controller;
pub mod directory;
pub mod dispatcher;
pub mod handle;
pub mod hub;

pub use controller::{Registrar, RegistryController};
pub use directory::ClientDirectory;
pub use dispatcher::{encode, Delivery, Dispatcher, EncodeError};
pub use handle::{ConnectionError, PeerHandle};
pub use hub::Hub;
