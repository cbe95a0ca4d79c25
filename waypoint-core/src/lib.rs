//! # waypoint-core: runtime contract for the waypoint connection manager
//!
//! The manager talks to a peer-to-peer ledger runtime that hosts many
//! isolated networks ("instances"). This crate defines the vocabulary both
//! sides share, with no transport and no manager logic:
//!
//! | Module | What it holds |
//! |--------|---------------|
//! | [`id`] | Typed identifiers ([`InstanceId`], [`NetworkId`], [`AgentId`], ...) |
//! | [`instance`] | [`Instance`], [`CloneOutcome`], admin request bodies |
//! | [`runtime`] | [`AdminSurface`], [`CallSurface`], [`Runtime`], [`Connector`] |
//! | [`config`] | [`ConnectionConfig`], [`SettlePolicy`] |
//! | [`connection`] | [`ConnectionState`] |
//! | [`error`] | The error taxonomy |
//!
//! ## Timeouts
//!
//! A timeout is a variant ([`RuntimeError::Timeout`], [`CallError::RemoteTimeout`]),
//! never a message. Transports classify timeouts from their own signal or
//! from the runtime's error code.

#![deny(missing_docs)]

pub mod config;
pub mod connection;
pub mod duration;
pub mod error;
pub mod id;
pub mod instance;
pub mod runtime;

#[cfg(feature = "test-utils")]
pub mod test_utils;

// Re-exports for convenience
pub use config::{ConnectionConfig, SettlePolicy};
pub use connection::ConnectionState;
pub use duration::DurationMs;
pub use error::{
    CallError, ConfigError, ConnectionError, NavigationError, ProvisionError, ProvisionStep,
    RemoteFailure, RuntimeError,
};
pub use id::{AgentId, InstanceId, InterfaceId, NetworkHash, NetworkId};
pub use instance::{
    CloneOutcome, InstallRequest, Instance, InstanceBinding, InterfaceInfo, InterfaceInstance,
};
pub use runtime::{AdminMethod, AdminSurface, CallSurface, Connector, Runtime};
