#![deny(missing_docs)]
//! Connection and instance-navigation manager.
//!
//! A [`ConnectionManager`] owns the single connection to the runtime, the
//! [`InstanceRegistry`] mirroring its inventory and the breadcrumb
//! [`NavigationStack`] of networks the session has descended into. Every
//! application call is routed to the instance of the current network.
//!
//! | Type | Role |
//! |------|------|
//! | [`ConnectionManager`] | Lifecycle, call routing, navigation |
//! | [`NetworkProvisioner`] | Clone, register and start networks |
//! | [`InstanceRegistry`] | Generation-stamped inventory snapshots |
//! | [`NavigationStack`] | Root-first trail of networks |
//! | [`Position`] | Serializable snapshot of where a session is |
//!
//! The transport is injected through [`waypoint_core::Connector`]; there is
//! no process-wide state, so several managers can coexist.

pub mod manager;
pub mod navigation;
pub mod provisioner;
pub mod registry;

pub use manager::{ConnectionManager, Position};
pub use navigation::NavigationStack;
pub use provisioner::NetworkProvisioner;
pub use registry::{InstanceRegistry, RegistrySnapshot};
