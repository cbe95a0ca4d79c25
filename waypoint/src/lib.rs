#![deny(missing_docs)]
//! # waypoint: umbrella crate
//!
//! Single import surface for the waypoint workspace. Re-exports the runtime
//! contract, the manager and the HTTP transport behind feature flags, plus a
//! `prelude` for the common path:
//!
//! ```ignore
//! use std::sync::Arc;
//! use waypoint::prelude::*;
//!
//! let manager = ConnectionManager::new(Arc::new(HttpConnector::new()));
//! manager.init(ConnectionConfig::from_env()?).await?;
//! let profile = manager.call("profiles", "get_my_profile", serde_json::Value::Null).await?;
//! ```

#[cfg(feature = "core")]
pub use waypoint_core;
#[cfg(feature = "http")]
pub use waypoint_http;
#[cfg(feature = "nav")]
pub use waypoint_nav;

/// Happy-path imports.
pub mod prelude {
    #[cfg(feature = "core")]
    pub use waypoint_core::{
        AgentId, CallError, CloneOutcome, ConnectionConfig, ConnectionError, ConnectionState,
        Connector, DurationMs, Instance, InstanceId, InterfaceInfo, NavigationError, NetworkId,
        ProvisionError, ProvisionStep, Runtime, RuntimeError, SettlePolicy,
    };

    #[cfg(feature = "nav")]
    pub use waypoint_nav::{ConnectionManager, NetworkProvisioner, Position};

    #[cfg(feature = "http")]
    pub use waypoint_http::HttpConnector;
}
