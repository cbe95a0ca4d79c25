//! The runtime contract: what the manager requires from the remote runtime.
//!
//! Two surfaces share one connection:
//!
//! | Surface | Trait | What it does |
//! |---------|-------|-------------|
//! | Admin | [`AdminSurface`] | Install, bind, list and start instances |
//! | Call | [`CallSurface`] | Application-level calls into one instance |
//!
//! A [`Connector`] turns a [`ConnectionConfig`] into a connected
//! [`Runtime`]. Implementations: `waypoint-http` (JSON-RPC over HTTP) and,
//! behind the `test-utils` feature, an in-memory runtime.

use crate::config::ConnectionConfig;
use crate::error::RuntimeError;
use crate::id::{InstanceId, InterfaceId};
use crate::instance::{CloneOutcome, InstallRequest, Instance, InstanceBinding, InterfaceInfo};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Admin requests the manager issues, by their runtime request names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdminMethod {
    /// `instance/list`
    #[serde(rename = "instance/list")]
    ListInstances,
    /// `dna/install_from_file`
    #[serde(rename = "dna/install_from_file")]
    InstallFromFile,
    /// `instance/add`
    #[serde(rename = "instance/add")]
    AddInstance,
    /// `interface/list`
    #[serde(rename = "interface/list")]
    ListInterfaces,
    /// `interface/add_instance`
    #[serde(rename = "interface/add_instance")]
    AddInstanceToInterface,
    /// `instance/running`
    #[serde(rename = "instance/running")]
    RunningInstances,
    /// `instance/start`
    #[serde(rename = "instance/start")]
    StartInstance,
}

impl AdminMethod {
    /// Every admin request, in contract order.
    pub const ALL: [AdminMethod; 7] = [
        Self::ListInstances,
        Self::InstallFromFile,
        Self::AddInstance,
        Self::ListInterfaces,
        Self::AddInstanceToInterface,
        Self::RunningInstances,
        Self::StartInstance,
    ];

    /// Runtime request name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ListInstances => "instance/list",
            Self::InstallFromFile => "dna/install_from_file",
            Self::AddInstance => "instance/add",
            Self::ListInterfaces => "interface/list",
            Self::AddInstanceToInterface => "interface/add_instance",
            Self::RunningInstances => "instance/running",
            Self::StartInstance => "instance/start",
        }
    }
}

impl fmt::Display for AdminMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The runtime's management API.
///
/// None of these requests are idempotent on the runtime side except the
/// list requests; callers must not blindly retry a failed sequence.
#[async_trait]
pub trait AdminSurface: Send + Sync {
    /// Full instance inventory.
    async fn list_instances(&self) -> Result<Vec<Instance>, RuntimeError>;

    /// Install a network from a template file with override properties.
    async fn install_from_file(
        &self,
        request: InstallRequest,
    ) -> Result<CloneOutcome, RuntimeError>;

    /// Bind an instance id to an agent and a network.
    async fn add_instance(&self, binding: &InstanceBinding) -> Result<(), RuntimeError>;

    /// Enumerate call interfaces.
    async fn list_interfaces(&self) -> Result<Vec<InterfaceInfo>, RuntimeError>;

    /// Make an instance reachable through an interface.
    async fn add_instance_to_interface(
        &self,
        instance: &InstanceId,
        interface: &InterfaceId,
    ) -> Result<(), RuntimeError>;

    /// Ids of the instances currently running.
    async fn running_instances(&self) -> Result<Vec<InstanceId>, RuntimeError>;

    /// Start a stopped instance.
    async fn start_instance(&self, instance: &InstanceId) -> Result<(), RuntimeError>;
}

/// The runtime's application-level call API.
#[async_trait]
pub trait CallSurface: Send + Sync {
    /// Invoke `operation` of `capability` inside `instance`.
    ///
    /// Implementations must report a runtime timeout as
    /// [`RuntimeError::Timeout`] and any other failure payload as
    /// [`RuntimeError::Remote`].
    async fn call(
        &self,
        instance: &InstanceId,
        capability: &str,
        operation: &str,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, RuntimeError>;
}

/// A connected runtime: both surfaces over one connection.
pub trait Runtime: AdminSurface + CallSurface {}

impl<T: AdminSurface + CallSurface + ?Sized> Runtime for T {}

/// Establishes the connection `init` runs on.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connect and complete the runtime handshake.
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Runtime>, RuntimeError>;
}
