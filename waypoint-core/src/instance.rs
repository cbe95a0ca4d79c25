//! Data model shared between the manager and runtime implementations.

use crate::id::{AgentId, InstanceId, InterfaceId, NetworkHash, NetworkId};
use serde::{Deserialize, Serialize};

/// One deployed, addressable copy of a network bound to an agent.
///
/// The runtime is the only owner of instances. A local copy goes stale as
/// soon as anything is provisioned or started and must be re-fetched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instance {
    /// Instance identifier.
    pub id: InstanceId,
    /// Network the instance runs.
    #[serde(rename = "dna")]
    pub network_id: NetworkId,
    /// Agent the instance acts as.
    #[serde(rename = "agent")]
    pub agent_id: AgentId,
}

impl Instance {
    /// Create an instance record.
    pub fn new(
        id: impl Into<InstanceId>,
        network_id: impl Into<NetworkId>,
        agent_id: impl Into<AgentId>,
    ) -> Self {
        Self {
            id: id.into(),
            network_id: network_id.into(),
            agent_id: agent_id.into(),
        }
    }
}

/// Result of installing a network from a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloneOutcome {
    /// Whether the runtime accepted the install.
    pub success: bool,
    /// Hash of the installed network.
    pub dna_hash: NetworkHash,
}

/// Request body for `dna/install_from_file`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallRequest {
    /// Identifier the new network is installed under.
    pub id: NetworkId,
    /// Template resource path the runtime reads.
    pub path: String,
    /// Properties overriding the template's defaults.
    pub properties: serde_json::Value,
    /// Copy the template file instead of referencing it in place.
    pub copy: bool,
}

/// Request body for `instance/add`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceBinding {
    /// New instance identifier.
    pub id: InstanceId,
    /// Agent the instance will act as.
    pub agent_id: AgentId,
    /// Network the instance will run.
    #[serde(rename = "dna_id")]
    pub network_id: NetworkId,
}

/// A call interface exposed by the runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceInfo {
    /// Interface identifier.
    pub id: InterfaceId,
    /// Whether the interface also accepts admin requests.
    #[serde(default)]
    pub admin: bool,
    /// Driver description as reported by the runtime (`{"type": "websocket", "port": 3000}`).
    #[serde(default)]
    pub driver: serde_json::Value,
    /// Instances currently reachable through this interface.
    #[serde(default)]
    pub instances: Vec<InterfaceInstance>,
}

impl InterfaceInfo {
    /// Create an interface record with no bound instances.
    pub fn new(id: impl Into<InterfaceId>) -> Self {
        Self {
            id: id.into(),
            admin: false,
            driver: serde_json::Value::Null,
            instances: Vec::new(),
        }
    }

    /// Whether `instance` is already reachable through this interface.
    pub fn serves(&self, instance: &InstanceId) -> bool {
        self.instances.iter().any(|i| &i.id == instance)
    }
}

/// Reference to an instance inside an [`InterfaceInfo`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceInstance {
    /// The bound instance.
    pub id: InstanceId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn instance_uses_runtime_field_names() {
        let inst: Instance =
            serde_json::from_value(json!({"id": "inst-1", "dna": "net-1", "agent": "alice"}))
                .unwrap();
        assert_eq!(inst, Instance::new("inst-1", "net-1", "alice"));

        let back = serde_json::to_value(&inst).unwrap();
        assert_eq!(back["dna"], "net-1");
        assert_eq!(back["agent"], "alice");
    }

    #[test]
    fn binding_serializes_dna_id() {
        let b = InstanceBinding {
            id: "inst-2".into(),
            agent_id: "bob".into(),
            network_id: "net-2".into(),
        };
        let v = serde_json::to_value(&b).unwrap();
        assert_eq!(v, json!({"id": "inst-2", "agent_id": "bob", "dna_id": "net-2"}));
    }

    #[test]
    fn interface_defaults_missing_fields() {
        let iface: InterfaceInfo = serde_json::from_value(json!({"id": "ws"})).unwrap();
        assert!(!iface.admin);
        assert!(iface.instances.is_empty());
        assert!(!iface.serves(&"x".into()));
    }
}
