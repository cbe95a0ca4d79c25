//! InMemoryRuntime: scripted runtime implementing both surfaces.

use crate::error::{RemoteFailure, RuntimeError};
use crate::id::{InstanceId, InterfaceId, NetworkHash, NetworkId};
use crate::instance::{
    CloneOutcome, InstallRequest, Instance, InstanceBinding, InterfaceInfo, InterfaceInstance,
};
use crate::runtime::{AdminMethod, AdminSurface, CallSurface};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Handler deciding what an application call returns.
pub type CallHandler = Arc<
    dyn Fn(&InstanceId, &str, &str, &serde_json::Value) -> Result<serde_json::Value, RuntimeError>
        + Send
        + Sync,
>;

/// One request received by an [`InMemoryRuntime`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeOp {
    /// An admin request.
    Admin(AdminMethod),
    /// An application call.
    Call {
        /// Target instance.
        instance: InstanceId,
        /// Capability called.
        capability: String,
        /// Operation called.
        operation: String,
    },
}

#[derive(Default)]
struct RuntimeState {
    instances: Vec<Instance>,
    // Added instances not yet visible to `instance/list`, with the number
    // of list requests that will still miss them.
    pending: Vec<(Instance, u32)>,
    running: BTreeSet<InstanceId>,
    interfaces: Vec<InterfaceInfo>,
    installed: BTreeMap<NetworkId, NetworkHash>,
    templates: BTreeSet<String>,
    failures: HashMap<AdminMethod, RuntimeError>,
    call_failure: Option<RuntimeError>,
    call_handler: Option<CallHandler>,
    settle_lag: u32,
    ops: Vec<RuntimeOp>,
}

impl RuntimeState {
    fn admin(&mut self, method: AdminMethod) -> Result<(), RuntimeError> {
        self.ops.push(RuntimeOp::Admin(method));
        match self.failures.get(&method) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn knows(&self, id: &InstanceId) -> bool {
        self.instances.iter().any(|i| &i.id == id) || self.pending.iter().any(|(i, _)| &i.id == id)
    }

    fn knows_network(&self, id: &NetworkId) -> bool {
        self.installed.contains_key(id) || self.instances.iter().any(|i| &i.network_id == id)
    }
}

fn rejected(message: String) -> RuntimeError {
    RuntimeError::Remote(RemoteFailure::message(message).with_code(-32602))
}

/// In-memory runtime backed by plain collections behind a `Mutex`.
///
/// The default call handler echoes the routing information back:
/// `{"instance", "capability", "operation", "args"}`.
pub struct InMemoryRuntime {
    state: Mutex<RuntimeState>,
}

impl InMemoryRuntime {
    /// Create an empty runtime.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RuntimeState::default()),
        }
    }

    /// Create a runtime already running one instance of `root`.
    pub fn with_root(instance: &str, root: &str, agent: &str) -> Self {
        Self::new()
            .with_running(Instance::new(instance, root, agent))
            .with_interface(InterfaceInfo::new("websocket-interface"))
    }

    fn state(&self) -> MutexGuard<'_, RuntimeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a stopped instance to the inventory.
    #[must_use]
    pub fn with_instance(self, instance: Instance) -> Self {
        self.state().instances.push(instance);
        self
    }

    /// Add a running instance to the inventory.
    #[must_use]
    pub fn with_running(self, instance: Instance) -> Self {
        {
            let mut state = self.state();
            state.running.insert(instance.id.clone());
            state.instances.push(instance);
        }
        self
    }

    /// Add a call interface.
    #[must_use]
    pub fn with_interface(self, interface: InterfaceInfo) -> Self {
        self.state().interfaces.push(interface);
        self
    }

    /// Accept installs only from these template paths. Without any
    /// template every path is accepted.
    #[must_use]
    pub fn with_template(self, path: impl Into<String>) -> Self {
        self.state().templates.insert(path.into());
        self
    }

    /// Number of `instance/list` requests that miss a newly added instance.
    #[must_use]
    pub fn with_settle_lag(self, lag: u32) -> Self {
        self.state().settle_lag = lag;
        self
    }

    /// Fail every future `method` request with `err`.
    pub fn fail(&self, method: AdminMethod, err: RuntimeError) {
        self.state().failures.insert(method, err);
    }

    /// Stop failing `method`.
    pub fn recover(&self, method: AdminMethod) {
        self.state().failures.remove(&method);
    }

    /// Fail every future application call with `err`.
    pub fn fail_calls(&self, err: RuntimeError) {
        self.state().call_failure = Some(err);
    }

    /// Replace the call handler.
    pub fn on_call(&self, handler: CallHandler) {
        self.state().call_handler = Some(handler);
    }

    /// Every request received so far, in order.
    pub fn ops(&self) -> Vec<RuntimeOp> {
        self.state().ops.clone()
    }

    /// How many times `method` was requested.
    pub fn admin_count(&self, method: AdminMethod) -> usize {
        self.state()
            .ops
            .iter()
            .filter(|op| **op == RuntimeOp::Admin(method))
            .count()
    }

    /// How many application calls were received.
    pub fn call_count(&self) -> usize {
        self.state()
            .ops
            .iter()
            .filter(|op| matches!(op, RuntimeOp::Call { .. }))
            .count()
    }

    /// Whether `instance` is running.
    pub fn is_running(&self, instance: &InstanceId) -> bool {
        self.state().running.contains(instance)
    }

    /// Whether `interface` serves `instance`.
    pub fn interface_serves(&self, interface: &InterfaceId, instance: &InstanceId) -> bool {
        self.state()
            .interfaces
            .iter()
            .any(|i| &i.id == interface && i.serves(instance))
    }
}

impl Default for InMemoryRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AdminSurface for InMemoryRuntime {
    async fn list_instances(&self) -> Result<Vec<Instance>, RuntimeError> {
        let mut state = self.state();
        state.admin(AdminMethod::ListInstances)?;

        let pending = std::mem::take(&mut state.pending);
        for (instance, remaining) in pending {
            if remaining == 0 {
                state.instances.push(instance);
            } else {
                state.pending.push((instance, remaining - 1));
            }
        }
        Ok(state.instances.clone())
    }

    async fn install_from_file(
        &self,
        request: InstallRequest,
    ) -> Result<CloneOutcome, RuntimeError> {
        let mut state = self.state();
        state.admin(AdminMethod::InstallFromFile)?;

        if !state.templates.is_empty() && !state.templates.contains(&request.path) {
            return Err(rejected(format!("template not found: {}", request.path)));
        }
        if state.knows_network(&request.id) {
            return Err(rejected(format!("dna already installed: {}", request.id)));
        }
        let hash = NetworkHash::new(format!("Qm{}", request.id));
        state.installed.insert(request.id, hash.clone());
        Ok(CloneOutcome {
            success: true,
            dna_hash: hash,
        })
    }

    async fn add_instance(&self, binding: &InstanceBinding) -> Result<(), RuntimeError> {
        let mut state = self.state();
        state.admin(AdminMethod::AddInstance)?;

        if state.knows(&binding.id) {
            return Err(rejected(format!("instance already exists: {}", binding.id)));
        }
        if !state.knows_network(&binding.network_id) {
            return Err(rejected(format!("unknown dna: {}", binding.network_id)));
        }
        let lag = state.settle_lag;
        state.pending.push((
            Instance {
                id: binding.id.clone(),
                network_id: binding.network_id.clone(),
                agent_id: binding.agent_id.clone(),
            },
            lag,
        ));
        Ok(())
    }

    async fn list_interfaces(&self) -> Result<Vec<InterfaceInfo>, RuntimeError> {
        let mut state = self.state();
        state.admin(AdminMethod::ListInterfaces)?;
        Ok(state.interfaces.clone())
    }

    async fn add_instance_to_interface(
        &self,
        instance: &InstanceId,
        interface: &InterfaceId,
    ) -> Result<(), RuntimeError> {
        let mut state = self.state();
        state.admin(AdminMethod::AddInstanceToInterface)?;

        if !state.knows(instance) {
            return Err(rejected(format!("unknown instance: {instance}")));
        }
        let iface = state
            .interfaces
            .iter_mut()
            .find(|i| &i.id == interface)
            .ok_or_else(|| rejected(format!("unknown interface: {interface}")))?;
        if !iface.serves(instance) {
            iface.instances.push(InterfaceInstance {
                id: instance.clone(),
            });
        }
        Ok(())
    }

    async fn running_instances(&self) -> Result<Vec<InstanceId>, RuntimeError> {
        let mut state = self.state();
        state.admin(AdminMethod::RunningInstances)?;
        Ok(state.running.iter().cloned().collect())
    }

    async fn start_instance(&self, instance: &InstanceId) -> Result<(), RuntimeError> {
        let mut state = self.state();
        state.admin(AdminMethod::StartInstance)?;

        if !state.knows(instance) {
            return Err(rejected(format!("unknown instance: {instance}")));
        }
        if !state.running.insert(instance.clone()) {
            return Err(rejected(format!("instance already running: {instance}")));
        }
        Ok(())
    }
}

#[async_trait]
impl CallSurface for InMemoryRuntime {
    async fn call(
        &self,
        instance: &InstanceId,
        capability: &str,
        operation: &str,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, RuntimeError> {
        let handler = {
            let mut state = self.state();
            state.ops.push(RuntimeOp::Call {
                instance: instance.clone(),
                capability: capability.to_owned(),
                operation: operation.to_owned(),
            });
            if let Some(err) = &state.call_failure {
                return Err(err.clone());
            }
            if !state.knows(instance) {
                return Err(rejected(format!("unknown instance: {instance}")));
            }
            state.call_handler.clone()
        };

        match handler {
            Some(handler) => handler(instance, capability, operation, &args),
            None => Ok(serde_json::json!({
                "instance": instance,
                "capability": capability,
                "operation": operation,
                "args": args,
            })),
        }
    }
}
