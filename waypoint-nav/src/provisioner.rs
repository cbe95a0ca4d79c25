//! Creating, binding and starting networks.
//!
//! The runtime has no transactional "provision" request, so each operation
//! here is a short sequence of admin requests. A failure reports the
//! [`ProvisionStep`] it happened at; steps before it have taken effect on
//! the runtime and are not rolled back.

use std::sync::Arc;

use waypoint_core::{
    AdminSurface, AgentId, CloneOutcome, ConnectionConfig, InstallRequest, InstanceBinding,
    InstanceId, InterfaceInfo, NetworkId, ProvisionError, ProvisionStep, RemoteFailure, Runtime,
    RuntimeError, SettlePolicy,
};

use crate::manager::ConnectionManager;

/// Provisioning operations over a manager's connection.
///
/// Obtained from [`ConnectionManager::provisioner`]. Every operation
/// fails with [`ProvisionError::NotReady`] unless the manager is `Ready`.
/// Do not run `clone_network` or `register_network` concurrently for the
/// same network.
pub struct NetworkProvisioner<'m> {
    manager: &'m ConnectionManager,
}

impl<'m> NetworkProvisioner<'m> {
    pub(crate) fn new(manager: &'m ConnectionManager) -> Self {
        Self { manager }
    }

    fn connection(&self) -> Result<(Arc<dyn Runtime>, Arc<ConnectionConfig>), ProvisionError> {
        self.manager
            .ready_session()
            .map_err(ProvisionError::NotReady)
    }

    /// Install `network` as a copy of the configured template with
    /// `properties` overriding the template's own.
    pub async fn clone_network(
        &self,
        network: &NetworkId,
        properties: serde_json::Value,
    ) -> Result<CloneOutcome, ProvisionError> {
        let (runtime, config) = self.connection()?;
        tracing::info!(network = %network, template = %config.template_path, "cloning network");

        let request = InstallRequest {
            id: network.clone(),
            path: config.template_path.clone(),
            properties,
            copy: true,
        };
        let outcome = runtime
            .install_from_file(request)
            .await
            .map_err(|err| match err {
                RuntimeError::Remote(failure) => ProvisionError::InstallRejected {
                    network: network.clone(),
                    failure,
                },
                other => ProvisionError::Step {
                    step: ProvisionStep::Install,
                    source: other,
                },
            })?;

        if !outcome.success {
            return Err(ProvisionError::InstallRejected {
                network: network.clone(),
                failure: RemoteFailure::message("runtime reported an unsuccessful install"),
            });
        }
        tracing::info!(network = %network, hash = %outcome.dna_hash, "network installed");
        Ok(outcome)
    }

    /// Bind `instance` to `agent` and `network`, expose it on the interface
    /// `choose_interface` selects, and wait until the runtime lists it.
    ///
    /// The steps run strictly in order. The registry is only refreshed by
    /// the final settle step; failures before it leave both the registry
    /// and the navigation trail untouched.
    pub async fn register_network<F>(
        &self,
        agent: &AgentId,
        network: &NetworkId,
        instance: &InstanceId,
        choose_interface: F,
    ) -> Result<(), ProvisionError>
    where
        F: FnOnce(&[InterfaceInfo]) -> Option<&InterfaceInfo> + Send,
    {
        let (runtime, config) = self.connection()?;

        let binding = InstanceBinding {
            id: instance.clone(),
            agent_id: agent.clone(),
            network_id: network.clone(),
        };
        runtime
            .add_instance(&binding)
            .await
            .map_err(ProvisionError::at(ProvisionStep::AddInstance))?;
        tracing::debug!(instance = %instance, network = %network, agent = %agent, "instance added");

        let interfaces = runtime
            .list_interfaces()
            .await
            .map_err(ProvisionError::at(ProvisionStep::ListInterfaces))?;
        let interface = choose_interface(&interfaces)
            .map(|i| i.id.clone())
            .ok_or_else(|| ProvisionError::NoInterface(instance.clone()))?;

        runtime
            .add_instance_to_interface(instance, &interface)
            .await
            .map_err(ProvisionError::at(ProvisionStep::BindInterface))?;
        tracing::debug!(instance = %instance, interface = %interface, "instance bound to interface");

        self.settle(runtime.as_ref(), &config.settle, instance).await
    }

    /// Poll the inventory until `instance` is listed, then refresh the registry.
    async fn settle(
        &self,
        runtime: &dyn Runtime,
        policy: &SettlePolicy,
        instance: &InstanceId,
    ) -> Result<(), ProvisionError> {
        let mut delays = policy.backoff();
        let mut attempt = 0;
        loop {
            attempt += 1;
            let listed = runtime
                .list_instances()
                .await
                .map_err(ProvisionError::at(ProvisionStep::Settle))?;
            let settled = listed.iter().any(|i| &i.id == instance);

            if settled || attempt >= policy.max_attempts {
                // The listing is authoritative either way.
                let generation = self.manager.registry().refresh(listed);
                if settled {
                    tracing::info!(instance = %instance, attempt, generation, "instance registered");
                    return Ok(());
                }
                tracing::warn!(instance = %instance, attempts = attempt, "instance never listed");
                return Err(ProvisionError::NotSettled {
                    instance: instance.clone(),
                    attempts: attempt,
                });
            }

            let delay = delays.next().unwrap_or(policy.max_backoff);
            tracing::warn!(instance = %instance, attempt, delay = %delay, "instance not listed yet");
            tokio::time::sleep(delay.to_std()).await;
        }
    }

    /// Enter `network` through `instance`, starting the instance first if
    /// the runtime does not report it running.
    ///
    /// The registry is consulted to check that `instance` really runs
    /// `network` (re-read once if it does not know the instance) and is
    /// refreshed after the start. The trail only changes once every
    /// runtime request has succeeded.
    pub async fn start_network(
        &self,
        network: &NetworkId,
        instance: &InstanceId,
    ) -> Result<(), ProvisionError> {
        let (runtime, _) = self.connection()?;
        let registry = self.manager.registry();

        let runs = match registry.network_of(instance) {
            Some(known) => known,
            None => {
                let listed = runtime
                    .list_instances()
                    .await
                    .map_err(ProvisionError::at(ProvisionStep::Refresh))?;
                registry.refresh(listed);
                registry
                    .network_of(instance)
                    .ok_or_else(|| ProvisionError::UnknownInstance(instance.clone()))?
            }
        };
        if &runs != network {
            return Err(ProvisionError::NetworkMismatch {
                instance: instance.clone(),
                expected: network.clone(),
                actual: runs,
            });
        }

        let running = runtime
            .running_instances()
            .await
            .map_err(ProvisionError::at(ProvisionStep::ListRunning))?;
        if running.contains(instance) {
            tracing::debug!(instance = %instance, "instance already running");
        } else {
            runtime
                .start_instance(instance)
                .await
                .map_err(ProvisionError::at(ProvisionStep::Start))?;
            tracing::info!(instance = %instance, network = %network, "instance started");

            let listed = runtime
                .list_instances()
                .await
                .map_err(ProvisionError::at(ProvisionStep::Refresh))?;
            registry.refresh(listed);
        }

        let trail = self
            .manager
            .enter(network.clone(), instance.clone())
            .map_err(ProvisionError::NotReady)?;
        tracing::info!(trail = %trail, instance = %instance, "entered network");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waypoint_core::test_utils::{InMemoryConnector, InMemoryRuntime};

    async fn ready(runtime: InMemoryRuntime) -> (ConnectionManager, Arc<InMemoryRuntime>) {
        let runtime = Arc::new(runtime);
        let mgr = ConnectionManager::new(Arc::new(InMemoryConnector::new(Arc::clone(&runtime))));
        mgr.init(ConnectionConfig::new("mem://", "n0", "dist/dna.json"))
            .await
            .unwrap();
        (mgr, runtime)
    }

    #[tokio::test]
    async fn not_ready_before_init() {
        let runtime = Arc::new(InMemoryRuntime::with_root("i0", "n0", "alice"));
        let mgr = ConnectionManager::new(Arc::new(InMemoryConnector::new(runtime)));
        let err = mgr
            .provisioner()
            .clone_network(&"n1".into(), serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProvisionError::NotReady(_)));
    }

    #[tokio::test]
    async fn clone_uses_configured_template() {
        let (mgr, _) = ready(
            InMemoryRuntime::with_root("i0", "n0", "alice").with_template("dist/dna.json"),
        )
        .await;
        let outcome = mgr
            .provisioner()
            .clone_network(&"n1".into(), serde_json::json!({"name": "team"}))
            .await
            .unwrap();
        assert!(outcome.success);
        assert!(!outcome.dna_hash.is_empty());
    }

    #[tokio::test]
    async fn duplicate_clone_is_rejected() {
        let (mgr, _) = ready(InMemoryRuntime::with_root("i0", "n0", "alice")).await;
        let err = mgr
            .provisioner()
            .clone_network(&"n0".into(), serde_json::Value::Null)
            .await
            .unwrap_err();
        let ProvisionError::InstallRejected { network, failure } = err else {
            panic!("expected InstallRejected, got {err:?}");
        };
        assert_eq!(network.as_str(), "n0");
        assert_eq!(failure.code, Some(-32602));
        assert!(failure.message.contains("already installed"));
    }

    #[tokio::test]
    async fn transport_failure_during_install_names_the_step() {
        let (mgr, runtime) = ready(InMemoryRuntime::with_root("i0", "n0", "alice")).await;
        runtime.fail(
            waypoint_core::AdminMethod::InstallFromFile,
            RuntimeError::Transport("connection reset".into()),
        );
        let err = mgr
            .provisioner()
            .clone_network(&"n1".into(), serde_json::Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProvisionError::Step {
                step: ProvisionStep::Install,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn start_rejects_mismatched_network() {
        let (mgr, _) = ready(
            InMemoryRuntime::with_root("i0", "n0", "alice")
                .with_instance(waypoint_core::Instance::new("i1", "n1", "alice")),
        )
        .await;
        let err = mgr
            .provisioner()
            .start_network(&"n2".into(), &"i1".into())
            .await
            .unwrap_err();
        assert!(matches!(err, ProvisionError::NetworkMismatch { .. }));
        assert_eq!(mgr.trail(), vec![NetworkId::new("n0")]);
    }
}
