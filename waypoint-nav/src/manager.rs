//! The connection manager: one runtime connection, one current instance.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, watch};
use waypoint_core::{
    AdminSurface, CallError, CallSurface, ConnectionConfig, ConnectionError, ConnectionState,
    Connector, InstanceId, NavigationError, NetworkId, Runtime,
};

use crate::navigation::NavigationStack;
use crate::provisioner::NetworkProvisioner;
use crate::registry::InstanceRegistry;

/// Where a session is: its trail, the instance calls go to, and the
/// registry generation both were resolved against.
///
/// Serializable so a host application can persist it between page loads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Breadcrumb trail, root first.
    pub trail: NavigationStack,
    /// Instance application calls are routed to.
    pub current_instance: InstanceId,
    /// Registry generation at the time of the snapshot.
    pub generation: u64,
}

struct Session {
    runtime: Arc<dyn Runtime>,
    config: Arc<ConnectionConfig>,
    trail: NavigationStack,
    current: InstanceId,
}

/// Owns the single connection to the runtime and routes every call
/// through the current instance.
///
/// Construct one per client and share it as `Arc<ConnectionManager>`.
/// Locks are never held across an await point.
pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    registry: InstanceRegistry,
    state: watch::Sender<ConnectionState>,
    session: RwLock<Option<Session>>,
    init_lock: Mutex<()>,
}

impl ConnectionManager {
    /// A disconnected manager that will connect through `connector`.
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            connector,
            registry: InstanceRegistry::new(),
            state,
            session: RwLock::new(None),
            init_lock: Mutex::new(()),
        }
    }

    /// Connect, load the instance inventory and enter the root network.
    ///
    /// On failure the manager is left `Failed` with an empty registry;
    /// calling `init` again is the only way back to `Ready`. Concurrent
    /// `init` calls run one at a time.
    pub async fn init(&self, config: ConnectionConfig) -> Result<(), ConnectionError> {
        let _init = self.init_lock.lock().await;

        self.set_state(ConnectionState::Connecting);
        *self.write_session() = None;
        tracing::info!(host = %config.host, root = %config.root_network, "connecting to runtime");

        match self.establish(config).await {
            Ok(session) => {
                tracing::info!(
                    host = %session.config.host,
                    root = %session.trail.root(),
                    instance = %session.current,
                    generation = self.registry.generation(),
                    "runtime connection ready"
                );
                *self.write_session() = Some(session);
                self.set_state(ConnectionState::Ready);
                Ok(())
            }
            Err(err) => {
                tracing::error!(error = %err, "runtime connection failed");
                // A previous session's inventory no longer describes anything reachable.
                self.registry.refresh(Vec::new());
                self.set_state(ConnectionState::Failed);
                Err(err)
            }
        }
    }

    async fn establish(&self, config: ConnectionConfig) -> Result<Session, ConnectionError> {
        config.validate()?;
        let budget = config.handshake_timeout;

        let handshake = async {
            let runtime = self
                .connector
                .connect(&config)
                .await
                .map_err(|source| ConnectionError::Connect {
                    host: config.host.clone(),
                    source,
                })?;
            let instances = runtime
                .list_instances()
                .await
                .map_err(ConnectionError::Inventory)?;
            Ok::<_, ConnectionError>((runtime, instances))
        };
        let (runtime, instances) = tokio::time::timeout(budget.to_std(), handshake)
            .await
            .map_err(|_| ConnectionError::HandshakeTimeout(budget))??;

        let root = instances
            .iter()
            .find(|i| i.network_id == config.root_network)
            .map(|i| i.id.clone())
            .ok_or_else(|| ConnectionError::RootInstanceMissing(config.root_network.clone()))?;
        self.registry.refresh(instances);

        Ok(Session {
            runtime,
            trail: NavigationStack::new(config.root_network.clone()),
            current: root,
            config: Arc::new(config),
        })
    }

    /// Route `operation` of `capability` to the current instance.
    ///
    /// Returns [`CallError::NotReady`] without contacting the runtime unless
    /// the connection is `Ready`.
    pub async fn call(
        &self,
        capability: &str,
        operation: &str,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, CallError> {
        let (runtime, instance) = self.route().map_err(CallError::NotReady)?;
        tracing::debug!(instance = %instance, capability, operation, "routing call");
        runtime
            .call(&instance, capability, operation, args)
            .await
            .map_err(|err| CallError::from_runtime(err, &instance, capability, operation))
    }

    /// [`call`](Self::call) with serde-encoded arguments and a typed reply.
    pub async fn call_as<T, A>(
        &self,
        capability: &str,
        operation: &str,
        args: &A,
    ) -> Result<T, CallError>
    where
        T: DeserializeOwned,
        A: Serialize + ?Sized,
    {
        let args =
            serde_json::to_value(args).map_err(|e| CallError::InvalidArguments(e.to_string()))?;
        let reply = self.call(capability, operation, args).await?;
        serde_json::from_value(reply).map_err(|e| CallError::InvalidResponse(e.to_string()))
    }

    /// Current lifecycle state.
    pub fn connection_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Observe lifecycle changes.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Breadcrumb trail, root first. Empty until `init` succeeds.
    pub fn trail(&self) -> Vec<NetworkId> {
        self.read_session()
            .as_ref()
            .map(|s| s.trail.trail().to_vec())
            .unwrap_or_default()
    }

    /// Network the session is operating in.
    pub fn current_network(&self) -> Option<NetworkId> {
        self.read_session().as_ref().map(|s| s.trail.current().clone())
    }

    /// Instance calls are routed to.
    pub fn current_instance(&self) -> Option<InstanceId> {
        self.read_session().as_ref().map(|s| s.current.clone())
    }

    /// Snapshot of where the session is.
    pub fn position(&self) -> Option<Position> {
        self.read_session().as_ref().map(|s| Position {
            trail: s.trail.clone(),
            current_instance: s.current.clone(),
            generation: self.registry.generation(),
        })
    }

    /// Return to a network already on the trail and make its instance current.
    ///
    /// Nothing changes when `network` is not on the trail or no known
    /// instance runs it.
    pub fn jump_to(&self, network: &NetworkId) -> Result<(), NavigationError> {
        let mut guard = self.write_session();
        let session = guard
            .as_mut()
            .filter(|s| s.trail.contains(network))
            .ok_or_else(|| NavigationError::NotOnTrail(network.clone()))?;
        let instance = self
            .registry
            .instance_of(network)
            .ok_or_else(|| NavigationError::NoInstance(network.clone()))?;

        session.trail.jump_to(network)?;
        session.current = instance;
        tracing::info!(trail = %session.trail, instance = %session.current, "jumped back");
        Ok(())
    }

    /// Known instances. Empty until `init` succeeds and after a failed `init`.
    pub fn registry(&self) -> &InstanceRegistry {
        &self.registry
    }

    /// Provisioning operations bound to this manager's connection.
    pub fn provisioner(&self) -> NetworkProvisioner<'_> {
        NetworkProvisioner::new(self)
    }

    /// Connection and configuration, when `Ready`.
    pub(crate) fn ready_session(
        &self,
    ) -> Result<(Arc<dyn Runtime>, Arc<ConnectionConfig>), ConnectionState> {
        let state = self.connection_state();
        if !state.is_ready() {
            return Err(state);
        }
        self.read_session()
            .as_ref()
            .map(|s| (Arc::clone(&s.runtime), Arc::clone(&s.config)))
            .ok_or(state)
    }

    /// Make `network` current with `instance` as the call target.
    pub(crate) fn enter(
        &self,
        network: NetworkId,
        instance: InstanceId,
    ) -> Result<String, ConnectionState> {
        let mut guard = self.write_session();
        let session = guard.as_mut().ok_or_else(|| self.connection_state())?;
        session.trail.enter(network);
        session.current = instance;
        Ok(session.trail.to_string())
    }

    fn route(&self) -> Result<(Arc<dyn Runtime>, InstanceId), ConnectionState> {
        let state = self.connection_state();
        if !state.is_ready() {
            return Err(state);
        }
        self.read_session()
            .as_ref()
            .map(|s| (Arc::clone(&s.runtime), s.current.clone()))
            .ok_or(state)
    }

    fn set_state(&self, next: ConnectionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            tracing::debug!(from = %previous, to = %next, "connection state changed");
        }
    }

    fn read_session(&self) -> RwLockReadGuard<'_, Option<Session>> {
        self.session.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_session(&self) -> RwLockWriteGuard<'_, Option<Session>> {
        self.session.write().unwrap_or_else(PoisonError::into_inner)
    }
}
