//! HTTP runtime client and connector.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use waypoint_core::{
    AdminMethod, AdminSurface, CallSurface, CloneOutcome, ConnectionConfig, Connector,
    InstallRequest, Instance, InstanceBinding, InstanceId, InterfaceId, InterfaceInfo,
    RemoteFailure, Runtime, RuntimeError,
};

use crate::error::{malformed, map_http_status, map_reqwest_error, map_rpc_error};
use crate::types::{BindParams, CallParams, RpcRequest, RpcResponse, StartParams};

/// Method the connector calls to confirm the endpoint speaks the protocol.
const HANDSHAKE_METHOD: &str = "info/instances";

/// Method application calls are sent as.
const CALL_METHOD: &str = "call";

/// Default per-request bound when none is configured.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Runtime reached over JSON-RPC 2.0 on a single HTTP endpoint.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use waypoint_http::HttpRuntime;
///
/// let runtime = HttpRuntime::new("http://localhost:3000")
///     .request_timeout(Duration::from_secs(10));
/// ```
pub struct HttpRuntime {
    pub(crate) endpoint: String,
    pub(crate) request_timeout: Duration,
    pub(crate) client: reqwest::Client,
    next_id: AtomicU64,
}

impl HttpRuntime {
    /// Client for the runtime at `endpoint`.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            client: reqwest::Client::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Bound each request; exceeding it is a [`RuntimeError::Timeout`].
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Share an existing HTTP client.
    #[must_use]
    pub fn client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Send one JSON-RPC request and return its raw result.
    pub async fn request(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, RuntimeError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(endpoint = %self.endpoint, method, id, "sending runtime request");

        let response = self
            .client
            .post(&self.endpoint)
            .timeout(self.request_timeout)
            .json(&RpcRequest::new(id, method, params))
            .send()
            .await
            .map_err(|e| map_reqwest_error(method, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| map_reqwest_error(method, e))?;
        if !status.is_success() {
            return Err(map_http_status(method, status, &body));
        }

        let envelope: RpcResponse =
            serde_json::from_str(&body).map_err(|e| malformed(method, e))?;
        if let Some(err) = envelope.error {
            tracing::debug!(method, code = err.code, "runtime returned an error");
            return Err(map_rpc_error(method, err));
        }
        envelope
            .result
            .ok_or_else(|| malformed(method, "response has neither result nor error"))
    }

    async fn admin<T: DeserializeOwned>(
        &self,
        method: AdminMethod,
        params: impl Serialize,
    ) -> Result<T, RuntimeError> {
        let name = format!("admin/{method}");
        let params = serde_json::to_value(params).map_err(|e| malformed(&name, e))?;
        let result = self.request(&name, params).await?;
        serde_json::from_value(result).map_err(|e| malformed(&name, e))
    }
}

/// Decode an application call result.
///
/// The runtime may hand the result back as a JSON-encoded string and may
/// wrap it as `{"Ok": v}` or `{"Err": e}`.
fn decode_call_result(result: serde_json::Value) -> Result<serde_json::Value, RuntimeError> {
    let value = match result {
        serde_json::Value::String(raw) => {
            serde_json::from_str(&raw).unwrap_or(serde_json::Value::String(raw))
        }
        other => other,
    };
    match value {
        serde_json::Value::Object(mut map) if map.len() == 1 => {
            if let Some(ok) = map.remove("Ok") {
                return Ok(ok);
            }
            if let Some(err) = map.remove("Err") {
                let message = match &err {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                return Err(RuntimeError::Remote(RemoteFailure {
                    code: None,
                    message,
                    data: Some(err),
                }));
            }
            Ok(serde_json::Value::Object(map))
        }
        other => Ok(other),
    }
}

#[async_trait]
impl AdminSurface for HttpRuntime {
    async fn list_instances(&self) -> Result<Vec<Instance>, RuntimeError> {
        self.admin(AdminMethod::ListInstances, serde_json::json!({}))
            .await
    }

    async fn install_from_file(
        &self,
        request: InstallRequest,
    ) -> Result<CloneOutcome, RuntimeError> {
        self.admin(AdminMethod::InstallFromFile, request).await
    }

    async fn add_instance(&self, binding: &InstanceBinding) -> Result<(), RuntimeError> {
        self.admin::<serde::de::IgnoredAny>(AdminMethod::AddInstance, binding)
            .await
            .map(drop)
    }

    async fn list_interfaces(&self) -> Result<Vec<InterfaceInfo>, RuntimeError> {
        self.admin(AdminMethod::ListInterfaces, serde_json::json!({}))
            .await
    }

    async fn add_instance_to_interface(
        &self,
        instance: &InstanceId,
        interface: &InterfaceId,
    ) -> Result<(), RuntimeError> {
        let params = BindParams {
            interface_id: interface,
            instance_id: instance,
        };
        self.admin::<serde::de::IgnoredAny>(AdminMethod::AddInstanceToInterface, params)
            .await
            .map(drop)
    }

    async fn running_instances(&self) -> Result<Vec<InstanceId>, RuntimeError> {
        let running: Vec<Instance> = self
            .admin(AdminMethod::RunningInstances, serde_json::json!({}))
            .await?;
        Ok(running.into_iter().map(|i| i.id).collect())
    }

    async fn start_instance(&self, instance: &InstanceId) -> Result<(), RuntimeError> {
        self.admin::<serde::de::IgnoredAny>(AdminMethod::StartInstance, StartParams { id: instance })
            .await
            .map(drop)
    }
}

#[async_trait]
impl CallSurface for HttpRuntime {
    async fn call(
        &self,
        instance: &InstanceId,
        capability: &str,
        operation: &str,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, RuntimeError> {
        let params = CallParams {
            instance_id: instance,
            zome: capability,
            function: operation,
            args,
        };
        let params = serde_json::to_value(params).map_err(|e| malformed(CALL_METHOD, e))?;
        let result = self.request(CALL_METHOD, params).await?;
        decode_call_result(result)
    }
}

/// Connector producing an [`HttpRuntime`] for `config.host`.
///
/// Applies `config.request_timeout` to every request and confirms the
/// endpoint with an `info/instances` handshake before handing it out.
#[derive(Default)]
pub struct HttpConnector {
    client: Option<reqwest::Client>,
}

impl HttpConnector {
    /// Connector with a fresh HTTP client per connection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Connector sharing `client` across connections.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client: Some(client),
        }
    }
}

#[async_trait]
impl Connector for HttpConnector {
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Runtime>, RuntimeError> {
        let mut runtime =
            HttpRuntime::new(config.host.clone()).request_timeout(config.request_timeout.to_std());
        if let Some(client) = &self.client {
            runtime = runtime.client(client.clone());
        }

        runtime
            .request(HANDSHAKE_METHOD, serde_json::json!({}))
            .await?;
        tracing::info!(host = %config.host, "runtime endpoint answered handshake");
        Ok(Arc::new(runtime))
    }
}
