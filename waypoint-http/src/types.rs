//! JSON-RPC 2.0 envelopes and request parameter shapes.
//!
//! Admin methods travel as `admin/<name>` (e.g. `admin/instance/list`);
//! application calls use the `call` method. Parameter field names follow
//! what the runtime expects on the wire, not the Rust-side names.

use serde::{Deserialize, Deserializer, Serialize};
use waypoint_core::{InstanceId, InterfaceId};

/// JSON-RPC request envelope.
#[derive(Debug, Serialize)]
pub struct RpcRequest<'a> {
    /// Always `"2.0"`.
    pub jsonrpc: &'static str,
    /// Client-chosen request id.
    pub id: u64,
    /// Method name.
    pub method: &'a str,
    /// Method parameters.
    pub params: serde_json::Value,
}

impl<'a> RpcRequest<'a> {
    /// Build a 2.0 request.
    pub fn new(id: u64, method: &'a str, params: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method,
            params,
        }
    }
}

/// JSON-RPC response envelope. Exactly one of `result` and `error` is set
/// by a conforming server.
#[derive(Debug, Deserialize)]
pub struct RpcResponse {
    /// Echo of the request id.
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    /// Success payload. `Some(Value::Null)` when the server sent
    /// `"result": null`, `None` only when the key is absent.
    #[serde(default, deserialize_with = "present")]
    pub result: Option<serde_json::Value>,
    /// Failure payload.
    #[serde(default)]
    pub error: Option<RpcError>,
}

// Only called when the key exists, so a literal `null` stays a value.
fn present<'de, D>(deserializer: D) -> Result<Option<serde_json::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

/// JSON-RPC error object.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcError {
    /// Error code.
    pub code: i64,
    /// Error message.
    pub message: String,
    /// Optional structured detail.
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// Error code the runtime uses for a request that exceeded its window.
pub const TIMEOUT_CODE: i64 = -32001;

/// Parameters of the `call` method.
#[derive(Debug, Serialize)]
pub struct CallParams<'a> {
    /// Target instance.
    pub instance_id: &'a InstanceId,
    /// Capability (zome) name.
    pub zome: &'a str,
    /// Operation (function) name.
    pub function: &'a str,
    /// Arguments.
    pub args: serde_json::Value,
}

/// Parameters of `admin/interface/add_instance`.
#[derive(Debug, Serialize)]
pub struct BindParams<'a> {
    /// Interface to extend.
    pub interface_id: &'a InterfaceId,
    /// Instance to expose.
    pub instance_id: &'a InstanceId,
}

/// Parameters of `admin/instance/start`.
#[derive(Debug, Serialize)]
pub struct StartParams<'a> {
    /// Instance to start.
    pub id: &'a InstanceId,
}
