//! Error types for the runtime contract and for each manager component.

use crate::connection::ConnectionState;
use crate::duration::DurationMs;
use crate::id::{InstanceId, NetworkId};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Structured failure payload returned by the runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteFailure {
    /// Runtime error code, when the runtime sends one.
    #[serde(default)]
    pub code: Option<i64>,
    /// Human-readable message. Never inspected for classification.
    pub message: String,
    /// Extra structured detail.
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl RemoteFailure {
    /// A failure with only a message.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
            data: None,
        }
    }

    /// Attach an error code.
    #[must_use]
    pub fn with_code(mut self, code: i64) -> Self {
        self.code = Some(code);
        self
    }
}

impl fmt::Display for RemoteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} (code {code})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Errors a runtime surface reports. Transport-neutral: every
/// [`AdminSurface`](crate::AdminSurface) and
/// [`CallSurface`](crate::CallSurface) method returns this.
#[non_exhaustive]
#[derive(Debug, Clone, Error)]
pub enum RuntimeError {
    /// The runtime could not be reached or the connection dropped.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The runtime did not answer within its response window.
    /// Transports produce this from their own timeout signal or from the
    /// runtime's timeout error code, never from message text.
    #[error("{method} timed out")]
    Timeout {
        /// Request that timed out.
        method: String,
    },

    /// The runtime answered with a failure payload.
    #[error("remote failure: {0}")]
    Remote(RemoteFailure),

    /// The runtime answered with something that does not decode.
    #[error("malformed response to {method}: {reason}")]
    Malformed {
        /// Request whose reply was malformed.
        method: String,
        /// Decoding error.
        reason: String,
    },
}

impl RuntimeError {
    /// Whether this is a structured timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Configuration errors.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required value was not provided.
    #[error("missing configuration value: {0}")]
    Missing(String),

    /// A value was provided but is unusable.
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Offending field.
        field: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A configuration document did not parse.
    #[error("config parse error: {0}")]
    Parse(String),
}

/// Failures of `ConnectionManager::init`.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The supplied configuration is unusable.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The connection or its handshake failed.
    #[error("could not connect to {host}: {source}")]
    Connect {
        /// Runtime address.
        host: String,
        /// Underlying failure.
        #[source]
        source: RuntimeError,
    },

    /// Connecting and fetching the inventory took longer than allowed.
    #[error("handshake did not complete within {0}")]
    HandshakeTimeout(DurationMs),

    /// The initial instance inventory could not be fetched or decoded.
    #[error("instance inventory failed: {0}")]
    Inventory(#[source] RuntimeError),

    /// No instance runs the configured root network.
    #[error("no instance runs root network {0}")]
    RootInstanceMissing(NetworkId),
}

/// Failures of `ConnectionManager::call`.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CallError {
    /// The connection is not `Ready`; the runtime was not contacted.
    #[error("connection is not ready (state: {0})")]
    NotReady(ConnectionState),

    /// The runtime did not answer within its response window.
    #[error("{capability}/{operation} on {instance} timed out")]
    RemoteTimeout {
        /// Instance the call was routed to.
        instance: InstanceId,
        /// Capability (zome) called.
        capability: String,
        /// Operation (function) called.
        operation: String,
    },

    /// The runtime returned a failure payload.
    #[error("remote error: {0}")]
    RemoteError(RemoteFailure),

    /// The transport failed before a reply arrived.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The reply could not be decoded into the requested shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The arguments could not be encoded.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
}

impl CallError {
    /// Classify a runtime error raised while calling `capability/operation`
    /// on `instance`.
    pub fn from_runtime(
        err: RuntimeError,
        instance: &InstanceId,
        capability: &str,
        operation: &str,
    ) -> Self {
        match err {
            RuntimeError::Timeout { .. } => Self::RemoteTimeout {
                instance: instance.clone(),
                capability: capability.to_owned(),
                operation: operation.to_owned(),
            },
            RuntimeError::Remote(failure) => Self::RemoteError(failure),
            RuntimeError::Transport(msg) => Self::Transport(msg),
            RuntimeError::Malformed { reason, .. } => Self::InvalidResponse(reason),
        }
    }

    /// Whether this is a structured timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::RemoteTimeout { .. })
    }
}

/// Breadcrumb navigation errors.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    /// The target is not on the current trail.
    #[error("network {0} is not on the navigation trail")]
    NotOnTrail(NetworkId),

    /// The target is on the trail but no known instance runs it.
    #[error("no known instance runs network {0}")]
    NoInstance(NetworkId),
}

/// Step of a provisioning sequence, reported with failures.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionStep {
    /// `dna/install_from_file`.
    Install,
    /// `instance/add`.
    AddInstance,
    /// `interface/list`.
    ListInterfaces,
    /// `interface/add_instance`.
    BindInterface,
    /// Polling `instance/list` until the runtime settles.
    Settle,
    /// `instance/running`.
    ListRunning,
    /// `instance/start`.
    Start,
    /// Re-reading `instance/list` after a start or for an unknown instance.
    Refresh,
}

impl fmt::Display for ProvisionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Install => "install",
            Self::AddInstance => "add instance",
            Self::ListInterfaces => "list interfaces",
            Self::BindInterface => "bind interface",
            Self::Settle => "settle",
            Self::ListRunning => "list running",
            Self::Start => "start",
            Self::Refresh => "refresh",
        };
        f.write_str(s)
    }
}

/// Provisioning errors.
///
/// Steps already completed on the runtime are not rolled back; `step`
/// tells the caller how far a sequence got.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// The connection is not `Ready`.
    #[error("connection is not ready (state: {0})")]
    NotReady(ConnectionState),

    /// The runtime refused to install the network.
    #[error("install of {network} rejected: {failure}")]
    InstallRejected {
        /// Network that was being installed.
        network: NetworkId,
        /// Runtime's failure, code and data included.
        failure: RemoteFailure,
    },

    /// A runtime request in the sequence failed.
    #[error("{step} failed: {source}")]
    Step {
        /// Step that failed.
        step: ProvisionStep,
        /// Underlying failure.
        #[source]
        source: RuntimeError,
    },

    /// The interface chooser selected nothing.
    #[error("no call interface selected for instance {0}")]
    NoInterface(InstanceId),

    /// The new instance never appeared in the runtime's inventory.
    #[error("instance {instance} not listed after {attempts} attempts")]
    NotSettled {
        /// Instance that was awaited.
        instance: InstanceId,
        /// Polls made.
        attempts: u32,
    },

    /// The instance is unknown to the runtime's inventory.
    #[error("unknown instance {0}")]
    UnknownInstance(InstanceId),

    /// The instance runs a different network than the caller claimed.
    #[error("instance {instance} runs {actual}, not {expected}")]
    NetworkMismatch {
        /// Instance checked.
        instance: InstanceId,
        /// Network the caller named.
        expected: NetworkId,
        /// Network the registry reports.
        actual: NetworkId,
    },
}

impl ProvisionError {
    /// Wrap a runtime error raised at `step`.
    pub fn at(step: ProvisionStep) -> impl FnOnce(RuntimeError) -> Self {
        move |source| Self::Step { step, source }
    }
}
