//! Connection configuration.
//!
//! Read once by `ConnectionManager::init` and immutable afterwards.
//! Build it in code, parse it from JSON, or read it from `WAYPOINT_*`
//! environment variables.

use crate::duration::DurationMs;
use crate::error::ConfigError;
use crate::id::NetworkId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Environment variable holding the runtime address.
pub const ENV_HOST: &str = "WAYPOINT_HOST";
/// Environment variable holding the root network id.
pub const ENV_ROOT_NETWORK: &str = "WAYPOINT_ROOT_NETWORK";
/// Environment variable holding the template resource path.
pub const ENV_TEMPLATE_PATH: &str = "WAYPOINT_TEMPLATE_PATH";
/// Optional handshake timeout override, in milliseconds.
pub const ENV_HANDSHAKE_TIMEOUT_MS: &str = "WAYPOINT_HANDSHAKE_TIMEOUT_MS";
/// Optional per-request timeout override, in milliseconds.
pub const ENV_REQUEST_TIMEOUT_MS: &str = "WAYPOINT_REQUEST_TIMEOUT_MS";

/// How long to wait for the runtime to list a freshly registered instance.
///
/// The runtime sends no "provisioning complete" notification, so the
/// provisioner polls the instance inventory with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettlePolicy {
    /// Inventory polls before giving up. Must be at least 1.
    pub max_attempts: u32,
    /// Delay before the second poll.
    pub initial_backoff: DurationMs,
    /// Upper bound for the delay between polls.
    pub max_backoff: DurationMs,
}

impl Default for SettlePolicy {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            initial_backoff: DurationMs::from_millis(50),
            max_backoff: DurationMs::from_secs(1),
        }
    }
}

impl SettlePolicy {
    /// Delays to sleep before each poll after the first.
    pub fn backoff(&self) -> impl Iterator<Item = DurationMs> + '_ {
        let cap = self.max_backoff;
        std::iter::successors(Some(self.initial_backoff.min(cap)), move |d| {
            Some(d.doubled_up_to(cap))
        })
        .take(self.max_attempts.saturating_sub(1) as usize)
    }
}

fn default_handshake_timeout() -> DurationMs {
    DurationMs::from_secs(10)
}

fn default_request_timeout() -> DurationMs {
    DurationMs::from_secs(30)
}

/// Everything `init` needs to reach the runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Runtime address, e.g. `http://localhost:3000`.
    pub host: String,
    /// Root network the session starts in.
    pub root_network: NetworkId,
    /// Template resource path new networks are cloned from.
    pub template_path: String,
    /// Bound on connecting plus fetching the initial inventory.
    #[serde(default = "default_handshake_timeout")]
    pub handshake_timeout: DurationMs,
    /// Bound a transport applies to each request.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: DurationMs,
    /// Post-registration settle policy.
    #[serde(default)]
    pub settle: SettlePolicy,
}

impl ConnectionConfig {
    /// Create a config with default timeouts and settle policy.
    pub fn new(
        host: impl Into<String>,
        root_network: impl Into<NetworkId>,
        template_path: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            root_network: root_network.into(),
            template_path: template_path.into(),
            handshake_timeout: default_handshake_timeout(),
            request_timeout: default_request_timeout(),
            settle: SettlePolicy::default(),
        }
    }

    /// Override the handshake timeout.
    #[must_use]
    pub fn handshake_timeout(mut self, timeout: impl Into<DurationMs>) -> Self {
        self.handshake_timeout = timeout.into();
        self
    }

    /// Override the per-request timeout.
    #[must_use]
    pub fn request_timeout(mut self, timeout: impl Into<DurationMs>) -> Self {
        self.request_timeout = timeout.into();
        self
    }

    /// Override the settle policy.
    #[must_use]
    pub fn settle(mut self, policy: SettlePolicy) -> Self {
        self.settle = policy;
        self
    }

    /// Root network → template path, as handed to the runtime.
    pub fn templates(&self) -> BTreeMap<NetworkId, String> {
        BTreeMap::from([(self.root_network.clone(), self.template_path.clone())])
    }

    /// Parse a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read `WAYPOINT_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable lookup; `from_env` uses the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &str| lookup(name).ok_or_else(|| ConfigError::Missing(name.into()));
        let millis = |name: &str| -> Result<Option<DurationMs>, ConfigError> {
            lookup(name)
                .map(|raw| {
                    raw.trim()
                        .parse::<u64>()
                        .map(DurationMs::from_millis)
                        .map_err(|e| ConfigError::Invalid {
                            field: name.into(),
                            reason: e.to_string(),
                        })
                })
                .transpose()
        };

        let mut config = Self::new(
            required(ENV_HOST)?,
            required(ENV_ROOT_NETWORK)?,
            required(ENV_TEMPLATE_PATH)?,
        );
        if let Some(t) = millis(ENV_HANDSHAKE_TIMEOUT_MS)? {
            config.handshake_timeout = t;
        }
        if let Some(t) = millis(ENV_REQUEST_TIMEOUT_MS)? {
            config.request_timeout = t;
        }
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations `init` could never succeed with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &str, reason: &str| ConfigError::Invalid {
            field: field.into(),
            reason: reason.into(),
        };
        if self.host.trim().is_empty() {
            return Err(invalid("host", "must not be empty"));
        }
        if self.root_network.is_empty() {
            return Err(invalid("root_network", "must not be empty"));
        }
        if self.template_path.trim().is_empty() {
            return Err(invalid("template_path", "must not be empty"));
        }
        if self.handshake_timeout == DurationMs::ZERO {
            return Err(invalid("handshake_timeout", "must be greater than zero"));
        }
        if self.request_timeout == DurationMs::ZERO {
            return Err(invalid("request_timeout", "must be greater than zero"));
        }
        if self.settle.max_attempts == 0 {
            return Err(invalid("settle.max_attempts", "must be at least 1"));
        }
        Ok(())
    }
}
