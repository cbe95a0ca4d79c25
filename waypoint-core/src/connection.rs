//! Lifecycle of the single runtime connection.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the connection is in its lifecycle.
///
/// `Disconnected → Connecting → Ready`, or `Connecting → Failed` when
/// `init` fails. A failed or ready connection moves back to `Connecting`
/// when `init` is called again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// `init` has never been called.
    #[default]
    Disconnected,
    /// `init` is in progress.
    Connecting,
    /// Connected; a current instance exists.
    Ready,
    /// The last `init` failed.
    Failed,
}

impl ConnectionState {
    /// Whether calls may be routed.
    pub fn is_ready(self) -> bool {
        matches!(self, Self::Ready)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Ready => "ready",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}
