//! Typed ID wrappers for instances, networks, agents and interfaces.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Typed ID wrappers keep an instance id from being passed where a
/// network id is expected. They are plain strings underneath: the runtime
/// decides what its identifiers look like (hashes, slugs, keys).
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create a new typed ID from anything that converts to String.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the inner string.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Whether the identifier is the empty string.
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

typed_id!(
    InstanceId,
    "Identifier of one deployed, agent-bound copy of a network."
);
typed_id!(
    NetworkId,
    "Logical network (DNA) identifier. Several instances may run copies of the same template, but each network id names one installed network."
);
typed_id!(AgentId, "Participant identity an instance is bound to.");
typed_id!(InterfaceId, "Identifier of a runtime call interface.");
typed_id!(
    NetworkHash,
    "Content hash the runtime assigns to an installed network."
);
