//! Breadcrumb trail of the networks a session has descended into.

use std::fmt;

use serde::{Deserialize, Serialize};
use waypoint_core::{NavigationError, NetworkId};

/// Root-first, current-last path of networks.
///
/// Never empty: the root is always the first element. A network appears at
/// most once, so the trail is a simple path that only grows at the end or
/// is truncated back to one of its own elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<NetworkId>", into = "Vec<NetworkId>")]
pub struct NavigationStack {
    trail: Vec<NetworkId>,
}

impl NavigationStack {
    /// A trail holding only `root`.
    pub fn new(root: NetworkId) -> Self {
        Self { trail: vec![root] }
    }

    /// Make `network` current.
    ///
    /// A network not on the trail is pushed. Entering a network already on
    /// the trail truncates back to it, which keeps the trail free of
    /// repeats and makes entering the current network a no-op.
    pub fn enter(&mut self, network: NetworkId) {
        match self.position(&network) {
            Some(index) => self.trail.truncate(index + 1),
            None => self.trail.push(network),
        }
    }

    /// Truncate the trail so it ends at `network`.
    ///
    /// Fails without touching the trail when `network` is not on it.
    pub fn jump_to(&mut self, network: &NetworkId) -> Result<(), NavigationError> {
        let index = self
            .position(network)
            .ok_or_else(|| NavigationError::NotOnTrail(network.clone()))?;
        self.trail.truncate(index + 1);
        Ok(())
    }

    /// The network the session is operating in.
    pub fn current(&self) -> &NetworkId {
        // Non-empty by construction.
        &self.trail[self.trail.len() - 1]
    }

    /// The first network of the trail.
    pub fn root(&self) -> &NetworkId {
        &self.trail[0]
    }

    /// The whole trail, root first.
    pub fn trail(&self) -> &[NetworkId] {
        &self.trail
    }

    /// Whether `network` is on the trail.
    pub fn contains(&self, network: &NetworkId) -> bool {
        self.position(network).is_some()
    }

    /// Number of networks on the trail.
    pub fn depth(&self) -> usize {
        self.trail.len()
    }

    fn position(&self, network: &NetworkId) -> Option<usize> {
        self.trail.iter().position(|n| n == network)
    }
}

impl fmt::Display for NavigationStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, network) in self.trail.iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{network}")?;
        }
        Ok(())
    }
}

impl TryFrom<Vec<NetworkId>> for NavigationStack {
    type Error = String;

    fn try_from(trail: Vec<NetworkId>) -> Result<Self, Self::Error> {
        if trail.is_empty() {
            return Err("navigation trail must contain the root network".into());
        }
        for (i, network) in trail.iter().enumerate() {
            if trail[..i].contains(network) {
                return Err(format!("network {network} appears twice on the trail"));
            }
        }
        Ok(Self { trail })
    }
}

impl From<NavigationStack> for Vec<NetworkId> {
    fn from(stack: NavigationStack) -> Self {
        stack.trail
    }
}
