//! Known instances, as last reported by the runtime.
//!
//! The runtime owns the inventory; the registry only mirrors it. Every
//! refresh replaces the whole set and bumps the generation. Readers take an
//! immutable [`RegistrySnapshot`], so a refresh running concurrently is
//! either entirely visible or not at all.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, PoisonError, RwLock};

use waypoint_core::{Instance, InstanceId, NetworkId};

/// One generation of the instance inventory.
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    generation: u64,
    instances: Vec<Instance>,
    by_id: HashMap<InstanceId, usize>,
    by_network: HashMap<NetworkId, InstanceId>,
}

impl RegistrySnapshot {
    fn build(generation: u64, listed: Vec<Instance>) -> Self {
        let mut snapshot = Self {
            generation,
            instances: Vec::with_capacity(listed.len()),
            by_id: HashMap::with_capacity(listed.len()),
            by_network: HashMap::with_capacity(listed.len()),
        };

        for instance in listed {
            let Entry::Vacant(slot) = snapshot.by_id.entry(instance.id.clone()) else {
                tracing::warn!(instance = %instance.id, "runtime listed instance twice; keeping first");
                continue;
            };
            slot.insert(snapshot.instances.len());

            match snapshot.by_network.entry(instance.network_id.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(instance.id.clone());
                }
                Entry::Occupied(existing) => {
                    tracing::warn!(
                        network = %instance.network_id,
                        first = %existing.get(),
                        second = %instance.id,
                        "runtime assigned one network to two instances"
                    );
                }
            }
            snapshot.instances.push(instance);
        }
        snapshot
    }

    /// Refresh counter this snapshot was produced by. Zero means never refreshed.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Instances in the order the runtime listed them.
    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    /// Look up an instance by id.
    pub fn get(&self, id: &InstanceId) -> Option<&Instance> {
        self.by_id.get(id).map(|&i| &self.instances[i])
    }

    /// Whether `id` is a known instance.
    pub fn is_member(&self, id: &InstanceId) -> bool {
        self.by_id.contains_key(id)
    }

    /// Network run by instance `id`.
    pub fn network_of(&self, id: &InstanceId) -> Option<NetworkId> {
        self.get(id).map(|i| i.network_id.clone())
    }

    /// Instance running `network`.
    pub fn instance_of(&self, network: &NetworkId) -> Option<InstanceId> {
        self.by_network.get(network).cloned()
    }

    /// Number of known instances.
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Whether no instance is known.
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

/// Shared, wholesale-refreshed view of the runtime's instances.
#[derive(Debug, Default)]
pub struct InstanceRegistry {
    current: RwLock<Arc<RegistrySnapshot>>,
}

impl InstanceRegistry {
    /// Create an empty registry at generation zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entire known set. Returns the new generation.
    pub fn refresh(&self, instances: Vec<Instance>) -> u64 {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let generation = current.generation + 1;
        *current = Arc::new(RegistrySnapshot::build(generation, instances));
        tracing::debug!(generation, instances = current.len(), "instance registry refreshed");
        generation
    }

    /// The latest snapshot. Holding it never blocks a refresh.
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Generation of the latest snapshot.
    pub fn generation(&self) -> u64 {
        self.snapshot().generation()
    }

    /// Whether `id` is a known instance.
    pub fn is_member(&self, id: &InstanceId) -> bool {
        self.snapshot().is_member(id)
    }

    /// Network run by instance `id`.
    pub fn network_of(&self, id: &InstanceId) -> Option<NetworkId> {
        self.snapshot().network_of(id)
    }

    /// Instance running `network`.
    pub fn instance_of(&self, network: &NetworkId) -> Option<InstanceId> {
        self.snapshot().instance_of(network)
    }

    /// Number of known instances.
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    /// Whether no instance is known.
    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}
