//! Property-based tests: registry lookups over arbitrary refresh sequences.

use proptest::prelude::*;
use waypoint_core::{Instance, InstanceId};
use waypoint_nav::InstanceRegistry;

fn arb_listing() -> impl Strategy<Value = Vec<Instance>> {
    proptest::collection::vec(("i[0-9]{1,2}", "n[0-9]{1,2}"), 0..12).prop_map(|pairs| {
        pairs
            .into_iter()
            .map(|(id, net)| Instance::new(id, net, "alice"))
            .collect()
    })
}

proptest! {
    #[test]
    fn lookups_are_inverse_over_latest_snapshot(
        listings in proptest::collection::vec(arb_listing(), 1..6),
    ) {
        let registry = InstanceRegistry::new();
        for listing in &listings {
            registry.refresh(listing.clone());
        }
        let snapshot = registry.snapshot();
        prop_assert_eq!(snapshot.generation(), listings.len() as u64);

        for instance in snapshot.instances() {
            let network = snapshot.network_of(&instance.id);
            prop_assert_eq!(network.as_ref(), Some(&instance.network_id));
            // instance_of picks one instance per network; it must map back.
            let owner = snapshot.instance_of(&instance.network_id);
            prop_assert!(owner.is_some());
            let owner = owner.unwrap_or_else(|| InstanceId::new(""));
            prop_assert_eq!(snapshot.network_of(&owner), Some(instance.network_id.clone()));
        }
    }

    #[test]
    fn refresh_forgets_everything_not_relisted(
        first in arb_listing(),
        second in arb_listing(),
    ) {
        let registry = InstanceRegistry::new();
        registry.refresh(first.clone());
        registry.refresh(second.clone());
        for instance in &first {
            let relisted = second.iter().any(|i| i.id == instance.id);
            prop_assert_eq!(registry.is_member(&instance.id), relisted);
        }
    }

    #[test]
    fn ids_are_unique_within_a_snapshot(listing in arb_listing()) {
        let registry = InstanceRegistry::new();
        registry.refresh(listing);
        let snapshot = registry.snapshot();
        let mut ids: Vec<_> = snapshot.instances().iter().map(|i| i.id.clone()).collect();
        ids.sort();
        ids.dedup();
        prop_assert_eq!(ids.len(), snapshot.len());
    }
}
