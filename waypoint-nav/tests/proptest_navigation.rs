//! Property-based tests: navigation trail invariants.

use proptest::prelude::*;
use waypoint_core::NetworkId;
use waypoint_nav::NavigationStack;

#[derive(Debug, Clone)]
enum Move {
    Enter(String),
    Jump(String),
}

fn arb_move() -> impl Strategy<Value = Move> {
    prop_oneof![
        "n[0-5]".prop_map(Move::Enter),
        "n[0-5]".prop_map(Move::Jump),
    ]
}

fn apply(stack: &mut NavigationStack, step: &Move) {
    match step {
        Move::Enter(n) => stack.enter(NetworkId::new(n.as_str())),
        Move::Jump(n) => {
            let _ = stack.jump_to(&NetworkId::new(n.as_str()));
        }
    }
}

proptest! {
    #[test]
    fn trail_stays_rooted_and_repeat_free(
        moves in proptest::collection::vec(arb_move(), 0..40),
    ) {
        let mut stack = NavigationStack::new(NetworkId::new("root"));
        for step in &moves {
            let before = stack.trail().to_vec();
            apply(&mut stack, step);
            let after = stack.trail();

            prop_assert_eq!(stack.root().as_str(), "root");
            prop_assert!(!after.is_empty());
            prop_assert!(after.windows(2).all(|w| w[0] != w[1]));
            // Either a prefix of the old trail, or the old trail plus one.
            let grew = after.len() == before.len() + 1 && after[..before.len()] == before[..];
            let shrank = after.len() <= before.len() && before[..after.len()] == *after;
            prop_assert!(grew || shrank);
        }
    }

    #[test]
    fn enter_then_jump_is_identity(
        moves in proptest::collection::vec(arb_move(), 0..20),
        target in "n[0-5]",
    ) {
        let mut stack = NavigationStack::new(NetworkId::new("root"));
        for step in &moves {
            apply(&mut stack, step);
        }
        let target = NetworkId::new(target);
        stack.enter(target.clone());
        let entered = stack.clone();
        prop_assert!(stack.jump_to(&target).is_ok());
        prop_assert_eq!(stack, entered);
    }

    #[test]
    fn failed_jump_does_not_mutate(
        moves in proptest::collection::vec(arb_move(), 0..20),
    ) {
        let mut stack = NavigationStack::new(NetworkId::new("root"));
        for step in &moves {
            apply(&mut stack, step);
        }
        let before = stack.clone();
        prop_assert!(stack.jump_to(&NetworkId::new("absent")).is_err());
        prop_assert_eq!(stack, before);
    }
}
