//! Property tests for circular turn order.

use holdem_engine::game::{PlayerId, TurnSequence};
use proptest::prelude::*;

fn ids(n: usize) -> Vec<PlayerId> {
    (1..=n as u64).map(PlayerId).collect()
}

proptest! {
    #[test]
    fn test_full_lap_returns_to_start(n in 1usize..12, start in 0usize..12) {
        let mut turns = TurnSequence::new(ids(n));
        let first = PlayerId((start % n) as u64 + 1);
        turns.set_current(first).unwrap();

        let mut seen = Vec::new();
        for _ in 0..n {
            seen.push(turns.next().unwrap());
        }
        prop_assert_eq!(turns.current().unwrap(), first);
        seen.sort();
        prop_assert_eq!(seen, ids(n));
    }

    #[test]
    fn test_previous_undoes_next(n in 1usize..12, steps in 0usize..30) {
        let mut turns = TurnSequence::new(ids(n));
        for _ in 0..steps {
            turns.next().unwrap();
        }
        let here = turns.current().unwrap();
        turns.next().unwrap();
        prop_assert_eq!(turns.previous().unwrap(), here);
    }

    #[test]
    fn test_removal_keeps_the_others_in_order(
        n in 2usize..12,
        gone in prop::collection::btree_set(1u64..12, 0..6),
        steps in 0usize..12,
    ) {
        let mut turns = TurnSequence::new(ids(n));
        for _ in 0..steps {
            turns.next().unwrap();
        }
        let gone: Vec<PlayerId> = gone
            .into_iter()
            .filter(|id| *id <= n as u64)
            .map(PlayerId)
            .take(n - 1)
            .collect();

        for player in &gone {
            let current = turns.current().unwrap();
            let successor = turns.peek_next().unwrap();
            turns.remove(*player).unwrap();
            if current == *player {
                prop_assert_eq!(turns.current().unwrap(), successor);
            } else {
                prop_assert_eq!(turns.current().unwrap(), current);
            }
        }

        let expected: Vec<PlayerId> = ids(n).into_iter().filter(|p| !gone.contains(p)).collect();
        prop_assert_eq!(turns.iter().collect::<Vec<_>>(), expected);
    }
}

#[test]
fn test_removing_unknown_player_fails() {
    let mut turns = TurnSequence::new(ids(3));
    assert!(turns.remove(PlayerId(9)).is_err());
    assert_eq!(turns.len(), 3);
}

#[test]
fn test_empty_sequence_has_no_turns() {
    let mut turns = TurnSequence::new(Vec::new());
    assert!(turns.current().is_err());
    assert!(turns.next().is_err());
    assert!(turns.is_empty());
}
