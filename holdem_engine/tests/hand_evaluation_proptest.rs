/// Property-based tests for hand evaluation using proptest
///
/// The evaluator is a black box to the rest of the engine, so these only pin
/// down the properties showdown relies on: determinism, order independence
/// and that more cards never make a hand worse.
use holdem_engine::game::{
    entities::{ACE, Card, Rank, Suit},
    functional::{argmax, eval},
};
use proptest::prelude::*;
use std::collections::BTreeSet;

fn card_strategy() -> impl Strategy<Value = Card> {
    (2u8..=ACE, 0usize..4).prop_map(|(value, suit)| Card(value, Suit::ALL[suit]))
}

fn unique_cards_strategy(len: usize) -> impl Strategy<Value = Vec<Card>> {
    prop::collection::vec(card_strategy(), len).prop_filter("cards must be unique", |cards| {
        let set: BTreeSet<_> = cards.iter().collect();
        set.len() == cards.len()
    })
}

proptest! {
    #[test]
    fn test_eval_is_deterministic(cards in unique_cards_strategy(7)) {
        prop_assert_eq!(eval(&cards), eval(&cards));
    }

    #[test]
    fn test_eval_ignores_card_order(cards in unique_cards_strategy(7)) {
        let mut reversed = cards.clone();
        reversed.reverse();
        prop_assert_eq!(eval(&cards), eval(&reversed));
    }

    #[test]
    fn test_more_cards_never_hurt(cards in unique_cards_strategy(7)) {
        let five = eval(&cards[..5]);
        let six = eval(&cards[..6]);
        let seven = eval(&cards);
        prop_assert!(six >= five);
        prop_assert!(seven >= six);
    }

    #[test]
    fn test_kickers_fit_in_five_cards(cards in unique_cards_strategy(7)) {
        let hand = eval(&cards);
        prop_assert!(!hand.values.is_empty());
        prop_assert!(hand.values.len() <= 5);
    }

    #[test]
    fn test_argmax_finds_every_best(values in prop::collection::vec(0u8..5, 1..10)) {
        let winners = argmax(&values);
        let best = values.iter().max().copied();
        prop_assert!(!winners.is_empty());
        for i in winners {
            prop_assert_eq!(Some(values[i]), best);
        }
    }
}

#[test]
fn test_wheel_is_the_lowest_straight() {
    let wheel = eval(&[
        Card(ACE, Suit::Club),
        Card(2, Suit::Heart),
        Card(3, Suit::Spade),
        Card(4, Suit::Diamond),
        Card(5, Suit::Club),
    ]);
    let six_high = eval(&[
        Card(2, Suit::Heart),
        Card(3, Suit::Spade),
        Card(4, Suit::Diamond),
        Card(5, Suit::Club),
        Card(6, Suit::Club),
    ]);
    assert_eq!(wheel.rank, Rank::Straight);
    assert_eq!(wheel.values, vec![5]);
    assert!(six_high > wheel);
}

#[test]
fn test_board_plays_for_both() {
    let board = [
        Card(10, Suit::Heart),
        Card(11, Suit::Heart),
        Card(12, Suit::Heart),
        Card(13, Suit::Heart),
        Card(ACE, Suit::Heart),
    ];
    let mut ann = board.to_vec();
    ann.extend([Card(2, Suit::Club), Card(3, Suit::Club)]);
    let mut bob = board.to_vec();
    bob.extend([Card(ACE, Suit::Club), Card(ACE, Suit::Spade)]);
    assert_eq!(eval(&ann), eval(&bob));
    assert_eq!(eval(&ann).rank, Rank::StraightFlush);
}
