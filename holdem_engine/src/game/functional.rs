//! Hand evaluation.
//!
//! The engine treats hand strength as a black box behind [`HandEvaluator`];
//! [`StandardEvaluator`] is the default and picks the best five cards out of
//! whatever it is given.

use std::collections::BTreeMap;

use super::entities::{ACE, Card, HandValue, Rank, Suit, Value};

/// Comparator between hands. Implementations must be deterministic so that
/// identical cards always compare equal.
pub trait HandEvaluator: Send + Sync {
    fn evaluate(&self, cards: &[Card]) -> HandValue;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct StandardEvaluator;

impl HandEvaluator for StandardEvaluator {
    fn evaluate(&self, cards: &[Card]) -> HandValue {
        eval(cards)
    }
}

/// Highest card of a five card straight within `values`, treating the ace as
/// both high and low. `values` must be sorted descending and deduplicated.
fn straight_high(values: &[Value]) -> Option<Value> {
    let mut values = values.to_vec();
    if values.first() == Some(&ACE) {
        values.push(1);
    }
    values.windows(5).find_map(|w| {
        if w[0] - w[4] == 4 {
            Some(w[0])
        } else {
            None
        }
    })
}

fn distinct_desc(cards: &[Card]) -> Vec<Value> {
    let mut values: Vec<Value> = cards.iter().map(|c| c.0).collect();
    values.sort_unstable_by(|a, b| b.cmp(a));
    values.dedup();
    values
}

/// Evaluate the best five card hand out of up to seven cards.
#[must_use]
pub fn eval(cards: &[Card]) -> HandValue {
    let mut by_suit: BTreeMap<Suit, Vec<Card>> = BTreeMap::new();
    for card in cards {
        by_suit.entry(card.1).or_default().push(*card);
    }
    let flush = by_suit.into_values().find(|suited| suited.len() >= 5);

    if let Some(suited) = &flush
        && let Some(high) = straight_high(&distinct_desc(suited))
    {
        return HandValue {
            rank: Rank::StraightFlush,
            values: vec![high],
        };
    }

    // Group values by multiplicity, biggest groups first and higher values
    // breaking ties.
    let mut counts: BTreeMap<Value, usize> = BTreeMap::new();
    for card in cards {
        *counts.entry(card.0).or_default() += 1;
    }
    let mut groups: Vec<(usize, Value)> = counts.into_iter().map(|(v, n)| (n, v)).collect();
    groups.sort_unstable_by(|a, b| b.cmp(a));

    let kickers = |exclude: &[Value], n: usize| -> Vec<Value> {
        distinct_desc(cards)
            .into_iter()
            .filter(|v| !exclude.contains(v))
            .take(n)
            .collect()
    };

    if let Some(&(4, quad)) = groups.first() {
        let mut values = vec![quad];
        values.extend(kickers(&[quad], 1));
        return HandValue {
            rank: Rank::FourOfAKind,
            values,
        };
    }

    if let Some(&(3, trips)) = groups.first()
        && let Some(&(_, pair)) = groups.iter().skip(1).find(|(n, _)| *n >= 2)
    {
        return HandValue {
            rank: Rank::FullHouse,
            values: vec![trips, pair],
        };
    }

    if let Some(suited) = flush {
        let mut values: Vec<Value> = suited.iter().map(|c| c.0).collect();
        values.sort_unstable_by(|a, b| b.cmp(a));
        values.truncate(5);
        return HandValue {
            rank: Rank::Flush,
            values,
        };
    }

    if let Some(high) = straight_high(&distinct_desc(cards)) {
        return HandValue {
            rank: Rank::Straight,
            values: vec![high],
        };
    }

    match groups.as_slice() {
        [(3, trips), ..] => {
            let mut values = vec![*trips];
            values.extend(kickers(&[*trips], 2));
            HandValue {
                rank: Rank::ThreeOfAKind,
                values,
            }
        }
        [(2, high), (2, low), ..] => {
            let mut values = vec![*high, *low];
            values.extend(kickers(&[*high, *low], 1));
            HandValue {
                rank: Rank::TwoPair,
                values,
            }
        }
        [(2, pair), ..] => {
            let mut values = vec![*pair];
            values.extend(kickers(&[*pair], 3));
            HandValue {
                rank: Rank::OnePair,
                values,
            }
        }
        _ => HandValue {
            rank: Rank::HighCard,
            values: kickers(&[], 5),
        },
    }
}

/// Indices of all the maximal elements.
#[must_use]
pub fn argmax<T: Ord>(items: &[T]) -> Vec<usize> {
    let Some(best) = items.iter().max() else {
        return Vec::new();
    };
    items
        .iter()
        .enumerate()
        .filter(|(_, item)| *item == best)
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::Suit::{Club, Diamond, Heart, Spade};

    fn cards(pairs: &[(Value, Suit)]) -> Vec<Card> {
        pairs.iter().map(|(v, s)| Card(*v, *s)).collect()
    }

    #[test]
    fn royal_flush_beats_quads() {
        let royal = eval(&cards(&[
            (14, Spade),
            (13, Spade),
            (12, Spade),
            (11, Spade),
            (10, Spade),
            (2, Heart),
            (3, Diamond),
        ]));
        let quads = eval(&cards(&[
            (9, Spade),
            (9, Heart),
            (9, Diamond),
            (9, Club),
            (14, Heart),
        ]));
        assert_eq!(royal.rank, Rank::StraightFlush);
        assert_eq!(quads.rank, Rank::FourOfAKind);
        assert_eq!(quads.values, vec![9, 14]);
        assert!(royal > quads);
    }

    #[test]
    fn wheel_is_five_high_straight() {
        let wheel = eval(&cards(&[
            (14, Spade),
            (2, Heart),
            (3, Diamond),
            (4, Club),
            (5, Spade),
            (9, Heart),
        ]));
        assert_eq!(wheel.rank, Rank::Straight);
        assert_eq!(wheel.values, vec![5]);
    }

    #[test]
    fn full_house_from_two_trips() {
        let hand = eval(&cards(&[
            (8, Spade),
            (8, Heart),
            (8, Diamond),
            (4, Club),
            (4, Spade),
            (4, Heart),
            (2, Club),
        ]));
        assert_eq!(hand.rank, Rank::FullHouse);
        assert_eq!(hand.values, vec![8, 4]);
    }

    #[test]
    fn flush_keeps_top_five() {
        let hand = eval(&cards(&[
            (2, Heart),
            (5, Heart),
            (9, Heart),
            (11, Heart),
            (13, Heart),
            (7, Heart),
            (14, Club),
        ]));
        assert_eq!(hand.rank, Rank::Flush);
        assert_eq!(hand.values, vec![13, 11, 9, 7, 5]);
    }

    #[test]
    fn two_pair_kicker_decides() {
        let board = [(10, Spade), (10, Heart), (6, Club), (6, Diamond), (2, Spade)];
        let mut a = cards(&board);
        a.extend(cards(&[(14, Club), (3, Heart)]));
        let mut b = cards(&board);
        b.extend(cards(&[(13, Club), (3, Diamond)]));
        let (a, b) = (eval(&a), eval(&b));
        assert_eq!(a.rank, Rank::TwoPair);
        assert!(a > b);
    }

    #[test]
    fn pair_and_high_card() {
        let pair = eval(&cards(&[(7, Spade), (7, Heart), (2, Club), (9, Diamond), (13, Spade)]));
        assert_eq!(pair.rank, Rank::OnePair);
        assert_eq!(pair.values, vec![7, 13, 9, 2]);
        let high = eval(&cards(&[(7, Spade), (4, Heart), (2, Club), (9, Diamond), (13, Spade)]));
        assert_eq!(high.rank, Rank::HighCard);
        assert_eq!(high.values, vec![13, 9, 7, 4, 2]);
    }

    #[test]
    fn argmax_returns_all_ties() {
        assert_eq!(argmax(&[3, 7, 1, 7]), vec![1, 3]);
        assert!(argmax::<u8>(&[]).is_empty());
    }
}
