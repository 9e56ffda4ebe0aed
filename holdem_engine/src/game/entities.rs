use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt};
use thiserror::Error;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Suit {
    Club,
    Spade,
    Diamond,
    Heart,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Club, Suit::Spade, Suit::Diamond, Suit::Heart];
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Club => "♣",
            Self::Spade => "♠",
            Self::Diamond => "♦",
            Self::Heart => "♥",
        };
        write!(f, "{repr}")
    }
}

/// Placeholder for card values.
pub type Value = u8;

pub const ACE: Value = 14;

/// A card is a tuple of a value (deuce=2u8 ... ace=14u8) and a suit.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Card(pub Value, pub Suit);

fn value_repr(value: Value) -> String {
    match value {
        1 | ACE => "A".to_string(),
        11 => "J".to_string(),
        12 => "Q".to_string(),
        13 => "K".to_string(),
        v => v.to_string(),
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = format!("{}/{}", value_repr(self.0), self.1);
        write!(f, "{repr:>4}")
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Rank {
    HighCard,
    OnePair,
    TwoPair,
    ThreeOfAKind,
    Straight,
    Flush,
    FullHouse,
    FourOfAKind,
    StraightFlush,
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::HighCard => "hi",
            Self::OnePair => "1p",
            Self::TwoPair => "2p",
            Self::ThreeOfAKind => "3k",
            Self::Straight => "s8",
            Self::Flush => "fs",
            Self::FullHouse => "fh",
            Self::FourOfAKind => "4k",
            Self::StraightFlush => "sf",
        };
        write!(f, "{repr}")
    }
}

/// Strength of a hand. Ordering is rank first, then kickers from most to
/// least significant.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct HandValue {
    pub rank: Rank,
    pub values: Vec<Value>,
}

impl fmt::Display for HandValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kickers = self
            .values
            .iter()
            .map(|v| value_repr(*v))
            .collect::<Vec<_>>()
            .join(",");
        write!(f, "{} [{kickers}]", self.rank)
    }
}

#[derive(Debug, Eq, Error, PartialEq)]
pub enum DeckError {
    #[error("deck is exhausted")]
    Exhausted,
}

#[derive(Debug)]
pub struct Deck {
    cards: [Card; 52],
    pub deck_idx: usize,
    rng: StdRng,
}

impl Deck {
    /// A deck whose shuffles are reproducible.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        let mut cards: [Card; 52] = [Card(2, Suit::Club); 52];
        for (i, value) in (2u8..=ACE).enumerate() {
            for (j, suit) in Suit::ALL.into_iter().enumerate() {
                cards[4 * i + j] = Card(value, suit);
            }
        }
        Self {
            cards,
            deck_idx: 0,
            rng,
        }
    }

    pub fn draw(&mut self) -> Result<Card, DeckError> {
        let card = *self.cards.get(self.deck_idx).ok_or(DeckError::Exhausted)?;
        self.deck_idx += 1;
        Ok(card)
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.cards.len() - self.deck_idx
    }

    /// Collects every card back and shuffles.
    pub fn reset(&mut self) {
        self.cards.shuffle(&mut self.rng);
        self.deck_idx = 0;
    }
}

impl Default for Deck {
    fn default() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }
}

/// Whole chips. All bets and player stacks are whole chips.
pub type Chips = u32;

#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player#{}", self.0)
    }
}

#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub struct TableId(pub u64);

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "table#{}", self.0)
    }
}

/// Type alias for seat positions at a table.
pub type SeatIndex = usize;

/// A seated player. Everything that only matters for the hand being played
/// lives in the hand itself, keyed by `PlayerId`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub stack: Chips,
    pub seat: SeatIndex,
}

impl Player {
    #[must_use]
    pub fn new(id: PlayerId, name: &str, stack: Chips, seat: SeatIndex) -> Self {
        Self {
            id,
            name: name.to_string(),
            stack,
            seat,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Blinds {
    pub small: Chips,
    pub big: Chips,
}

impl fmt::Display for Blinds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.small, self.big)
    }
}

/// Betting actions a player can take during a round. Bet and raise amounts
/// are the player's total contribution for the round after the action.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Action {
    AllIn,
    Bet(Chips),
    Call,
    Check,
    Fold,
    Raise(Chips),
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::AllIn => "goes all-in",
            Self::Bet(amount) => &format!("bets {amount}"),
            Self::Call => "calls",
            Self::Check => "checks",
            Self::Fold => "folds",
            Self::Raise(amount) => &format!("raises to {amount}"),
        };
        write!(f, "{repr}")
    }
}

/// A pot slice and the players that can win it.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Pot {
    pub amount: Chips,
    pub eligible: BTreeSet<PlayerId>,
}

impl fmt::Display for Pot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} eligible)", self.amount, self.eligible.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_deck_has_52_unique_cards() {
        let mut deck = Deck::seeded(7);
        deck.reset();
        let mut seen = HashSet::new();
        for _ in 0..52 {
            assert!(seen.insert(deck.draw().unwrap()));
        }
        assert_eq!(deck.remaining(), 0);
    }

    #[test]
    fn test_deck_exhausted() {
        let mut deck = Deck::seeded(1);
        for _ in 0..52 {
            deck.draw().unwrap();
        }
        assert_eq!(deck.draw(), Err(DeckError::Exhausted));
    }

    #[test]
    fn test_deck_reset_restores_all_cards() {
        let mut deck = Deck::seeded(3);
        deck.draw().unwrap();
        deck.draw().unwrap();
        deck.reset();
        assert_eq!(deck.deck_idx, 0);
        assert_eq!(deck.remaining(), 52);
    }

    #[test]
    fn test_seeded_decks_shuffle_identically() {
        let mut a = Deck::seeded(42);
        let mut b = Deck::seeded(42);
        a.reset();
        b.reset();
        for _ in 0..52 {
            assert_eq!(a.draw(), b.draw());
        }
    }

    #[test]
    fn test_card_display_face_cards() {
        assert_eq!(Card(ACE, Suit::Spade).to_string(), " A/♠");
        assert_eq!(Card(11, Suit::Heart).to_string(), " J/♥");
        assert_eq!(Card(10, Suit::Club).to_string(), "10/♣");
    }

    #[test]
    fn test_hand_value_ordering() {
        let pair = HandValue {
            rank: Rank::OnePair,
            values: vec![9, 14, 10, 4],
        };
        let better_kicker = HandValue {
            rank: Rank::OnePair,
            values: vec![9, 14, 12, 4],
        };
        let flush = HandValue {
            rank: Rank::Flush,
            values: vec![7, 6, 5, 4, 2],
        };
        assert!(better_kicker > pair);
        assert!(flush > better_kicker);
    }

    #[test]
    fn test_action_display() {
        assert_eq!(Action::Raise(40).to_string(), "raises to 40");
        assert_eq!(Action::Bet(20).to_string(), "bets 20");
        assert_eq!(Action::Check.to_string(), "checks");
    }

    #[test]
    fn test_ids_display() {
        assert_eq!(PlayerId(3).to_string(), "player#3");
        assert_eq!(TableId(9).to_string(), "table#9");
    }
}
