use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

use super::{
    entities::{Action, Card, Chips, HandValue, PlayerId, Pot, SeatIndex},
    pots::Payouts,
    state_machine::Phase,
};

/// A forced bet taken at the start of a hand.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct BlindPost {
    pub player: PlayerId,
    pub amount: Chips,
}

/// Cards a player turned over at showdown.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ShownHand {
    pub cards: Vec<Card>,
    pub value: HandValue,
}

/// Everything that happens at a table, in the order it happened.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum GameEvent {
    HandStarted {
        hand: u64,
        dealer: PlayerId,
        small_blind: BlindPost,
        big_blind: BlindPost,
        players: Vec<PlayerId>,
        started_at: DateTime<Utc>,
    },
    NextPlayer {
        player: PlayerId,
        to_call: Chips,
        min_raise_to: Chips,
    },
    PotChanged {
        total: Chips,
        pots: Vec<Pot>,
    },
    RoundAdvanced {
        phase: Phase,
        dealt: Vec<Card>,
        board: Vec<Card>,
    },
    PlayerActed {
        player: PlayerId,
        action: Action,
        chips: Chips,
    },
    PlayerFolded(PlayerId),
    PlayerAllIn {
        player: PlayerId,
        chips: Chips,
    },
    PlayerJoined {
        player: PlayerId,
        name: String,
        seat: SeatIndex,
        stack: Chips,
    },
    PlayerLeft {
        player: PlayerId,
        stack: Chips,
    },
    ChatMessage {
        player: PlayerId,
        message: String,
        sent_at: DateTime<Utc>,
    },
    HandEnded {
        hand: u64,
        payouts: Payouts,
        shown: BTreeMap<PlayerId, ShownHand>,
        board: Vec<Card>,
    },
    HandAborted {
        hand: u64,
        reason: String,
    },
}

fn cards_repr(cards: &[Card]) -> String {
    cards
        .iter()
        .map(|c| c.to_string().trim_start().to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

impl fmt::Display for GameEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::HandStarted {
                hand,
                dealer,
                small_blind,
                big_blind,
                players,
                ..
            } => format!(
                "hand {hand} started with {} players, {dealer} has the button, {} posts {} and {} posts {}",
                players.len(),
                small_blind.player,
                small_blind.amount,
                big_blind.player,
                big_blind.amount,
            ),
            Self::NextPlayer {
                player, to_call, ..
            } => format!("{player} to act ({to_call} to call)"),
            Self::PotChanged { total, pots } => {
                format!("pot is {total} across {} pot(s)", pots.len().max(1))
            }
            Self::RoundAdvanced { phase, board, .. } => {
                format!("{phase}: {}", cards_repr(board))
            }
            Self::PlayerActed {
                player, action, ..
            } => format!("{player} {action}"),
            Self::PlayerFolded(player) => format!("{player} folds"),
            Self::PlayerAllIn { player, chips } => format!("{player} is all-in for {chips}"),
            Self::PlayerJoined {
                player,
                name,
                seat,
                stack,
            } => format!("{name} ({player}) sits in seat {seat} with {stack}"),
            Self::PlayerLeft { player, stack } => format!("{player} left with {stack}"),
            Self::ChatMessage {
                player, message, ..
            } => format!("{player}: {message}"),
            Self::HandEnded { hand, payouts, .. } => {
                let winners = payouts
                    .iter()
                    .map(|(player, chips)| format!("{player} wins {chips}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("hand {hand} ended: {winners}")
            }
            Self::HandAborted { hand, reason } => format!("hand {hand} aborted: {reason}"),
        };
        write!(f, "{repr}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::Suit;

    #[test]
    fn display_lines() {
        let event = GameEvent::PlayerActed {
            player: PlayerId(2),
            action: Action::Raise(60),
            chips: 40,
        };
        assert_eq!(event.to_string(), "player#2 raises to 60");

        let event = GameEvent::RoundAdvanced {
            phase: Phase::Flop,
            dealt: vec![],
            board: vec![Card(14, Suit::Spade), Card(10, Suit::Heart)],
        };
        assert_eq!(event.to_string(), "flop: A/♠ 10/♥");

        let event = GameEvent::HandEnded {
            hand: 3,
            payouts: Payouts::from([(PlayerId(1), 90), (PlayerId(2), 60)]),
            shown: BTreeMap::new(),
            board: vec![],
        };
        assert_eq!(
            event.to_string(),
            "hand 3 ended: player#1 wins 90, player#2 wins 60"
        );
    }

    #[test]
    fn events_serialize() {
        let event = GameEvent::HandEnded {
            hand: 1,
            payouts: Payouts::from([(PlayerId(1), 10)]),
            shown: BTreeMap::new(),
            board: vec![Card(2, Suit::Club)],
        };
        assert!(serde_json::to_string(&event).is_ok());

        let folded = GameEvent::PlayerFolded(PlayerId(4));
        let json = serde_json::to_string(&folded).unwrap();
        let back: GameEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, folded);
    }
}
