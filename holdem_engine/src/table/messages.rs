//! Game mediator message types.

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::{
    game::{
        Phase,
        entities::{Action, Card, Chips, PlayerId, Pot, SeatIndex, TableId},
    },
    session::SessionError,
};

pub type Reply<T> = oneshot::Sender<Result<T, SessionError>>;

/// Messages that can be sent to a `GameActor`
#[derive(Debug)]
pub enum MediatorMessage {
    /// Betting action from the player whose turn it is
    Act {
        player: PlayerId,
        action: Action,
        response: Reply<()>,
    },

    /// Start a hand if none is running
    Deal {
        player: PlayerId,
        response: Reply<()>,
    },

    /// Sit down; dealt in from the next hand on
    Join {
        player: PlayerId,
        name: String,
        stack: Chips,
        seat: Option<SeatIndex>,
        response: Reply<SeatIndex>,
    },

    /// Stand up, folding first if needed. Replies with the stack carried away.
    Leave {
        player: PlayerId,
        response: Reply<Chips>,
    },

    /// Chat to everyone at the table
    Say {
        player: PlayerId,
        message: String,
        response: Reply<()>,
    },

    /// Private query for one player's hole cards
    Pocket {
        player: PlayerId,
        response: Reply<Vec<Card>>,
    },

    /// Stop the actor
    Close,
}

/// Public view of one seat.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SeatView {
    pub player: PlayerId,
    pub name: String,
    pub seat: SeatIndex,
    pub stack: Chips,
    /// Chips put in during the current betting round
    pub bet: Chips,
    pub dealt_in: bool,
    pub folded: bool,
    pub all_in: bool,
}

/// Everything anybody at the table is allowed to see.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TableSnapshot {
    pub table_id: TableId,
    pub name: String,
    pub hand: Option<u64>,
    pub phase: Phase,
    pub board: Vec<Card>,
    pub pots: Vec<Pot>,
    pub pot_total: Chips,
    pub highest_bet: Chips,
    pub dealer: Option<PlayerId>,
    pub current: Option<PlayerId>,
    pub seats: Vec<SeatView>,
}

impl TableSnapshot {
    #[must_use]
    pub fn empty(table_id: TableId, name: &str) -> Self {
        Self {
            table_id,
            name: name.to_string(),
            hand: None,
            phase: Phase::Waiting,
            board: Vec::new(),
            pots: Vec::new(),
            pot_total: 0,
            highest_bet: 0,
            dealer: None,
            current: None,
            seats: Vec::new(),
        }
    }

    #[must_use]
    pub fn seat_of(&self, player: PlayerId) -> Option<&SeatView> {
        self.seats.iter().find(|s| s.player == player)
    }

    /// Stacks plus everything in the middle.
    #[must_use]
    pub fn total_chips(&self) -> Chips {
        self.seats.iter().map(|s| s.stack).sum::<Chips>() + self.pot_total
    }
}
