//! Hand-level poker logic: cards, hand strength, turn order, pots and the
//! betting-round state machine. Nothing in here is shared between tasks; the
//! table actor owns the running [`Game`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod entities;
pub mod events;
pub mod functional;
pub mod pots;
pub mod state_machine;
pub mod turns;

pub use entities::{Action, Blinds, Card, Chips, Deck, Player, PlayerId, SeatIndex, TableId};
pub use events::GameEvent;
pub use functional::{HandEvaluator, StandardEvaluator};
pub use pots::{Payouts, PotEngine};
pub use state_machine::{Game, Phase, Round};
pub use turns::{TurnError, TurnSequence};

/// Why an action was refused. Everything except `Internal` is the player's
/// mistake and leaves the game untouched.
#[derive(Clone, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum ActionError {
    #[error("not your turn")]
    OutOfTurn,
    #[error("can't do that during {phase}")]
    WrongPhase { phase: Phase },
    #[error("not dealt into this hand")]
    NotInHand,
    #[error("no hand in progress")]
    NoHandInProgress,
    #[error("hand already in progress")]
    HandInProgress,
    #[error("need 2+ players with chips")]
    NotEnoughPlayers,
    #[error("can't check, {to_call} to call")]
    CannotCheck { to_call: Chips },
    #[error("nothing to call")]
    NothingToCall,
    #[error("there's already a bet, raise instead")]
    BetAlreadyMade,
    #[error("no bet to raise, bet instead")]
    NoBetToRaise,
    #[error("need to raise to at least {min}")]
    RaiseTooSmall { min: Chips },
    #[error("need {needed} but only have {stack}")]
    InsufficientChips { needed: Chips, stack: Chips },
    #[error("invalid game state: {0}")]
    Internal(String),
}

impl From<TurnError> for ActionError {
    fn from(err: TurnError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<pots::PotError> for ActionError {
    fn from(err: pots::PotError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<entities::DeckError> for ActionError {
    fn from(err: entities::DeckError) -> Self {
        Self::Internal(err.to_string())
    }
}
