//! Tables and the actor that runs the game at each one.
//!
//! ## Architecture
//!
//! A [`Table`] owns its seats behind a single async mutex; that lock is the
//! only place membership changes and hand starts are serialized. Each table
//! gets one [`GameActor`] task with an mpsc inbox, reached through the
//! cloneable [`GameMediator`] handle. The actor is the only writer of the
//! running hand, and it publishes events only after it lets go of the lock.
//! [`ServerContext`] owns the table and game registries.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::game::entities::{Chips, PlayerId, SeatIndex, TableId};

pub mod actor;
pub mod config;
pub mod manager;
pub mod messages;
pub mod roster;

pub use actor::{GameActor, GameMediator};
pub use config::TableConfig;
pub use manager::{HOUSE, ServerContext, ServerEvent, TableSummary};
pub use messages::{MediatorMessage, SeatView, TableSnapshot};
pub use roster::Roster;

#[derive(Clone, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum TableError {
    #[error("table is full")]
    Full,
    #[error("seat {0} is taken")]
    SeatTaken(SeatIndex),
    #[error("there is no seat {0}")]
    NoSuchSeat(SeatIndex),
    #[error("{0} is already seated")]
    AlreadySeated(PlayerId),
    #[error("{0} is not seated here")]
    NotSeated(PlayerId),
    #[error("{0} does not exist")]
    NotFound(TableId),
    #[error("buy-in must be between {min} and {max}, got {stack}")]
    BuyIn { stack: Chips, min: Chips, max: Chips },
    #[error("invalid table config: {0}")]
    InvalidConfig(String),
    #[error("a buy-in of {0} would put more chips on the table than it can count")]
    TooManyChips(Chips),
}

pub struct Table {
    pub id: TableId,
    pub config: TableConfig,
    pub roster: Mutex<Roster>,
}

impl Table {
    pub fn new(id: TableId, config: TableConfig) -> Result<Self, TableError> {
        config.validate()?;
        let roster = Roster::new(config.max_players);
        Ok(Self {
            id,
            config,
            roster: Mutex::new(roster),
        })
    }
}
