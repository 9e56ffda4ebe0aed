//! # Hold'em engine
//!
//! A server-authoritative Texas Hold'em engine. The server owns every table;
//! clients only ever ask for something through their [`Session`], and the
//! server decides whether it happens.
//!
//! ## Architecture
//!
//! - [`game`]: cards, hand strength, turn order, pots and the betting-round
//!   state machine for a single hand
//! - [`table`]: seats, the per-table game actor and its [`GameMediator`]
//!   handle, and the [`ServerContext`] holding every table
//! - [`session`]: per-player session state and the permission matrix that
//!   gates every operation
//! - [`mediator`]: the [`EventMediator`] fanning events out to listeners
//!
//! Each table runs one actor task that is the only writer of the hand being
//! played. Seating changes and hand starts are serialized by the table's
//! roster lock, and events are only published after that lock is released.
//!
//! ## Example
//!
//! ```no_run
//! use holdem_engine::{ServerContext, SessionError, TableConfig};
//!
//! # async fn demo() -> Result<(), SessionError> {
//! let context = ServerContext::new();
//! let ann = context.register_player("ann");
//! let bob = context.register_player("bob");
//!
//! let table = ann.create_table(TableConfig::default(), 500).await?;
//! let mut events = bob.listen()?;
//! bob.join_table(table, 500, None).await?;
//! while let Some(event) = events.recv().await {
//!     println!("{event}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod game;
pub mod mediator;
pub mod session;
pub mod table;

pub use game::{
    ActionError, GameEvent, HandEvaluator, Phase, StandardEvaluator,
    entities::{self, Action, Card, Chips, PlayerId, TableId},
    functional,
};
pub use mediator::{DeliveryError, EventMediator, Listener};
pub use session::{Notification, Session, SessionError, SessionOp, SessionState, SessionTag};
pub use table::{
    GameMediator, HOUSE, ServerContext, ServerEvent, TableConfig, TableError, TableSnapshot,
};
