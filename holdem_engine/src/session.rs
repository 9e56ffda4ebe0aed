//! Per-player sessions.
//!
//! Every player connected to the server has exactly one [`SessionState`].
//! Whether an operation is legal is decided in one place,
//! [`SessionTag::permits`]; the state itself only says where the player is.

use log::debug;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, PoisonError, RwLock},
};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::{
    game::{
        ActionError, GameEvent,
        entities::{Action, Card, Chips, PlayerId, SeatIndex, TableId},
    },
    mediator::EventMediator,
    table::{GameMediator, ServerContext, ServerEvent, TableConfig, TableError},
};

/// Everything a player can ask of their session.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum SessionOp {
    CreateTable,
    JoinTable,
    StartGame,
    Call,
    Bet,
    Raise,
    Check,
    Fold,
    AllIn,
    Deal,
    PocketCards,
    LeaveTable,
    Say,
}

impl From<Action> for SessionOp {
    fn from(action: Action) -> Self {
        match action {
            Action::AllIn => Self::AllIn,
            Action::Bet(_) => Self::Bet,
            Action::Call => Self::Call,
            Action::Check => Self::Check,
            Action::Fold => Self::Fold,
            Action::Raise(_) => Self::Raise,
        }
    }
}

impl fmt::Display for SessionOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::CreateTable => "create a table",
            Self::JoinTable => "join a table",
            Self::StartGame => "start the game",
            Self::Call => "call",
            Self::Bet => "bet",
            Self::Raise => "raise",
            Self::Check => "check",
            Self::Fold => "fold",
            Self::AllIn => "go all-in",
            Self::Deal => "deal",
            Self::PocketCards => "look at your cards",
            Self::LeaveTable => "leave the table",
            Self::Say => "chat",
        };
        write!(f, "{repr}")
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum SessionTag {
    Idle,
    SeatedWaiting,
    Playing,
}

impl SessionTag {
    /// The permission matrix.
    #[must_use]
    pub fn permits(self, op: SessionOp) -> bool {
        use SessionOp::*;
        match op {
            CreateTable | JoinTable => self == Self::Idle,
            StartGame => self == Self::SeatedWaiting,
            Call | Bet | Raise | Check | Fold | AllIn | Deal | PocketCards => {
                self == Self::Playing
            }
            LeaveTable => self != Self::Idle,
            Say => true,
        }
    }
}

impl fmt::Display for SessionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Idle => "not at a table",
            Self::SeatedWaiting => "waiting at a table",
            Self::Playing => "playing",
        };
        write!(f, "{repr}")
    }
}

/// Where a player is. Seated states carry the table's mediator.
#[derive(Clone, Debug, Default)]
pub enum SessionState {
    #[default]
    Idle,
    SeatedWaiting(GameMediator),
    Playing(GameMediator),
}

impl SessionState {
    #[must_use]
    pub fn tag(&self) -> SessionTag {
        match self {
            Self::Idle => SessionTag::Idle,
            Self::SeatedWaiting(_) => SessionTag::SeatedWaiting,
            Self::Playing(_) => SessionTag::Playing,
        }
    }

    #[must_use]
    pub fn permits(&self, op: SessionOp) -> bool {
        self.tag().permits(op)
    }

    #[must_use]
    pub fn mediator(&self) -> Option<&GameMediator> {
        match self {
            Self::Idle => None,
            Self::SeatedWaiting(mediator) | Self::Playing(mediator) => Some(mediator),
        }
    }

    #[must_use]
    pub fn table_id(&self) -> Option<TableId> {
        self.mediator().map(GameMediator::table_id)
    }
}

#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum SessionError {
    #[error("can't {op} while {state}")]
    NotAllowed { op: SessionOp, state: SessionTag },
    #[error("{0} has no session")]
    UnknownPlayer(PlayerId),
    #[error("table is closed")]
    MediatorClosed,
    #[error(transparent)]
    Action(#[from] ActionError),
    #[error(transparent)]
    Table(#[from] TableError),
}

/// What a session listener receives.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum Notification {
    Game(GameEvent),
    Server(ServerEvent),
}

impl From<GameEvent> for Notification {
    fn from(event: GameEvent) -> Self {
        Self::Game(event)
    }
}

impl From<ServerEvent> for Notification {
    fn from(event: ServerEvent) -> Self {
        Self::Server(event)
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Game(event) => write!(f, "{event}"),
            Self::Server(event) => write!(f, "{event}"),
        }
    }
}

/// Buffered notifications per listener before events start getting dropped.
pub const NOTIFICATION_BUFFER: usize = 256;

struct Entry {
    name: String,
    state: SessionState,
    listener: Option<mpsc::Sender<Notification>>,
}

/// Every session on the server. Holding the lock never spans an `.await`;
/// when a table roster is also needed, it is locked first.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<PlayerId, Entry>>,
    server_events: Arc<EventMediator<ServerEvent>>,
}

impl SessionRegistry {
    pub fn new(server_events: Arc<EventMediator<ServerEvent>>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            server_events,
        }
    }

    pub fn register(&self, player: PlayerId, name: &str) {
        let entry = Entry {
            name: name.to_string(),
            state: SessionState::Idle,
            listener: None,
        };
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(player, entry);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn name(&self, player: PlayerId) -> Result<String, SessionError> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&player)
            .map(|entry| entry.name.clone())
            .ok_or(SessionError::UnknownPlayer(player))
    }

    pub fn state(&self, player: PlayerId) -> Result<SessionState, SessionError> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&player)
            .map(|entry| entry.state.clone())
            .ok_or(SessionError::UnknownPlayer(player))
    }

    /// Move `player` to `next` if their current state permits `op`. The
    /// player's listener follows them to the matching event scope.
    pub fn transition(
        &self,
        player: PlayerId,
        op: SessionOp,
        next: SessionState,
    ) -> Result<SessionState, SessionError> {
        let mut sessions = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let entry = sessions
            .get_mut(&player)
            .ok_or(SessionError::UnknownPlayer(player))?;
        let state = entry.state.tag();
        if !state.permits(op) {
            return Err(SessionError::NotAllowed { op, state });
        }

        let previous = std::mem::replace(&mut entry.state, next);
        if let Some(listener) = &entry.listener {
            self.unsubscribe(player, &previous);
            self.subscribe(player, listener, &entry.state);
        }
        debug!("{player}: {} -> {}", previous.tag(), entry.state.tag());
        Ok(previous)
    }

    /// Open a fresh notification stream for `player`, replacing any previous
    /// one.
    pub fn listen(
        &self,
        player: PlayerId,
        capacity: usize,
    ) -> Result<mpsc::Receiver<Notification>, SessionError> {
        let mut sessions = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let entry = sessions
            .get_mut(&player)
            .ok_or(SessionError::UnknownPlayer(player))?;
        let (sender, receiver) = mpsc::channel(capacity);
        self.subscribe(player, &sender, &entry.state);
        entry.listener = Some(sender);
        Ok(receiver)
    }

    fn subscribe(
        &self,
        player: PlayerId,
        listener: &mpsc::Sender<Notification>,
        state: &SessionState,
    ) {
        match state {
            SessionState::Playing(mediator) => {
                mediator.events().subscribe(player, Arc::new(listener.clone()));
            }
            _ => self
                .server_events
                .subscribe(player, Arc::new(listener.clone())),
        }
    }

    fn unsubscribe(&self, player: PlayerId, state: &SessionState) {
        match state {
            SessionState::Playing(mediator) => {
                mediator.events().unsubscribe(player);
            }
            _ => {
                self.server_events.unsubscribe(player);
            }
        }
    }
}

/// A connected player's handle. Every operation is checked against the
/// permission matrix before anything else happens, and a rejected operation
/// has no effect.
#[derive(Clone)]
pub struct Session {
    player: PlayerId,
    context: Arc<ServerContext>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("player", &self.player)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub(crate) fn new(player: PlayerId, context: Arc<ServerContext>) -> Self {
        Self { player, context }
    }

    #[must_use]
    pub fn player(&self) -> PlayerId {
        self.player
    }

    pub fn state(&self) -> Result<SessionState, SessionError> {
        self.context.sessions().state(self.player)
    }

    fn guard(&self, op: SessionOp) -> Result<SessionState, SessionError> {
        let state = self.state()?;
        if !state.permits(op) {
            return Err(SessionError::NotAllowed {
                op,
                state: state.tag(),
            });
        }
        Ok(state)
    }

    fn seated(&self, op: SessionOp) -> Result<GameMediator, SessionError> {
        let state = self.guard(op)?;
        state.mediator().cloned().ok_or(SessionError::NotAllowed {
            op,
            state: state.tag(),
        })
    }

    /// One stream for everything this player is allowed to hear about.
    pub fn listen(&self) -> Result<mpsc::Receiver<Notification>, SessionError> {
        self.context
            .sessions()
            .listen(self.player, NOTIFICATION_BUFFER)
    }

    /// Create a table and sit down at it.
    pub async fn create_table(
        &self,
        config: TableConfig,
        buy_in: Chips,
    ) -> Result<TableId, SessionError> {
        self.guard(SessionOp::CreateTable)?;
        config.check_buy_in(buy_in)?;
        let table = self.context.create_table(config).await?;
        if let Err(err) = self.join_table(table, buy_in, None).await {
            self.context.remove_table_if_empty(table).await;
            return Err(err);
        }
        Ok(table)
    }

    pub async fn join_table(
        &self,
        table: TableId,
        buy_in: Chips,
        seat: Option<SeatIndex>,
    ) -> Result<SeatIndex, SessionError> {
        self.guard(SessionOp::JoinTable)?;
        let mediator = self
            .context
            .mediator(table)
            .await
            .ok_or(TableError::NotFound(table))?;
        let name = self.context.sessions().name(self.player)?;
        mediator.join_game(self.player, name, buy_in, seat).await
    }

    pub async fn start_game(&self) -> Result<(), SessionError> {
        self.seated(SessionOp::StartGame)?.deal(self.player).await
    }

    async fn act(&self, action: Action) -> Result<(), SessionError> {
        self.seated(SessionOp::from(action))?
            .act(self.player, action)
            .await
    }

    pub async fn call(&self) -> Result<(), SessionError> {
        self.act(Action::Call).await
    }

    /// `amount` is the total put in this round after the bet.
    pub async fn bet(&self, amount: Chips) -> Result<(), SessionError> {
        self.act(Action::Bet(amount)).await
    }

    /// `amount` is the total to raise to.
    pub async fn raise(&self, amount: Chips) -> Result<(), SessionError> {
        self.act(Action::Raise(amount)).await
    }

    pub async fn check(&self) -> Result<(), SessionError> {
        self.act(Action::Check).await
    }

    pub async fn fold(&self) -> Result<(), SessionError> {
        self.act(Action::Fold).await
    }

    pub async fn all_in(&self) -> Result<(), SessionError> {
        self.act(Action::AllIn).await
    }

    pub async fn deal(&self) -> Result<(), SessionError> {
        self.seated(SessionOp::Deal)?.deal(self.player).await
    }

    /// Stand up and return the stack carried away. Folds first when a hand
    /// is in progress.
    pub async fn leave_table(&self) -> Result<Chips, SessionError> {
        let mediator = self.seated(SessionOp::LeaveTable)?;
        let stack = mediator.leave_game(self.player).await?;
        self.context.remove_table_if_empty(mediator.table_id()).await;
        Ok(stack)
    }

    /// Chat to the table while playing, to the whole server otherwise.
    pub async fn say(&self, message: &str) -> Result<(), SessionError> {
        match self.guard(SessionOp::Say)? {
            SessionState::Playing(mediator) => {
                mediator.say(self.player, message.to_string()).await
            }
            _ => {
                self.context.say(self.player, message);
                Ok(())
            }
        }
    }

    pub async fn pocket_cards(&self) -> Result<Vec<Card>, SessionError> {
        self.seated(SessionOp::PocketCards)?
            .pocket_cards(self.player)
            .await
    }
}
