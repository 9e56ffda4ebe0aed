//! Server context: every table, every game mediator and every session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};
use tokio::sync::RwLock;

use super::{
    Table, TableError,
    actor::{GameActor, GameMediator},
    config::TableConfig,
};
use crate::{
    game::{
        HandEvaluator, StandardEvaluator,
        entities::{Blinds, Chips, PlayerId, TableId},
    },
    mediator::EventMediator,
    session::{Session, SessionRegistry},
};

/// Subscriber id reserved for the server itself. Players are numbered from 1.
pub const HOUSE: PlayerId = PlayerId(0);

/// Server-scope events, heard by everyone not playing a hand.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum ServerEvent {
    TableCreated {
        table: TableId,
        name: String,
    },
    TableRemoved(TableId),
    PlayerJoinedTable {
        player: PlayerId,
        name: String,
        table: TableId,
    },
    PlayerLeftTable {
        player: PlayerId,
        table: TableId,
        stack: Chips,
    },
    GameStarted {
        table: TableId,
        hand: u64,
    },
    ChatMessage {
        player: PlayerId,
        message: String,
        sent_at: DateTime<Utc>,
    },
}

impl fmt::Display for ServerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::TableCreated { table, name } => format!("{table} '{name}' created"),
            Self::TableRemoved(table) => format!("{table} removed"),
            Self::PlayerJoinedTable {
                player,
                name,
                table,
            } => format!("{name} ({player}) joined {table}"),
            Self::PlayerLeftTable {
                player,
                table,
                stack,
            } => format!("{player} left {table} with {stack}"),
            Self::GameStarted { table, hand } => format!("{table} started hand {hand}"),
            Self::ChatMessage {
                player, message, ..
            } => format!("{player}: {message}"),
        };
        write!(f, "{repr}")
    }
}

/// Table metadata for discovery
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TableSummary {
    pub id: TableId,
    pub name: String,
    pub player_count: usize,
    pub max_players: usize,
    pub blinds: Blinds,
    pub in_hand: bool,
}

/// Everything shared by the whole server. Created once and passed around by
/// `Arc`.
pub struct ServerContext {
    tables: RwLock<HashMap<TableId, Arc<Table>>>,

    /// Exactly one mediator per table
    games: RwLock<HashMap<TableId, GameMediator>>,

    sessions: Arc<SessionRegistry>,

    events: Arc<EventMediator<ServerEvent>>,

    next_table_id: AtomicU64,

    next_player_id: AtomicU64,

    evaluator: Arc<dyn HandEvaluator>,
}

impl ServerContext {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Self::with_evaluator(Arc::new(StandardEvaluator))
    }

    #[must_use]
    pub fn with_evaluator(evaluator: Arc<dyn HandEvaluator>) -> Arc<Self> {
        let events = Arc::new(EventMediator::new("server"));
        Arc::new(Self {
            tables: RwLock::new(HashMap::new()),
            games: RwLock::new(HashMap::new()),
            sessions: Arc::new(SessionRegistry::new(Arc::clone(&events))),
            events,
            next_table_id: AtomicU64::new(1),
            next_player_id: AtomicU64::new(1),
            evaluator,
        })
    }

    #[must_use]
    pub fn events(&self) -> &Arc<EventMediator<ServerEvent>> {
        &self.events
    }

    #[must_use]
    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    /// New idle session for a player called `name`.
    pub fn register_player(self: &Arc<Self>, name: &str) -> Session {
        let player = PlayerId(self.next_player_id.fetch_add(1, Ordering::Relaxed));
        self.sessions.register(player, name);
        log::info!("{name} registered as {player}");
        Session::new(player, Arc::clone(self))
    }

    /// Create an empty table and spawn its game actor.
    pub async fn create_table(&self, config: TableConfig) -> Result<TableId, TableError> {
        config.validate()?;
        let table_id = TableId(self.next_table_id.fetch_add(1, Ordering::Relaxed));
        let name = config.name.clone();
        let table = Arc::new(Table::new(table_id, config)?);

        let (actor, mediator) = GameActor::new(
            Arc::clone(&table),
            Arc::clone(&self.sessions),
            Arc::clone(&self.events),
            Arc::clone(&self.evaluator),
        );
        self.tables.write().await.insert(table_id, table);
        self.games.write().await.insert(table_id, mediator);
        tokio::spawn(actor.run());

        log::info!("Created {table_id} '{name}'");
        self.events.publish(&ServerEvent::TableCreated {
            table: table_id,
            name,
        });
        Ok(table_id)
    }

    pub async fn table(&self, id: TableId) -> Option<Arc<Table>> {
        self.tables.read().await.get(&id).cloned()
    }

    pub async fn mediator(&self, id: TableId) -> Option<GameMediator> {
        self.games.read().await.get(&id).cloned()
    }

    /// Every table, described from its latest snapshot.
    pub async fn list_tables(&self) -> Vec<TableSummary> {
        let tables = self.tables.read().await;
        let games = self.games.read().await;
        let mut summaries: Vec<TableSummary> = tables
            .values()
            .map(|table| {
                let snapshot = games.get(&table.id).map(GameMediator::snapshot);
                TableSummary {
                    id: table.id,
                    name: table.config.name.clone(),
                    player_count: snapshot.as_ref().map_or(0, |s| s.seats.len()),
                    max_players: table.config.max_players,
                    blinds: table.config.blinds(),
                    in_hand: snapshot.is_some_and(|s| s.hand.is_some()),
                }
            })
            .collect();
        summaries.sort_by_key(|s| s.id);
        summaries
    }

    /// Remove `id` and stop its mediator if nobody is seated there.
    pub async fn remove_table_if_empty(&self, id: TableId) -> bool {
        let Some(table) = self.table(id).await else {
            return false;
        };
        let mut roster = table.roster.lock().await;
        if !roster.is_empty() {
            return false;
        }
        // Joins already queued at the actor see this under the same lock.
        roster.close();
        self.tables.write().await.remove(&id);
        let mediator = self.games.write().await.remove(&id);
        drop(roster);

        if let Some(mediator) = mediator {
            mediator.close().await;
        }
        log::info!("Removed empty {id}");
        self.events.publish(&ServerEvent::TableRemoved(id));
        true
    }

    /// Chat to everyone in the server scope.
    pub fn say(&self, player: PlayerId, message: &str) {
        self.events.publish(&ServerEvent::ChatMessage {
            player,
            message: message.to_string(),
            sent_at: Utc::now(),
        });
    }

    /// Stop every game actor. Tables stay registered but no longer respond.
    pub async fn shutdown(&self) {
        let games: Vec<GameMediator> = self.games.write().await.drain().map(|(_, m)| m).collect();
        for mediator in &games {
            mediator.close().await;
        }
        self.tables.write().await.clear();
        log::info!("Closed {} table(s)", games.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{SessionError, SessionTag};
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn create_table_publishes_and_registers() {
        let context = ServerContext::new();
        let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();
        context.events().subscribe(HOUSE, Arc::new(tx));

        let id = context.create_table(TableConfig::default()).await.unwrap();
        assert_eq!(
            rx.recv().await.unwrap(),
            ServerEvent::TableCreated {
                table: id,
                name: "Default Table".to_string()
            }
        );
        assert!(context.table(id).await.is_some());
        assert!(context.mediator(id).await.is_some());

        let tables = context.list_tables().await;
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].player_count, 0);
    }

    #[tokio::test]
    async fn invalid_config_creates_nothing() {
        let context = ServerContext::new();
        let config = TableConfig {
            big_blind: 1,
            ..TableConfig::default()
        };
        assert!(context.create_table(config).await.is_err());
        assert!(context.list_tables().await.is_empty());
    }

    #[tokio::test]
    async fn empty_table_is_removed() {
        let context = ServerContext::new();
        let id = context.create_table(TableConfig::default()).await.unwrap();
        let mediator = context.mediator(id).await.unwrap();
        assert!(context.remove_table_if_empty(id).await);
        assert!(context.table(id).await.is_none());
        assert!(!context.remove_table_if_empty(id).await);
        // The actor stops once it sees the close.
        while !mediator.is_closed() {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn join_after_removal_leaves_session_idle() {
        let context = ServerContext::new();
        let id = context.create_table(TableConfig::default()).await.unwrap();
        let mediator = context.mediator(id).await.unwrap();
        let ann = context.register_player("ann");
        assert!(context.remove_table_if_empty(id).await);

        // A join that got hold of the mediator before the table went away
        let err = mediator
            .join_game(ann.player(), "ann".to_string(), 500, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::Table(TableError::NotFound(_)) | SessionError::MediatorClosed
        ));
        assert_eq!(ann.state().unwrap().tag(), SessionTag::Idle);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn join_racing_removal_never_strands_a_session() {
        for _ in 0..50 {
            let context = ServerContext::new();
            let id = context.create_table(TableConfig::default()).await.unwrap();
            let bob = context.register_player("bob");

            let (joined, removed) = tokio::join!(
                bob.join_table(id, 500, None),
                context.remove_table_if_empty(id)
            );
            match joined {
                Ok(_) => {
                    assert!(!removed);
                    assert!(context.table(id).await.is_some());
                    assert_eq!(bob.leave_table().await.unwrap(), 500);
                }
                Err(_) => {
                    assert!(removed);
                    assert_eq!(bob.state().unwrap().tag(), SessionTag::Idle);
                }
            }
            context.shutdown().await;
        }
    }

    #[tokio::test]
    async fn player_ids_start_after_the_house() {
        let context = ServerContext::new();
        let ann = context.register_player("ann");
        let bob = context.register_player("bob");
        assert_eq!(ann.player(), PlayerId(1));
        assert_eq!(bob.player(), PlayerId(2));
        assert_eq!(context.sessions().len(), 2);
    }
}
