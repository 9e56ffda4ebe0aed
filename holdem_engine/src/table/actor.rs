//! Game actor implementation with async message handling.

use chrono::Utc;
use std::{fmt, sync::Arc};
use tokio::sync::{mpsc, oneshot, watch};

use super::{
    Table, TableError,
    manager::ServerEvent,
    messages::{MediatorMessage, Reply, SeatView, TableSnapshot},
    roster::Roster,
};
use crate::{
    game::{
        ActionError, Game, GameEvent, HandEvaluator, Phase,
        entities::{Action, Card, Chips, Deck, PlayerId, SeatIndex, TableId},
    },
    mediator::EventMediator,
    session::{SessionError, SessionOp, SessionRegistry, SessionState},
};

/// Messages waiting in a mediator's inbox before senders have to wait.
const INBOX_CAPACITY: usize = 100;

/// Hands in a row the blinds may decide before the table stops dealing on
/// its own. Tied all-in blinds can return every chip where it came from.
const MAX_UNATTENDED_HANDS: usize = 64;

/// Cloneable handle to a table's game actor
#[derive(Clone)]
pub struct GameMediator {
    sender: mpsc::Sender<MediatorMessage>,
    table_id: TableId,
    snapshot: watch::Receiver<TableSnapshot>,
    events: Arc<EventMediator<GameEvent>>,
}

impl fmt::Debug for GameMediator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameMediator")
            .field("table_id", &self.table_id)
            .finish_non_exhaustive()
    }
}

impl GameMediator {
    #[must_use]
    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    /// Game-scope events of this table.
    #[must_use]
    pub fn events(&self) -> &Arc<EventMediator<GameEvent>> {
        &self.events
    }

    /// Latest public state of the table. Never waits on the actor.
    #[must_use]
    pub fn snapshot(&self) -> TableSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Receiver that is notified every time the snapshot changes.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<TableSnapshot> {
        self.snapshot.clone()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    async fn request<T>(
        &self,
        message: impl FnOnce(Reply<T>) -> MediatorMessage,
    ) -> Result<T, SessionError> {
        let (response, reply) = oneshot::channel();
        self.sender
            .send(message(response))
            .await
            .map_err(|_| SessionError::MediatorClosed)?;
        reply.await.map_err(|_| SessionError::MediatorClosed)?
    }

    pub async fn act(&self, player: PlayerId, action: Action) -> Result<(), SessionError> {
        self.request(|response| MediatorMessage::Act {
            player,
            action,
            response,
        })
        .await
    }

    pub async fn deal(&self, player: PlayerId) -> Result<(), SessionError> {
        self.request(|response| MediatorMessage::Deal { player, response })
            .await
    }

    pub async fn join_game(
        &self,
        player: PlayerId,
        name: String,
        stack: Chips,
        seat: Option<SeatIndex>,
    ) -> Result<SeatIndex, SessionError> {
        self.request(|response| MediatorMessage::Join {
            player,
            name,
            stack,
            seat,
            response,
        })
        .await
    }

    pub async fn leave_game(&self, player: PlayerId) -> Result<Chips, SessionError> {
        self.request(|response| MediatorMessage::Leave { player, response })
            .await
    }

    pub async fn say(&self, player: PlayerId, message: String) -> Result<(), SessionError> {
        self.request(|response| MediatorMessage::Say {
            player,
            message,
            response,
        })
        .await
    }

    pub async fn pocket_cards(&self, player: PlayerId) -> Result<Vec<Card>, SessionError> {
        self.request(|response| MediatorMessage::Pocket { player, response })
            .await
    }

    /// Ask the actor to stop. Returns false if it already had.
    pub async fn close(&self) -> bool {
        self.sender.send(MediatorMessage::Close).await.is_ok()
    }
}

/// Single writer of the hand being played at one table
pub struct GameActor {
    table: Arc<Table>,

    inbox: mpsc::Receiver<MediatorMessage>,

    /// Lets the actor hand out mediators without keeping its own inbox open
    weak_sender: mpsc::WeakSender<MediatorMessage>,

    game: Option<Game>,

    hands_played: u64,

    /// Next button: the player and the seat they had, in case they're gone
    button: Option<(PlayerId, SeatIndex)>,

    snapshot: watch::Sender<TableSnapshot>,

    events: Arc<EventMediator<GameEvent>>,

    server_events: Arc<EventMediator<ServerEvent>>,

    sessions: Arc<SessionRegistry>,

    evaluator: Arc<dyn HandEvaluator>,

    /// Events produced while the roster is locked, published once it isn't
    outbox: Vec<GameEvent>,

    server_outbox: Vec<ServerEvent>,
}

impl GameActor {
    /// Create a new game actor
    ///
    /// # Returns
    ///
    /// * `(GameActor, GameMediator)` - Actor to spawn and handle for sending messages
    pub fn new(
        table: Arc<Table>,
        sessions: Arc<SessionRegistry>,
        server_events: Arc<EventMediator<ServerEvent>>,
        evaluator: Arc<dyn HandEvaluator>,
    ) -> (Self, GameMediator) {
        let (sender, inbox) = mpsc::channel(INBOX_CAPACITY);
        let (snapshot, snapshot_rx) =
            watch::channel(TableSnapshot::empty(table.id, &table.config.name));
        let events = Arc::new(EventMediator::new(table.id.to_string()));

        let mediator = GameMediator {
            sender: sender.clone(),
            table_id: table.id,
            snapshot: snapshot_rx,
            events: Arc::clone(&events),
        };
        let actor = Self {
            table,
            inbox,
            weak_sender: sender.downgrade(),
            game: None,
            hands_played: 0,
            button: None,
            snapshot,
            events,
            server_events,
            sessions,
            evaluator,
            outbox: Vec::new(),
            server_outbox: Vec::new(),
        };
        (actor, mediator)
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        log::info!("{} '{}' open", self.table.id, self.table.config.name);

        while let Some(message) = self.inbox.recv().await {
            if !self.handle_message(message).await {
                break;
            }
        }

        log::info!("{} '{}' closed", self.table.id, self.table.config.name);
    }

    /// Returns false once the actor should stop.
    async fn handle_message(&mut self, message: MediatorMessage) -> bool {
        match message {
            MediatorMessage::Act {
                player,
                action,
                response,
            } => {
                let result = self.handle_action(player, action).await;
                let _ = response.send(result);
            }

            MediatorMessage::Deal { player, response } => {
                let result = self.handle_deal(player).await;
                let _ = response.send(result);
            }

            MediatorMessage::Join {
                player,
                name,
                stack,
                seat,
                response,
            } => {
                let result = self.handle_join(player, name, stack, seat).await;
                let _ = response.send(result);
            }

            MediatorMessage::Leave { player, response } => {
                let result = self.handle_leave(player).await;
                let _ = response.send(result);
            }

            MediatorMessage::Say {
                player,
                message,
                response,
            } => {
                let result = self.handle_say(player, message).await;
                let _ = response.send(result);
            }

            MediatorMessage::Pocket { player, response } => {
                let result = self
                    .game
                    .as_ref()
                    .and_then(|game| game.pocket(player))
                    .map(<[Card]>::to_vec)
                    .ok_or(SessionError::Action(ActionError::NotInHand));
                let _ = response.send(result);
            }

            MediatorMessage::Close => return false,
        }
        true
    }

    fn mediator(&self) -> Option<GameMediator> {
        Some(GameMediator {
            sender: self.weak_sender.upgrade()?,
            table_id: self.table.id,
            snapshot: self.snapshot.subscribe(),
            events: Arc::clone(&self.events),
        })
    }

    async fn handle_action(
        &mut self,
        player: PlayerId,
        action: Action,
    ) -> Result<(), SessionError> {
        let table = Arc::clone(&self.table);
        let mut roster = table.roster.lock().await;
        let game = self.game.as_mut().ok_or(ActionError::NoHandInProgress)?;
        let result = game.act(&mut roster, player, action);

        let result = self.absorb(&mut roster, result);
        if result.is_ok() {
            self.finish_if_over(&mut roster);
        }
        self.flush(roster);
        Ok(result?)
    }

    async fn handle_deal(&mut self, player: PlayerId) -> Result<(), SessionError> {
        let table = Arc::clone(&self.table);
        let mut roster = table.roster.lock().await;
        if !roster.contains(player) {
            return Err(TableError::NotSeated(player).into());
        }
        if self.game.is_some() {
            return Err(ActionError::HandInProgress.into());
        }

        let result = self.deal_hands(&mut roster, true);
        self.flush(roster);
        Ok(result?)
    }

    async fn handle_join(
        &mut self,
        player: PlayerId,
        name: String,
        stack: Chips,
        seat: Option<SeatIndex>,
    ) -> Result<SeatIndex, SessionError> {
        self.table.config.check_buy_in(stack)?;
        let mediator = self.mediator().ok_or(SessionError::MediatorClosed)?;

        let table = Arc::clone(&self.table);
        let mut roster = table.roster.lock().await;
        if roster.is_closed() {
            return Err(TableError::NotFound(table.id).into());
        }
        let seat = roster.add(player, &name, stack, seat)?;
        if let Err(err) = self.sessions.transition(
            player,
            SessionOp::JoinTable,
            SessionState::SeatedWaiting(mediator),
        ) {
            roster.remove(player)?;
            return Err(err);
        }

        log::info!("{}: {name} ({player}) sat down in seat {seat}", table.id);
        self.outbox.push(GameEvent::PlayerJoined {
            player,
            name: name.clone(),
            seat,
            stack,
        });
        self.server_outbox.push(ServerEvent::PlayerJoinedTable {
            player,
            name,
            table: table.id,
        });

        if self.game.is_none() && table.config.auto_start && roster.funded().len() >= 2 {
            if let Err(err) = self.deal_hands(&mut roster, true) {
                log::warn!("{}: couldn't start a hand: {err}", table.id);
            }
        }
        self.flush(roster);
        Ok(seat)
    }

    async fn handle_leave(&mut self, player: PlayerId) -> Result<Chips, SessionError> {
        let table = Arc::clone(&self.table);
        let mut roster = table.roster.lock().await;
        if !roster.contains(player) {
            return Err(TableError::NotSeated(player).into());
        }

        let folded = match self.game.as_mut() {
            Some(game) => game.remove_player(&mut roster, player),
            None => Ok(()),
        };
        let departed = roster.remove(player)?;
        if let Err(err) = self.absorb(&mut roster, folded) {
            log::warn!("{}: {player} left mid-hand: {err}", table.id);
        }

        if let Err(err) = self
            .sessions
            .transition(player, SessionOp::LeaveTable, SessionState::Idle)
        {
            log::warn!("{}: {player} left without a seated session: {err}", table.id);
        }

        log::info!("{}: {player} left with {}", table.id, departed.stack);
        self.outbox.push(GameEvent::PlayerLeft {
            player,
            stack: departed.stack,
        });
        self.server_outbox.push(ServerEvent::PlayerLeftTable {
            player,
            table: table.id,
            stack: departed.stack,
        });

        self.finish_if_over(&mut roster);
        self.flush(roster);
        Ok(departed.stack)
    }

    async fn handle_say(&mut self, player: PlayerId, message: String) -> Result<(), SessionError> {
        let roster = self.table.roster.lock().await;
        if !roster.contains(player) {
            return Err(TableError::NotSeated(player).into());
        }
        drop(roster);

        self.events.publish(&GameEvent::ChatMessage {
            player,
            message,
            sent_at: Utc::now(),
        });
        Ok(())
    }

    /// Deal a hand at the next button.
    fn start_hand(&mut self, roster: &mut Roster, from_waiting: bool) -> Result<(), ActionError> {
        if self.game.is_some() {
            return Err(ActionError::HandInProgress);
        }
        let dealer = self.choose_dealer(roster).ok_or(ActionError::NotEnoughPlayers)?;
        let hand = self.hands_played + 1;
        let deck = match self.table.config.shuffle_seed {
            Some(seed) => Deck::seeded(seed.wrapping_add(hand)),
            None => Deck::default(),
        };
        let mut game = Game::start(
            hand,
            roster,
            dealer,
            self.table.config.blinds(),
            deck,
            Arc::clone(&self.evaluator),
        )?;
        self.hands_played = hand;

        // Everybody seated is in the game now; their listeners move over
        // before the hand's first event goes out.
        if let Some(mediator) = self.mediator() {
            for player in roster.in_seat_order() {
                match self.sessions.transition(
                    player.id,
                    SessionOp::StartGame,
                    SessionState::Playing(mediator.clone()),
                ) {
                    // Already playing since an earlier hand
                    Ok(_) | Err(SessionError::NotAllowed { .. }) => {}
                    Err(err) => log::warn!(
                        "{}: {} can't follow hand {hand}: {err}",
                        self.table.id,
                        player.id
                    ),
                }
            }
        }
        if from_waiting {
            self.server_outbox.push(ServerEvent::GameStarted {
                table: self.table.id,
                hand,
            });
        }

        let result = game.check_conservation(roster);
        self.game = Some(game);
        self.absorb(roster, result)
    }

    /// Deal until a hand waits on a player or fewer than two players can
    /// pay. Blinds alone can decide a hand when they put players all in.
    fn deal_hands(&mut self, roster: &mut Roster, from_waiting: bool) -> Result<(), ActionError> {
        for dealt in 0..MAX_UNATTENDED_HANDS {
            self.start_hand(roster, from_waiting && dealt == 0)?;
            if !self.game.as_ref().is_some_and(Game::is_over) {
                return Ok(());
            }
            self.end_hand(roster);
            if roster.funded().len() < 2 {
                log::info!("{}: waiting for players", self.table.id);
                return Ok(());
            }
        }
        log::warn!(
            "{}: blinds decided {MAX_UNATTENDED_HANDS} hands in a row, waiting for a deal",
            self.table.id
        );
        Ok(())
    }

    fn choose_dealer(&self, roster: &Roster) -> Option<PlayerId> {
        match self.button {
            Some((player, _)) if roster.stack(player).is_some_and(|stack| stack > 0) => {
                Some(player)
            }
            Some((_, seat)) => roster.funded_after(seat),
            None => roster.funded().first().copied(),
        }
    }

    /// Collect what the hand produced and check it still adds up. Internal
    /// errors abort the hand.
    fn absorb(
        &mut self,
        roster: &mut Roster,
        result: Result<(), ActionError>,
    ) -> Result<(), ActionError> {
        let Some(game) = self.game.as_mut() else {
            return result;
        };
        let result = result.and_then(|()| game.check_conservation(roster));
        self.outbox.extend(game.drain_events());

        if let Err(ActionError::Internal(reason)) = &result {
            log::error!("{}: hand {} aborted: {reason}", self.table.id, game.hand());
            game.abort(roster, reason);
            self.outbox.extend(game.drain_events());
            self.end_hand(roster);
        }
        result
    }

    /// Pay out a finished hand and move on to the next one.
    fn finish_if_over(&mut self, roster: &mut Roster) {
        if !self.game.as_ref().is_some_and(Game::is_over) {
            return;
        }
        self.end_hand(roster);

        if roster.funded().len() < 2 {
            log::info!("{}: waiting for players", self.table.id);
            return;
        }
        if let Err(err) = self.deal_hands(roster, false) {
            log::warn!("{}: couldn't start the next hand: {err}", self.table.id);
        }
    }

    fn end_hand(&mut self, roster: &Roster) {
        let Some(game) = self.game.take() else {
            return;
        };
        let next = game.next_dealer();
        let seat = roster
            .get(next)
            .map(|p| p.seat)
            .or(self.button.map(|(_, seat)| seat))
            .unwrap_or_default();
        self.button = Some((next, seat));
    }

    fn snapshot_of(&self, roster: &Roster) -> TableSnapshot {
        let game = self.game.as_ref();
        let seats = roster
            .in_seat_order()
            .map(|p| SeatView {
                player: p.id,
                name: p.name.clone(),
                seat: p.seat,
                stack: p.stack,
                bet: game.map_or(0, |g| g.round().contribution(p.id)),
                dealt_in: game.is_some_and(|g| g.is_dealt_in(p.id)),
                folded: game.is_some_and(|g| g.is_folded(p.id)),
                all_in: game.is_some_and(|g| g.is_all_in(p.id)),
            })
            .collect();

        TableSnapshot {
            table_id: self.table.id,
            name: self.table.config.name.clone(),
            hand: game.map(Game::hand),
            phase: game.map_or(Phase::Waiting, Game::phase),
            board: game.map(|g| g.board().to_vec()).unwrap_or_default(),
            pots: game.map(Game::pots).unwrap_or_default(),
            pot_total: game.map_or(0, Game::pot_total),
            highest_bet: game.map_or(0, |g| g.round().highest_bet),
            dealer: game.map(Game::dealer),
            current: game.and_then(Game::current_player),
            seats,
        }
    }

    /// Release the roster, then tell everyone what happened.
    fn flush(&mut self, roster: tokio::sync::MutexGuard<'_, Roster>) {
        let snapshot = self.snapshot_of(&roster);
        drop(roster);

        self.snapshot.send_replace(snapshot);
        for event in self.outbox.drain(..) {
            self.events.publish(&event);
        }
        for event in self.server_outbox.drain(..) {
            self.server_events.publish(&event);
        }
    }
}
