//! Betting-round state machine for a single hand.
//!
//! A [`Game`] is created when a hand starts and dropped when it ends. Every
//! player action goes through [`Game::validate`], which never mutates, and
//! the resulting [`Plan`] is then applied. Streets are dealt and pots are
//! settled automatically as rounds close.

use chrono::Utc;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet, HashMap, VecDeque},
    fmt,
    sync::Arc,
};

use super::{
    ActionError,
    entities::{Action, Blinds, Card, Chips, Deck, PlayerId, Pot},
    events::{BlindPost, GameEvent, ShownHand},
    functional::HandEvaluator,
    pots::{Payouts, PotEngine},
    turns::TurnSequence,
};
use crate::table::Roster;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Phase {
    Waiting,
    PreFlop,
    Flop,
    Turn,
    River,
    Showdown,
}

impl Phase {
    #[must_use]
    pub fn is_betting(self) -> bool {
        matches!(self, Self::PreFlop | Self::Flop | Self::Turn | Self::River)
    }

    /// The street after this one and how many community cards it reveals.
    #[must_use]
    pub fn next_street(self) -> Option<(Self, usize)> {
        match self {
            Self::PreFlop => Some((Self::Flop, 3)),
            Self::Flop => Some((Self::Turn, 1)),
            Self::Turn => Some((Self::River, 1)),
            _ => None,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Waiting => "waiting",
            Self::PreFlop => "pre-flop",
            Self::Flop => "flop",
            Self::Turn => "turn",
            Self::River => "river",
            Self::Showdown => "showdown",
        };
        write!(f, "{repr}")
    }
}

/// One betting round.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Round {
    pub phase: Phase,
    pub highest_bet: Chips,
    pub min_raise: Chips,
    pub last_aggressor: Option<PlayerId>,
    contributions: BTreeMap<PlayerId, Chips>,
    pending: BTreeSet<PlayerId>,
}

impl Round {
    fn new(phase: Phase, min_raise: Chips, pending: BTreeSet<PlayerId>) -> Self {
        Self {
            phase,
            highest_bet: 0,
            min_raise,
            last_aggressor: None,
            contributions: BTreeMap::new(),
            pending,
        }
    }

    #[must_use]
    pub fn contribution(&self, player: PlayerId) -> Chips {
        self.contributions.get(&player).copied().unwrap_or(0)
    }

    pub fn contributions(&self) -> impl Iterator<Item = (PlayerId, Chips)> + '_ {
        self.contributions.iter().map(|(p, c)| (*p, *c))
    }

    #[must_use]
    pub fn total(&self) -> Chips {
        self.contributions.values().sum()
    }

    #[must_use]
    pub fn owes_action(&self, player: PlayerId) -> bool {
        self.pending.contains(&player)
    }

    /// Nobody left owes an action.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.pending.is_empty()
    }

    fn commit(&mut self, player: PlayerId, chips: Chips) -> Chips {
        let contribution = self.contributions.entry(player).or_default();
        *contribution += chips;
        *contribution
    }
}

/// A validated action, ready to be applied.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Plan {
    Check(PlayerId),
    Commit {
        player: PlayerId,
        action: Action,
        chips: Chips,
        all_in: bool,
    },
    Fold(PlayerId),
}

#[derive(Clone, Debug, Default)]
struct Holding {
    pocket: Vec<Card>,
    folded: bool,
    all_in: bool,
}

/// State of the hand currently being played at a table.
pub struct Game {
    hand: u64,
    dealer: PlayerId,
    next_dealer: PlayerId,
    first_to_act: PlayerId,
    blinds: Blinds,
    /// Non-folded players, all-in ones included.
    turns: TurnSequence,
    /// Everyone dealt in that is still seated.
    dealt_in: TurnSequence,
    /// Seat order starting left of the button, fixed for the hand.
    order: Vec<PlayerId>,
    board: Vec<Card>,
    deck: Deck,
    holdings: BTreeMap<PlayerId, Holding>,
    pots: PotEngine,
    round: Round,
    starting_chips: Chips,
    departed_chips: Chips,
    evaluator: Arc<dyn HandEvaluator>,
    events: VecDeque<GameEvent>,
}

impl Game {
    /// Deal a new hand to every funded player in `roster` with `dealer` on
    /// the button. Posts the blinds and prompts the first player.
    pub fn start(
        hand: u64,
        roster: &mut Roster,
        dealer: PlayerId,
        blinds: Blinds,
        mut deck: Deck,
        evaluator: Arc<dyn HandEvaluator>,
    ) -> Result<Self, ActionError> {
        let funded = roster.funded();
        if funded.len() < 2 {
            return Err(ActionError::NotEnoughPlayers);
        }

        let mut dealt_in = TurnSequence::new(funded.clone());
        dealt_in.set_current(dealer)?;
        let next_dealer = dealt_in.next_to(dealer)?;
        let order = {
            let mut seq = dealt_in.clone();
            seq.next()?;
            seq.lap()
        };

        let heads_up = funded.len() == 2;
        let (small_blind, big_blind) = if heads_up {
            (dealer, next_dealer)
        } else {
            (next_dealer, dealt_in.next_to(next_dealer)?)
        };
        let first_to_act = if heads_up {
            dealer
        } else {
            dealt_in.next_to(big_blind)?
        };

        deck.reset();
        let mut holdings: BTreeMap<PlayerId, Holding> =
            order.iter().map(|p| (*p, Holding::default())).collect();
        for _ in 0..2 {
            for player in &order {
                let card = deck.draw()?;
                if let Some(holding) = holdings.get_mut(player) {
                    holding.pocket.push(card);
                }
            }
        }

        let starting_chips = funded
            .iter()
            .filter_map(|p| roster.stack(*p))
            .try_fold(0, Chips::checked_add)
            .ok_or_else(|| ActionError::Internal("chips in play overflow".to_string()))?;
        let mut game = Self {
            hand,
            dealer,
            next_dealer,
            first_to_act,
            blinds: blinds.clone(),
            turns: TurnSequence::new(funded),
            dealt_in,
            order,
            board: Vec::with_capacity(5),
            deck,
            holdings,
            pots: PotEngine::new(),
            round: Round::new(Phase::PreFlop, blinds.big, BTreeSet::new()),
            starting_chips,
            departed_chips: 0,
            evaluator,
            events: VecDeque::new(),
        };

        let small_blind = game.post_blind(roster, small_blind, blinds.small)?;
        let big_blind = game.post_blind(roster, big_blind, blinds.big)?;
        game.round.pending = game.able_to_act().collect();
        game.turns.set_current(first_to_act)?;

        info!(
            "hand {hand} started: {} players, {dealer} on the button",
            game.order.len()
        );
        game.events.push_back(GameEvent::HandStarted {
            hand,
            dealer,
            small_blind,
            big_blind,
            players: game.order.clone(),
            started_at: Utc::now(),
        });
        game.push_pot_changed();
        game.advance(roster)?;
        Ok(game)
    }

    fn post_blind(
        &mut self,
        roster: &mut Roster,
        player: PlayerId,
        amount: Chips,
    ) -> Result<BlindPost, ActionError> {
        let stack = roster
            .stack_mut(player)
            .ok_or_else(|| ActionError::Internal(format!("{player} can't post a blind")))?;
        let chips = amount.min(*stack);
        *stack -= chips;
        let all_in = *stack == 0;

        let total = self.round.commit(player, chips);
        self.round.highest_bet = self.round.highest_bet.max(total);
        if all_in && let Some(holding) = self.holdings.get_mut(&player) {
            holding.all_in = true;
        }
        Ok(BlindPost {
            player,
            amount: chips,
        })
    }

    #[must_use]
    pub fn hand(&self) -> u64 {
        self.hand
    }

    #[must_use]
    pub fn dealer(&self) -> PlayerId {
        self.dealer
    }

    /// Who gets the button next hand.
    #[must_use]
    pub fn next_dealer(&self) -> PlayerId {
        self.next_dealer
    }

    #[must_use]
    pub fn first_to_act(&self) -> PlayerId {
        self.first_to_act
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.round.phase
    }

    #[must_use]
    pub fn round(&self) -> &Round {
        &self.round
    }

    #[must_use]
    pub fn board(&self) -> &[Card] {
        &self.board
    }

    #[must_use]
    pub fn turns(&self) -> &TurnSequence {
        &self.turns
    }

    #[must_use]
    pub fn dealt_in(&self) -> &TurnSequence {
        &self.dealt_in
    }

    /// Collected pots. Bets of the round in progress are not included.
    #[must_use]
    pub fn pots(&self) -> Vec<Pot> {
        self.pots.pots()
    }

    /// Every chip that's been put in this hand.
    #[must_use]
    pub fn pot_total(&self) -> Chips {
        self.pots.total() + self.round.total()
    }

    #[must_use]
    pub fn is_over(&self) -> bool {
        self.round.phase == Phase::Showdown
    }

    /// Whoever is being waited on, if anyone.
    #[must_use]
    pub fn current_player(&self) -> Option<PlayerId> {
        if self.is_over() || self.round.is_closed() {
            return None;
        }
        self.turns.current().ok()
    }

    #[must_use]
    pub fn is_dealt_in(&self, player: PlayerId) -> bool {
        self.holdings.contains_key(&player)
    }

    #[must_use]
    pub fn is_folded(&self, player: PlayerId) -> bool {
        self.holdings.get(&player).is_some_and(|h| h.folded)
    }

    #[must_use]
    pub fn is_all_in(&self, player: PlayerId) -> bool {
        self.holdings.get(&player).is_some_and(|h| h.all_in)
    }

    #[must_use]
    pub fn pocket(&self, player: PlayerId) -> Option<&[Card]> {
        self.holdings.get(&player).map(|h| h.pocket.as_slice())
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = GameEvent> + '_ {
        self.events.drain(..)
    }

    /// Non-folded players that still have chips behind.
    fn able_to_act(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.turns.iter().filter(|p| !self.is_all_in(*p))
    }

    pub fn validate(
        &self,
        roster: &Roster,
        player: PlayerId,
        action: Action,
    ) -> Result<Plan, ActionError> {
        let phase = self.round.phase;
        if !phase.is_betting() {
            return Err(ActionError::WrongPhase { phase });
        }
        if !self.is_dealt_in(player) {
            return Err(ActionError::NotInHand);
        }
        if self.current_player() != Some(player) {
            return Err(ActionError::OutOfTurn);
        }

        let stack = roster.stack(player).ok_or(ActionError::NotInHand)?;
        let contributed = self.round.contribution(player);
        let highest = self.round.highest_bet;
        let to_call = highest.saturating_sub(contributed);
        let commit = |chips: Chips| Plan::Commit {
            player,
            action,
            chips,
            all_in: chips == stack,
        };

        match action {
            Action::Check if to_call > 0 => Err(ActionError::CannotCheck { to_call }),
            Action::Check => Ok(Plan::Check(player)),
            Action::Call if to_call == 0 => Err(ActionError::NothingToCall),
            Action::Call => Ok(commit(to_call.min(stack))),
            Action::Bet(_) if highest > 0 => Err(ActionError::BetAlreadyMade),
            Action::Raise(_) if highest == 0 => Err(ActionError::NoBetToRaise),
            Action::Bet(amount) | Action::Raise(amount) => {
                let min = highest.saturating_add(self.round.min_raise);
                if amount < min {
                    return Err(ActionError::RaiseTooSmall { min });
                }
                let needed = amount - contributed;
                if needed > stack {
                    return Err(ActionError::InsufficientChips { needed, stack });
                }
                Ok(commit(needed))
            }
            Action::Fold => Ok(Plan::Fold(player)),
            Action::AllIn => Ok(commit(stack)),
        }
    }

    pub fn apply(&mut self, roster: &mut Roster, plan: Plan) -> Result<(), ActionError> {
        match plan {
            Plan::Check(player) => {
                self.round.pending.remove(&player);
                self.events.push_back(GameEvent::PlayerActed {
                    player,
                    action: Action::Check,
                    chips: 0,
                });
                self.turns.next()?;
            }
            Plan::Commit {
                player,
                action,
                chips,
                all_in,
            } => {
                let stack = roster
                    .stack_mut(player)
                    .filter(|stack| **stack >= chips)
                    .ok_or_else(|| ActionError::Internal(format!("{player} can't cover {chips}")))?;
                *stack -= chips;

                let total = self.round.commit(player, chips);
                if total > self.round.highest_bet {
                    let raise_by = total - self.round.highest_bet;
                    if raise_by >= self.round.min_raise {
                        self.round.min_raise = raise_by;
                    }
                    self.round.highest_bet = total;
                    self.round.last_aggressor = Some(player);
                    self.round.pending = self.able_to_act().collect();
                }
                self.round.pending.remove(&player);

                if all_in {
                    if let Some(holding) = self.holdings.get_mut(&player) {
                        holding.all_in = true;
                    }
                    self.events
                        .push_back(GameEvent::PlayerAllIn { player, chips });
                } else {
                    self.events.push_back(GameEvent::PlayerActed {
                        player,
                        action,
                        chips,
                    });
                }
                self.push_pot_changed();
                self.turns.next()?;
            }
            Plan::Fold(player) => {
                self.fold_out(player)?;
                self.events.push_back(GameEvent::PlayerFolded(player));
            }
        }
        self.advance(roster)
    }

    /// Validate and apply in one go.
    pub fn act(
        &mut self,
        roster: &mut Roster,
        player: PlayerId,
        action: Action,
    ) -> Result<(), ActionError> {
        let plan = self.validate(roster, player, action)?;
        debug!("hand {}: {player} {action}", self.hand);
        self.apply(roster, plan)
    }

    /// Take `player` out of the hand because they're leaving the table. Must
    /// be called while they are still in `roster`; their stack is accounted
    /// as carried away.
    pub fn remove_player(
        &mut self,
        roster: &mut Roster,
        player: PlayerId,
    ) -> Result<(), ActionError> {
        if self.is_over() || !self.dealt_in.contains(player) {
            return Ok(());
        }
        if self.next_dealer == player && self.dealt_in.len() > 1 {
            self.next_dealer = self.dealt_in.next_to(player)?;
        }
        self.dealt_in.remove(player)?;
        self.departed_chips += roster.stack(player).unwrap_or(0);

        if !self.turns.contains(player) {
            return Ok(());
        }
        let was_current = self.current_player() == Some(player);
        if self.first_to_act == player {
            self.first_to_act = self.turns.next_to(player)?;
        }
        self.fold_out(player)?;
        self.events.push_back(GameEvent::PlayerFolded(player));

        if was_current || self.turns.len() <= 1 || self.betting_is_over() {
            self.advance(roster)?;
        }
        Ok(())
    }

    fn fold_out(&mut self, player: PlayerId) -> Result<(), ActionError> {
        let holding = self
            .holdings
            .get_mut(&player)
            .ok_or(ActionError::NotInHand)?;
        holding.folded = true;
        self.pots.fold(player);
        self.round.pending.remove(&player);
        self.turns.remove(player)?;
        Ok(())
    }

    /// At most one player can still put chips in, and they've matched.
    fn betting_is_over(&self) -> bool {
        let mut able = self.able_to_act();
        match (able.next(), able.next()) {
            (None, _) => true,
            (Some(player), None) => self.round.contribution(player) >= self.round.highest_bet,
            _ => false,
        }
    }

    fn seek_pending(&mut self) -> Result<PlayerId, ActionError> {
        for _ in 0..self.turns.len() {
            let player = self.turns.current()?;
            if self.round.owes_action(player) {
                return Ok(player);
            }
            self.turns.next()?;
        }
        Err(ActionError::Internal("nobody owes an action".to_string()))
    }

    /// Move the hand forward until someone has to act or it's over.
    fn advance(&mut self, roster: &mut Roster) -> Result<(), ActionError> {
        loop {
            if self.turns.len() <= 1 {
                let winner = self.turns.current()?;
                return self.finish_uncontested(roster, winner);
            }

            if !self.round.is_closed() && !self.betting_is_over() {
                let player = self.seek_pending()?;
                let highest = self.round.highest_bet;
                self.events.push_back(GameEvent::NextPlayer {
                    player,
                    to_call: highest.saturating_sub(self.round.contribution(player)),
                    min_raise_to: highest.saturating_add(self.round.min_raise),
                });
                return Ok(());
            }

            self.collect_round();
            let Some((phase, count)) = self.round.phase.next_street() else {
                return self.showdown(roster);
            };

            let mut dealt = Vec::with_capacity(count);
            for _ in 0..count {
                dealt.push(self.deck.draw()?);
            }
            self.board.extend(&dealt);
            self.round = Round::new(phase, self.blinds.big, self.able_to_act().collect());
            if let Some(first) = self
                .order
                .iter()
                .copied()
                .find(|p| self.round.owes_action(*p))
            {
                self.first_to_act = first;
                self.turns.set_current(first)?;
            }
            debug!("hand {}: dealing the {phase}", self.hand);
            self.events.push_back(GameEvent::RoundAdvanced {
                phase,
                dealt,
                board: self.board.clone(),
            });
        }
    }

    fn collect_round(&mut self) {
        for (player, chips) in std::mem::take(&mut self.round.contributions) {
            self.pots.contribute(player, chips);
        }
    }

    fn showdown(&mut self, roster: &mut Roster) -> Result<(), ActionError> {
        let mut hands = HashMap::new();
        let mut shown = BTreeMap::new();
        for player in self.turns.iter() {
            let pocket = self.pocket(player).ok_or(ActionError::NotInHand)?.to_vec();
            let mut cards = pocket.clone();
            cards.extend(&self.board);
            let value = self.evaluator.evaluate(&cards);
            hands.insert(player, value.clone());
            shown.insert(
                player,
                ShownHand {
                    cards: pocket,
                    value,
                },
            );
        }
        let payouts = self.pots.distribute(&hands, &self.order)?;
        self.settle(roster, payouts, shown)
    }

    fn finish_uncontested(
        &mut self,
        roster: &mut Roster,
        winner: PlayerId,
    ) -> Result<(), ActionError> {
        self.collect_round();
        let payouts = self.pots.award_all(winner);
        self.settle(roster, payouts, BTreeMap::new())
    }

    fn settle(
        &mut self,
        roster: &mut Roster,
        payouts: Payouts,
        shown: BTreeMap<PlayerId, ShownHand>,
    ) -> Result<(), ActionError> {
        if let Some(missing) = payouts.keys().find(|p| !roster.contains(**p)) {
            return Err(ActionError::Internal(format!(
                "{missing} won chips but isn't seated"
            )));
        }
        for (player, chips) in &payouts {
            if let Some(stack) = roster.stack_mut(*player) {
                *stack += chips;
            }
        }
        self.pots = PotEngine::new();
        self.round.phase = Phase::Showdown;

        info!("hand {} ended, paid {payouts:?}", self.hand);
        self.events.push_back(GameEvent::HandEnded {
            hand: self.hand,
            payouts,
            shown,
            board: self.board.clone(),
        });
        Ok(())
    }

    /// Give every chip put in this hand back to whoever put it in and end
    /// the hand. Chips of players that already left are lost.
    pub fn abort(&mut self, roster: &mut Roster, reason: &str) {
        let mut refunds = Payouts::new();
        for (player, chips) in self.pots.contributions().chain(self.round.contributions()) {
            *refunds.entry(player).or_default() += chips;
        }
        for (player, chips) in refunds {
            if let Some(stack) = roster.stack_mut(player) {
                *stack += chips;
            }
        }
        self.pots = PotEngine::new();
        self.round.contributions.clear();
        self.round.pending.clear();
        self.round.phase = Phase::Showdown;
        self.events.push_back(GameEvent::HandAborted {
            hand: self.hand,
            reason: reason.to_string(),
        });
    }

    /// Chips accounted for by this hand: stacks of players still dealt in,
    /// bets, pots and whatever left with departed players.
    #[must_use]
    pub fn chips_in_play(&self, roster: &Roster) -> Chips {
        let stacks = self
            .dealt_in
            .iter()
            .filter_map(|p| roster.stack(p))
            .fold(0, Chips::saturating_add);
        stacks
            .saturating_add(self.pot_total())
            .saturating_add(self.departed_chips)
    }

    pub fn check_conservation(&self, roster: &Roster) -> Result<(), ActionError> {
        let actual = self.chips_in_play(roster);
        if actual != self.starting_chips {
            return Err(ActionError::Internal(format!(
                "{actual} chips in play, expected {}",
                self.starting_chips
            )));
        }
        Ok(())
    }

    fn push_pot_changed(&mut self) {
        self.events.push_back(GameEvent::PotChanged {
            total: self.pot_total(),
            pots: self.pots.pots(),
        });
    }
}
