//! Seats and the players sitting in them.

use std::collections::HashMap;

use super::TableError;
use crate::game::entities::{Chips, Player, PlayerId, SeatIndex};

/// Arena of seated players keyed by id, plus the seat map. Everything else
/// refers to players by id and looks them up here.
#[derive(Clone, Debug)]
pub struct Roster {
    seats: Vec<Option<PlayerId>>,
    players: HashMap<PlayerId, Player>,
    /// Set once the table is being removed; nobody sits down after that.
    closed: bool,
}

impl Roster {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            seats: vec![None; capacity],
            players: HashMap::new(),
            closed: false,
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn close(&mut self) {
        self.closed = true;
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.seats.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.players.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    #[must_use]
    pub fn contains(&self, player: PlayerId) -> bool {
        self.players.contains_key(&player)
    }

    #[must_use]
    pub fn get(&self, player: PlayerId) -> Option<&Player> {
        self.players.get(&player)
    }

    #[must_use]
    pub fn stack(&self, player: PlayerId) -> Option<Chips> {
        self.players.get(&player).map(|p| p.stack)
    }

    pub fn stack_mut(&mut self, player: PlayerId) -> Option<&mut Chips> {
        self.players.get_mut(&player).map(|p| &mut p.stack)
    }

    /// Seat `player` at `seat`, or at the first open seat when `seat` is
    /// `None`.
    pub fn add(
        &mut self,
        id: PlayerId,
        name: &str,
        stack: Chips,
        seat: Option<SeatIndex>,
    ) -> Result<SeatIndex, TableError> {
        if self.players.contains_key(&id) {
            return Err(TableError::AlreadySeated(id));
        }
        if self.total_chips().checked_add(stack).is_none() {
            return Err(TableError::TooManyChips(stack));
        }
        let seat = match seat {
            Some(seat) => match self.seats.get(seat) {
                None => return Err(TableError::NoSuchSeat(seat)),
                Some(Some(_)) => return Err(TableError::SeatTaken(seat)),
                Some(None) => seat,
            },
            None => self
                .seats
                .iter()
                .position(Option::is_none)
                .ok_or(TableError::Full)?,
        };
        self.seats[seat] = Some(id);
        self.players.insert(id, Player::new(id, name, stack, seat));
        Ok(seat)
    }

    pub fn remove(&mut self, id: PlayerId) -> Result<Player, TableError> {
        let player = self.players.remove(&id).ok_or(TableError::NotSeated(id))?;
        self.seats[player.seat] = None;
        Ok(player)
    }

    /// Seated players from the lowest seat up.
    pub fn in_seat_order(&self) -> impl Iterator<Item = &Player> + '_ {
        self.seats
            .iter()
            .flatten()
            .filter_map(|id| self.players.get(id))
    }

    /// Players with chips, in seat order. These are the ones that get dealt in.
    #[must_use]
    pub fn funded(&self) -> Vec<PlayerId> {
        self.in_seat_order()
            .filter(|p| p.stack > 0)
            .map(|p| p.id)
            .collect()
    }

    /// First funded player seated after `seat`, wrapping around.
    #[must_use]
    pub fn funded_after(&self, seat: SeatIndex) -> Option<PlayerId> {
        let n = self.seats.len();
        (1..=n)
            .filter_map(|i| self.seats[(seat + i) % n])
            .find(|id| self.stack(*id).is_some_and(|stack| stack > 0))
    }

    /// Never overflows: [`Roster::add`] refuses stacks that would.
    #[must_use]
    pub fn total_chips(&self) -> Chips {
        self.players.values().map(|p| p.stack).sum()
    }
}
