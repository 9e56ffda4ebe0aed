//! Circular turn order over the players of a hand.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::entities::PlayerId;

#[derive(Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum TurnError {
    #[error("turn sequence is empty")]
    Empty,
    #[error("{0} is not in the turn sequence")]
    NotFound(PlayerId),
}

/// Players in seat order with a pointer to whoever's turn it is. Holds ids
/// only; the table roster owns the players themselves.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct TurnSequence {
    order: Vec<PlayerId>,
    current: usize,
}

impl TurnSequence {
    #[must_use]
    pub fn new(order: Vec<PlayerId>) -> Self {
        Self { order, current: 0 }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[must_use]
    pub fn contains(&self, player: PlayerId) -> bool {
        self.order.contains(&player)
    }

    /// Players in seat order, regardless of the pointer.
    pub fn iter(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.order.iter().copied()
    }

    /// Players starting at the current one and going around once.
    #[must_use]
    pub fn lap(&self) -> Vec<PlayerId> {
        let n = self.order.len();
        (0..n).map(|i| self.order[(self.current + i) % n]).collect()
    }

    fn index_of(&self, player: PlayerId) -> Result<usize, TurnError> {
        self.order
            .iter()
            .position(|p| *p == player)
            .ok_or(TurnError::NotFound(player))
    }

    fn step(&self, from: usize, forward: bool) -> Result<usize, TurnError> {
        let n = self.order.len();
        if n == 0 {
            return Err(TurnError::Empty);
        }
        Ok(if forward {
            (from + 1) % n
        } else {
            (from + n - 1) % n
        })
    }

    pub fn current(&self) -> Result<PlayerId, TurnError> {
        self.order.get(self.current).copied().ok_or(TurnError::Empty)
    }

    pub fn peek_next(&self) -> Result<PlayerId, TurnError> {
        let idx = self.step(self.current, true)?;
        Ok(self.order[idx])
    }

    pub fn peek_previous(&self) -> Result<PlayerId, TurnError> {
        let idx = self.step(self.current, false)?;
        Ok(self.order[idx])
    }

    /// Advance the pointer and return the new current player.
    pub fn next(&mut self) -> Result<PlayerId, TurnError> {
        self.current = self.step(self.current, true)?;
        Ok(self.order[self.current])
    }

    /// Retreat the pointer and return the new current player.
    pub fn previous(&mut self) -> Result<PlayerId, TurnError> {
        self.current = self.step(self.current, false)?;
        Ok(self.order[self.current])
    }

    pub fn set_current(&mut self, player: PlayerId) -> Result<(), TurnError> {
        self.current = self.index_of(player)?;
        Ok(())
    }

    /// The player that follows `player`, without moving the pointer.
    pub fn next_to(&self, player: PlayerId) -> Result<PlayerId, TurnError> {
        let idx = self.step(self.index_of(player)?, true)?;
        Ok(self.order[idx])
    }

    /// Remove `player`. If they were current, their former successor becomes
    /// current.
    pub fn remove(&mut self, player: PlayerId) -> Result<(), TurnError> {
        let idx = self.index_of(player)?;
        self.order.remove(idx);
        if idx < self.current {
            self.current -= 1;
        }
        if self.current >= self.order.len() {
            self.current = 0;
        }
        Ok(())
    }
}
