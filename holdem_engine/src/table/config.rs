//! Table configuration models.

use serde::{Deserialize, Serialize};

use super::TableError;
use crate::game::entities::{Blinds, Chips};

/// Most seats a Hold'em table can deal to: 2 * 23 + 5 = 51 cards.
pub const MAX_SEATS: usize = 23;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    /// Table name
    pub name: String,

    /// Number of seats (default: 9)
    pub max_players: usize,

    pub small_blind: Chips,

    pub big_blind: Chips,

    /// Minimum buy-in in big blinds (e.g., 20 BB)
    pub min_buy_in_bb: u16,

    /// Maximum buy-in in big blinds (e.g., 100 BB)
    pub max_buy_in_bb: u16,

    /// Start a hand as soon as two funded players are seated
    pub auto_start: bool,

    /// Makes every shuffle at this table reproducible
    #[serde(default)]
    pub shuffle_seed: Option<u64>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            name: "Default Table".to_string(),
            max_players: 9,
            small_blind: 5,
            big_blind: 10,
            min_buy_in_bb: 20,
            max_buy_in_bb: 100,
            auto_start: true,
            shuffle_seed: None,
        }
    }
}

impl TableConfig {
    pub fn validate(&self) -> Result<(), TableError> {
        let invalid = |reason: &str| Err(TableError::InvalidConfig(reason.to_string()));

        if self.small_blind == 0 {
            return invalid("small blind must be positive");
        }

        if self.big_blind <= self.small_blind {
            return invalid("big blind must be greater than small blind");
        }

        if self.max_buy_in_bb < self.min_buy_in_bb || self.min_buy_in_bb == 0 {
            return invalid("buy-in range must be non-empty and start above zero");
        }

        if self.max_players < 2 || self.max_players > MAX_SEATS {
            return invalid("max players must be between 2 and 23");
        }

        // Every seat bought in at the maximum has to fit in a chip count.
        let full_table = Chips::from(self.max_buy_in_bb)
            .checked_mul(self.big_blind)
            .and_then(|max| max.checked_mul(self.max_players as Chips));
        if full_table.is_none() {
            return invalid("maximum buy-ins for every seat overflow the chip count");
        }

        Ok(())
    }

    #[must_use]
    pub fn blinds(&self) -> Blinds {
        Blinds {
            small: self.small_blind,
            big: self.big_blind,
        }
    }

    #[must_use]
    pub fn min_buy_in_chips(&self) -> Chips {
        self.big_blind.saturating_mul(Chips::from(self.min_buy_in_bb))
    }

    #[must_use]
    pub fn max_buy_in_chips(&self) -> Chips {
        self.big_blind.saturating_mul(Chips::from(self.max_buy_in_bb))
    }

    /// Fails unless `stack` is within the table's buy-in range.
    pub fn check_buy_in(&self, stack: Chips) -> Result<(), TableError> {
        let (min, max) = (self.min_buy_in_chips(), self.max_buy_in_chips());
        if stack < min || stack > max {
            return Err(TableError::BuyIn { stack, min, max });
        }
        Ok(())
    }
}
