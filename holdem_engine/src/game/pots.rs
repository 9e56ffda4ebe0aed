//! Pot accounting for a single hand.
//!
//! Contributions are added as each betting round is collected. Main and side
//! pots are derived from them on demand, so folding never has to move chips
//! around: a folded player's chips stay where they are and the player simply
//! stops being eligible.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use thiserror::Error;

use super::{
    entities::{Chips, HandValue, PlayerId, Pot},
    functional::argmax,
};

#[derive(Debug, Eq, Error, PartialEq)]
pub enum PotError {
    #[error("no hand was shown for {0}")]
    MissingHand(PlayerId),
}

/// Chips won by each player at the end of a hand.
pub type Payouts = BTreeMap<PlayerId, Chips>;

#[derive(Clone, Debug, Default)]
pub struct PotEngine {
    contributions: BTreeMap<PlayerId, Chips>,
    folded: BTreeSet<PlayerId>,
}

impl PotEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contribute(&mut self, player: PlayerId, amount: Chips) {
        if amount > 0 {
            *self.contributions.entry(player).or_default() += amount;
        }
    }

    /// The player keeps their chips in the pot but can no longer win any.
    pub fn fold(&mut self, player: PlayerId) {
        self.folded.insert(player);
    }

    #[must_use]
    pub fn contribution(&self, player: PlayerId) -> Chips {
        self.contributions.get(&player).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn total(&self) -> Chips {
        self.contributions.values().sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Every contribution, folded or not.
    pub fn contributions(&self) -> impl Iterator<Item = (PlayerId, Chips)> + '_ {
        self.contributions.iter().map(|(p, c)| (*p, *c))
    }

    /// Main pot first, then side pots by ascending contribution level.
    #[must_use]
    pub fn pots(&self) -> Vec<Pot> {
        let live: Vec<(PlayerId, Chips)> = self
            .contributions()
            .filter(|(p, _)| !self.folded.contains(p))
            .collect();
        let mut levels: Vec<Chips> = live.iter().map(|(_, c)| *c).collect();
        levels.sort_unstable();
        levels.dedup();

        let mut pots = Vec::with_capacity(levels.len());
        let mut prev = 0;
        for level in levels {
            let amount = self
                .contributions
                .values()
                .map(|c| (*c).min(level) - (*c).min(prev))
                .sum();
            let eligible = live
                .iter()
                .filter(|(_, c)| *c >= level)
                .map(|(p, _)| *p)
                .collect();
            pots.push(Pot { amount, eligible });
            prev = level;
        }

        // Folded players that put in more than anyone left standing. Nobody
        // can win that slice on its own, so it joins the last pot.
        let dead: Chips = self.contributions.values().map(|c| c - (*c).min(prev)).sum();
        if dead > 0 {
            match pots.last_mut() {
                Some(pot) => pot.amount += dead,
                None => pots.push(Pot {
                    amount: dead,
                    eligible: BTreeSet::new(),
                }),
            }
        }
        pots
    }

    /// Give everything to the last player standing.
    #[must_use]
    pub fn award_all(&self, winner: PlayerId) -> Payouts {
        let mut payouts = Payouts::new();
        let total = self.total();
        if total > 0 {
            payouts.insert(winner, total);
        }
        payouts
    }

    /// Award every pot to the best hand(s) among its eligible players.
    ///
    /// `order` is the seating order starting with the player immediately
    /// left of the button. Odd chips from a split go one at a time to the
    /// tied winners in that order.
    pub fn distribute(
        &self,
        hands: &HashMap<PlayerId, HandValue>,
        order: &[PlayerId],
    ) -> Result<Payouts, PotError> {
        let mut payouts = Payouts::new();
        for pot in self.pots() {
            if let Some(missing) = pot.eligible.iter().find(|p| !hands.contains_key(p)) {
                return Err(PotError::MissingHand(*missing));
            }
            let contenders: Vec<PlayerId> = order
                .iter()
                .copied()
                .filter(|p| pot.eligible.contains(p))
                .collect();
            let values: Vec<Option<&HandValue>> =
                contenders.iter().map(|p| hands.get(p)).collect();
            let winners: Vec<PlayerId> = argmax(&values)
                .into_iter()
                .map(|i| contenders[i])
                .collect();
            if winners.is_empty() {
                continue;
            }

            let num_winners = winners.len() as Chips;
            let share = pot.amount / num_winners;
            let mut remainder = pot.amount % num_winners;
            for winner in winners {
                let mut won = share;
                if remainder > 0 {
                    won += 1;
                    remainder -= 1;
                }
                if won > 0 {
                    *payouts.entry(winner).or_default() += won;
                }
            }
        }
        Ok(payouts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::Rank;

    const A: PlayerId = PlayerId(1);
    const B: PlayerId = PlayerId(2);
    const C: PlayerId = PlayerId(3);
    const D: PlayerId = PlayerId(4);

    fn hand(rank: Rank, high: u8) -> HandValue {
        HandValue {
            rank,
            values: vec![high],
        }
    }

    fn pot(amount: Chips, eligible: &[PlayerId]) -> Pot {
        Pot {
            amount,
            eligible: eligible.iter().copied().collect(),
        }
    }

    #[test]
    fn single_level_is_one_pot() {
        let mut pots = PotEngine::new();
        for p in [A, B, C] {
            pots.contribute(p, 40);
        }
        assert_eq!(pots.pots(), vec![pot(120, &[A, B, C])]);
    }

    #[test]
    fn all_in_short_creates_side_pot() {
        let mut pots = PotEngine::new();
        pots.contribute(A, 30);
        pots.contribute(B, 90);
        pots.contribute(C, 30);
        pots.fold(C);
        assert_eq!(pots.pots(), vec![pot(90, &[A, B]), pot(60, &[B])]);
        assert_eq!(pots.total(), 150);
    }

    #[test]
    fn folded_contribution_between_levels_stays_in_lower_pot() {
        let mut pots = PotEngine::new();
        pots.contribute(A, 30);
        pots.contribute(B, 90);
        pots.contribute(C, 20);
        pots.fold(C);
        assert_eq!(pots.pots(), vec![pot(80, &[A, B]), pot(60, &[B])]);
    }

    #[test]
    fn dead_money_above_live_levels_joins_last_pot() {
        let mut pots = PotEngine::new();
        pots.contribute(A, 50);
        pots.contribute(B, 50);
        pots.contribute(C, 80);
        pots.fold(C);
        assert_eq!(pots.pots(), vec![pot(180, &[A, B])]);
    }

    #[test]
    fn side_pot_winners_by_eligibility() {
        let mut pots = PotEngine::new();
        pots.contribute(A, 30);
        pots.contribute(B, 90);
        pots.contribute(C, 30);
        pots.fold(C);
        let hands = HashMap::from([(A, hand(Rank::Flush, 9)), (B, hand(Rank::OnePair, 4))]);
        let payouts = pots.distribute(&hands, &[A, B, C]).unwrap();
        assert_eq!(payouts.get(&A), Some(&90));
        assert_eq!(payouts.get(&B), Some(&60));
        assert_eq!(payouts.values().sum::<Chips>(), pots.total());
    }

    #[test]
    fn odd_chip_goes_left_of_button_first() {
        let mut pots = PotEngine::new();
        pots.contribute(A, 11);
        pots.contribute(B, 11);
        pots.contribute(C, 11);
        pots.fold(A);
        let tie = hand(Rank::Straight, 9);
        let hands = HashMap::from([(B, tie.clone()), (C, tie)]);
        // C sits immediately left of the button.
        let payouts = pots.distribute(&hands, &[C, A, B]).unwrap();
        assert_eq!(payouts.get(&C), Some(&17));
        assert_eq!(payouts.get(&B), Some(&16));
    }

    #[test]
    fn three_way_split_with_two_odd_chips() {
        let mut pots = PotEngine::new();
        for p in [A, B, C, D] {
            pots.contribute(p, 5);
        }
        pots.fold(D);
        let tie = hand(Rank::HighCard, 14);
        let hands = HashMap::from([(A, tie.clone()), (B, tie.clone()), (C, tie)]);
        let payouts = pots.distribute(&hands, &[B, C, D, A]).unwrap();
        assert_eq!(payouts.get(&B), Some(&7));
        assert_eq!(payouts.get(&C), Some(&7));
        assert_eq!(payouts.get(&A), Some(&6));
    }

    #[test]
    fn missing_hand_is_an_error() {
        let mut pots = PotEngine::new();
        pots.contribute(A, 10);
        pots.contribute(B, 10);
        let hands = HashMap::from([(A, hand(Rank::HighCard, 9))]);
        assert_eq!(
            pots.distribute(&hands, &[A, B]),
            Err(PotError::MissingHand(B))
        );
    }

    #[test]
    fn award_all_takes_dead_money() {
        let mut pots = PotEngine::new();
        pots.contribute(A, 10);
        pots.contribute(B, 25);
        pots.fold(A);
        let payouts = pots.award_all(B);
        assert_eq!(payouts.get(&B), Some(&35));
    }
}
