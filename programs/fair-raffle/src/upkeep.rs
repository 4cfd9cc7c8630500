//! Upkeep eligibility: when may a round be closed.

use crate::errors::{RaffleError, RaffleResult};
use crate::state::Raffle;

/// The four conditions behind `check_upkeep`, kept apart so each can be
/// inspected on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpkeepCheck {
    /// At least `interval` seconds since the last settlement.
    pub time_passed: bool,
    /// The raffle is `Open`.
    pub is_open: bool,
    /// The vault holds a prize above its rent floor.
    pub has_balance: bool,
    /// At least one entry this round.
    pub has_players: bool,
}

impl UpkeepCheck {
    pub fn upkeep_needed(&self) -> bool {
        self.time_passed && self.is_open && self.has_balance && self.has_players
    }
}

impl Raffle {
    /// Evaluate eligibility at `now` given the vault's prize `balance`.
    ///
    /// Read-only and infallible: an ineligible raffle is a `false`, never an error.
    pub fn check_upkeep(&self, now: i64, balance: u64) -> UpkeepCheck {
        UpkeepCheck {
            time_passed: now.saturating_sub(self.last_timestamp) >= self.interval,
            is_open: self.is_open(),
            has_balance: balance > 0,
            has_players: !self.participants.is_empty(),
        }
    }

    /// Fail with the balance/participants/state snapshot unless upkeep is needed.
    pub(crate) fn ensure_upkeep_needed(&self, now: i64, balance: u64) -> RaffleResult<()> {
        if self.check_upkeep(now, balance).upkeep_needed() {
            return Ok(());
        }
        Err(RaffleError::UpkeepNotNeeded {
            balance,
            participants: self.number_of_players(),
            state: self.raffle_state,
        })
    }
}
