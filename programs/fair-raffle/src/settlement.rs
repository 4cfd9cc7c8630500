//! Fulfill half of the randomness protocol and the settlement it drives.
//!
//! Settlement runs checks, then every state mutation, then the single
//! outbound transfer. A recipient that re-enters the raffle during the
//! transfer sees a fresh open round with no entries and no pending request,
//! so there is nothing left to claim twice. If the transfer fails the round is
//! restored exactly as it was before the callback.

use anchor_lang::prelude::{emit, Pubkey};

use crate::errors::{RaffleError, RaffleResult};
use crate::events::WinnerPicked;
use crate::randomness::RandomWord;
use crate::state::{Raffle, RaffleState};

/// Holder of the pot.
pub trait PrizeVault {
    /// Prize currently available for payout.
    fn balance(&self) -> u64;

    /// Send `amount` to `winner`.
    ///
    /// `raffle` is handed over in its already-reset state; a recipient that
    /// calls back into the raffle operates on that state.
    fn pay_out(&mut self, raffle: &mut Raffle, winner: Pubkey, amount: u64) -> RaffleResult<()>;
}

/// Outcome of a settled round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub request_id: u64,
    /// Index of the settled round.
    pub round: u64,
    pub winner_index: usize,
    pub winner: Pubkey,
    pub prize: u64,
}

/// `word mod participants`, reading `word` as a little-endian 256-bit integer.
///
/// Modulo bias is below `participants / 2^256`, negligible for any round size
/// the account can hold.
pub fn winner_index(word: &RandomWord, participants: usize) -> RaffleResult<usize> {
    if participants == 0 {
        return Err(RaffleError::NoParticipants);
    }
    let modulus = participants as u128;
    // Horner's rule from the most significant byte; the accumulator stays below
    // `modulus`, so `acc << 8` never leaves u128.
    let remainder = word
        .iter()
        .rev()
        .fold(0u128, |acc, byte| ((acc << 8) | u128::from(*byte)) % modulus);
    Ok(remainder as usize)
}

/// Round fields restored if the payout fails.
struct RoundSnapshot {
    raffle_state: RaffleState,
    participants: Vec<Pubkey>,
    recent_winner: Pubkey,
    last_timestamp: i64,
    pending_request_id: u64,
    round: u64,
}

impl RoundSnapshot {
    /// Capture the round, moving the participant list out of `raffle`.
    fn take(raffle: &mut Raffle) -> Self {
        Self {
            raffle_state: raffle.raffle_state,
            participants: std::mem::take(&mut raffle.participants),
            recent_winner: raffle.recent_winner,
            last_timestamp: raffle.last_timestamp,
            pending_request_id: raffle.pending_request_id,
            round: raffle.round,
        }
    }

    fn restore(self, raffle: &mut Raffle) {
        raffle.raffle_state = self.raffle_state;
        raffle.participants = self.participants;
        raffle.recent_winner = self.recent_winner;
        raffle.last_timestamp = self.last_timestamp;
        raffle.pending_request_id = self.pending_request_id;
        raffle.round = self.round;
    }
}

impl Raffle {
    /// Consume the coordinator's answer to the pending request.
    ///
    /// Only `random_words[0]` is used. Routing (which caller may deliver) is
    /// enforced by the instruction layer; here the raffle only checks that the
    /// answer is for the request it is waiting on.
    pub fn fulfill_random_words<V: PrizeVault>(
        &mut self,
        vault: &mut V,
        request_id: u64,
        random_words: &[RandomWord],
        now: i64,
    ) -> RaffleResult<Settlement> {
        if self.raffle_state != RaffleState::Calculating {
            return Err(RaffleError::NoPendingRequest {
                received: request_id,
            });
        }
        if request_id != self.pending_request_id {
            return Err(RaffleError::UnknownRequest {
                expected: self.pending_request_id,
                received: request_id,
            });
        }
        let word = random_words.first().ok_or(RaffleError::MissingRandomWords)?;

        self.settle(vault, request_id, word, now)
    }

    fn settle<V: PrizeVault>(
        &mut self,
        vault: &mut V,
        request_id: u64,
        word: &RandomWord,
        now: i64,
    ) -> RaffleResult<Settlement> {
        let index = winner_index(word, self.participants.len())?;
        let winner = self.participants[index];
        let settled_round = self.round;
        let next_round = self.round.checked_add(1).ok_or(RaffleError::CounterOverflow)?;
        let prize = vault.balance();

        // Effects: the complete reset happens before any value leaves the vault.
        let snapshot = RoundSnapshot::take(self);
        self.recent_winner = winner;
        if let Err(err) = self.transition(RaffleState::Open) {
            snapshot.restore(self);
            return Err(err);
        }
        self.last_timestamp = now;
        self.round = next_round;

        emit!(WinnerPicked {
            winner,
            round: settled_round,
            request_id,
            prize,
        });

        // Interaction.
        if let Err(err) = vault.pay_out(self, winner, prize) {
            snapshot.restore(self);
            return Err(err);
        }

        Ok(Settlement {
            request_id,
            round: settled_round,
            winner_index: index,
            winner,
            prize,
        })
    }
}
