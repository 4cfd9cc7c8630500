//! In-memory collaborators for engine tests.

use anchor_lang::prelude::Pubkey;

use crate::errors::{RaffleError, RaffleResult};
use crate::randomness::{RandomWord, RandomWordsRequest, RandomnessCoordinator};
use crate::settlement::PrizeVault;
use crate::state::{Raffle, RaffleConfig};

pub const ENTRANCE_FEE: u64 = 10_000_000;
pub const INTERVAL: i64 = 30;

pub fn sample_config() -> RaffleConfig {
    RaffleConfig {
        entrance_fee: ENTRANCE_FEE,
        interval: INTERVAL,
        coordinator_program: Pubkey::new_from_array([7u8; 32]),
        key_hash: [9u8; 32],
        subscription_id: 1,
        callback_compute_limit: 200_000,
    }
}

pub fn open_raffle(now: i64) -> Raffle {
    Raffle::open(&sample_config(), now, 255, 254)
}

/// Entropy word whose 256-bit value is `value`.
pub fn word(value: u64) -> RandomWord {
    let mut word = [0u8; 32];
    word[..8].copy_from_slice(&value.to_le_bytes());
    word
}

/// A raffle opened at `start`, entered by `players`, with upkeep performed.
pub fn calculating_raffle(players: &[Pubkey], start: i64) -> (Raffle, u64) {
    let mut raffle = open_raffle(start);
    for player in players {
        raffle.enter(*player, ENTRANCE_FEE).unwrap();
    }
    let mut coordinator = MockCoordinator::starting_at(17);
    let balance = ENTRANCE_FEE * players.len() as u64;
    let request_id = raffle
        .perform_upkeep(&mut coordinator, &Pubkey::new_unique(), start + INTERVAL, balance)
        .unwrap();
    (raffle, request_id)
}

pub struct MockCoordinator {
    next_id: u64,
    reject: bool,
    pub requests: Vec<RandomWordsRequest>,
}

impl MockCoordinator {
    pub fn starting_at(next_id: u64) -> Self {
        Self {
            next_id,
            reject: false,
            requests: Vec::new(),
        }
    }

    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::starting_at(0)
        }
    }
}

impl RandomnessCoordinator for MockCoordinator {
    fn request_random_words(&mut self, request: &RandomWordsRequest) -> RaffleResult<u64> {
        if self.reject {
            return Err(RaffleError::RandomnessRequestFailed);
        }
        self.requests.push(request.clone());
        let id = self.next_id;
        self.next_id += 1;
        Ok(id)
    }
}

pub struct MockVault {
    pub balance: u64,
    pub payouts: Vec<(Pubkey, u64)>,
    reject: bool,
}

impl MockVault {
    pub fn holding(balance: u64) -> Self {
        Self {
            balance,
            payouts: Vec::new(),
            reject: false,
        }
    }

    /// A vault whose recipient always refuses the transfer.
    pub fn rejecting(balance: u64) -> Self {
        Self {
            reject: true,
            ..Self::holding(balance)
        }
    }
}

impl PrizeVault for MockVault {
    fn balance(&self) -> u64 {
        self.balance
    }

    fn pay_out(&mut self, _raffle: &mut Raffle, winner: Pubkey, amount: u64) -> RaffleResult<()> {
        if self.reject {
            return Err(RaffleError::TransferFailed { winner, amount });
        }
        self.balance -= amount;
        self.payouts.push((winner, amount));
        Ok(())
    }
}
