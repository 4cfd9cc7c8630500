//! Request half of the randomness protocol.
//!
//! `perform_upkeep` closes the round, records the coordinator's request id and
//! returns. Nothing survives until the coordinator calls back except what is
//! persisted on the [`Raffle`] account: the `Calculating` phase and the
//! pending request id.

use anchor_lang::prelude::{emit, Pubkey};
use sha2::{Digest, Sha256};

use crate::constants::{NATIVE_PAYMENT, NUM_WORDS, REQUEST_CONFIRMATIONS};
use crate::errors::RaffleResult;
use crate::events::RequestedRaffleWinner;
use crate::state::{Raffle, RaffleState};

/// One 256-bit entropy word as delivered by the coordinator.
pub type RandomWord = [u8; 32];

/// Everything the coordinator needs to serve one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RandomWordsRequest {
    pub key_hash: [u8; 32],
    pub subscription_id: u64,
    pub request_confirmations: u16,
    pub callback_compute_limit: u32,
    pub num_words: u32,
    pub native_payment: bool,
    /// Caller entropy mixed into the oracle input.
    pub seed: [u8; 32],
}

/// The external randomness provider.
///
/// Implementations submit the request and return the id the later
/// `fulfill_random_words` callback will carry. There is no cancel: once
/// submitted, a request is answered once or never.
pub trait RandomnessCoordinator {
    fn request_random_words(&mut self, request: &RandomWordsRequest) -> RaffleResult<u64>;
}

impl Raffle {
    /// Build the request for the current round.
    ///
    /// `seed = sha256(key_hash || raffle || round_le || now_le)`.
    pub fn random_words_request(&self, raffle_key: &Pubkey, now: i64) -> RandomWordsRequest {
        let mut hasher = Sha256::new();
        hasher.update(self.key_hash);
        hasher.update(raffle_key.as_ref());
        hasher.update(self.round.to_le_bytes());
        hasher.update(now.to_le_bytes());
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&hasher.finalize());

        RandomWordsRequest {
            key_hash: self.key_hash,
            subscription_id: self.subscription_id,
            request_confirmations: REQUEST_CONFIRMATIONS,
            callback_compute_limit: self.callback_compute_limit,
            num_words: NUM_WORDS,
            native_payment: NATIVE_PAYMENT,
            seed,
        }
    }

    /// Close the round and ask `coordinator` for a winner.
    ///
    /// Permissionless: fails with `UpkeepNotNeeded` (carrying balance,
    /// participant count and phase) unless `check_upkeep` holds. On success
    /// the raffle is `Calculating` until the matching fulfillment settles it.
    pub fn perform_upkeep<C: RandomnessCoordinator>(
        &mut self,
        coordinator: &mut C,
        raffle_key: &Pubkey,
        now: i64,
        balance: u64,
    ) -> RaffleResult<u64> {
        self.ensure_upkeep_needed(now, balance)?;
        self.transition(RaffleState::Calculating)?;

        let request = self.random_words_request(raffle_key, now);
        let request_id = match coordinator.request_random_words(&request) {
            Ok(id) => id,
            Err(err) => {
                self.transition(RaffleState::Open)?;
                return Err(err);
            }
        };
        self.pending_request_id = request_id;

        emit!(RequestedRaffleWinner {
            request_id,
            round: self.round,
            key_hash: request.key_hash,
            subscription_id: request.subscription_id,
            request_confirmations: request.request_confirmations,
            num_words: request.num_words,
            callback_compute_limit: request.callback_compute_limit,
            native_payment: request.native_payment,
        });
        Ok(request_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RaffleError;
    use crate::test_utils::{open_raffle, MockCoordinator, ENTRANCE_FEE, INTERVAL};

    fn ready(now: i64) -> Raffle {
        let mut raffle = open_raffle(now);
        raffle.enter(Pubkey::new_unique(), ENTRANCE_FEE).unwrap();
        raffle
    }

    #[test]
    fn request_uses_fixed_routing() {
        let raffle = open_raffle(0);
        let request = raffle.random_words_request(&Pubkey::new_unique(), 10);
        assert_eq!(request.request_confirmations, 3);
        assert_eq!(request.num_words, 1);
        assert!(!request.native_payment);
        assert_eq!(request.key_hash, raffle.key_hash);
        assert_eq!(request.subscription_id, raffle.subscription_id);
        assert_eq!(request.callback_compute_limit, raffle.callback_compute_limit);
    }

    #[test]
    fn seed_changes_with_round_and_time() {
        let mut raffle = open_raffle(0);
        let key = Pubkey::new_unique();
        let a = raffle.random_words_request(&key, 10).seed;
        let b = raffle.random_words_request(&key, 11).seed;
        raffle.round = 1;
        let c = raffle.random_words_request(&key, 10).seed;
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, open_raffle(0).random_words_request(&key, 10).seed);
    }

    #[test]
    fn upkeep_moves_to_calculating_and_records_request() {
        let mut raffle = ready(0);
        let mut coordinator = MockCoordinator::starting_at(41);

        let id = raffle
            .perform_upkeep(&mut coordinator, &Pubkey::new_unique(), INTERVAL, ENTRANCE_FEE)
            .unwrap();

        assert_eq!(id, 41);
        assert_eq!(raffle.raffle_state, RaffleState::Calculating);
        assert_eq!(raffle.pending_request_id, 41);
        assert_eq!(coordinator.requests.len(), 1);
    }

    #[test]
    fn ineligible_upkeep_fails_without_requesting() {
        let mut raffle = ready(0);
        let mut coordinator = MockCoordinator::starting_at(0);

        let err = raffle
            .perform_upkeep(&mut coordinator, &Pubkey::new_unique(), INTERVAL - 1, ENTRANCE_FEE)
            .unwrap_err();

        assert_eq!(
            err,
            RaffleError::UpkeepNotNeeded {
                balance: ENTRANCE_FEE,
                participants: 1,
                state: RaffleState::Open,
            }
        );
        assert_eq!(raffle.raffle_state, RaffleState::Open);
        assert!(coordinator.requests.is_empty());
    }

    #[test]
    fn second_upkeep_is_blocked_while_calculating() {
        let mut raffle = ready(0);
        let mut coordinator = MockCoordinator::starting_at(0);
        let key = Pubkey::new_unique();
        raffle
            .perform_upkeep(&mut coordinator, &key, INTERVAL, ENTRANCE_FEE)
            .unwrap();

        let err = raffle
            .perform_upkeep(&mut coordinator, &key, INTERVAL * 10, ENTRANCE_FEE)
            .unwrap_err();

        assert!(matches!(
            err,
            RaffleError::UpkeepNotNeeded {
                state: RaffleState::Calculating,
                ..
            }
        ));
        assert_eq!(coordinator.requests.len(), 1);
        assert_eq!(raffle.pending_request_id, 0);
    }

    #[test]
    fn rejected_request_leaves_round_open() {
        let mut raffle = ready(0);
        let before = raffle.clone();
        let mut coordinator = MockCoordinator::rejecting();

        assert_eq!(
            raffle.perform_upkeep(&mut coordinator, &Pubkey::new_unique(), INTERVAL, ENTRANCE_FEE),
            Err(RaffleError::RandomnessRequestFailed)
        );
        assert_eq!(raffle, before);
        assert!(raffle.is_open());

        // The restored round is eligible again.
        let mut coordinator = MockCoordinator::starting_at(0);
        assert_eq!(
            raffle.perform_upkeep(&mut coordinator, &Pubkey::new_unique(), INTERVAL, ENTRANCE_FEE),
            Ok(0)
        );
        assert_eq!(raffle.raffle_state, RaffleState::Calculating);
    }
}
