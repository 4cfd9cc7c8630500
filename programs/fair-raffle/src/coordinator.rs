//! CPI client for the VRF coordinator program.
//!
//! The coordinator is an external program; its instruction layout is built by
//! hand rather than through a crate dependency.

use anchor_lang::prelude::*;
use anchor_lang::solana_program::instruction::Instruction;
use anchor_lang::solana_program::program::invoke;
use sha2::{Digest, Sha256};

use crate::constants::{COORDINATOR_REQUEST_COUNTER_OFFSET, REQUEST_SEED};
use crate::errors::{RaffleError, RaffleResult};
use crate::randomness::{RandomWordsRequest, RandomnessCoordinator};

/// Compute the Anchor instruction discriminator: `sha256("global:<name>")[..8]`.
pub fn instruction_discriminator(name: &str) -> [u8; 8] {
    let mut hasher = Sha256::new();
    hasher.update(format!("global:{name}"));
    let hash = hasher.finalize();
    let mut disc = [0u8; 8];
    disc.copy_from_slice(&hash[..8]);
    disc
}

/// Read the coordinator's next request id from its config account data.
pub fn request_counter(config_data: &[u8]) -> RaffleResult<u64> {
    let end = COORDINATOR_REQUEST_COUNTER_OFFSET + 8;
    let bytes = config_data
        .get(COORDINATOR_REQUEST_COUNTER_OFFSET..end)
        .ok_or(RaffleError::InvalidCoordinatorAccount)?;
    let mut counter = [0u8; 8];
    counter.copy_from_slice(bytes);
    Ok(u64::from_le_bytes(counter))
}

/// Address of the request PDA the coordinator creates for `request_id`.
pub fn request_address(coordinator: &Pubkey, request_id: u64) -> Pubkey {
    Pubkey::find_program_address(&[REQUEST_SEED, &request_id.to_le_bytes()], coordinator).0
}

/// Instruction data for the coordinator's
/// `request_random_words(num_words: u32, seed: [u8; 32], callback_compute_limit: u32)`.
pub fn request_instruction_data(request: &RandomWordsRequest) -> Vec<u8> {
    let mut data = Vec::with_capacity(8 + 4 + 32 + 4);
    data.extend_from_slice(&instruction_discriminator("request_random_words"));
    data.extend_from_slice(&request.num_words.to_le_bytes());
    data.extend_from_slice(&request.seed);
    data.extend_from_slice(&request.callback_compute_limit.to_le_bytes());
    data
}

/// Accounts of the coordinator's `request_random_words`, in instruction order.
pub struct RequestAccounts<'info> {
    /// Pays the request PDA rent.
    pub requester: AccountInfo<'info>,
    pub config: AccountInfo<'info>,
    pub subscription: AccountInfo<'info>,
    pub consumer_registration: AccountInfo<'info>,
    /// This program; the coordinator calls it back.
    pub consumer_program: AccountInfo<'info>,
    pub request: AccountInfo<'info>,
    pub system_program: AccountInfo<'info>,
}

/// [`RandomnessCoordinator`] backed by a CPI into the coordinator program.
pub struct CoordinatorCpi<'info> {
    program: AccountInfo<'info>,
    accounts: RequestAccounts<'info>,
}

impl<'info> CoordinatorCpi<'info> {
    pub fn new(program: AccountInfo<'info>, accounts: RequestAccounts<'info>) -> Self {
        Self { program, accounts }
    }

    fn instruction(&self, request: &RandomWordsRequest) -> Instruction {
        let a = &self.accounts;
        Instruction {
            program_id: self.program.key(),
            accounts: vec![
                AccountMeta::new(a.requester.key(), true),
                AccountMeta::new(a.config.key(), false),
                AccountMeta::new(a.subscription.key(), false),
                AccountMeta::new_readonly(a.consumer_registration.key(), false),
                AccountMeta::new_readonly(a.consumer_program.key(), false),
                AccountMeta::new(a.request.key(), false),
                AccountMeta::new_readonly(a.system_program.key(), false),
            ],
            data: request_instruction_data(request),
        }
    }
}

impl<'info> RandomnessCoordinator for CoordinatorCpi<'info> {
    fn request_random_words(&mut self, request: &RandomWordsRequest) -> RaffleResult<u64> {
        if *self.accounts.config.owner != self.program.key() {
            return Err(RaffleError::InvalidCoordinatorAccount);
        }
        // The coordinator assigns ids from its counter at request time.
        let request_id = {
            let data = self
                .accounts
                .config
                .try_borrow_data()
                .map_err(|_| RaffleError::InvalidCoordinatorAccount)?;
            request_counter(&data)?
        };
        if self.accounts.request.key() != request_address(&self.program.key(), request_id) {
            msg!("Request account does not match request {}", request_id);
            return Err(RaffleError::InvalidCoordinatorAccount);
        }

        let ix = self.instruction(request);
        let a = &self.accounts;
        invoke(
            &ix,
            &[
                a.requester.clone(),
                a.config.clone(),
                a.subscription.clone(),
                a.consumer_registration.clone(),
                a.consumer_program.clone(),
                a.request.clone(),
                a.system_program.clone(),
                self.program.clone(),
            ],
        )
        .map_err(|err| {
            msg!("Coordinator request failed: {}", err);
            RaffleError::RandomnessRequestFailed
        })?;

        Ok(request_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discriminator_matches_anchor_convention() {
        let expected = {
            let hash = Sha256::digest(b"global:request_random_words");
            let mut disc = [0u8; 8];
            disc.copy_from_slice(&hash[..8]);
            disc
        };
        assert_eq!(instruction_discriminator("request_random_words"), expected);
        assert_ne!(
            instruction_discriminator("request_random_words"),
            instruction_discriminator("fulfill_random_words")
        );
    }

    #[test]
    fn reads_request_counter_at_fixed_offset() {
        let mut data = vec![0u8; 8 + 32 + 32 + 8 + 4 + 8 + 8 + 1];
        data[84..92].copy_from_slice(&42u64.to_le_bytes());
        assert_eq!(request_counter(&data), Ok(42));
    }

    #[test]
    fn short_config_is_rejected() {
        assert_eq!(
            request_counter(&[0u8; 90]),
            Err(RaffleError::InvalidCoordinatorAccount)
        );
    }

    #[test]
    fn request_address_follows_counter() {
        let coordinator = Pubkey::new_unique();
        let (expected, _) =
            Pubkey::find_program_address(&[b"request", &7u64.to_le_bytes()], &coordinator);
        assert_eq!(request_address(&coordinator, 7), expected);
        assert_ne!(request_address(&coordinator, 7), request_address(&coordinator, 8));
    }

    #[test]
    fn request_data_layout() {
        let request = RandomWordsRequest {
            key_hash: [1u8; 32],
            subscription_id: 3,
            request_confirmations: 3,
            callback_compute_limit: 200_000,
            num_words: 1,
            native_payment: false,
            seed: [5u8; 32],
        };
        let data = request_instruction_data(&request);
        assert_eq!(data.len(), 48);
        assert_eq!(&data[..8], &instruction_discriminator("request_random_words"));
        assert_eq!(&data[8..12], &1u32.to_le_bytes());
        assert_eq!(&data[12..44], &[5u8; 32]);
        assert_eq!(&data[44..48], &200_000u32.to_le_bytes());
    }
}
