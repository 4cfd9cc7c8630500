//! Resolves the accounts the coordinator must forward when it calls back into
//! the raffle with fulfilled randomness.
//!
//! The coordinator passes `coordinator_config` as the signing first account
//! and appends whatever remaining accounts the fulfiller supplies. The raffle
//! expects, in order: raffle, vault, winner and the system program. The
//! winner depends on the random word, so the fulfiller has to compute it the
//! same way the program will.

use serde::Serialize;
use sha2::{Digest, Sha256};
use solana_sdk::instruction::AccountMeta;
use solana_sdk::pubkey::Pubkey;

use crate::config::{RAFFLE_SEED, VAULT_SEED};
use crate::raffle_account::{Phase, RaffleSnapshot};

/// The system program address is the all-zero key.
pub const SYSTEM_PROGRAM_ID: Pubkey = Pubkey::new_from_array([0u8; 32]);

/// First word the coordinator expands from its base randomness:
/// `sha256(randomness || 0u32_le)`.
pub fn first_random_word(randomness: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(randomness);
    hasher.update(0u32.to_le_bytes());
    let mut word = [0u8; 32];
    word.copy_from_slice(&hasher.finalize());
    word
}

/// `word mod participants`, with the word read as a little-endian 256-bit
/// integer. `None` for an empty round.
pub fn winner_index(word: &[u8; 32], participants: usize) -> Option<usize> {
    if participants == 0 {
        return None;
    }
    let modulus = participants as u128;
    let remainder = word
        .iter()
        .rev()
        .fold(0u128, |acc, byte| ((acc << 8) | u128::from(*byte)) % modulus);
    Some(remainder as usize)
}

/// Callback accounts plus the winner they were resolved for.
#[derive(Debug, Clone)]
pub struct RaffleCallback {
    pub request_id: u64,
    pub winner_index: usize,
    pub winner: Pubkey,
    pub accounts: Vec<AccountMeta>,
}

#[derive(Serialize)]
struct AccountMetaJson {
    pubkey: String,
    is_signer: bool,
    is_writable: bool,
}

impl RaffleCallback {
    pub fn to_json(&self) -> serde_json::Value {
        let accounts: Vec<AccountMetaJson> = self
            .accounts
            .iter()
            .map(|meta| AccountMetaJson {
                pubkey: meta.pubkey.to_string(),
                is_signer: meta.is_signer,
                is_writable: meta.is_writable,
            })
            .collect();
        serde_json::json!({
            "request_id": self.request_id,
            "winner_index": self.winner_index,
            "winner": self.winner.to_string(),
            "accounts": accounts,
        })
    }
}

/// Derive the callback accounts for the pending round of `snapshot`, given
/// the coordinator's base randomness for that request.
///
/// Returns `None` unless the raffle is `Calculating` with at least one entry.
pub fn derive_raffle_callback_accounts(
    program_id: &Pubkey,
    snapshot: &RaffleSnapshot,
    randomness: &[u8; 32],
) -> Option<RaffleCallback> {
    if snapshot.phase != Phase::Calculating {
        return None;
    }
    let word = first_random_word(randomness);
    let index = winner_index(&word, snapshot.participants.len())?;
    let winner = snapshot.participants[index];

    let (raffle, _) = Pubkey::find_program_address(&[RAFFLE_SEED], program_id);
    let (vault, _) = Pubkey::find_program_address(&[VAULT_SEED, raffle.as_ref()], program_id);

    Some(RaffleCallback {
        request_id: snapshot.pending_request_id,
        winner_index: index,
        winner,
        accounts: vec![
            AccountMeta::new(raffle, false),
            AccountMeta::new(vault, false),
            AccountMeta::new(winner, false),
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
        ],
    })
}
