use anchor_lang::prelude::*;

/// Emitted when a participant takes a slot in the current round.
#[event]
pub struct RaffleEntered {
    pub player: Pubkey,
    pub round: u64,
    /// Slot count of the round after this entry.
    pub entries: u32,
}

/// Emitted when upkeep closes the round and asks the coordinator for randomness.
///
/// Carries the full request routing so the oracle side can audit what was asked for.
#[event]
pub struct RequestedRaffleWinner {
    pub request_id: u64,
    pub round: u64,
    pub key_hash: [u8; 32],
    pub subscription_id: u64,
    pub request_confirmations: u16,
    pub num_words: u32,
    pub callback_compute_limit: u32,
    pub native_payment: bool,
}

/// Emitted once per settled round, after the round has been reset and before
/// the prize leaves the vault.
#[event]
pub struct WinnerPicked {
    pub winner: Pubkey,
    pub round: u64,
    pub request_id: u64,
    pub prize: u64,
}
