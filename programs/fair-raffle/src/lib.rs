use anchor_lang::prelude::*;

pub mod constants;
pub mod coordinator;
pub mod errors;
pub mod events;
pub mod instructions;
pub mod randomness;
pub mod registry;
pub mod settlement;
pub mod state;
pub mod upkeep;
pub mod vault;

#[cfg(test)]
mod test_utils;

use instructions::*;
use state::{RaffleConfig, RaffleState};

declare_id!("8GnVgncSwyTcTEzmt343p3XmSv4KksjYfv61WumT13FB");

/// Verifiably fair raffle settled with VRF coordinator randomness.
///
/// Players stake at least the entrance fee to take a slot in the current
/// round. Once the interval has passed and the round has entries and a pot,
/// anyone may close it; the raffle then asks the coordinator for one random
/// word and waits. The coordinator calls back with the word, which picks the
/// winner by `word mod entries`, resets the round and pays out the whole pot.
///
/// ## Round lifecycle
///
/// 1. **Enter**: `enter_raffle` while `Open`.
/// 2. **Upkeep**: `check_upkeep` reports eligibility; `perform_upkeep`
///    moves to `Calculating` and submits the randomness request.
/// 3. **Fulfill**: the coordinator invokes `fulfill_random_words`; the round
///    is reset to `Open` before the prize is transferred.
///
/// ## Known limitation
///
/// There is no timeout and no override. If the coordinator never answers, or
/// the winner can never receive the transfer, the raffle stays `Calculating`.
#[program]
pub mod fair_raffle {
    use super::*;

    /// Create the singleton raffle with its immutable configuration.
    pub fn initialize(ctx: Context<Initialize>, config: RaffleConfig) -> Result<()> {
        instructions::initialize::handler(ctx, config)
    }

    /// Stake `amount` lamports for one slot in the current round.
    ///
    /// Fails with `InsufficientStake` below the entrance fee and with
    /// `RaffleClosed` outside the `Open` phase.
    pub fn enter_raffle(ctx: Context<EnterRaffle>, amount: u64) -> Result<()> {
        instructions::enter_raffle::handler(ctx, amount)
    }

    /// Whether `perform_upkeep` would succeed now. Safe to simulate.
    pub fn check_upkeep(ctx: Context<CheckUpkeep>) -> Result<CheckUpkeepResult> {
        instructions::check_upkeep::handler(ctx)
    }

    /// Close the round and request randomness from the coordinator.
    ///
    /// Permissionless; fails with `UpkeepNotNeeded` when ineligible.
    pub fn perform_upkeep(ctx: Context<PerformUpkeep>, perform_data: Vec<u8>) -> Result<()> {
        instructions::perform_upkeep::handler(ctx, perform_data)
    }

    /// Coordinator callback delivering the randomness for the pending request.
    ///
    /// Only accepted when signed by the configured coordinator's config PDA.
    pub fn fulfill_random_words(
        ctx: Context<FulfillRandomWords>,
        request_id: u64,
        random_words: Vec<[u8; 32]>,
    ) -> Result<()> {
        instructions::fulfill_random_words::handler(ctx, request_id, random_words)
    }

    pub fn get_entrance_fee(ctx: Context<ReadRaffle>) -> Result<u64> {
        instructions::views::entrance_fee(ctx)
    }

    pub fn get_raffle_state(ctx: Context<ReadRaffle>) -> Result<RaffleState> {
        instructions::views::raffle_state(ctx)
    }

    pub fn get_recent_winner(ctx: Context<ReadRaffle>) -> Result<Pubkey> {
        instructions::views::recent_winner(ctx)
    }

    pub fn get_number_of_players(ctx: Context<ReadRaffle>) -> Result<u64> {
        instructions::views::number_of_players(ctx)
    }

    pub fn get_player(ctx: Context<ReadRaffle>, index: u64) -> Result<Pubkey> {
        instructions::views::player(ctx, index)
    }

    pub fn get_last_timestamp(ctx: Context<ReadRaffle>) -> Result<i64> {
        instructions::views::last_timestamp(ctx)
    }

    pub fn get_interval(ctx: Context<ReadRaffle>) -> Result<i64> {
        instructions::views::interval(ctx)
    }

    pub fn get_request_config(ctx: Context<ReadRaffle>) -> Result<RequestConfig> {
        instructions::views::request_config(ctx)
    }
}
