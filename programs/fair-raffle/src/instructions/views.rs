use anchor_lang::prelude::*;

use crate::constants::{NATIVE_PAYMENT, NUM_WORDS, RAFFLE_SEED, REQUEST_CONFIRMATIONS};
use crate::state::{Raffle, RaffleState};

/// Read-only access to the raffle for the view instructions.
#[derive(Accounts)]
pub struct ReadRaffle<'info> {
    #[account(
        seeds = [RAFFLE_SEED],
        bump = raffle.bump,
    )]
    pub raffle: Account<'info, Raffle>,
}

/// Randomness routing fixed at construction, as returned by `get_request_config`.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct RequestConfig {
    pub coordinator_program: Pubkey,
    pub key_hash: [u8; 32],
    pub subscription_id: u64,
    pub callback_compute_limit: u32,
    pub request_confirmations: u16,
    pub num_words: u32,
    pub native_payment: bool,
}

impl From<&Raffle> for RequestConfig {
    fn from(raffle: &Raffle) -> Self {
        Self {
            coordinator_program: raffle.coordinator_program,
            key_hash: raffle.key_hash,
            subscription_id: raffle.subscription_id,
            callback_compute_limit: raffle.callback_compute_limit,
            request_confirmations: REQUEST_CONFIRMATIONS,
            num_words: NUM_WORDS,
            native_payment: NATIVE_PAYMENT,
        }
    }
}

pub fn entrance_fee(ctx: Context<ReadRaffle>) -> Result<u64> {
    Ok(ctx.accounts.raffle.entrance_fee)
}

pub fn raffle_state(ctx: Context<ReadRaffle>) -> Result<RaffleState> {
    Ok(ctx.accounts.raffle.raffle_state)
}

pub fn recent_winner(ctx: Context<ReadRaffle>) -> Result<Pubkey> {
    Ok(ctx.accounts.raffle.recent_winner)
}

pub fn number_of_players(ctx: Context<ReadRaffle>) -> Result<u64> {
    Ok(ctx.accounts.raffle.number_of_players())
}

pub fn player(ctx: Context<ReadRaffle>, index: u64) -> Result<Pubkey> {
    Ok(ctx.accounts.raffle.player(index)?)
}

pub fn last_timestamp(ctx: Context<ReadRaffle>) -> Result<i64> {
    Ok(ctx.accounts.raffle.last_timestamp)
}

pub fn interval(ctx: Context<ReadRaffle>) -> Result<i64> {
    Ok(ctx.accounts.raffle.interval)
}

pub fn request_config(ctx: Context<ReadRaffle>) -> Result<RequestConfig> {
    Ok(RequestConfig::from(&*ctx.accounts.raffle))
}
