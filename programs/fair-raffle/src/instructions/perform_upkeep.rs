use anchor_lang::prelude::*;

use crate::constants::{
    CONSUMER_SEED, COORDINATOR_CONFIG_SEED, RAFFLE_SEED, SUBSCRIPTION_SEED, VAULT_SEED,
};
use crate::coordinator::{CoordinatorCpi, RequestAccounts};
use crate::errors::RaffleErrorCode;
use crate::state::Raffle;
use crate::vault::prize_balance;

/// Accounts required to close the round and request randomness.
///
/// Permissionless. The coordinator-side PDAs are re-derived here so the
/// request is always charged to the subscription fixed at construction.
#[derive(Accounts)]
pub struct PerformUpkeep<'info> {
    /// Any caller; pays the rent of the coordinator's request PDA.
    #[account(mut)]
    pub caller: Signer<'info>,

    #[account(
        mut,
        seeds = [RAFFLE_SEED],
        bump = raffle.bump,
    )]
    pub raffle: Account<'info, Raffle>,

    #[account(
        seeds = [VAULT_SEED, raffle.key().as_ref()],
        bump = raffle.vault_bump,
    )]
    pub vault: SystemAccount<'info>,

    /// CHECK: Must be the coordinator fixed at construction.
    #[account(
        executable,
        address = raffle.coordinator_program @ RaffleErrorCode::InvalidCoordinatorAccount,
    )]
    pub coordinator_program: UncheckedAccount<'info>,

    /// CHECK: Coordinator config PDA; its layout is read by the CPI client.
    #[account(
        mut,
        seeds = [COORDINATOR_CONFIG_SEED],
        bump,
        seeds::program = coordinator_program.key(),
    )]
    pub coordinator_config: UncheckedAccount<'info>,

    /// CHECK: The configured subscription PDA on the coordinator.
    #[account(
        mut,
        seeds = [SUBSCRIPTION_SEED, raffle.subscription_id.to_le_bytes().as_ref()],
        bump,
        seeds::program = coordinator_program.key(),
    )]
    pub subscription: UncheckedAccount<'info>,

    /// CHECK: Registration of this program under the subscription; validated by the coordinator.
    #[account(
        seeds = [CONSUMER_SEED, raffle.subscription_id.to_le_bytes().as_ref(), crate::ID.as_ref()],
        bump,
        seeds::program = coordinator_program.key(),
    )]
    pub consumer_registration: UncheckedAccount<'info>,

    /// CHECK: This program, named as the callback target.
    #[account(address = crate::ID)]
    pub raffle_program: UncheckedAccount<'info>,

    /// CHECK: Created by the coordinator at `["request", request_counter]`;
    /// the address is checked against the counter before the CPI.
    #[account(mut)]
    pub randomness_request: UncheckedAccount<'info>,

    pub system_program: Program<'info, System>,
}

/// Close the round and submit a randomness request for it.
pub fn handler(ctx: Context<PerformUpkeep>, _perform_data: Vec<u8>) -> Result<()> {
    let now = Clock::get()?.unix_timestamp;
    let balance = prize_balance(&ctx.accounts.vault.to_account_info())?;
    let raffle_key = ctx.accounts.raffle.key();

    let accounts = &mut *ctx.accounts;
    let mut coordinator = CoordinatorCpi::new(
        accounts.coordinator_program.to_account_info(),
        RequestAccounts {
            requester: accounts.caller.to_account_info(),
            config: accounts.coordinator_config.to_account_info(),
            subscription: accounts.subscription.to_account_info(),
            consumer_registration: accounts.consumer_registration.to_account_info(),
            consumer_program: accounts.raffle_program.to_account_info(),
            request: accounts.randomness_request.to_account_info(),
            system_program: accounts.system_program.to_account_info(),
        },
    );

    let request_id = accounts
        .raffle
        .perform_upkeep(&mut coordinator, &raffle_key, now, balance)?;

    msg!(
        "Requested raffle winner: request_id={} round={}",
        request_id,
        accounts.raffle.round
    );
    Ok(())
}
