use anchor_lang::prelude::*;

use crate::constants::{RAFFLE_SEED, VAULT_SEED};
use crate::state::Raffle;
use crate::vault::prize_balance;

/// Return value of `check_upkeep`.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct CheckUpkeepResult {
    pub upkeep_needed: bool,
    /// Passed back to `perform_upkeep`. Always empty.
    pub perform_data: Vec<u8>,
}

/// Read-only accounts for evaluating upkeep.
#[derive(Accounts)]
pub struct CheckUpkeep<'info> {
    #[account(
        seeds = [RAFFLE_SEED],
        bump = raffle.bump,
    )]
    pub raffle: Account<'info, Raffle>,

    #[account(
        seeds = [VAULT_SEED, raffle.key().as_ref()],
        bump = raffle.vault_bump,
    )]
    pub vault: SystemAccount<'info>,
}

/// Report whether the round may be closed now. Never fails on an ineligible raffle.
pub fn handler(ctx: Context<CheckUpkeep>) -> Result<CheckUpkeepResult> {
    let now = Clock::get()?.unix_timestamp;
    let balance = prize_balance(&ctx.accounts.vault.to_account_info())?;
    let check = ctx.accounts.raffle.check_upkeep(now, balance);

    Ok(CheckUpkeepResult {
        upkeep_needed: check.upkeep_needed(),
        perform_data: Vec::new(),
    })
}
