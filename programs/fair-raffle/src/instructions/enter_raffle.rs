use anchor_lang::prelude::*;
use anchor_lang::system_program;

use crate::constants::{RAFFLE_SEED, VAULT_SEED};
use crate::state::Raffle;

/// Accounts required to enter the current round.
#[derive(Accounts)]
pub struct EnterRaffle<'info> {
    /// The entrant; pays the stake.
    #[account(mut)]
    pub player: Signer<'info>,

    #[account(
        mut,
        seeds = [RAFFLE_SEED],
        bump = raffle.bump,
    )]
    pub raffle: Account<'info, Raffle>,

    #[account(
        mut,
        seeds = [VAULT_SEED, raffle.key().as_ref()],
        bump = raffle.vault_bump,
    )]
    pub vault: SystemAccount<'info>,

    pub system_program: Program<'info, System>,
}

/// Take one slot in the round, moving `amount` lamports into the vault.
pub fn handler(ctx: Context<EnterRaffle>, amount: u64) -> Result<()> {
    let player = ctx.accounts.player.key();
    ctx.accounts.raffle.enter(player, amount)?;

    system_program::transfer(
        CpiContext::new(
            ctx.accounts.system_program.to_account_info(),
            system_program::Transfer {
                from: ctx.accounts.player.to_account_info(),
                to: ctx.accounts.vault.to_account_info(),
            },
        ),
        amount,
    )?;

    msg!(
        "Raffle entered: player={} entries={}",
        player,
        ctx.accounts.raffle.participants.len()
    );
    Ok(())
}
