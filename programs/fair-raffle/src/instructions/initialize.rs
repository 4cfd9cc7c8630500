use anchor_lang::prelude::*;
use anchor_lang::system_program;

use crate::constants::{RAFFLE_SEED, VAULT_SEED};
use crate::state::{Raffle, RaffleConfig};

/// Accounts required to create the raffle.
#[derive(Accounts)]
pub struct Initialize<'info> {
    /// Pays for the raffle account and the vault's rent floor.
    #[account(mut)]
    pub payer: Signer<'info>,

    /// Singleton raffle PDA. Seeds: `["raffle"]`.
    #[account(
        init,
        payer = payer,
        space = 8 + Raffle::INIT_SPACE,
        seeds = [RAFFLE_SEED],
        bump,
    )]
    pub raffle: Account<'info, Raffle>,

    /// System-owned vault holding the stakes. Seeds: `["vault", raffle]`.
    #[account(
        mut,
        seeds = [VAULT_SEED, raffle.key().as_ref()],
        bump,
    )]
    pub vault: SystemAccount<'info>,

    pub system_program: Program<'info, System>,
}

/// Create the raffle in the `Open` phase with the immutable `config`.
pub fn handler(ctx: Context<Initialize>, config: RaffleConfig) -> Result<()> {
    let floor = Rent::get()?.minimum_balance(0);
    config.validate(floor)?;

    let now = Clock::get()?.unix_timestamp;
    let raffle = Raffle::open(&config, now, ctx.bumps.raffle, ctx.bumps.vault);
    ctx.accounts.raffle.set_inner(raffle);

    // Keep the vault rent-exempt so that every stake lands in a live account.
    let top_up = floor.saturating_sub(ctx.accounts.vault.lamports());
    if top_up > 0 {
        system_program::transfer(
            CpiContext::new(
                ctx.accounts.system_program.to_account_info(),
                system_program::Transfer {
                    from: ctx.accounts.payer.to_account_info(),
                    to: ctx.accounts.vault.to_account_info(),
                },
            ),
            top_up,
        )?;
    }

    msg!(
        "Raffle initialized: entrance_fee={} interval={} coordinator={}",
        config.entrance_fee,
        config.interval,
        config.coordinator_program
    );
    Ok(())
}
