use anchor_lang::prelude::*;

use crate::constants::{COORDINATOR_CONFIG_SEED, RAFFLE_SEED, VAULT_SEED};
use crate::errors::RaffleError;
use crate::state::Raffle;
use crate::vault::VaultPayout;

/// Accounts of the coordinator's callback.
///
/// The coordinator passes its config PDA first, signed via `invoke_signed`,
/// followed by the remaining accounts the fulfiller supplied.
#[derive(Accounts)]
pub struct FulfillRandomWords<'info> {
    /// Coordinator config PDA. Checked against the raffle's coordinator in the handler.
    pub coordinator_config: Signer<'info>,

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

    /// CHECK: Must be the participant selected by the delivered word; checked before payout.
    #[account(mut)]
    pub winner: UncheckedAccount<'info>,

    pub system_program: Program<'info, System>,
}

/// Settle the round with the delivered randomness.
pub fn handler(
    ctx: Context<FulfillRandomWords>,
    request_id: u64,
    random_words: Vec<[u8; 32]>,
) -> Result<()> {
    let (expected_signer, _) = Pubkey::find_program_address(
        &[COORDINATOR_CONFIG_SEED],
        &ctx.accounts.raffle.coordinator_program,
    );
    if ctx.accounts.coordinator_config.key() != expected_signer {
        return Err(RaffleError::UnauthorizedCoordinator.into());
    }

    let now = Clock::get()?.unix_timestamp;
    let rent_floor = Rent::get()?.minimum_balance(0);
    let raffle_key = ctx.accounts.raffle.key();

    let accounts = &mut *ctx.accounts;
    let vault_bump = accounts.raffle.vault_bump;
    let mut vault = VaultPayout::new(
        &accounts.vault,
        &accounts.winner,
        &accounts.system_program,
        raffle_key,
        vault_bump,
        rent_floor,
    );

    let settlement = accounts
        .raffle
        .fulfill_random_words(&mut vault, request_id, &random_words, now)?;

    msg!(
        "Winner picked: {} (index={} prize={} request_id={})",
        settlement.winner,
        settlement.winner_index,
        settlement.prize,
        settlement.request_id
    );
    Ok(())
}
