use anchor_lang::prelude::*;
use anchor_lang::system_program;

use crate::constants::VAULT_SEED;
use crate::errors::{RaffleError, RaffleResult};
use crate::settlement::PrizeVault;
use crate::state::Raffle;

/// Prize held by the vault: everything above its rent-exempt floor.
pub fn prize_balance(vault: &AccountInfo) -> Result<u64> {
    let floor = Rent::get()?.minimum_balance(0);
    Ok(vault.lamports().saturating_sub(floor))
}

/// [`PrizeVault`] over the system-owned vault PDA, paying out through a
/// system-program transfer signed with the vault seeds.
pub struct VaultPayout<'a, 'info> {
    vault: &'a SystemAccount<'info>,
    winner: &'a UncheckedAccount<'info>,
    system_program: &'a Program<'info, System>,
    raffle_key: Pubkey,
    vault_bump: u8,
    rent_floor: u64,
}

impl<'a, 'info> VaultPayout<'a, 'info> {
    pub fn new(
        vault: &'a SystemAccount<'info>,
        winner: &'a UncheckedAccount<'info>,
        system_program: &'a Program<'info, System>,
        raffle_key: Pubkey,
        vault_bump: u8,
        rent_floor: u64,
    ) -> Self {
        Self {
            vault,
            winner,
            system_program,
            raffle_key,
            vault_bump,
            rent_floor,
        }
    }
}

impl<'a, 'info> PrizeVault for VaultPayout<'a, 'info> {
    fn balance(&self) -> u64 {
        self.vault.lamports().saturating_sub(self.rent_floor)
    }

    fn pay_out(&mut self, _raffle: &mut Raffle, winner: Pubkey, amount: u64) -> RaffleResult<()> {
        if self.winner.key() != winner {
            return Err(RaffleError::WinnerAccountMismatch {
                expected: winner,
                actual: self.winner.key(),
            });
        }

        let bump = [self.vault_bump];
        let signer_seeds: &[&[u8]] = &[VAULT_SEED, self.raffle_key.as_ref(), &bump];

        system_program::transfer(
            CpiContext::new_with_signer(
                self.system_program.to_account_info(),
                system_program::Transfer {
                    from: self.vault.to_account_info(),
                    to: self.winner.to_account_info(),
                },
                &[signer_seeds],
            ),
            amount,
        )
        .map_err(|err| {
            msg!("Prize transfer failed: {}", err);
            RaffleError::TransferFailed { winner, amount }
        })
    }
}
