//! Stake registry: the ordered entry list of the current round.

use anchor_lang::prelude::{emit, Pubkey};

use crate::constants::MAX_PARTICIPANTS;
use crate::errors::{RaffleError, RaffleResult};
use crate::events::RaffleEntered;
use crate::state::Raffle;

impl Raffle {
    /// Record one entry for `player`, who staked `amount` lamports.
    ///
    /// Every call takes a separate slot, so a player entering twice holds
    /// twice the odds. Nothing is mutated on failure.
    pub fn enter(&mut self, player: Pubkey, amount: u64) -> RaffleResult<()> {
        if amount < self.entrance_fee {
            return Err(RaffleError::InsufficientStake {
                sent: amount,
                required: self.entrance_fee,
            });
        }
        if !self.is_open() {
            return Err(RaffleError::RaffleClosed);
        }
        if self.participants.len() >= MAX_PARTICIPANTS {
            return Err(RaffleError::RaffleFull {
                capacity: MAX_PARTICIPANTS,
            });
        }

        self.participants.push(player);

        emit!(RaffleEntered {
            player,
            round: self.round,
            entries: self.participants.len() as u32,
        });
        Ok(())
    }

    pub fn number_of_players(&self) -> u64 {
        self.participants.len() as u64
    }

    pub fn player(&self, index: u64) -> RaffleResult<Pubkey> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.participants.get(i))
            .copied()
            .ok_or(RaffleError::PlayerIndexOutOfRange {
                index,
                len: self.number_of_players(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::RaffleState;
    use crate::test_utils::{open_raffle, ENTRANCE_FEE};

    #[test]
    fn entries_append_in_order_with_duplicates() {
        let mut raffle = open_raffle(0);
        let alice = Pubkey::new_unique();
        let bob = Pubkey::new_unique();

        raffle.enter(alice, ENTRANCE_FEE).unwrap();
        raffle.enter(bob, ENTRANCE_FEE * 3).unwrap();
        raffle.enter(alice, ENTRANCE_FEE).unwrap();

        assert_eq!(raffle.participants, vec![alice, bob, alice]);
        assert_eq!(raffle.number_of_players(), 3);
        assert_eq!(raffle.player(1), Ok(bob));
    }

    #[test]
    fn underpaid_entry_is_rejected_in_every_phase() {
        let mut raffle = open_raffle(0);
        let player = Pubkey::new_unique();

        assert_eq!(
            raffle.enter(player, ENTRANCE_FEE - 1),
            Err(RaffleError::InsufficientStake {
                sent: ENTRANCE_FEE - 1,
                required: ENTRANCE_FEE,
            })
        );
        assert!(raffle.participants.is_empty());

        raffle.raffle_state = RaffleState::Calculating;
        assert!(matches!(
            raffle.enter(player, 0),
            Err(RaffleError::InsufficientStake { .. })
        ));
        assert!(raffle.participants.is_empty());
    }

    #[test]
    fn entry_while_calculating_is_rejected_for_any_amount() {
        let mut raffle = open_raffle(0);
        raffle.raffle_state = RaffleState::Calculating;

        for amount in [ENTRANCE_FEE, ENTRANCE_FEE * 10, u64::MAX] {
            assert_eq!(
                raffle.enter(Pubkey::new_unique(), amount),
                Err(RaffleError::RaffleClosed)
            );
        }
        assert!(raffle.participants.is_empty());
    }

    #[test]
    fn full_round_refuses_more_entries() {
        let mut raffle = open_raffle(0);
        for _ in 0..MAX_PARTICIPANTS {
            raffle.enter(Pubkey::new_unique(), ENTRANCE_FEE).unwrap();
        }
        assert_eq!(
            raffle.enter(Pubkey::new_unique(), ENTRANCE_FEE),
            Err(RaffleError::RaffleFull {
                capacity: MAX_PARTICIPANTS
            })
        );
        assert_eq!(raffle.participants.len(), MAX_PARTICIPANTS);
    }

    #[test]
    fn player_lookup_out_of_range() {
        let raffle = open_raffle(0);
        assert_eq!(
            raffle.player(0),
            Err(RaffleError::PlayerIndexOutOfRange { index: 0, len: 0 })
        );
    }
}
