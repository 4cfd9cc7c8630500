use std::fmt;

use anchor_lang::prelude::*;

use crate::constants::MAX_PARTICIPANTS;
use crate::errors::{RaffleError, RaffleResult};

/// Phase of the current round.
///
/// `Open -> Calculating -> Open` is the only cycle; there is no terminal state.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq, InitSpace)]
pub enum RaffleState {
    /// Accepting entries.
    Open,
    /// A randomness request is outstanding; entries and upkeep are refused.
    Calculating,
}

impl RaffleState {
    /// Allowed transition table.
    pub fn can_transition_to(self, next: RaffleState) -> bool {
        matches!(
            (self, next),
            (RaffleState::Open, RaffleState::Calculating)
                | (RaffleState::Calculating, RaffleState::Open)
        )
    }
}

impl fmt::Display for RaffleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RaffleState::Open => f.write_str("OPEN"),
            RaffleState::Calculating => f.write_str("CALCULATING"),
        }
    }
}

/// Construction-time parameters. Immutable once the raffle exists.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct RaffleConfig {
    /// Minimum stake per entry, in lamports.
    pub entrance_fee: u64,
    /// Minimum seconds between settlements.
    pub interval: i64,
    /// Program id of the VRF coordinator that serves this raffle.
    pub coordinator_program: Pubkey,
    /// Oracle key identifier (gas lane) the requests are routed under.
    pub key_hash: [u8; 32],
    /// Coordinator subscription charged for every request.
    pub subscription_id: u64,
    /// Compute budget granted to the fulfillment callback.
    pub callback_compute_limit: u32,
}

impl RaffleConfig {
    /// `min_entrance_fee` is the rent-exempt minimum of an empty account; a
    /// smaller prize could not be paid to a drained winner.
    pub fn validate(&self, min_entrance_fee: u64) -> RaffleResult<()> {
        if self.entrance_fee == 0 {
            return Err(RaffleError::InvalidConfiguration("entrance fee must be positive"));
        }
        if self.entrance_fee < min_entrance_fee {
            return Err(RaffleError::InvalidConfiguration(
                "entrance fee is below the rent-exempt minimum",
            ));
        }
        if self.interval <= 0 {
            return Err(RaffleError::InvalidConfiguration("interval must be positive"));
        }
        if self.coordinator_program == Pubkey::default() {
            return Err(RaffleError::InvalidConfiguration("coordinator program is the zero key"));
        }
        if self.callback_compute_limit == 0 {
            return Err(RaffleError::InvalidConfiguration("callback compute limit must be positive"));
        }
        Ok(())
    }
}

/// The raffle, stored as a singleton PDA.
///
/// Seeds: `["raffle"]`
///
/// The pot itself is not stored here; it is the lamport balance of the vault
/// PDA `["vault", raffle]` above its rent-exempt floor.
#[account]
#[derive(InitSpace, Debug, PartialEq, Eq)]
pub struct Raffle {
    /// Minimum stake per entry, in lamports.
    pub entrance_fee: u64,
    /// Minimum seconds between settlements.
    pub interval: i64,
    /// VRF coordinator program; its config PDA is the only accepted callback signer.
    pub coordinator_program: Pubkey,
    pub key_hash: [u8; 32],
    pub subscription_id: u64,
    pub callback_compute_limit: u32,
    /// Current phase.
    pub raffle_state: RaffleState,
    /// Unix timestamp of the last settlement, or of construction.
    pub last_timestamp: i64,
    /// Winner of the most recently settled round. Informational only.
    pub recent_winner: Pubkey,
    /// Coordinator request id awaiting fulfillment. Meaningful only while `Calculating`.
    pub pending_request_id: u64,
    /// Number of settled rounds.
    pub round: u64,
    /// PDA bump seed cached for efficient re-derivation.
    pub bump: u8,
    /// Bump of the vault PDA.
    pub vault_bump: u8,
    /// Entries of the current round in entry order. Kept last so that
    /// off-chain readers can decode the fixed fields at stable offsets.
    #[max_len(MAX_PARTICIPANTS)]
    pub participants: Vec<Pubkey>,
}

impl Raffle {
    /// A fresh, open raffle whose interval starts counting at `now`.
    pub fn open(config: &RaffleConfig, now: i64, bump: u8, vault_bump: u8) -> Self {
        Self {
            entrance_fee: config.entrance_fee,
            interval: config.interval,
            coordinator_program: config.coordinator_program,
            key_hash: config.key_hash,
            subscription_id: config.subscription_id,
            callback_compute_limit: config.callback_compute_limit,
            raffle_state: RaffleState::Open,
            last_timestamp: now,
            recent_winner: Pubkey::default(),
            pending_request_id: 0,
            round: 0,
            bump,
            vault_bump,
            participants: Vec::new(),
        }
    }

    /// Move to `next`, rejecting anything outside [`RaffleState::can_transition_to`].
    pub fn transition(&mut self, next: RaffleState) -> RaffleResult<()> {
        if !self.raffle_state.can_transition_to(next) {
            return Err(RaffleError::IllegalTransition {
                from: self.raffle_state,
                to: next,
            });
        }
        self.raffle_state = next;
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.raffle_state == RaffleState::Open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::sample_config;

    /// `Rent::default().minimum_balance(0)`.
    const RENT_FLOOR: u64 = 890_880;

    #[test]
    fn transition_table_is_a_two_cycle() {
        use RaffleState::*;
        assert!(Open.can_transition_to(Calculating));
        assert!(Calculating.can_transition_to(Open));
        assert!(!Open.can_transition_to(Open));
        assert!(!Calculating.can_transition_to(Calculating));
    }

    #[test]
    fn open_raffle_starts_empty() {
        let raffle = Raffle::open(&sample_config(), 1_000, 254, 253);
        assert_eq!(raffle.raffle_state, RaffleState::Open);
        assert!(raffle.participants.is_empty());
        assert_eq!(raffle.last_timestamp, 1_000);
        assert_eq!(raffle.recent_winner, Pubkey::default());
        assert_eq!(raffle.round, 0);
    }

    #[test]
    fn illegal_transition_is_a_typed_error() {
        let mut raffle = Raffle::open(&sample_config(), 0, 0, 0);
        assert_eq!(
            raffle.transition(RaffleState::Open),
            Err(RaffleError::IllegalTransition {
                from: RaffleState::Open,
                to: RaffleState::Open,
            })
        );
        raffle.transition(RaffleState::Calculating).unwrap();
        assert_eq!(
            raffle.transition(RaffleState::Calculating),
            Err(RaffleError::IllegalTransition {
                from: RaffleState::Calculating,
                to: RaffleState::Calculating,
            })
        );
        assert_eq!(raffle.raffle_state, RaffleState::Calculating);
    }

    #[test]
    fn config_validation() {
        assert!(sample_config().validate(RENT_FLOOR).is_ok());

        let mut config = sample_config();
        config.entrance_fee = 0;
        assert!(matches!(
            config.validate(RENT_FLOOR),
            Err(RaffleError::InvalidConfiguration(_))
        ));

        let mut config = sample_config();
        config.interval = 0;
        assert!(config.validate(RENT_FLOOR).is_err());

        let mut config = sample_config();
        config.coordinator_program = Pubkey::default();
        assert!(config.validate(RENT_FLOOR).is_err());

        let mut config = sample_config();
        config.callback_compute_limit = 0;
        assert!(config.validate(RENT_FLOOR).is_err());
    }

    #[test]
    fn entrance_fee_must_cover_rent_exemption() {
        let mut config = sample_config();
        config.entrance_fee = RENT_FLOOR - 1;
        assert_eq!(
            config.validate(RENT_FLOOR),
            Err(RaffleError::InvalidConfiguration(
                "entrance fee is below the rent-exempt minimum"
            ))
        );

        config.entrance_fee = RENT_FLOOR;
        assert!(config.validate(RENT_FLOOR).is_ok());
    }

    #[test]
    fn account_fits_in_a_cpi_allocation() {
        // System-program CPI allocations are capped at 10 KiB.
        assert!(8 + Raffle::INIT_SPACE <= 10 * 1024);
    }
}
