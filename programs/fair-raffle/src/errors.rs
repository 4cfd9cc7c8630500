use anchor_lang::prelude::{error_code, msg, Pubkey};

use crate::state::RaffleState;

/// Error codes for the raffle program.
///
/// Anchor encodes these as `6000 + variant index` in on-chain error responses.
#[error_code]
pub enum RaffleErrorCode {
    /// The stake sent with an entry is below the entrance fee.
    #[msg("Stake is below the entrance fee")]
    InsufficientStake,
    /// Entries are only accepted while the raffle is `Open`.
    #[msg("Raffle is not open")]
    RaffleClosed,
    /// Every participant slot of the current round is taken.
    #[msg("Raffle is full")]
    RaffleFull,
    /// `perform_upkeep` was called while `check_upkeep` is false.
    #[msg("Upkeep not needed")]
    UpkeepNotNeeded,
    /// The prize transfer to the winner was rejected.
    #[msg("Prize transfer failed")]
    TransferFailed,
    /// The winner account passed to the callback is not the selected participant.
    #[msg("Winner account does not match the selected participant")]
    WinnerAccountMismatch,
    /// The callback signer is not the configured coordinator's config PDA.
    #[msg("Unauthorized coordinator")]
    UnauthorizedCoordinator,
    /// A fulfillment arrived while no request was outstanding.
    #[msg("No randomness request is pending")]
    NoPendingRequest,
    /// A fulfillment arrived for a request id other than the pending one.
    #[msg("Unknown randomness request")]
    UnknownRequest,
    /// The coordinator delivered an empty word vector.
    #[msg("No random words delivered")]
    MissingRandomWords,
    /// Winner selection over an empty participant list.
    #[msg("Raffle has no participants")]
    NoParticipants,
    /// The phase transition is not in the allowed table.
    #[msg("Illegal raffle state transition")]
    IllegalTransition,
    /// A construction argument is out of range.
    #[msg("Invalid raffle configuration")]
    InvalidConfiguration,
    /// `get_player` index is past the end of the participant list.
    #[msg("Player index out of range")]
    PlayerIndexOutOfRange,
    /// The CPI into the coordinator failed.
    #[msg("Randomness request failed")]
    RandomnessRequestFailed,
    /// The coordinator account does not belong to the configured program or is malformed.
    #[msg("Invalid coordinator account")]
    InvalidCoordinatorAccount,
    /// The round counter would overflow u64 (practically unreachable).
    #[msg("Round counter overflow")]
    CounterOverflow,
}

/// Engine-level failure carrying the diagnostic payload for each case.
///
/// Converted into [`RaffleErrorCode`] at the instruction boundary; the payload
/// is written to the program log on the way out.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RaffleError {
    #[error("insufficient stake: sent {sent}, entrance fee is {required}")]
    InsufficientStake { sent: u64, required: u64 },
    #[error("raffle is not open")]
    RaffleClosed,
    #[error("raffle is full ({capacity} participants)")]
    RaffleFull { capacity: usize },
    #[error("upkeep not needed: balance={balance} participants={participants} state={state}")]
    UpkeepNotNeeded {
        balance: u64,
        participants: u64,
        state: RaffleState,
    },
    #[error("transfer of {amount} lamports to {winner} failed")]
    TransferFailed { winner: Pubkey, amount: u64 },
    #[error("winner account mismatch: expected {expected}, got {actual}")]
    WinnerAccountMismatch { expected: Pubkey, actual: Pubkey },
    #[error("callback signer is not the coordinator config")]
    UnauthorizedCoordinator,
    #[error("no randomness request is pending (request {received})")]
    NoPendingRequest { received: u64 },
    #[error("unknown request {received}, pending request is {expected}")]
    UnknownRequest { expected: u64, received: u64 },
    #[error("no random words delivered")]
    MissingRandomWords,
    #[error("raffle has no participants")]
    NoParticipants,
    #[error("illegal transition {from} -> {to}")]
    IllegalTransition { from: RaffleState, to: RaffleState },
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(&'static str),
    #[error("player index {index} out of range ({len} players)")]
    PlayerIndexOutOfRange { index: u64, len: u64 },
    #[error("randomness request failed")]
    RandomnessRequestFailed,
    #[error("invalid coordinator account")]
    InvalidCoordinatorAccount,
    #[error("round counter overflow")]
    CounterOverflow,
}

pub type RaffleResult<T> = std::result::Result<T, RaffleError>;

impl RaffleError {
    /// The on-chain error code this failure surfaces as.
    pub fn code(&self) -> RaffleErrorCode {
        match self {
            RaffleError::InsufficientStake { .. } => RaffleErrorCode::InsufficientStake,
            RaffleError::RaffleClosed => RaffleErrorCode::RaffleClosed,
            RaffleError::RaffleFull { .. } => RaffleErrorCode::RaffleFull,
            RaffleError::UpkeepNotNeeded { .. } => RaffleErrorCode::UpkeepNotNeeded,
            RaffleError::TransferFailed { .. } => RaffleErrorCode::TransferFailed,
            RaffleError::WinnerAccountMismatch { .. } => RaffleErrorCode::WinnerAccountMismatch,
            RaffleError::UnauthorizedCoordinator => RaffleErrorCode::UnauthorizedCoordinator,
            RaffleError::NoPendingRequest { .. } => RaffleErrorCode::NoPendingRequest,
            RaffleError::UnknownRequest { .. } => RaffleErrorCode::UnknownRequest,
            RaffleError::MissingRandomWords => RaffleErrorCode::MissingRandomWords,
            RaffleError::NoParticipants => RaffleErrorCode::NoParticipants,
            RaffleError::IllegalTransition { .. } => RaffleErrorCode::IllegalTransition,
            RaffleError::InvalidConfiguration(_) => RaffleErrorCode::InvalidConfiguration,
            RaffleError::PlayerIndexOutOfRange { .. } => RaffleErrorCode::PlayerIndexOutOfRange,
            RaffleError::RandomnessRequestFailed => RaffleErrorCode::RandomnessRequestFailed,
            RaffleError::InvalidCoordinatorAccount => RaffleErrorCode::InvalidCoordinatorAccount,
            RaffleError::CounterOverflow => RaffleErrorCode::CounterOverflow,
        }
    }
}

impl From<RaffleError> for anchor_lang::error::Error {
    fn from(err: RaffleError) -> Self {
        msg!("{}", err);
        err.code().into()
    }
}
