/// Seed of the singleton raffle PDA.
pub const RAFFLE_SEED: &[u8] = b"raffle";

/// Seed prefix of the system-owned PDA that holds the pot: `["vault", raffle]`.
pub const VAULT_SEED: &[u8] = b"vault";

// Coordinator-side PDA seeds. These must match the coordinator program.
pub const COORDINATOR_CONFIG_SEED: &[u8] = b"coordinator-config";
pub const SUBSCRIPTION_SEED: &[u8] = b"subscription";
pub const CONSUMER_SEED: &[u8] = b"consumer";
pub const REQUEST_SEED: &[u8] = b"request";

/// Blocks the coordinator waits before answering a request.
pub const REQUEST_CONFIRMATIONS: u16 = 3;

/// One entropy word is enough to pick a single winner.
pub const NUM_WORDS: u32 = 1;

/// Requests are paid from subscription credit, never in native lamports.
pub const NATIVE_PAYMENT: bool = false;

/// Participant slots per round. Bounded by the fixed size of the raffle account.
pub const MAX_PARTICIPANTS: usize = 250;

/// Byte offset of `request_counter` inside the coordinator config account:
/// discriminator (8) + admin (32) + authority (32) + fee_per_word (8) + max_num_words (4).
pub const COORDINATOR_REQUEST_COUNTER_OFFSET: usize = 84;
