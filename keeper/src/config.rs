//! Keeper configuration loaded from environment variables.
//!
//! Required: `RAFFLE_PROGRAM_ID`
//! Optional: `RPC_URL`, `KEEPER_KEYPAIR_PATH`, `CLUSTER`, `HTTP_PORT`,
//!           `POLL_INTERVAL_MS`, `MAX_RETRIES`, `INITIAL_RETRY_DELAY_MS`,
//!           `PRIORITY_FEE_MICRO_LAMPORTS`
//!
//! The coordinator program and subscription are not configured here; they are
//! read from the raffle account, which fixed them at construction.

use anyhow::{Context, Result};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, read_keypair_file};
use std::str::FromStr;
use std::sync::Arc;

/// Seed of the singleton raffle PDA.
pub const RAFFLE_SEED: &[u8] = b"raffle";
/// Seed prefix of the vault PDA: `["vault", raffle]`.
pub const VAULT_SEED: &[u8] = b"vault";

/// Application configuration for the upkeep keeper.
#[derive(Clone)]
pub struct AppConfig {
    /// Solana JSON-RPC endpoint (HTTP).
    pub rpc_url: String,
    /// Keypair that signs and pays for `perform_upkeep`.
    pub keeper_keypair: Arc<Keypair>,
    /// The deployed raffle program ID.
    pub program_id: Pubkey,
    /// Cluster name for explorer URLs.
    pub cluster: String,
    /// HTTP server port.
    pub http_port: u16,
    /// Delay between upkeep checks in milliseconds.
    pub poll_interval_ms: u64,
    /// Maximum send attempts per upkeep.
    pub max_retries: u32,
    /// Initial retry delay in milliseconds.
    pub initial_retry_delay_ms: u64,
    /// Priority fee in micro-lamports per compute unit.
    pub priority_fee_micro_lamports: u64,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let rpc_url = std::env::var("RPC_URL").unwrap_or_else(|_| "http://127.0.0.1:8899".into());

        let keypair_path = std::env::var("KEEPER_KEYPAIR_PATH")
            .unwrap_or_else(|_| "~/.config/solana/id.json".into());
        let keypair_path = shellexpand::tilde(&keypair_path).to_string();
        let keeper_keypair = read_keypair_file(&keypair_path)
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("failed to read keypair from {keypair_path}"))?;

        let program_id_str =
            std::env::var("RAFFLE_PROGRAM_ID").context("RAFFLE_PROGRAM_ID env var must be set")?;
        let program_id = Pubkey::from_str(&program_id_str)
            .with_context(|| format!("invalid RAFFLE_PROGRAM_ID: {program_id_str}"))?;

        let cluster = std::env::var("CLUSTER").unwrap_or_else(|_| "devnet".into());

        let http_port = env_or("HTTP_PORT", 8080);
        let poll_interval_ms = env_or("POLL_INTERVAL_MS", 10_000);
        let max_retries = env_or("MAX_RETRIES", 5);
        let initial_retry_delay_ms = env_or("INITIAL_RETRY_DELAY_MS", 500);
        let priority_fee_micro_lamports = env_or("PRIORITY_FEE_MICRO_LAMPORTS", 0);

        Ok(Self {
            rpc_url,
            keeper_keypair: Arc::new(keeper_keypair),
            program_id,
            cluster,
            http_port,
            poll_interval_ms,
            max_retries,
            initial_retry_delay_ms,
            priority_fee_micro_lamports,
        })
    }

    /// Address of the singleton raffle PDA.
    pub fn raffle_address(&self) -> Pubkey {
        Pubkey::find_program_address(&[RAFFLE_SEED], &self.program_id).0
    }

    /// Address of the raffle's vault PDA.
    pub fn vault_address(&self) -> Pubkey {
        let raffle = self.raffle_address();
        Pubkey::find_program_address(&[VAULT_SEED, raffle.as_ref()], &self.program_id).0
    }

    /// Return the Solscan explorer URL for a given transaction signature.
    pub fn explorer_url(&self, signature: &str) -> String {
        match self.cluster.as_str() {
            "mainnet-beta" => format!("https://solscan.io/tx/{signature}"),
            cluster => format!("https://solscan.io/tx/{signature}?cluster={cluster}"),
        }
    }
}

/// Parse an optional variable, falling back to `default` when unset or malformed.
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
