//! Upkeep loop: polls `check_upkeep` by simulation and submits
//! `perform_upkeep` once a round is eligible.
//!
//! `perform_upkeep` is permissionless and the program re-checks eligibility,
//! so several keepers may race; the loser's transaction fails with
//! `UpkeepNotNeeded`, which is expected and not retried.

use anyhow::{Context, Result, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use sha2::{Digest, Sha256};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signer;
use solana_sdk::transaction::Transaction;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};

use crate::callback_accounts::SYSTEM_PROGRAM_ID;
use crate::config::AppConfig;
use crate::metrics::Metrics;
use crate::raffle_account::{RaffleSnapshot, coordinator_request_counter};

/// Raffle program error codes after which retrying cannot help.
const ERROR_RAFFLE_CLOSED: u32 = 6001;
const ERROR_UPKEEP_NOT_NEEDED: u32 = 6003;

/// Latest observations, served by `/status`.
#[derive(Default)]
pub struct KeeperStatus {
    pub snapshot: Option<RaffleSnapshot>,
    pub last_check_unix: Option<u64>,
    pub last_upkeep_signature: Option<String>,
}

impl KeeperStatus {
    pub fn to_json(&self) -> serde_json::Value {
        match &self.snapshot {
            Some(raffle) => serde_json::json!({
                "status": "running",
                "raffle_state": raffle.phase,
                "round": raffle.round,
                "entrance_fee": raffle.entrance_fee,
                "subscription_id": raffle.subscription_id,
                "callback_compute_limit": raffle.callback_compute_limit,
                "participants": raffle.participants.len(),
                "last_timestamp": raffle.last_timestamp,
                "interval": raffle.interval,
                "pending_request_id": raffle.pending_request_id,
                "recent_winner": raffle.recent_winner.to_string(),
                "last_check_unix": self.last_check_unix,
                "last_upkeep_signature": self.last_upkeep_signature,
            }),
            None => serde_json::json!({
                "status": "starting",
                "last_check_unix": self.last_check_unix,
            }),
        }
    }
}

/// Compute the Anchor instruction discriminator: `sha256("global:<name>")[..8]`.
pub fn instruction_discriminator(name: &str) -> [u8; 8] {
    let hash = Sha256::digest(format!("global:{name}").as_bytes());
    let mut disc = [0u8; 8];
    disc.copy_from_slice(&hash[..8]);
    disc
}

/// Build the read-only `check_upkeep` instruction.
pub fn build_check_upkeep_instruction(program_id: &Pubkey, raffle: &Pubkey, vault: &Pubkey) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*raffle, false),
            AccountMeta::new_readonly(*vault, false),
        ],
        data: instruction_discriminator("check_upkeep").to_vec(),
    }
}

/// Build `perform_upkeep` with the coordinator accounts for the next request.
///
/// `request_counter` is the coordinator's current counter; the request PDA it
/// is about to create is seeded with it.
pub fn build_perform_upkeep_instruction(
    program_id: &Pubkey,
    caller: &Pubkey,
    raffle: &Pubkey,
    vault: &Pubkey,
    snapshot: &RaffleSnapshot,
    request_counter: u64,
) -> Instruction {
    let coordinator = &snapshot.coordinator_program;
    let subscription_le = snapshot.subscription_id.to_le_bytes();

    let (coordinator_config, _) = Pubkey::find_program_address(&[b"coordinator-config"], coordinator);
    let (subscription, _) =
        Pubkey::find_program_address(&[b"subscription", &subscription_le], coordinator);
    let (consumer_registration, _) = Pubkey::find_program_address(
        &[b"consumer", &subscription_le, program_id.as_ref()],
        coordinator,
    );
    let (request, _) =
        Pubkey::find_program_address(&[b"request", &request_counter.to_le_bytes()], coordinator);

    // discriminator + empty Vec<u8> perform_data
    let mut data = instruction_discriminator("perform_upkeep").to_vec();
    data.extend_from_slice(&0u32.to_le_bytes());

    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*caller, true),
            AccountMeta::new(*raffle, false),
            AccountMeta::new_readonly(*vault, false),
            AccountMeta::new_readonly(*coordinator, false),
            AccountMeta::new(coordinator_config, false),
            AccountMeta::new(subscription, false),
            AccountMeta::new_readonly(consumer_registration, false),
            AccountMeta::new_readonly(*program_id, false),
            AccountMeta::new(request, false),
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
        ],
        data,
    }
}

/// Build a `SetComputeUnitPrice` instruction.
fn build_set_compute_unit_price_instruction(micro_lamports: u64) -> Result<Instruction> {
    let compute_budget_id: Pubkey = "ComputeBudget111111111111111111111111111111"
        .parse()
        .context("invalid compute budget program id")?;
    let mut data = Vec::with_capacity(9);
    data.push(3u8);
    data.extend_from_slice(&micro_lamports.to_le_bytes());
    Ok(Instruction {
        program_id: compute_budget_id,
        accounts: vec![],
        data,
    })
}

/// Decode the `upkeep_needed` flag from `check_upkeep` return data.
pub fn decode_upkeep_needed(return_data: &[u8]) -> Result<bool> {
    match return_data.first() {
        Some(0) => Ok(false),
        Some(1) => Ok(true),
        Some(other) => bail!("invalid upkeep_needed byte {other}"),
        // Solana drops trailing zero bytes from return data.
        None => Ok(false),
    }
}

/// Check if an error string contains a known non-retryable error.
pub fn is_non_retryable(err_str: &str) -> bool {
    let non_retryable_codes = [
        format!("0x{:x}", ERROR_UPKEEP_NOT_NEEDED),
        format!("0x{:x}", ERROR_RAFFLE_CLOSED),
    ];
    non_retryable_codes.iter().any(|code| err_str.contains(code))
        || err_str.contains("UpkeepNotNeeded")
        || err_str.contains("RaffleClosed")
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Main keeper loop.
pub async fn run_keeper(
    config: AppConfig,
    rpc_client: Arc<RpcClient>,
    status: Arc<RwLock<KeeperStatus>>,
    metrics: Arc<Metrics>,
) {
    let mut ticker = tokio::time::interval(Duration::from_millis(config.poll_interval_ms));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if let Err(e) = tick(&rpc_client, &config, &status, &metrics).await {
            handle_upkeep_error(e, &metrics);
        }
    }
}

fn handle_upkeep_error(error: anyhow::Error, metrics: &Metrics) {
    let err_str = format!("{error:#}");
    if is_non_retryable(&err_str) {
        warn!(reason = %err_str, "Upkeep no longer needed, skipping");
    } else {
        metrics.record_failure();
        error!(error = %err_str, "Upkeep failed");
    }
}

/// One poll: refresh the snapshot, simulate `check_upkeep`, perform if due.
#[instrument(skip_all)]
async fn tick(
    rpc_client: &RpcClient,
    config: &AppConfig,
    status: &RwLock<KeeperStatus>,
    metrics: &Metrics,
) -> Result<()> {
    let raffle = config.raffle_address();
    let vault = config.vault_address();

    let data = rpc_client
        .get_account_data(&raffle)
        .await
        .context("failed to fetch raffle account")?;
    let snapshot = RaffleSnapshot::decode(&data)?;

    {
        let mut status = status.write().await;
        status.snapshot = Some(snapshot.clone());
        status.last_check_unix = Some(unix_now());
    }
    metrics.record_check();

    if !simulate_check_upkeep(rpc_client, config, &raffle, &vault).await? {
        debug!(
            round = snapshot.round,
            participants = snapshot.participants.len(),
            state = ?snapshot.phase,
            "Upkeep not needed"
        );
        return Ok(());
    }

    let start = Instant::now();
    info!(
        round = snapshot.round,
        participants = snapshot.participants.len(),
        "Round eligible, performing upkeep"
    );

    let (coordinator_config, _) =
        Pubkey::find_program_address(&[b"coordinator-config"], &snapshot.coordinator_program);
    let config_data = rpc_client
        .get_account_data(&coordinator_config)
        .await
        .context("failed to fetch coordinator config")?;
    let request_counter = coordinator_request_counter(&config_data)?;

    let mut instructions = Vec::with_capacity(2);
    if config.priority_fee_micro_lamports > 0 {
        instructions.push(build_set_compute_unit_price_instruction(
            config.priority_fee_micro_lamports,
        )?);
    }
    instructions.push(build_perform_upkeep_instruction(
        &config.program_id,
        &config.keeper_keypair.pubkey(),
        &raffle,
        &vault,
        &snapshot,
        request_counter,
    ));

    let sig = send_with_retries(rpc_client, config, &instructions).await?;
    let latency_ms = start.elapsed().as_millis() as u64;
    metrics.record_upkeep(latency_ms);
    status.write().await.last_upkeep_signature = Some(sig.clone());

    info!(
        round = snapshot.round,
        request_id = request_counter,
        signature = %sig,
        latency_ms,
        explorer = %config.explorer_url(&sig),
        "Upkeep performed, randomness requested"
    );
    Ok(())
}

/// Simulate `check_upkeep` and read its return data.
async fn simulate_check_upkeep(
    rpc_client: &RpcClient,
    config: &AppConfig,
    raffle: &Pubkey,
    vault: &Pubkey,
) -> Result<bool> {
    let ix = build_check_upkeep_instruction(&config.program_id, raffle, vault);
    let blockhash = rpc_client
        .get_latest_blockhash()
        .await
        .context("failed to fetch latest blockhash")?;
    let tx = Transaction::new_signed_with_payer(
        &[ix],
        Some(&config.keeper_keypair.pubkey()),
        &[config.keeper_keypair.as_ref()],
        blockhash,
    );

    let result = rpc_client
        .simulate_transaction(&tx)
        .await
        .context("check_upkeep simulation failed")?
        .value;
    if let Some(err) = result.err {
        bail!("check_upkeep simulation failed: {err:?}, logs: {:?}", result.logs);
    }

    let Some(return_data) = result.return_data else {
        return Ok(false);
    };
    let bytes = BASE64
        .decode(&return_data.data.0)
        .context("invalid base64 return data")?;
    decode_upkeep_needed(&bytes)
}

/// Send a transaction with exponential backoff on BlockhashNotFound.
async fn send_with_retries(
    rpc_client: &RpcClient,
    config: &AppConfig,
    instructions: &[Instruction],
) -> Result<String> {
    let mut retry_delay = Duration::from_millis(config.initial_retry_delay_ms);

    for attempt in 0..config.max_retries {
        let blockhash = rpc_client
            .get_latest_blockhash()
            .await
            .context("failed to fetch latest blockhash")?;

        let tx = Transaction::new_signed_with_payer(
            instructions,
            Some(&config.keeper_keypair.pubkey()),
            &[config.keeper_keypair.as_ref()],
            blockhash,
        );

        match rpc_client.send_and_confirm_transaction(&tx).await {
            Ok(sig) => return Ok(sig.to_string()),
            Err(e)
                if e.to_string().contains("BlockhashNotFound")
                    && attempt + 1 < config.max_retries =>
            {
                warn!(
                    attempt = attempt + 1,
                    delay = ?retry_delay,
                    "BlockhashNotFound, retrying"
                );
                tokio::time::sleep(retry_delay).await;
                retry_delay = retry_delay.saturating_mul(2).min(Duration::from_secs(60));
            }
            Err(e) => return Err(e).context("send_and_confirm_transaction failed"),
        }
    }

    bail!("max retries ({}) exceeded for perform_upkeep", config.max_retries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raffle_account::Phase;
    use crate::raffle_account::tests::sample;

    #[test]
    fn upkeep_flag_from_return_data() {
        // CheckUpkeepResult { upkeep_needed: true, perform_data: [] }
        assert!(decode_upkeep_needed(&[1, 0, 0, 0, 0]).unwrap());
        assert!(decode_upkeep_needed(&[1]).unwrap());
        assert!(!decode_upkeep_needed(&[0, 0, 0, 0, 0]).unwrap());
        assert!(!decode_upkeep_needed(&[]).unwrap());
        assert!(decode_upkeep_needed(&[2]).is_err());
    }

    #[test]
    fn non_retryable_errors() {
        assert!(is_non_retryable("custom program error: 0x1773"));
        assert!(is_non_retryable("Error Code: UpkeepNotNeeded"));
        assert!(is_non_retryable("custom program error: 0x1771"));
        assert!(!is_non_retryable("BlockhashNotFound"));
        assert!(!is_non_retryable("custom program error: 0x1770"));
    }

    #[test]
    fn perform_upkeep_accounts_follow_program_layout() {
        let program_id = Pubkey::new_unique();
        let caller = Pubkey::new_unique();
        let raffle = Pubkey::new_unique();
        let vault = Pubkey::new_unique();
        let snapshot = sample(Phase::Open, vec![Pubkey::new_unique()]);

        let ix = build_perform_upkeep_instruction(&program_id, &caller, &raffle, &vault, &snapshot, 5);

        assert_eq!(ix.program_id, program_id);
        assert_eq!(&ix.data[..8], &instruction_discriminator("perform_upkeep"));
        assert_eq!(&ix.data[8..], &[0, 0, 0, 0]);
        assert_eq!(ix.accounts.len(), 10);
        assert_eq!(ix.accounts[0], AccountMeta::new(caller, true));
        assert_eq!(ix.accounts[3].pubkey, snapshot.coordinator_program);
        assert_eq!(ix.accounts[7].pubkey, program_id);

        let (request, _) = Pubkey::find_program_address(
            &[b"request", &5u64.to_le_bytes()],
            &snapshot.coordinator_program,
        );
        assert_eq!(ix.accounts[8], AccountMeta::new(request, false));
        assert_eq!(ix.accounts[9].pubkey, SYSTEM_PROGRAM_ID);
    }

    #[test]
    fn check_upkeep_is_read_only() {
        let ix = build_check_upkeep_instruction(
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
        );
        assert_eq!(ix.data, instruction_discriminator("check_upkeep").to_vec());
        assert!(ix.accounts.iter().all(|m| !m.is_writable && !m.is_signer));
    }

    #[test]
    fn status_before_first_poll() {
        let status = KeeperStatus::default();
        assert_eq!(status.to_json()["status"], "starting");
    }

    #[test]
    fn status_reports_round() {
        let status = KeeperStatus {
            snapshot: Some(sample(Phase::Calculating, vec![Pubkey::new_unique()])),
            last_check_unix: Some(1),
            last_upkeep_signature: None,
        };
        let json = status.to_json();
        assert_eq!(json["raffle_state"], "CALCULATING");
        assert_eq!(json["participants"], 1);
        assert_eq!(json["round"], 3);
    }
}
