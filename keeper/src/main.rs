//! Raffle Keeper
//!
//! Off-chain service that closes raffle rounds once they become eligible.
//! Runs two concurrent subsystems:
//!
//! - **Upkeep loop**: simulates `check_upkeep` on an interval and submits
//!   `perform_upkeep` when it reports true.
//! - **HTTP server**: liveness (`/health`), raffle status (`/status`),
//!   counters (`/metrics`) and callback-account resolution for the
//!   randomness fulfiller (`/callback-accounts?randomness=<base64>`).

use actix_web::{App, HttpResponse, HttpServer, web};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_commitment_config::CommitmentConfig;
use solana_sdk::signature::Signer;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

mod callback_accounts;
mod config;
mod metrics;
mod raffle_account;
mod upkeep;

use callback_accounts::derive_raffle_callback_accounts;
use config::AppConfig;
use metrics::Metrics;
use raffle_account::RaffleSnapshot;
use upkeep::KeeperStatus;

/// Shared application state accessible from HTTP handlers.
struct AppState {
    config: AppConfig,
    rpc_client: Arc<RpcClient>,
    status: Arc<RwLock<KeeperStatus>>,
    metrics: Arc<Metrics>,
}

#[derive(serde::Deserialize)]
struct CallbackQuery {
    /// Base64 of the coordinator's 32-byte base randomness.
    randomness: String,
}

/// Liveness probe: returns 200 if the process is running.
async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({"status": "ok"}))
}

/// Last observed raffle state.
async fn status(data: web::Data<AppState>) -> HttpResponse {
    let status = data.status.read().await;
    HttpResponse::Ok().json(status.to_json())
}

async fn metrics(data: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(data.metrics.to_json())
}

/// Accounts the fulfiller must pass for the raffle callback of the pending request.
async fn callback_accounts(
    data: web::Data<AppState>,
    query: web::Query<CallbackQuery>,
) -> HttpResponse {
    let randomness: [u8; 32] = match BASE64
        .decode(&query.randomness)
        .ok()
        .and_then(|bytes| bytes.try_into().ok())
    {
        Some(randomness) => randomness,
        None => {
            return HttpResponse::BadRequest()
                .json(serde_json::json!({"error": "randomness must be 32 bytes of base64"}));
        }
    };

    let snapshot = match data
        .rpc_client
        .get_account_data(&data.config.raffle_address())
        .await
        .map_err(anyhow::Error::from)
        .and_then(|bytes| RaffleSnapshot::decode(&bytes))
    {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!(error = %format!("{e:#}"), "Failed to read raffle for callback resolution");
            return HttpResponse::BadGateway().json(serde_json::json!({"error": format!("{e:#}")}));
        }
    };

    match derive_raffle_callback_accounts(&data.config.program_id, &snapshot, &randomness) {
        Some(callback) => {
            data.metrics.record_callback_resolved();
            info!(
                request_id = callback.request_id,
                winner = %callback.winner,
                winner_index = callback.winner_index,
                "Resolved callback accounts"
            );
            HttpResponse::Ok().json(callback.to_json())
        }
        None => HttpResponse::Conflict().json(serde_json::json!({
            "error": "no pending request",
            "raffle_state": snapshot.phase,
        })),
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();

    fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,solana_client=warn,solana_rpc_client=warn,hyper=warn")),
        )
        .with_target(true)
        .with_ansi(true)
        .init();

    let config = AppConfig::from_env().map_err(|e| std::io::Error::other(format!("{e:#}")))?;

    info!(
        program = %config.program_id,
        raffle = %config.raffle_address(),
        keeper = %config.keeper_keypair.pubkey(),
        "Starting raffle keeper"
    );
    info!(rpc = %config.rpc_url, poll_interval_ms = config.poll_interval_ms, "Endpoints configured");

    let rpc_client = Arc::new(RpcClient::new_with_commitment(
        config.rpc_url.clone(),
        CommitmentConfig::confirmed(),
    ));
    let keeper_status = Arc::new(RwLock::new(KeeperStatus::default()));
    let keeper_metrics = Arc::new(Metrics::new());

    // Background: poll eligibility and close rounds.
    tokio::spawn(upkeep::run_keeper(
        config.clone(),
        rpc_client.clone(),
        keeper_status.clone(),
        keeper_metrics.clone(),
    ));

    let addr = ("0.0.0.0", config.http_port);
    let state = web::Data::new(AppState {
        config,
        rpc_client,
        status: keeper_status,
        metrics: keeper_metrics,
    });

    info!(port = addr.1, "Starting HTTP server");

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .route("/health", web::get().to(health))
            .route("/status", web::get().to(status))
            .route("/metrics", web::get().to(metrics))
            .route("/callback-accounts", web::get().to(callback_accounts))
    })
    .bind(addr)?
    .run()
    .await
}
