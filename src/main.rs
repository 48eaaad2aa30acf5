//! Echo client
//!
//! Runs the four echo protocol steps against a deployed program:
//!
//! ```text
//! echo-client <PROGRAM_ID> <MESSAGE>
//! ```
//!
//! Endpoint, commitment, wallet and buffer settings come from `ECHO_*`
//! environment variables (or `.env`). Exits non-zero if any step fails or any
//! written buffer does not read back as expected.

// Compiler warning configuration
#![deny(unused_imports)]
#![deny(unused_mut)]
#![deny(unused_variables)]
#![warn(dead_code)]
#![warn(unused_must_use)]

use anyhow::{Context, Result};
use clap::Parser;
use echo_client::{Config, EchoProtocol, ProtocolSettings, RpcLedgerClient, WalletManager};
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Echo program id (base58)
    #[arg(value_parser = parse_pubkey)]
    program_id: Pubkey,

    /// Text to echo
    message: String,
}

fn parse_pubkey(s: &str) -> Result<Pubkey, String> {
    Pubkey::from_str(s).map_err(|e| format!("invalid program id '{}': {}", s, e))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging()?;

    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env().context("Failed to load configuration")?;
    info!(rpc = %config.rpc.url, commitment = ?config.rpc.commitment, "Configuration loaded");

    let wallet = match &config.wallet.keypair_path {
        Some(path) => WalletManager::from_file(path).context("Failed to load wallet")?,
        None => WalletManager::generate(),
    };
    info!("Fee payer: {}", wallet.pubkey());

    let client = RpcLedgerClient::new(
        config.rpc.url.clone(),
        config.rpc.commitment.commitment(),
        config.rpc.skip_preflight,
    );
    debug!("RPC endpoint: {}", client.url());

    let protocol = EchoProtocol::new(
        &client,
        args.program_id,
        wallet.keypair(),
        ProtocolSettings::from(&config),
    )?;

    let outcome = protocol.run(&args.message).await;

    match protocol.metrics().render() {
        Ok(text) => debug!("Run metrics:\n{}", text),
        Err(e) => debug!("Failed to render metrics: {}", e),
    }

    if let Err(e) = &outcome {
        if e.is_retryable() {
            warn!("The failure looks transient; rerunning may succeed");
        }
    }
    let report = outcome.with_context(|| format!("Echo run {} aborted", protocol.run_id()))?;

    for step in &report.steps {
        println!("Step {}: {}", step.step, step.explorer_url);
    }

    if !report.mismatches.is_empty() {
        for mismatch in &report.mismatches {
            error!("{}", mismatch);
        }
        anyhow::bail!(
            "{} of {} buffer reads did not match the written message",
            report.mismatches.len(),
            report.steps.len()
        );
    }

    info!("All {} steps confirmed and verified", report.steps.len());
    Ok(())
}

/// Initialize logging
fn init_logging() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "echo_client=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    Ok(())
}
