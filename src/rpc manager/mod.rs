//! RPC Manager Module
//!
//! The network boundary the protocol talks through: funding, rent queries,
//! submission, confirmation polling and account fetches.

use async_trait::async_trait;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    hash::Hash,
    pubkey::Pubkey,
    signature::Signature,
    transaction::{Transaction, TransactionError},
};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

// Submodules
pub mod rpc_client;
pub mod rpc_errors;

// Re-exports for convenience
pub use rpc_client::RpcLedgerClient;
pub use rpc_errors::RpcManagerError;

/// Deadline and polling cadence for confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// How a submitted transaction settled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationStatus {
    /// Reached the requested commitment level
    Confirmed,
    /// Landed but execution failed
    Failed(TransactionError),
    /// Deadline passed without reaching the requested level
    TimedOut,
}

/// Trait for the ledger operations the echo protocol needs
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Request test funds for `to`; returns the airdrop transaction signature
    async fn request_airdrop(&self, to: &Pubkey, lamports: u64)
        -> Result<Signature, RpcManagerError>;

    /// Minimum balance keeping an account of `data_len` bytes rent-exempt
    async fn minimum_balance_for_rent_exemption(
        &self,
        data_len: usize,
    ) -> Result<u64, RpcManagerError>;

    async fn latest_blockhash(&self) -> Result<Hash, RpcManagerError>;

    /// Hand a signed transaction to the network
    async fn submit(&self, tx: &Transaction) -> Result<Signature, RpcManagerError>;

    /// `None` while the signature has not reached `commitment`
    async fn signature_status(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> Result<Option<Result<(), TransactionError>>, RpcManagerError>;

    /// Raw account data, `None` if the account does not exist
    async fn fetch_account_data(
        &self,
        address: &Pubkey,
        commitment: CommitmentConfig,
    ) -> Result<Option<Vec<u8>>, RpcManagerError>;

    /// Poll `signature_status` until the signature settles or the deadline passes
    async fn await_confirmation(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
        policy: &ConfirmationPolicy,
    ) -> Result<ConfirmationStatus, RpcManagerError> {
        let started = Instant::now();
        loop {
            match self.signature_status(signature, commitment).await? {
                Some(Ok(())) => {
                    debug!(
                        signature = %signature,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Signature confirmed"
                    );
                    return Ok(ConfirmationStatus::Confirmed);
                }
                Some(Err(err)) => {
                    warn!(signature = %signature, error = %err, "Transaction failed on ledger");
                    return Ok(ConfirmationStatus::Failed(err));
                }
                None => {}
            }

            if started.elapsed() >= policy.timeout {
                return Ok(ConfirmationStatus::TimedOut);
            }
            tokio::time::sleep(policy.poll_interval).await;
        }
    }
}
