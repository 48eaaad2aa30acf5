//! JSON-RPC implementation of [`LedgerClient`]

use super::{LedgerClient, RpcManagerError};
use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_rpc_client_api::config::RpcSendTransactionConfig;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    hash::Hash,
    pubkey::Pubkey,
    signature::Signature,
    transaction::{Transaction, TransactionError},
};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Ledger client backed by a single RPC endpoint
pub struct RpcLedgerClient {
    client: Arc<RpcClient>,
    url: String,
    commitment: CommitmentConfig,
    skip_preflight: bool,
}

impl std::fmt::Debug for RpcLedgerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcLedgerClient")
            .field("url", &self.url)
            .field("commitment", &self.commitment.commitment)
            .field("skip_preflight", &self.skip_preflight)
            .finish_non_exhaustive()
    }
}

impl RpcLedgerClient {
    pub fn new(url: impl Into<String>, commitment: CommitmentConfig, skip_preflight: bool) -> Self {
        let url = url.into();
        Self {
            client: Arc::new(RpcClient::new_with_commitment(url.clone(), commitment)),
            url,
            commitment,
            skip_preflight,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn map_err(&self, err: solana_client::client_error::ClientError) -> RpcManagerError {
        RpcManagerError::from_client_error(err, &self.url)
    }
}

#[async_trait]
impl LedgerClient for RpcLedgerClient {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn request_airdrop(
        &self,
        to: &Pubkey,
        lamports: u64,
    ) -> Result<Signature, RpcManagerError> {
        self.client
            .request_airdrop(to, lamports)
            .await
            .map_err(|e| self.map_err(e))
    }

    async fn minimum_balance_for_rent_exemption(
        &self,
        data_len: usize,
    ) -> Result<u64, RpcManagerError> {
        self.client
            .get_minimum_balance_for_rent_exemption(data_len)
            .await
            .map_err(|e| self.map_err(e))
    }

    async fn latest_blockhash(&self) -> Result<Hash, RpcManagerError> {
        self.client
            .get_latest_blockhash()
            .await
            .map_err(|e| self.map_err(e))
    }

    #[instrument(skip(self, tx), fields(url = %self.url))]
    async fn submit(&self, tx: &Transaction) -> Result<Signature, RpcManagerError> {
        let config = RpcSendTransactionConfig {
            skip_preflight: self.skip_preflight,
            preflight_commitment: Some(self.commitment.commitment),
            ..RpcSendTransactionConfig::default()
        };
        let signature = self
            .client
            .send_transaction_with_config(tx, config)
            .await
            .map_err(|e| self.map_err(e))?;
        debug!(signature = %signature, "Transaction sent");
        Ok(signature)
    }

    async fn signature_status(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> Result<Option<Result<(), TransactionError>>, RpcManagerError> {
        self.client
            .get_signature_status_with_commitment(signature, commitment)
            .await
            .map_err(|e| self.map_err(e))
    }

    #[instrument(skip(self), fields(url = %self.url))]
    async fn fetch_account_data(
        &self,
        address: &Pubkey,
        commitment: CommitmentConfig,
    ) -> Result<Option<Vec<u8>>, RpcManagerError> {
        let account = self
            .client
            .get_account_with_commitment(address, commitment)
            .await
            .map_err(|e| self.map_err(e))?
            .value;
        Ok(account.map(|account| account.data))
    }
}
