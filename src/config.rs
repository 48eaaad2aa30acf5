//! Configuration module for the echo client
//!
//! Operational settings come from the environment only. `.env` is loaded
//! first, then `ECHO_`-prefixed variables override the defaults, with `__`
//! separating sections (`ECHO_RPC__URL`, `ECHO_PROTOCOL__BUFFER_SEED`, ...).

use crate::rpc_manager::ConfirmationPolicy;
use crate::tx_builder::codec::AUTHORIZED_HEADER_LEN;
use serde::{Deserialize, Serialize};
use solana_sdk::commitment_config::CommitmentConfig;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub rpc: RpcConfig,

    #[serde(default)]
    pub wallet: WalletConfig,

    #[serde(default)]
    pub protocol: ProtocolConfig,
}

/// Confirmation level the client waits for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmationLevel {
    Processed,
    #[default]
    Confirmed,
    Finalized,
}

impl ConfirmationLevel {
    pub fn commitment(self) -> CommitmentConfig {
        match self {
            ConfirmationLevel::Processed => CommitmentConfig::processed(),
            ConfirmationLevel::Confirmed => CommitmentConfig::confirmed(),
            ConfirmationLevel::Finalized => CommitmentConfig::finalized(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// JSON-RPC endpoint
    #[serde(default = "default_rpc_url")]
    pub url: String,

    #[serde(default)]
    pub commitment: ConfirmationLevel,

    /// Confirmation deadline per transaction
    #[serde(default = "default_confirm_timeout")]
    pub confirm_timeout_secs: u64,

    /// Signature status polling interval
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_true")]
    pub skip_preflight: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Fee-payer keypair file; a fresh keypair is generated when unset
    #[serde(default)]
    pub keypair_path: Option<String>,

    /// Test funds requested for the fee payer (0 skips the airdrop)
    #[serde(default = "default_airdrop_lamports")]
    pub airdrop_lamports: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Seed integer for the authorized buffer address
    #[serde(default = "default_buffer_seed")]
    pub buffer_seed: u64,

    /// Requested authorized buffer length in bytes
    #[serde(default = "default_buffer_len")]
    pub buffer_len: u64,

    /// Explorer cluster name used in transaction links
    #[serde(default = "default_cluster")]
    pub cluster: String,
}

// Default value functions
fn default_rpc_url() -> String { "https://api.devnet.solana.com".to_string() }
fn default_confirm_timeout() -> u64 { 60 }
fn default_poll_interval() -> u64 { 500 }
fn default_true() -> bool { true }
fn default_airdrop_lamports() -> u64 { 2_000_000_000 }
fn default_buffer_seed() -> u64 { 40 }
fn default_buffer_len() -> u64 { 100 }
fn default_cluster() -> String { "devnet".to_string() }

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: default_rpc_url(),
            commitment: ConfirmationLevel::default(),
            confirm_timeout_secs: default_confirm_timeout(),
            poll_interval_ms: default_poll_interval(),
            skip_preflight: default_true(),
        }
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            keypair_path: None,
            airdrop_lamports: default_airdrop_lamports(),
        }
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            buffer_seed: default_buffer_seed(),
            buffer_len: default_buffer_len(),
            cluster: default_cluster(),
        }
    }
}

impl RpcConfig {
    pub fn confirmation_policy(&self) -> ConfirmationPolicy {
        ConfirmationPolicy {
            timeout: Duration::from_secs(self.confirm_timeout_secs),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}

impl ProtocolConfig {
    /// Bytes available for the message in the authorized buffer
    pub fn message_capacity(&self) -> u64 {
        self.buffer_len.saturating_sub(AUTHORIZED_HEADER_LEN as u64)
    }
}

impl Config {
    /// Load configuration from `.env` and `ECHO_*` environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_source(config::Environment::with_prefix("ECHO"))
    }

    /// Load configuration from an explicit environment source
    pub fn from_source(env: config::Environment) -> anyhow::Result<Self> {
        let config: Config = config::Config::builder()
            .add_source(
                env.prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the protocol cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.rpc.url.trim().is_empty() {
            anyhow::bail!("rpc.url must not be empty");
        }
        if self.rpc.confirm_timeout_secs == 0 {
            anyhow::bail!("rpc.confirm_timeout_secs must be greater than 0");
        }
        if self.rpc.poll_interval_ms == 0 {
            anyhow::bail!("rpc.poll_interval_ms must be greater than 0");
        }
        if self.rpc.poll_interval_ms >= self.rpc.confirm_timeout_secs.saturating_mul(1000) {
            anyhow::bail!(
                "rpc.poll_interval_ms ({}) must be shorter than the confirmation timeout ({}s)",
                self.rpc.poll_interval_ms,
                self.rpc.confirm_timeout_secs
            );
        }
        if self.protocol.message_capacity() == 0 {
            anyhow::bail!(
                "protocol.buffer_len ({}) must exceed the {}-byte authorized buffer header",
                self.protocol.buffer_len,
                AUTHORIZED_HEADER_LEN
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_source(vars: &[(&str, &str)]) -> config::Environment {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        config::Environment::with_prefix("ECHO").source(Some(map))
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.rpc.url, "https://api.devnet.solana.com");
        assert_eq!(config.rpc.commitment, ConfirmationLevel::Confirmed);
        assert_eq!(config.protocol.buffer_seed, 40);
        assert_eq!(config.protocol.buffer_len, 100);
        assert_eq!(config.wallet.airdrop_lamports, 2_000_000_000);
        assert!(config.wallet.keypair_path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_environment_uses_defaults() {
        let config = Config::from_source(env_source(&[])).unwrap();
        assert_eq!(config.protocol.cluster, "devnet");
        assert!(config.rpc.skip_preflight);
    }

    #[test]
    fn test_environment_overrides() {
        let config = Config::from_source(env_source(&[
            ("ECHO_RPC__URL", "http://127.0.0.1:8899"),
            ("ECHO_RPC__COMMITMENT", "finalized"),
            ("ECHO_RPC__CONFIRM_TIMEOUT_SECS", "5"),
            ("ECHO_PROTOCOL__BUFFER_SEED", "7"),
            ("ECHO_WALLET__AIRDROP_LAMPORTS", "0"),
        ]))
        .unwrap();

        assert_eq!(config.rpc.url, "http://127.0.0.1:8899");
        assert_eq!(config.rpc.commitment, ConfirmationLevel::Finalized);
        assert_eq!(config.rpc.confirm_timeout_secs, 5);
        assert_eq!(config.protocol.buffer_seed, 7);
        assert_eq!(config.wallet.airdrop_lamports, 0);
        assert_eq!(config.protocol.buffer_len, 100);
    }

    #[test]
    fn test_buffer_too_small_for_header() {
        let mut config = Config::default();
        config.protocol.buffer_len = AUTHORIZED_HEADER_LEN as u64;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("header"));

        config.protocol.buffer_len = AUTHORIZED_HEADER_LEN as u64 + 1;
        assert!(config.validate().is_ok());
        assert_eq!(config.protocol.message_capacity(), 1);
    }

    #[test]
    fn test_invalid_timeouts() {
        let mut config = Config::default();
        config.rpc.confirm_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.rpc.poll_interval_ms = 60_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_commitment_mapping() {
        assert_eq!(
            ConfirmationLevel::Confirmed.commitment(),
            CommitmentConfig::confirmed()
        );
        assert_eq!(
            ConfirmationLevel::Processed.commitment(),
            CommitmentConfig::processed()
        );
    }

    #[test]
    fn test_confirmation_policy() {
        let policy = RpcConfig::default().confirmation_policy();
        assert_eq!(policy.timeout, Duration::from_secs(60));
        assert_eq!(policy.poll_interval, Duration::from_millis(500));
    }
}
