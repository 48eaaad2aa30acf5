//! Echo - client for the on-ledger echo program
//!
//! Encodes the program's instructions, derives its authorized buffer address,
//! sequences the four protocol transactions and verifies what each one wrote.

pub mod config;
pub mod metrics;
pub mod observability;
pub mod protocol;
pub mod structured_logging;
pub mod types;
pub mod verifier;
pub mod wallet;

// Component modules with non-standard paths (directories with spaces)
#[path = "rpc manager/mod.rs"]
pub mod rpc_manager;

pub mod tx_builder;

// Re-export commonly used types
pub use config::Config;
pub use protocol::{EchoProtocol, ProtocolSettings};
pub use rpc_manager::{LedgerClient, RpcLedgerClient};
pub use solana_sdk::{pubkey::Pubkey, signature::Signature};
pub use tx_builder::EchoClientError;
pub use types::{ProtocolStep, RunReport, StepReport};
pub use wallet::WalletManager;
