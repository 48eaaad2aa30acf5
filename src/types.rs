//! Shared types for the echo protocol run

use serde::{Deserialize, Serialize};
use solana_sdk::{pubkey::Pubkey, signature::Signature};
use std::fmt;

/// The four protocol steps, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProtocolStep {
    /// Create a fresh buffer account and Echo into it
    UnauthenticatedEcho = 1,
    /// Derive and initialize the authorized buffer
    InitializeAuthorizedBuffer = 2,
    /// First authorized write
    AuthorizedEcho = 3,
    /// Second authorized write over the same buffer
    AuthorizedOverwrite = 4,
}

impl ProtocolStep {
    /// All steps in order
    pub const ALL: [ProtocolStep; 4] = [
        ProtocolStep::UnauthenticatedEcho,
        ProtocolStep::InitializeAuthorizedBuffer,
        ProtocolStep::AuthorizedEcho,
        ProtocolStep::AuthorizedOverwrite,
    ];

    /// 1-based step number
    pub fn number(self) -> u8 {
        self as u8
    }

    /// Short label for logs and metrics
    pub fn label(self) -> &'static str {
        match self {
            ProtocolStep::UnauthenticatedEcho => "unauthenticated echo",
            ProtocolStep::InitializeAuthorizedBuffer => "initialize authorized buffer",
            ProtocolStep::AuthorizedEcho => "authorized echo",
            ProtocolStep::AuthorizedOverwrite => "authorized overwrite",
        }
    }
}

impl fmt::Display for ProtocolStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.number(), self.label())
    }
}

/// Outcome of one confirmed protocol step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub step: ProtocolStep,
    pub signature: Signature,
    /// Account the step wrote to
    pub address: Pubkey,
    pub explorer_url: String,
}

/// Outcome of a full protocol run
///
/// A run that returns a `RunReport` confirmed all four steps; verification
/// mismatches are collected here rather than aborting the run.
#[derive(Debug, Default)]
pub struct RunReport {
    pub steps: Vec<StepReport>,
    pub mismatches: Vec<crate::tx_builder::EchoClientError>,
}

impl RunReport {
    /// True when every step confirmed and every verification matched
    pub fn is_success(&self) -> bool {
        self.mismatches.is_empty() && self.steps.len() == ProtocolStep::ALL.len()
    }
}

/// Build a block explorer link for a transaction
pub fn explorer_tx_url(signature: &Signature, cluster: &str) -> String {
    format!("https://explorer.solana.com/tx/{}?cluster={}", signature, cluster)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_order_and_display() {
        let numbers: Vec<u8> = ProtocolStep::ALL.iter().map(|s| s.number()).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
        assert!(ProtocolStep::AuthorizedEcho < ProtocolStep::AuthorizedOverwrite);
        assert_eq!(
            ProtocolStep::AuthorizedOverwrite.to_string(),
            "4 (authorized overwrite)"
        );
    }

    #[test]
    fn test_explorer_url() {
        let sig = Signature::from([7u8; 64]);
        let url = explorer_tx_url(&sig, "devnet");
        assert!(url.starts_with("https://explorer.solana.com/tx/"));
        assert!(url.ends_with("?cluster=devnet"));
        assert!(url.contains(&sig.to_string()));
    }

    #[test]
    fn test_empty_report_is_not_success() {
        assert!(!RunReport::default().is_success());
    }
}
