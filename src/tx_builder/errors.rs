//! Error types for the echo client
//!
//! One taxonomy covers the whole protocol lifecycle:
//! - Local encoding, derivation and instruction-shape failures (raised before
//!   any network call)
//! - Signing, submission and confirmation failures (abort the remaining steps)
//! - Verification mismatches (collected and reported when the run ends)

use crate::rpc_manager::RpcManagerError;
use crate::types::ProtocolStep;
use solana_sdk::{pubkey::Pubkey, signature::Signature};
use thiserror::Error;

/// Comprehensive error type for all echo client operations
#[derive(Error, Debug)]
pub enum EchoClientError {
    /// A field value does not fit the width the wire format gives it
    #[error("Encoding error (field={field}): {reason}")]
    Encoding {
        /// Name of the offending field
        field: &'static str,
        /// Detailed reason for the failure
        reason: String,
    },

    /// No bump in 255..=0 produced an off-curve address
    ///
    /// Fatal: the seed/program combination is unusable.
    #[error("Program address derivation exhausted (program={program})")]
    DerivationExhausted {
        /// The program the derivation ran against
        program: Pubkey,
    },

    /// Account list does not match the variant's fixed shape
    #[error("Malformed {variant} instruction: {reason}")]
    MalformedInstruction {
        /// Variant name
        variant: &'static str,
        /// Which slot or flag was wrong
        reason: String,
    },

    /// A signer required by the compiled message has no credential
    #[error("Signing failed: {0}")]
    Signing(String),

    /// The transaction executed on the ledger with an error
    #[error("Submission rejected: {0}")]
    SubmissionRejected(String),

    /// The requested confirmation level was not reached in time
    #[error("Confirmation timed out after {timeout_ms}ms (signature={signature})")]
    ConfirmationTimeout {
        /// Signature that never reached the requested level
        signature: Signature,
        /// Deadline that passed
        timeout_ms: u64,
    },

    /// Fetched account bytes differ from the expected text
    ///
    /// Non-fatal: the run continues and the mismatch is reported at the end.
    #[error("Verification mismatch at {address}: expected {expected:?}, found {found:?}")]
    VerificationMismatch {
        /// Account that was fetched
        address: Pubkey,
        /// Expected decoded text
        expected: String,
        /// Decoded text actually stored
        found: String,
    },

    /// The sequencer was driven out of order
    #[error("Invalid sequencer state: {0}")]
    InvalidState(String),

    /// Configuration or validation error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// RPC layer error
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcManagerError),

    /// A fatal error tagged with the protocol step that raised it
    #[error("Step {step} failed: {source}")]
    StepFailed {
        /// The failing step
        step: ProtocolStep,
        /// Underlying error
        #[source]
        source: Box<EchoClientError>,
    },
}

impl EchoClientError {
    /// Whether this error aborts the remaining protocol steps
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::VerificationMismatch { .. } => false,
            Self::StepFailed { source, .. } => source.is_fatal(),
            _ => true,
        }
    }

    /// Whether this error was raised locally, before anything reached the network
    pub fn is_local(&self) -> bool {
        match self {
            Self::Encoding { .. }
            | Self::DerivationExhausted { .. }
            | Self::MalformedInstruction { .. }
            | Self::Signing(_)
            | Self::InvalidState(_)
            | Self::Configuration(_) => true,
            Self::StepFailed { source, .. } => source.is_local(),
            _ => false,
        }
    }

    /// Whether rerunning the failed step could succeed without any change
    ///
    /// The protocol never retries by itself.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Rpc(e) => e.is_retryable(),
            Self::ConfirmationTimeout { .. } => true,
            Self::StepFailed { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// Get the error category for metrics and logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Encoding { .. } => "encoding",
            Self::DerivationExhausted { .. } => "derivation",
            Self::MalformedInstruction { .. } => "instruction",
            Self::Signing(_) => "signing",
            Self::SubmissionRejected(_) => "submission",
            Self::ConfirmationTimeout { .. } => "confirmation",
            Self::VerificationMismatch { .. } => "verification",
            Self::InvalidState(_) => "state",
            Self::Configuration(_) => "config",
            Self::Rpc(_) => "rpc",
            Self::StepFailed { source, .. } => source.category(),
        }
    }

    /// The protocol step this error was tagged with, if any
    pub fn step(&self) -> Option<ProtocolStep> {
        match self {
            Self::StepFailed { step, .. } => Some(*step),
            _ => None,
        }
    }

    /// Tag this error with the step that raised it
    ///
    /// Already-tagged errors keep the step they were first tagged with.
    pub fn at_step(self, step: ProtocolStep) -> Self {
        match self {
            tagged @ Self::StepFailed { .. } => tagged,
            other => Self::StepFailed {
                step,
                source: Box::new(other),
            },
        }
    }
}

// Convenience constructors for common error scenarios
impl EchoClientError {
    /// Create an encoding error for a named field
    pub fn encoding(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Encoding {
            field,
            reason: reason.into(),
        }
    }

    /// Create a malformed-instruction error for a variant
    pub fn malformed(variant: &'static str, reason: impl Into<String>) -> Self {
        Self::MalformedInstruction {
            variant,
            reason: reason.into(),
        }
    }

    /// Create a submission rejection
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::SubmissionRejected(reason.into())
    }

    /// Create an invalid state error
    pub fn invalid_state(reason: impl Into<String>) -> Self {
        Self::InvalidState(reason.into())
    }
}
