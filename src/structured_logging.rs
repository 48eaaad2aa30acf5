//! Structured logging for protocol step events

use crate::observability::CorrelationId;
use crate::tx_builder::EchoClientError;
use crate::types::ProtocolStep;
use solana_sdk::{pubkey::Pubkey, signature::Signature};

/// Structured logger bound to one protocol run
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    run_id: CorrelationId,
}

impl StructuredLogger {
    pub fn new(run_id: CorrelationId) -> Self {
        Self { run_id }
    }

    pub fn run_id(&self) -> &CorrelationId {
        &self.run_id
    }

    pub fn log_funding(&self, fee_payer: &Pubkey, lamports: u64) {
        tracing::info!(
            run_id = %self.run_id,
            fee_payer = %fee_payer,
            lamports = %lamports,
            "Requesting airdrop"
        );
    }

    pub fn log_step_started(&self, step: ProtocolStep, target: &Pubkey) {
        tracing::info!(
            run_id = %self.run_id,
            step = step.number(),
            label = step.label(),
            target = %target,
            "Step started"
        );
    }

    pub fn log_step_confirmed(
        &self,
        step: ProtocolStep,
        signature: &Signature,
        explorer_url: &str,
        latency_ms: u64,
    ) {
        tracing::info!(
            run_id = %self.run_id,
            step = step.number(),
            signature = %signature,
            latency_ms = %latency_ms,
            explorer = %explorer_url,
            "Step confirmed"
        );
    }

    pub fn log_step_failed(&self, step: ProtocolStep, error: &EchoClientError) {
        tracing::error!(
            run_id = %self.run_id,
            step = step.number(),
            category = error.category(),
            error = %error,
            "Step failed"
        );
    }

    pub fn log_verification(&self, step: ProtocolStep, address: &Pubkey, matched: bool) {
        if matched {
            tracing::info!(
                run_id = %self.run_id,
                step = step.number(),
                address = %address,
                "Buffer contents verified"
            );
        } else {
            tracing::warn!(
                run_id = %self.run_id,
                step = step.number(),
                address = %address,
                "Buffer contents do not match"
            );
        }
    }
}
