//! Transaction sequencing: assemble, sign, submit, confirm
//!
//! A [`TransactionSequencer`] carries exactly one transaction through
//! `Unbuilt -> Assembled -> Submitted -> Confirmed | Failed`. Instructions run
//! in append order. Once submission starts the instruction list is frozen, and
//! a sequencer that reached `Confirmed` or `Failed` cannot be reused.

use crate::rpc_manager::{ConfirmationPolicy, ConfirmationStatus, LedgerClient};
use crate::tx_builder::errors::EchoClientError;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    instruction::Instruction,
    signature::{Signature, Signer},
    transaction::Transaction,
};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Lifecycle of one transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerState {
    Unbuilt,
    Assembled,
    Submitted(Signature),
    Confirmed(Signature),
    Failed,
}

/// Result of a confirmed submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirmation {
    pub signature: Signature,
    /// Time from submission to the requested commitment level
    pub latency: Duration,
}

/// Builds and drives a single transaction
pub struct TransactionSequencer<'a> {
    fee_payer: &'a dyn Signer,
    signers: Vec<&'a dyn Signer>,
    instructions: Vec<Instruction>,
    state: SequencerState,
}

impl std::fmt::Debug for TransactionSequencer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionSequencer")
            .field("fee_payer", &self.fee_payer.pubkey())
            .field(
                "signers",
                &self.signers.iter().map(|s| s.pubkey()).collect::<Vec<_>>(),
            )
            .field("instructions", &self.instructions.len())
            .field("state", &self.state)
            .finish()
    }
}

impl<'a> TransactionSequencer<'a> {
    /// Start an empty transaction paid for (and signed) by `fee_payer`
    pub fn new(fee_payer: &'a dyn Signer) -> Self {
        Self {
            fee_payer,
            signers: vec![fee_payer],
            instructions: Vec::new(),
            state: SequencerState::Unbuilt,
        }
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Append an instruction; it executes after every instruction already added
    pub fn append(&mut self, ix: Instruction) -> Result<&mut Self, EchoClientError> {
        match self.state {
            SequencerState::Unbuilt | SequencerState::Assembled => {
                self.instructions.push(ix);
                self.state = SequencerState::Assembled;
                Ok(self)
            }
            other => Err(EchoClientError::invalid_state(format!(
                "cannot append instructions in state {:?}",
                other
            ))),
        }
    }

    /// Append several instructions in order
    pub fn append_all(
        &mut self,
        instructions: impl IntoIterator<Item = Instruction>,
    ) -> Result<&mut Self, EchoClientError> {
        for ix in instructions {
            self.append(ix)?;
        }
        Ok(self)
    }

    /// Provide an additional signing credential
    pub fn add_signer(&mut self, signer: &'a dyn Signer) -> &mut Self {
        if !self.signers.iter().any(|s| s.pubkey() == signer.pubkey()) {
            self.signers.push(signer);
        }
        self
    }

    /// Compile the message and sign it with every provided credential
    ///
    /// Fails with `Signing` if the message requires a signature no provided
    /// signer can produce.
    pub fn sign(&self, recent_blockhash: solana_sdk::hash::Hash) -> Result<Transaction, EchoClientError> {
        if self.state != SequencerState::Assembled {
            return Err(EchoClientError::invalid_state(format!(
                "cannot sign in state {:?}",
                self.state
            )));
        }

        let mut tx = Transaction::new_with_payer(&self.instructions, Some(&self.fee_payer.pubkey()));

        let required = tx.message.header.num_required_signatures as usize;
        let missing: Vec<String> = tx.message.account_keys[..required]
            .iter()
            .filter(|key| !self.signers.iter().any(|s| s.pubkey() == **key))
            .map(|key| key.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(EchoClientError::Signing(format!(
                "no credential for required signer(s): {}",
                missing.join(", ")
            )));
        }

        // Only signers the message actually requires; try_sign rejects extras
        let signers: Vec<&dyn Signer> = self
            .signers
            .iter()
            .copied()
            .filter(|s| tx.message.account_keys[..required].contains(&s.pubkey()))
            .collect();
        tx.try_sign(&signers, recent_blockhash)
            .map_err(|e| EchoClientError::Signing(e.to_string()))?;
        Ok(tx)
    }

    /// Sign, submit and wait for `commitment`
    ///
    /// Calling it outside `Assembled` is an `InvalidState` error and leaves the
    /// state as is; any other failure leaves the sequencer in `Failed`.
    pub async fn submit_and_confirm<C: LedgerClient + ?Sized>(
        &mut self,
        client: &C,
        commitment: CommitmentConfig,
        policy: &ConfirmationPolicy,
    ) -> Result<Confirmation, EchoClientError> {
        if self.state != SequencerState::Assembled {
            return Err(EchoClientError::invalid_state(format!(
                "cannot submit in state {:?}",
                self.state
            )));
        }

        let result = self.drive(client, commitment, policy).await;
        if result.is_err() {
            self.state = SequencerState::Failed;
        }
        result
    }

    async fn drive<C: LedgerClient + ?Sized>(
        &mut self,
        client: &C,
        commitment: CommitmentConfig,
        policy: &ConfirmationPolicy,
    ) -> Result<Confirmation, EchoClientError> {
        let blockhash = client.latest_blockhash().await?;
        let tx = self.sign(blockhash)?;

        let signature = client.submit(&tx).await?;
        self.state = SequencerState::Submitted(signature);
        debug!(
            signature = %signature,
            instructions = self.instructions.len(),
            "Transaction submitted"
        );

        let submitted_at = tokio::time::Instant::now();
        match client
            .await_confirmation(&signature, commitment, policy)
            .await?
        {
            ConfirmationStatus::Confirmed => {
                self.state = SequencerState::Confirmed(signature);
                let latency = submitted_at.elapsed();
                info!(
                    signature = %signature,
                    commitment = ?commitment.commitment,
                    latency_ms = latency.as_millis() as u64,
                    "Transaction confirmed"
                );
                Ok(Confirmation { signature, latency })
            }
            ConfirmationStatus::Failed(err) => Err(EchoClientError::rejected(format!(
                "transaction {} failed: {}",
                signature, err
            ))),
            ConfirmationStatus::TimedOut => {
                warn!(signature = %signature, "Confirmation deadline passed");
                Err(EchoClientError::ConfirmationTimeout {
                    signature,
                    timeout_ms: policy.timeout.as_millis() as u64,
                })
            }
        }
    }
}
