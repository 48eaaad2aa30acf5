//! The four-step echo protocol
//!
//! Steps run strictly in order and each one consumes the confirmed result of
//! the previous one:
//!
//! 1. create a fresh buffer sized to the message and `Echo` into it
//! 2. derive and initialize the authorized buffer
//! 3. first authorized write
//! 4. authorized overwrite of the same buffer
//!
//! Any fatal error aborts the remaining steps and comes back tagged with the
//! step that raised it. Verification mismatches are collected in the
//! [`RunReport`] instead.

use crate::config::Config;
use crate::metrics::Metrics;
use crate::observability::CorrelationId;
use crate::rpc_manager::{ConfirmationPolicy, ConfirmationStatus, LedgerClient};
use crate::structured_logging::StructuredLogger;
use crate::tx_builder::{
    codec::check_message_len,
    derive::authorized_buffer_address,
    instructions, DerivedAddress, EchoClientError, TransactionSequencer, WriteMode,
    AUTHORIZED_HEADER_LEN,
};
use crate::types::{explorer_tx_url, ProtocolStep, RunReport, StepReport};
use crate::verifier::{BufferLayout, StateVerifier, Verification};
use solana_sdk::{
    commitment_config::CommitmentConfig,
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use tracing::{debug, info};

/// Knobs the protocol reads from configuration
#[derive(Debug, Clone)]
pub struct ProtocolSettings {
    pub buffer_seed: u64,
    pub buffer_len: u64,
    /// 0 skips funding
    pub airdrop_lamports: u64,
    pub cluster: String,
    pub commitment: CommitmentConfig,
    pub policy: ConfirmationPolicy,
}

impl From<&Config> for ProtocolSettings {
    fn from(config: &Config) -> Self {
        Self {
            buffer_seed: config.protocol.buffer_seed,
            buffer_len: config.protocol.buffer_len,
            airdrop_lamports: config.wallet.airdrop_lamports,
            cluster: config.protocol.cluster.clone(),
            commitment: config.rpc.commitment.commitment(),
            policy: config.rpc.confirmation_policy(),
        }
    }
}

impl ProtocolSettings {
    /// Reject settings no run could complete with
    pub fn validate(&self) -> Result<(), EchoClientError> {
        if self.buffer_len <= AUTHORIZED_HEADER_LEN as u64 {
            return Err(EchoClientError::Configuration(format!(
                "buffer_len {} leaves no room after the {} byte header",
                self.buffer_len, AUTHORIZED_HEADER_LEN
            )));
        }
        if self.policy.timeout.is_zero() || self.policy.poll_interval.is_zero() {
            return Err(EchoClientError::Configuration(
                "confirmation timeout and poll interval must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ProtocolSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// Step 1 result
#[derive(Debug)]
pub struct UnauthenticatedEcho {
    pub report: StepReport,
    pub verification: Verification,
}

/// Step 2 result; steps 3 and 4 write into `buffer`
#[derive(Debug)]
pub struct AuthorizedBuffer {
    pub buffer: DerivedAddress,
    pub report: StepReport,
    pub verification: Verification,
}

/// Step 3 and 4 result
#[derive(Debug)]
pub struct AuthorizedWrite {
    pub buffer: DerivedAddress,
    pub report: StepReport,
    pub verification: Verification,
}

/// Drives the echo protocol for one fee payer against one program
pub struct EchoProtocol<'a, C: LedgerClient + ?Sized> {
    client: &'a C,
    program_id: Pubkey,
    fee_payer: &'a Keypair,
    settings: ProtocolSettings,
    logger: StructuredLogger,
    metrics: Metrics,
}

impl<'a, C: LedgerClient + ?Sized> EchoProtocol<'a, C> {
    pub fn new(
        client: &'a C,
        program_id: Pubkey,
        fee_payer: &'a Keypair,
        settings: ProtocolSettings,
    ) -> anyhow::Result<Self> {
        settings.validate()?;
        Ok(Self {
            client,
            program_id,
            fee_payer,
            settings,
            logger: StructuredLogger::new(CorrelationId::new()),
            metrics: Metrics::new()?,
        })
    }

    pub fn run_id(&self) -> &CorrelationId {
        self.logger.run_id()
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn settings(&self) -> &ProtocolSettings {
        &self.settings
    }

    /// Fund the fee payer, then run all four steps with `message`
    pub async fn run(&self, message: &str) -> Result<RunReport, EchoClientError> {
        info!(
            run_id = %self.run_id(),
            program_id = %self.program_id,
            fee_payer = %self.fee_payer.pubkey(),
            message_len = message.len(),
            "Starting echo protocol"
        );

        // Refuse a message no step can store before anything is paid for
        check_message_len(message.len())
            .map_err(|err| self.fail(ProtocolStep::UnauthenticatedEcho, err))?;
        self.check_message_fits(message)
            .map_err(|err| self.fail(ProtocolStep::AuthorizedEcho, err))?;

        self.fund().await?;

        let mut run = RunReport::default();

        let step1 = self.unauthenticated_echo(message).await?;
        self.collect(&mut run, step1.report, step1.verification);

        let step2 = self.initialize_authorized_buffer().await?;
        let buffer = step2.buffer;
        self.collect(&mut run, step2.report, step2.verification);

        let step3 = self.authorized_echo(&buffer, message).await?;
        let buffer = step3.buffer;
        self.collect(&mut run, step3.report, step3.verification);

        let step4 = self.authorized_overwrite(&buffer, message).await?;
        self.collect(&mut run, step4.report, step4.verification);

        info!(
            run_id = %self.run_id(),
            steps = run.steps.len(),
            mismatches = run.mismatches.len(),
            "Echo protocol finished"
        );
        Ok(run)
    }

    /// Request test funds and wait until they land
    pub async fn fund(&self) -> Result<(), EchoClientError> {
        let lamports = self.settings.airdrop_lamports;
        if lamports == 0 {
            debug!("Airdrop disabled, using existing fee payer balance");
            return Ok(());
        }

        let fee_payer = self.fee_payer.pubkey();
        self.logger.log_funding(&fee_payer, lamports);
        let signature = self.client.request_airdrop(&fee_payer, lamports).await?;

        match self
            .client
            .await_confirmation(&signature, self.settings.commitment, &self.settings.policy)
            .await?
        {
            ConfirmationStatus::Confirmed => {
                info!(signature = %signature, lamports = %lamports, "Airdrop received");
                Ok(())
            }
            ConfirmationStatus::Failed(err) => Err(EchoClientError::rejected(format!(
                "airdrop {} failed: {}",
                signature, err
            ))),
            ConfirmationStatus::TimedOut => Err(EchoClientError::ConfirmationTimeout {
                signature,
                timeout_ms: self.settings.policy.timeout.as_millis() as u64,
            }),
        }
    }

    /// Step 1: create a buffer sized to `message` and echo into it
    pub async fn unauthenticated_echo(
        &self,
        message: &str,
    ) -> Result<UnauthenticatedEcho, EchoClientError> {
        let step = ProtocolStep::UnauthenticatedEcho;
        async {
            let echo_buffer = Keypair::new();
            let buffer = echo_buffer.pubkey();
            self.logger.log_step_started(step, &buffer);

            check_message_len(message.len())?;

            let lamports = self
                .client
                .minimum_balance_for_rent_exemption(message.len())
                .await?;
            let plan = instructions::plan_unauthenticated_echo(
                &self.program_id,
                &self.fee_payer.pubkey(),
                &buffer,
                lamports,
                message.as_bytes(),
            )?;

            let mut sequencer = TransactionSequencer::new(self.fee_payer);
            sequencer.append_all(plan.instructions)?.add_signer(&echo_buffer);
            let report = self.execute(step, sequencer, buffer).await?;

            let verification = self
                .verifier()
                .verify(&buffer, message, BufferLayout::Unauthenticated)
                .await?;
            Ok::<_, EchoClientError>(UnauthenticatedEcho {
                report,
                verification,
            })
        }
        .await
        .map_err(|err| self.fail(step, err))
    }

    /// Step 2: derive the authorized buffer and initialize it
    pub async fn initialize_authorized_buffer(&self) -> Result<AuthorizedBuffer, EchoClientError> {
        let step = ProtocolStep::InitializeAuthorizedBuffer;
        async {
            let authority = self.fee_payer.pubkey();
            let buffer =
                authorized_buffer_address(&self.program_id, &authority, self.settings.buffer_seed)?;
            self.logger.log_step_started(step, &buffer.address);
            debug!(
                address = %buffer.address,
                bump = buffer.bump,
                seed = self.settings.buffer_seed,
                "Derived authorized buffer"
            );

            let ix = instructions::initialize_authorized_echo(
                &self.program_id,
                &buffer.address,
                &authority,
                self.settings.buffer_seed,
                self.settings.buffer_len,
            )?;

            let mut sequencer = TransactionSequencer::new(self.fee_payer);
            sequencer.append(ix)?;
            let report = self.execute(step, sequencer, buffer.address).await?;

            let verification = self
                .verifier()
                .verify_authorized_header(&buffer, self.settings.buffer_seed, self.settings.buffer_len)
                .await?;
            Ok::<_, EchoClientError>(AuthorizedBuffer {
                buffer,
                report,
                verification,
            })
        }
        .await
        .map_err(|err| self.fail(step, err))
    }

    /// Step 3: first authorized write into the initialized buffer
    pub async fn authorized_echo(
        &self,
        buffer: &DerivedAddress,
        message: &str,
    ) -> Result<AuthorizedWrite, EchoClientError> {
        self.authorized_write(ProtocolStep::AuthorizedEcho, WriteMode::First, buffer, message)
            .await
    }

    /// Step 4: overwrite the authorized buffer written in step 3
    pub async fn authorized_overwrite(
        &self,
        buffer: &DerivedAddress,
        message: &str,
    ) -> Result<AuthorizedWrite, EchoClientError> {
        self.authorized_write(
            ProtocolStep::AuthorizedOverwrite,
            WriteMode::Overwrite,
            buffer,
            message,
        )
        .await
    }

    async fn authorized_write(
        &self,
        step: ProtocolStep,
        mode: WriteMode,
        buffer: &DerivedAddress,
        message: &str,
    ) -> Result<AuthorizedWrite, EchoClientError> {
        async {
            self.logger.log_step_started(step, &buffer.address);
            self.check_message_fits(message)?;

            let ix = instructions::authorized_echo(
                &self.program_id,
                &buffer.address,
                &self.fee_payer.pubkey(),
                message.as_bytes(),
                mode,
            )?;

            let mut sequencer = TransactionSequencer::new(self.fee_payer);
            sequencer.append(ix)?;
            let report = self.execute(step, sequencer, buffer.address).await?;

            let verification = self
                .verifier()
                .verify(&buffer.address, message, BufferLayout::Authorized)
                .await?;
            Ok::<_, EchoClientError>(AuthorizedWrite {
                buffer: *buffer,
                report,
                verification,
            })
        }
        .await
        .map_err(|err| self.fail(step, err))
    }

    /// The program truncates writes at the buffer end; refuse them instead
    fn check_message_fits(&self, message: &str) -> Result<(), EchoClientError> {
        let len = check_message_len(message.len())?;
        let capacity = self
            .settings
            .buffer_len
            .saturating_sub(AUTHORIZED_HEADER_LEN as u64);
        if u64::from(len) > capacity {
            return Err(EchoClientError::encoding(
                "message",
                format!(
                    "{} bytes do not fit the {} byte authorized buffer ({} bytes after the header)",
                    len, self.settings.buffer_len, capacity
                ),
            ));
        }
        Ok(())
    }

    async fn execute(
        &self,
        step: ProtocolStep,
        mut sequencer: TransactionSequencer<'_>,
        address: Pubkey,
    ) -> Result<StepReport, EchoClientError> {
        let confirmation = sequencer
            .submit_and_confirm(self.client, self.settings.commitment, &self.settings.policy)
            .await?;

        let explorer_url = explorer_tx_url(&confirmation.signature, &self.settings.cluster);
        self.metrics.record_confirmed(step, confirmation.latency);
        self.logger.log_step_confirmed(
            step,
            &confirmation.signature,
            &explorer_url,
            confirmation.latency.as_millis() as u64,
        );

        Ok(StepReport {
            step,
            signature: confirmation.signature,
            address,
            explorer_url,
        })
    }

    fn verifier(&self) -> StateVerifier<'_, C> {
        StateVerifier::new(self.client, self.settings.commitment)
    }

    fn collect(&self, run: &mut RunReport, report: StepReport, verification: Verification) {
        self.logger
            .log_verification(report.step, &report.address, verification.is_match());
        if let Verification::Mismatch(err) = verification {
            self.metrics.record_mismatch();
            run.mismatches.push(err.at_step(report.step));
        }
        run.steps.push(report);
    }

    fn fail(&self, step: ProtocolStep, err: EchoClientError) -> EchoClientError {
        let err = err.at_step(step);
        self.metrics.record_failed(step);
        self.logger.log_step_failed(step, &err);
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_settings_from_config() {
        let mut config = Config::default();
        config.protocol.buffer_seed = 7;
        config.wallet.airdrop_lamports = 0;
        config.rpc.poll_interval_ms = 50;

        let settings = ProtocolSettings::from(&config);
        assert_eq!(settings.buffer_seed, 7);
        assert_eq!(settings.buffer_len, 100);
        assert_eq!(settings.airdrop_lamports, 0);
        assert_eq!(settings.commitment, CommitmentConfig::confirmed());
        assert_eq!(settings.policy.poll_interval, Duration::from_millis(50));
        assert_eq!(settings.cluster, "devnet");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_settings_validation() {
        let settings = ProtocolSettings {
            buffer_len: AUTHORIZED_HEADER_LEN as u64,
            ..ProtocolSettings::default()
        };
        let err = settings.validate().unwrap_err();
        assert_eq!(err.category(), "config");

        let settings = ProtocolSettings {
            policy: ConfirmationPolicy {
                timeout: Duration::ZERO,
                poll_interval: Duration::from_millis(10),
            },
            ..ProtocolSettings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(EchoClientError::Configuration(_))
        ));
    }
}
