//! Post-confirmation state verification
//!
//! Fetches account bytes at the configured commitment and compares the stored
//! message against what the step wrote. A mismatch is reported, not raised:
//! the run continues and collects it.

use crate::rpc_manager::LedgerClient;
use crate::tx_builder::codec::{decode_text, AUTHORIZED_HEADER_LEN};
use crate::tx_builder::derive::DerivedAddress;
use crate::tx_builder::errors::EchoClientError;
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey};
use tracing::{debug, warn};

/// How the program lays out an echo buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferLayout {
    /// The whole account is the message
    Unauthenticated,
    /// `[bump][seed u64 LE][message][zero padding]`
    Authorized,
}

impl BufferLayout {
    /// The message region of raw account bytes
    ///
    /// For authorized buffers the zero padding is stripped, so a stored
    /// message ending in NUL bytes shows without them. Use
    /// [`BufferLayout::matches`] to compare.
    pub fn message_bytes(self, data: &[u8]) -> &[u8] {
        match self {
            BufferLayout::Unauthenticated => data,
            BufferLayout::Authorized => {
                let body = data.get(AUTHORIZED_HEADER_LEN..).unwrap_or(&[]);
                let end = body.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
                &body[..end]
            }
        }
    }

    /// Whether `data` holds exactly `expected`
    ///
    /// An authorized buffer matches when its message region starts with
    /// `expected` and everything after it is padding.
    pub fn matches(self, data: &[u8], expected: &[u8]) -> bool {
        match self {
            BufferLayout::Unauthenticated => data == expected,
            BufferLayout::Authorized => {
                let body = data.get(AUTHORIZED_HEADER_LEN..).unwrap_or(&[]);
                body.len() >= expected.len()
                    && &body[..expected.len()] == expected
                    && body[expected.len()..].iter().all(|&b| b == 0)
            }
        }
    }

    /// Decode the stored message as text
    pub fn decode(self, data: &[u8]) -> String {
        decode_text(self.message_bytes(data))
    }
}

/// Outcome of one verification
#[derive(Debug)]
pub enum Verification {
    Matched,
    /// Carries an `EchoClientError::VerificationMismatch`
    Mismatch(EchoClientError),
}

impl Verification {
    pub fn is_match(&self) -> bool {
        matches!(self, Verification::Matched)
    }

    fn mismatch(address: &Pubkey, expected: &str, found: String) -> Self {
        warn!(address = %address, expected = %expected, found = %found, "Verification mismatch");
        Verification::Mismatch(EchoClientError::VerificationMismatch {
            address: *address,
            expected: expected.to_string(),
            found,
        })
    }
}

/// Reads confirmed account state back from the ledger
pub struct StateVerifier<'a, C: LedgerClient + ?Sized> {
    client: &'a C,
    commitment: CommitmentConfig,
}

impl<'a, C: LedgerClient + ?Sized> StateVerifier<'a, C> {
    pub fn new(client: &'a C, commitment: CommitmentConfig) -> Self {
        Self { client, commitment }
    }

    /// Compare the message stored at `address` with `expected`
    ///
    /// Network failures are errors; a missing account or differing bytes are
    /// a [`Verification::Mismatch`].
    pub async fn verify(
        &self,
        address: &Pubkey,
        expected: &str,
        layout: BufferLayout,
    ) -> Result<Verification, EchoClientError> {
        let Some(data) = self
            .client
            .fetch_account_data(address, self.commitment)
            .await?
        else {
            return Ok(Verification::mismatch(address, expected, "<account missing>".to_string()));
        };

        let stored = layout.message_bytes(&data);
        debug!(
            address = %address,
            layout = ?layout,
            stored = %hex::encode(stored),
            "Fetched echo buffer"
        );

        if layout.matches(&data, expected.as_bytes()) {
            Ok(Verification::Matched)
        } else {
            Ok(Verification::mismatch(address, expected, decode_text(stored)))
        }
    }

    /// Check the header the program writes when initializing an authorized buffer
    pub async fn verify_authorized_header(
        &self,
        derived: &DerivedAddress,
        buffer_seed: u64,
        buffer_len: u64,
    ) -> Result<Verification, EchoClientError> {
        let expected = format!(
            "{} byte buffer with header bump={} seed={}",
            buffer_len, derived.bump, buffer_seed
        );
        let Some(data) = self
            .client
            .fetch_account_data(&derived.address, self.commitment)
            .await?
        else {
            return Ok(Verification::mismatch(
                &derived.address,
                &expected,
                "<account missing>".to_string(),
            ));
        };

        let header_ok = data.len() as u64 == buffer_len
            && data.len() >= AUTHORIZED_HEADER_LEN
            && data[0] == derived.bump
            && data[1..AUTHORIZED_HEADER_LEN] == buffer_seed.to_le_bytes();
        if header_ok {
            Ok(Verification::Matched)
        } else {
            let found = format!(
                "{} byte buffer with header {}",
                data.len(),
                hex::encode(&data[..data.len().min(AUTHORIZED_HEADER_LEN)])
            );
            Ok(Verification::mismatch(&derived.address, &expected, found))
        }
    }
}
