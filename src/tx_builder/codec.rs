//! Binary codec for echo program instruction data
//!
//! Wire format (all integers little-endian):
//!
//! | tag | variant | fields |
//! |-----|---------|--------|
//! | 0 | `Echo` | `u32` message length, message bytes |
//! | 1 | `InitializeAuthorizedEcho` | `u64` buffer seed, `u64` buffer size |
//! | 2 | `AuthorizedEcho` | `u32` message length, message bytes |
//! | 3 | `AuthorizedOverwrite` | same shape as tag 2 |
//!
//! The layout is the Borsh encoding of [`EchoInstruction`], which is what the
//! on-ledger program deserializes.

use crate::tx_builder::errors::EchoClientError;
use borsh::{BorshDeserialize, BorshSerialize};

/// Bytes the program keeps in front of the message in an authorized buffer:
/// `[bump: u8][buffer_seed: u64 LE]`
pub const AUTHORIZED_HEADER_LEN: usize = 9;

/// Instruction variants understood by the echo program
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub enum EchoInstruction {
    /// Copy `data` into an unauthenticated buffer sized exactly to it
    ///
    ///   0. `[w]` Echo buffer
    Echo { data: Vec<u8> },

    /// Create the derived buffer and write its header
    ///
    ///   0. `[w]` Authorized buffer (derived address)
    ///   1. `[s]` Authority, pays for the account
    ///   2. `[r]` System program
    InitializeAuthorizedEcho { buffer_seed: u64, buffer_size: u64 },

    /// First write into the authorized buffer
    ///
    ///   0. `[w]` Authorized buffer
    ///   1. `[s]` Authority
    AuthorizedEcho { data: Vec<u8> },

    /// Subsequent write into the same authorized buffer
    ///
    ///   0. `[w]` Authorized buffer
    ///   1. `[s]` Authority
    AuthorizedOverwrite { data: Vec<u8> },
}

/// Which authorized write a payload is for; both share one wire shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    First,
    Overwrite,
}

impl EchoInstruction {
    /// Leading tag byte
    pub fn discriminant(&self) -> u8 {
        match self {
            Self::Echo { .. } => 0,
            Self::InitializeAuthorizedEcho { .. } => 1,
            Self::AuthorizedEcho { .. } => 2,
            Self::AuthorizedOverwrite { .. } => 3,
        }
    }

    /// Variant name for errors and logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::Echo { .. } => "Echo",
            Self::InitializeAuthorizedEcho { .. } => "InitializeAuthorizedEcho",
            Self::AuthorizedEcho { .. } => "AuthorizedEcho",
            Self::AuthorizedOverwrite { .. } => "AuthorizedOverwrite",
        }
    }

    /// Build an `Echo` payload, checking the length prefix can hold the message
    pub fn echo(message: &[u8]) -> Result<Self, EchoClientError> {
        check_message_len(message.len())?;
        Ok(Self::Echo {
            data: message.to_vec(),
        })
    }

    /// Build an `InitializeAuthorizedEcho` payload
    pub fn initialize_authorized(buffer_seed: u64, buffer_size: u64) -> Self {
        Self::InitializeAuthorizedEcho {
            buffer_seed,
            buffer_size,
        }
    }

    /// Build an authorized write payload; `mode` only selects the tag
    pub fn authorized(message: &[u8], mode: WriteMode) -> Result<Self, EchoClientError> {
        check_message_len(message.len())?;
        let data = message.to_vec();
        Ok(match mode {
            WriteMode::First => Self::AuthorizedEcho { data },
            WriteMode::Overwrite => Self::AuthorizedOverwrite { data },
        })
    }

    /// Message bytes carried by the variant, if it carries one
    pub fn message(&self) -> Option<&[u8]> {
        match self {
            Self::Echo { data } | Self::AuthorizedEcho { data } | Self::AuthorizedOverwrite { data } => {
                Some(data)
            }
            Self::InitializeAuthorizedEcho { .. } => None,
        }
    }

    /// Encode to the exact instruction data bytes
    pub fn encode(&self) -> Result<Vec<u8>, EchoClientError> {
        if let Some(message) = self.message() {
            check_message_len(message.len())?;
        }
        borsh::to_vec(self).map_err(|e| EchoClientError::encoding(self.name(), e.to_string()))
    }

    /// Decode instruction data produced by [`EchoInstruction::encode`]
    pub fn decode(data: &[u8]) -> Result<Self, EchoClientError> {
        Self::try_from_slice(data)
            .map_err(|e| EchoClientError::encoding("instruction_data", e.to_string()))
    }
}

/// Reject messages whose length does not fit the 4-byte prefix
pub fn check_message_len(len: usize) -> Result<u32, EchoClientError> {
    u32::try_from(len).map_err(|_| {
        EchoClientError::encoding(
            "message",
            format!("length {} exceeds u32 length prefix", len),
        )
    })
}

/// Decode stored account bytes as message text
///
/// The whole byte range is the message; no length prefix is parsed.
pub fn decode_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
