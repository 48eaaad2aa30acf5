//! Echo program transaction building
//!
//! The module is split into focused pieces:
//! - **codec**: binary instruction encoding and decoding
//! - **derive**: program-derived address for authorized buffers
//! - **instructions**: account shapes, validation and instruction planning
//! - **sequencer**: the assemble / sign / submit / confirm state machine
//! - **errors**: error taxonomy shared by every layer
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use echo_client::tx_builder::{instructions, TransactionSequencer};
//! use solana_sdk::{pubkey::Pubkey, signature::Keypair, signer::Signer};
//!
//! # fn example() -> Result<(), echo_client::tx_builder::EchoClientError> {
//! let program_id = Pubkey::new_unique();
//! let payer = Keypair::new();
//! let buffer = Keypair::new();
//!
//! let plan = instructions::plan_unauthenticated_echo(
//!     &program_id,
//!     &payer.pubkey(),
//!     &buffer.pubkey(),
//!     890_880,
//!     b"hello",
//! )?;
//!
//! let mut sequencer = TransactionSequencer::new(&payer);
//! sequencer.append_all(plan.instructions)?.add_signer(&buffer);
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod derive;
pub mod errors;
pub mod instructions;
pub mod sequencer;

pub use codec::{EchoInstruction, WriteMode, AUTHORIZED_HEADER_LEN};
pub use derive::{authorized_buffer_address, DerivedAddress, AUTHORITY_SEED};
pub use errors::EchoClientError;
pub use instructions::{AccountSlot, InstructionPlan};
pub use sequencer::{Confirmation, SequencerState, TransactionSequencer};
