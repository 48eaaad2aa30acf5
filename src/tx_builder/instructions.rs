//! Instruction building and account-shape validation
//!
//! Every echo variant has a fixed account list. [`build`] checks the supplied
//! accounts against that shape before producing an [`Instruction`], so a
//! mis-assembled instruction never reaches the network.
//!
//! Step 1 also needs a System `create_account` in front of the Echo; that pair
//! is planned by [`plan_unauthenticated_echo`] and its ordering checked by
//! [`sanity_check_ix_order`].

use crate::tx_builder::codec::{EchoInstruction, WriteMode};
use crate::tx_builder::errors::EchoClientError;
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_instruction, system_program,
};

/// Expected role of one account slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountSlot {
    pub name: &'static str,
    pub is_signer: bool,
    pub is_writable: bool,
    /// Address the slot must hold, if fixed
    pub fixed_address: Option<Pubkey>,
}

impl AccountSlot {
    const fn new(name: &'static str, is_signer: bool, is_writable: bool) -> Self {
        Self {
            name,
            is_signer,
            is_writable,
            fixed_address: None,
        }
    }
}

const ECHO_SHAPE: &[AccountSlot] = &[AccountSlot::new("echo_buffer", false, true)];

const INITIALIZE_SHAPE: &[AccountSlot] = &[
    AccountSlot::new("authorized_buffer", false, true),
    AccountSlot::new("authority", true, false),
    AccountSlot {
        name: "system_program",
        is_signer: false,
        is_writable: false,
        fixed_address: Some(system_program::ID),
    },
];

const AUTHORIZED_SHAPE: &[AccountSlot] = &[
    AccountSlot::new("authorized_buffer", false, true),
    AccountSlot::new("authority", true, false),
];

/// The fixed account shape of a variant
pub fn account_shape(ix: &EchoInstruction) -> &'static [AccountSlot] {
    match ix {
        EchoInstruction::Echo { .. } => ECHO_SHAPE,
        EchoInstruction::InitializeAuthorizedEcho { .. } => INITIALIZE_SHAPE,
        EchoInstruction::AuthorizedEcho { .. } | EchoInstruction::AuthorizedOverwrite { .. } => {
            AUTHORIZED_SHAPE
        }
    }
}

/// Check `accounts` against the variant's shape
pub fn validate_accounts(
    ix: &EchoInstruction,
    accounts: &[AccountMeta],
) -> Result<(), EchoClientError> {
    let shape = account_shape(ix);
    if accounts.len() != shape.len() {
        return Err(EchoClientError::malformed(
            ix.name(),
            format!("expected {} accounts, got {}", shape.len(), accounts.len()),
        ));
    }

    for (idx, (slot, meta)) in shape.iter().zip(accounts).enumerate() {
        if meta.is_signer != slot.is_signer {
            return Err(EchoClientError::malformed(
                ix.name(),
                format!(
                    "account {} ({}) must {}be a signer",
                    idx,
                    slot.name,
                    if slot.is_signer { "" } else { "not " }
                ),
            ));
        }
        if meta.is_writable != slot.is_writable {
            return Err(EchoClientError::malformed(
                ix.name(),
                format!(
                    "account {} ({}) must be {}",
                    idx,
                    slot.name,
                    if slot.is_writable { "writable" } else { "read-only" }
                ),
            ));
        }
        if let Some(expected) = slot.fixed_address {
            if meta.pubkey != expected {
                return Err(EchoClientError::malformed(
                    ix.name(),
                    format!(
                        "account {} ({}) must be {}, got {}",
                        idx, slot.name, expected, meta.pubkey
                    ),
                ));
            }
        }
    }

    Ok(())
}

/// Compose an encoded variant with its accounts into an [`Instruction`]
///
/// # Errors
///
/// - `MalformedInstruction` if the account list does not match the variant
/// - `Encoding` if a field does not fit its wire width
pub fn build(
    ix: &EchoInstruction,
    accounts: Vec<AccountMeta>,
    program_id: &Pubkey,
) -> Result<Instruction, EchoClientError> {
    validate_accounts(ix, &accounts)?;
    let data = ix.encode()?;
    tracing::debug!(
        variant = ix.name(),
        program = %program_id,
        payload = %hex::encode(&data),
        "Built echo instruction"
    );
    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Create an `Echo` instruction
pub fn echo(
    program_id: &Pubkey,
    echo_buffer: &Pubkey,
    message: &[u8],
) -> Result<Instruction, EchoClientError> {
    build(
        &EchoInstruction::echo(message)?,
        vec![AccountMeta::new(*echo_buffer, false)],
        program_id,
    )
}

/// Create an `InitializeAuthorizedEcho` instruction
pub fn initialize_authorized_echo(
    program_id: &Pubkey,
    authorized_buffer: &Pubkey,
    authority: &Pubkey,
    buffer_seed: u64,
    buffer_size: u64,
) -> Result<Instruction, EchoClientError> {
    build(
        &EchoInstruction::initialize_authorized(buffer_seed, buffer_size),
        vec![
            AccountMeta::new(*authorized_buffer, false),
            AccountMeta::new_readonly(*authority, true),
            AccountMeta::new_readonly(system_program::ID, false),
        ],
        program_id,
    )
}

/// Create an authorized write (`AuthorizedEcho` or `AuthorizedOverwrite`)
pub fn authorized_echo(
    program_id: &Pubkey,
    authorized_buffer: &Pubkey,
    authority: &Pubkey,
    message: &[u8],
    mode: WriteMode,
) -> Result<Instruction, EchoClientError> {
    build(
        &EchoInstruction::authorized(message, mode)?,
        vec![
            AccountMeta::new(*authorized_buffer, false),
            AccountMeta::new_readonly(*authority, true),
        ],
        program_id,
    )
}

/// Ordered instructions for one transaction
#[derive(Debug, Clone)]
pub struct InstructionPlan {
    pub instructions: Vec<Instruction>,
}

/// Plan step 1: create the buffer account, then Echo into it
///
/// The buffer is sized to exactly `message.len()` bytes and owned by
/// `program_id`; `lamports` should be the rent-exempt minimum for that size.
pub fn plan_unauthenticated_echo(
    program_id: &Pubkey,
    payer: &Pubkey,
    echo_buffer: &Pubkey,
    lamports: u64,
    message: &[u8],
) -> Result<InstructionPlan, EchoClientError> {
    let echo_ix = echo(program_id, echo_buffer, message)?;
    let create_ix = system_instruction::create_account(
        payer,
        echo_buffer,
        lamports,
        message.len() as u64,
        program_id,
    );

    let instructions = vec![create_ix, echo_ix];
    sanity_check_ix_order(&instructions)?;
    Ok(InstructionPlan { instructions })
}

/// Check that every echo-program write targets an account created earlier in
/// the same list, when the list creates accounts at all
///
/// A create_account must come before any instruction that writes to the new
/// account; instructions execute in append order.
pub fn sanity_check_ix_order(instructions: &[Instruction]) -> Result<(), EchoClientError> {
    if instructions.is_empty() {
        return Err(EchoClientError::invalid_state("instruction list is empty"));
    }

    // SystemInstruction::CreateAccount is variant 0, u32 little-endian
    let created_account = |ix: &Instruction| -> Option<Pubkey> {
        let is_create = ix.program_id == system_program::ID
            && ix.data.len() >= 4
            && ix.data[..4] == [0, 0, 0, 0];
        if is_create {
            ix.accounts.get(1).map(|meta| meta.pubkey)
        } else {
            None
        }
    };

    for (idx, ix) in instructions.iter().enumerate() {
        if ix.program_id == system_program::ID {
            continue;
        }
        let Some(target) = ix.accounts.first().map(|meta| meta.pubkey) else {
            continue;
        };
        let created_later = instructions[idx + 1..]
            .iter()
            .filter_map(created_account)
            .any(|created| created == target);
        if created_later {
            return Err(EchoClientError::invalid_state(format!(
                "instruction {} writes to {} before it is created",
                idx, target
            )));
        }
    }

    Ok(())
}
