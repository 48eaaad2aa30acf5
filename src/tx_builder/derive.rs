//! Program-derived address for the authorized echo buffer
//!
//! Seeds are, in this exact order: the `b"authority"` tag, the authority's
//! address bytes, and the buffer seed as 8 little-endian bytes. Bumps are
//! scanned from 255 downward; the first off-curve candidate wins.

use crate::tx_builder::errors::EchoClientError;
use solana_sdk::pubkey::Pubkey;

/// Tag seed the echo program uses for authorized buffers
pub const AUTHORITY_SEED: &[u8] = b"authority";

/// Derived address together with the bump that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedAddress {
    pub address: Pubkey,
    pub bump: u8,
}

/// Derive a program-owned address from ordered seeds
///
/// # Errors
///
/// `DerivationExhausted` if no bump yields an off-curve address.
pub fn derive(program_id: &Pubkey, seeds: &[&[u8]]) -> Result<DerivedAddress, EchoClientError> {
    Pubkey::try_find_program_address(seeds, program_id)
        .map(|(address, bump)| DerivedAddress { address, bump })
        .ok_or(EchoClientError::DerivationExhausted {
            program: *program_id,
        })
}

/// Derive the authorized buffer for `authority` and `buffer_seed`
pub fn authorized_buffer_address(
    program_id: &Pubkey,
    authority: &Pubkey,
    buffer_seed: u64,
) -> Result<DerivedAddress, EchoClientError> {
    let seed_bytes = buffer_seed.to_le_bytes();
    derive(
        program_id,
        &[AUTHORITY_SEED, authority.as_ref(), &seed_bytes],
    )
}
