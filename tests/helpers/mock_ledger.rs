use async_trait::async_trait;
use echo_client::rpc_manager::{LedgerClient, RpcManagerError};
use echo_client::tx_builder::EchoInstruction;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    hash::Hash,
    instruction::InstructionError,
    pubkey::Pubkey,
    rent::Rent,
    signature::Signature,
    system_instruction::SystemInstruction,
    system_program,
    transaction::{Transaction, TransactionError},
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Lamports charged per required signature
pub const FEE_PER_SIGNATURE: u64 = 5_000;

const ENDPOINT: &str = "mock://ledger";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MockAccount {
    pub lamports: u64,
    pub data: Vec<u8>,
    pub owner: Pubkey,
}

/// Failures the ledger can be told to produce
#[derive(Clone, Debug, Default)]
pub struct Faults {
    /// 1-based index of the submission to reject outright
    pub reject_submission: Option<usize>,
    /// 1-based index of the submission whose connection drops
    pub drop_submission: Option<usize>,
    /// Accept submissions but never report them as confirmed
    pub never_confirm: bool,
    /// Execute echo writes as no-ops, leaving buffers untouched
    pub ignore_echo_writes: bool,
}

#[derive(Default)]
struct LedgerState {
    accounts: HashMap<Pubkey, MockAccount>,
    statuses: HashMap<Signature, Result<(), TransactionError>>,
    submitted: Vec<Transaction>,
    airdrops: u64,
}

/// In-memory ledger running the System program and the echo program
#[derive(Clone)]
pub struct MockLedger {
    program_id: Pubkey,
    blockhash: Hash,
    faults: Faults,
    state: Arc<RwLock<LedgerState>>,
}

#[derive(Clone, Copy)]
struct IxAccount {
    key: Pubkey,
    is_signer: bool,
    is_writable: bool,
}

impl MockLedger {
    pub fn new(program_id: Pubkey) -> Self {
        Self {
            program_id,
            blockhash: Hash::new_from_array([7u8; 32]),
            faults: Faults::default(),
            state: Arc::new(RwLock::new(LedgerState::default())),
        }
    }

    pub fn reject_submission(mut self, nth: usize) -> Self {
        self.faults.reject_submission = Some(nth);
        self
    }

    pub fn drop_submission(mut self, nth: usize) -> Self {
        self.faults.drop_submission = Some(nth);
        self
    }

    pub fn never_confirm(mut self) -> Self {
        self.faults.never_confirm = true;
        self
    }

    pub fn ignore_echo_writes(mut self) -> Self {
        self.faults.ignore_echo_writes = true;
        self
    }

    pub fn program_id(&self) -> Pubkey {
        self.program_id
    }

    /// Every transaction handed to `submit`, rejected ones included
    pub async fn submitted(&self) -> Vec<Transaction> {
        self.state.read().await.submitted.clone()
    }

    /// Echo program tags in submission order
    pub async fn submitted_echo_tags(&self) -> Vec<u8> {
        self.submitted()
            .await
            .iter()
            .flat_map(|tx| {
                tx.message
                    .instructions
                    .iter()
                    .filter(|ix| {
                        tx.message.account_keys[ix.program_id_index as usize] == self.program_id
                    })
                    .filter_map(|ix| ix.data.first().copied())
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    pub async fn account(&self, address: &Pubkey) -> Option<MockAccount> {
        self.state.read().await.accounts.get(address).cloned()
    }

    pub async fn balance(&self, address: &Pubkey) -> u64 {
        self.account(address).await.map_or(0, |a| a.lamports)
    }

    pub async fn airdrop_count(&self) -> u64 {
        self.state.read().await.airdrops
    }

    pub async fn status(&self, signature: &Signature) -> Option<Result<(), TransactionError>> {
        self.state.read().await.statuses.get(signature).cloned()
    }

    fn next_signature(state: &LedgerState) -> Signature {
        let mut bytes = [0u8; 64];
        bytes[..8].copy_from_slice(&(state.statuses.len() as u64 + 1).to_le_bytes());
        bytes[8] = 0xA1;
        Signature::from(bytes)
    }

    fn execute(
        &self,
        accounts: &mut HashMap<Pubkey, MockAccount>,
        tx: &Transaction,
    ) -> Result<(), TransactionError> {
        let message = &tx.message;
        let payer = message.account_keys[0];
        let fee = FEE_PER_SIGNATURE * message.header.num_required_signatures as u64;
        match accounts.get_mut(&payer) {
            Some(account) if account.lamports >= fee => account.lamports -= fee,
            _ => return Err(TransactionError::InsufficientFundsForFee),
        }

        // Instructions are atomic as a whole: work on a copy
        let mut working = accounts.clone();
        for (index, ix) in message.instructions.iter().enumerate() {
            let program_id = message.account_keys[ix.program_id_index as usize];
            let metas: Vec<IxAccount> = ix
                .accounts
                .iter()
                .map(|&i| IxAccount {
                    key: message.account_keys[i as usize],
                    is_signer: is_signer(tx, i as usize),
                    is_writable: is_writable(tx, i as usize),
                })
                .collect();

            let result = if program_id == system_program::ID {
                self.run_system(&mut working, &metas, &ix.data)
            } else if program_id == self.program_id {
                self.run_echo(&mut working, &metas, &ix.data)
            } else {
                Err(InstructionError::UnsupportedProgramId)
            };
            result.map_err(|e| TransactionError::InstructionError(index as u8, e))?;
        }

        *accounts = working;
        Ok(())
    }

    fn run_system(
        &self,
        accounts: &mut HashMap<Pubkey, MockAccount>,
        metas: &[IxAccount],
        data: &[u8],
    ) -> Result<(), InstructionError> {
        let instruction: SystemInstruction =
            bincode::deserialize(data).map_err(|_| InstructionError::InvalidInstructionData)?;
        let SystemInstruction::CreateAccount {
            lamports,
            space,
            owner,
        } = instruction
        else {
            return Err(InstructionError::InvalidInstructionData);
        };

        let from = metas.first().ok_or(InstructionError::NotEnoughAccountKeys)?;
        let to = metas.get(1).ok_or(InstructionError::NotEnoughAccountKeys)?;
        if !from.is_signer || !to.is_signer {
            return Err(InstructionError::MissingRequiredSignature);
        }
        create_account(accounts, &from.key, &to.key, lamports, space as usize, owner)
    }

    fn run_echo(
        &self,
        accounts: &mut HashMap<Pubkey, MockAccount>,
        metas: &[IxAccount],
        data: &[u8],
    ) -> Result<(), InstructionError> {
        let instruction =
            EchoInstruction::decode(data).map_err(|_| InstructionError::InvalidInstructionData)?;

        match instruction {
            EchoInstruction::Echo { data } => {
                let buffer = metas.first().ok_or(InstructionError::NotEnoughAccountKeys)?;
                let account = self.program_account(accounts, buffer)?;
                if account.data.len() != data.len() {
                    // The program copies with clone_from_slice and panics
                    return Err(InstructionError::ProgramFailedToComplete);
                }
                if !self.faults.ignore_echo_writes {
                    account.data.copy_from_slice(&data);
                }
                Ok(())
            }
            EchoInstruction::InitializeAuthorizedEcho {
                buffer_seed,
                buffer_size,
            } => {
                let buffer = metas.first().ok_or(InstructionError::NotEnoughAccountKeys)?;
                let authority = metas.get(1).ok_or(InstructionError::NotEnoughAccountKeys)?;
                let system = metas.get(2).ok_or(InstructionError::NotEnoughAccountKeys)?;
                if system.key != system_program::ID {
                    return Err(InstructionError::IncorrectProgramId);
                }

                let (expected, bump) = Pubkey::find_program_address(
                    &[b"authority", authority.key.as_ref(), &buffer_seed.to_le_bytes()],
                    &self.program_id,
                );
                if expected != buffer.key {
                    return Err(InstructionError::InvalidAccountData);
                }
                if !authority.is_signer {
                    return Err(InstructionError::MissingRequiredSignature);
                }
                if !buffer.is_writable {
                    return Err(InstructionError::ReadonlyDataModified);
                }

                let size = buffer_size as usize;
                let lamports = Rent::default().minimum_balance(size);
                create_account(accounts, &authority.key, &buffer.key, lamports, size, self.program_id)?;

                let account = accounts
                    .get_mut(&buffer.key)
                    .ok_or(InstructionError::UninitializedAccount)?;
                if account.data.len() < 9 {
                    return Err(InstructionError::ProgramFailedToComplete);
                }
                account.data[0] = bump;
                account.data[1..9].copy_from_slice(&buffer_seed.to_le_bytes());
                Ok(())
            }
            EchoInstruction::AuthorizedEcho { data } | EchoInstruction::AuthorizedOverwrite { data } => {
                let buffer = metas.first().ok_or(InstructionError::NotEnoughAccountKeys)?;
                let authority = *metas.get(1).ok_or(InstructionError::NotEnoughAccountKeys)?;
                let ignore_writes = self.faults.ignore_echo_writes;
                let program_id = self.program_id;
                let account = self.program_account(accounts, buffer)?;
                if account.data.len() < 9 {
                    return Err(InstructionError::ProgramFailedToComplete);
                }

                let found = Pubkey::create_program_address(
                    &[
                        b"authority",
                        authority.key.as_ref(),
                        &account.data[1..9],
                        &[account.data[0]],
                    ],
                    &program_id,
                )
                .map_err(|_| InstructionError::InvalidSeeds)?;
                if found != buffer.key {
                    return Err(InstructionError::InvalidAccountData);
                }

                if !ignore_writes {
                    let end = (data.len() + 9).min(account.data.len());
                    account.data[9..end].copy_from_slice(&data[..end - 9]);
                }
                Ok(())
            }
        }
    }

    /// A writable account owned by the echo program
    fn program_account<'m>(
        &self,
        accounts: &'m mut HashMap<Pubkey, MockAccount>,
        meta: &IxAccount,
    ) -> Result<&'m mut MockAccount, InstructionError> {
        if !meta.is_writable {
            return Err(InstructionError::ReadonlyDataModified);
        }
        let account = accounts
            .get_mut(&meta.key)
            .ok_or(InstructionError::UninitializedAccount)?;
        if account.owner != self.program_id {
            return Err(InstructionError::ExternalAccountDataModified);
        }
        Ok(account)
    }
}

fn is_signer(tx: &Transaction, index: usize) -> bool {
    index < tx.message.header.num_required_signatures as usize
}

fn is_writable(tx: &Transaction, index: usize) -> bool {
    let header = &tx.message.header;
    let signed = header.num_required_signatures as usize;
    if index < signed {
        index < signed - header.num_readonly_signed_accounts as usize
    } else {
        index < tx.message.account_keys.len() - header.num_readonly_unsigned_accounts as usize
    }
}

fn create_account(
    accounts: &mut HashMap<Pubkey, MockAccount>,
    from: &Pubkey,
    to: &Pubkey,
    lamports: u64,
    space: usize,
    owner: Pubkey,
) -> Result<(), InstructionError> {
    if let Some(existing) = accounts.get(to) {
        if existing.lamports > 0 || !existing.data.is_empty() {
            // SystemError::AccountAlreadyInUse
            return Err(InstructionError::Custom(0));
        }
    }
    let payer = accounts
        .get_mut(from)
        .ok_or(InstructionError::InsufficientFunds)?;
    if payer.lamports < lamports {
        // SystemError::ResultWithNegativeLamports
        return Err(InstructionError::Custom(1));
    }
    payer.lamports -= lamports;
    accounts.insert(
        *to,
        MockAccount {
            lamports,
            data: vec![0; space],
            owner,
        },
    );
    Ok(())
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn request_airdrop(
        &self,
        to: &Pubkey,
        lamports: u64,
    ) -> Result<Signature, RpcManagerError> {
        let mut state = self.state.write().await;
        let signature = Self::next_signature(&state);
        state
            .accounts
            .entry(*to)
            .or_insert_with(|| MockAccount {
                lamports: 0,
                data: Vec::new(),
                owner: system_program::ID,
            })
            .lamports += lamports;
        state.statuses.insert(signature, Ok(()));
        state.airdrops += 1;
        Ok(signature)
    }

    async fn minimum_balance_for_rent_exemption(
        &self,
        data_len: usize,
    ) -> Result<u64, RpcManagerError> {
        Ok(Rent::default().minimum_balance(data_len))
    }

    async fn latest_blockhash(&self) -> Result<Hash, RpcManagerError> {
        Ok(self.blockhash)
    }

    async fn submit(&self, tx: &Transaction) -> Result<Signature, RpcManagerError> {
        let mut state = self.state.write().await;
        state.submitted.push(tx.clone());

        if self.faults.reject_submission == Some(state.submitted.len()) {
            return Err(RpcManagerError::RpcResponse {
                endpoint: ENDPOINT.to_string(),
                message: "injected rejection".to_string(),
                code: Some(-32002),
            });
        }
        if self.faults.drop_submission == Some(state.submitted.len()) {
            return Err(RpcManagerError::Transport {
                endpoint: ENDPOINT.to_string(),
                message: "connection reset by peer".to_string(),
            });
        }
        if tx.message.recent_blockhash != self.blockhash {
            return Err(RpcManagerError::BlockhashNotFound {
                endpoint: ENDPOINT.to_string(),
            });
        }
        tx.verify().map_err(|e| RpcManagerError::RpcResponse {
            endpoint: ENDPOINT.to_string(),
            message: format!("signature verification failed: {}", e),
            code: Some(-32003),
        })?;

        let signature = tx.signatures[0];
        if self.faults.never_confirm {
            return Ok(signature);
        }

        let result = self.execute(&mut state.accounts, tx);
        state.statuses.insert(signature, result);
        Ok(signature)
    }

    async fn signature_status(
        &self,
        signature: &Signature,
        _commitment: CommitmentConfig,
    ) -> Result<Option<Result<(), TransactionError>>, RpcManagerError> {
        Ok(self.status(signature).await)
    }

    async fn fetch_account_data(
        &self,
        address: &Pubkey,
        _commitment: CommitmentConfig,
    ) -> Result<Option<Vec<u8>>, RpcManagerError> {
        Ok(self.account(address).await.map(|a| a.data))
    }
}
