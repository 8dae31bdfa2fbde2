//! Transaction and block validation rules.
//!
//! Transactions are checked by running each input's unlock script followed
//! by the referenced output's lock script. Blocks are checked structurally
//! against the ledger they extend.

use crate::pow::verify_pow;
use scriptchain_assembler::{assemble, AssemblerError};
use scriptchain_core::{script, Block, Hash, OutPoint, Transaction, TxOutput};
use scriptchain_ledger::{LedgerState, UtxoSet};
use scriptchain_vm::{execute, CheckSigPolicy, ScriptContext, VmError};
use std::collections::HashSet;
use thiserror::Error;

/// Why a single transaction was refused.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransactionError {
    #[error("coinbase transactions cannot be submitted")]
    UnexpectedCoinbase,

    #[error("transaction spends no inputs")]
    NoInputs,

    #[error("output {0} is already spent or never existed")]
    AlreadySpent(OutPoint),

    #[error("referenced output {0} not found")]
    MissingOutput(OutPoint),

    #[error("script for {point} does not assemble: {source}")]
    Script {
        point: OutPoint,
        #[source]
        source: AssemblerError,
    },

    #[error("script for {point} failed: {source}")]
    Execution {
        point: OutPoint,
        #[source]
        source: VmError,
    },

    #[error("script for {0} did not leave a true value")]
    UnlockFailed(OutPoint),

    #[error("outputs {outputs} exceed inputs {inputs}")]
    Overspend { inputs: u64, outputs: u64 },

    #[error("value overflow")]
    ValueOverflow,
}

/// Errors in a block's structure or proof-of-work.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("block height mismatch (expected {expected}, got {got})")]
    InvalidHeight { expected: u64, got: u64 },

    #[error("block previous_hash mismatch (expected {expected}, got {got})")]
    InvalidPrevHash { expected: Hash, got: Hash },

    #[error("block merkle root verification failed")]
    InvalidMerkleRoot,

    #[error("block must start with exactly one coinbase transaction")]
    InvalidCoinbase,

    #[error("duplicate transaction in block")]
    DuplicateTransaction,

    #[error("header hash has {leading_zeros} leading zero bits, difficulty is {difficulty}")]
    InvalidProofOfWork { difficulty: u32, leading_zeros: u32 },
}

pub type Result<T> = std::result::Result<T, ValidationError>;

/// Script-level transaction validator.
pub struct TransactionValidator;

impl TransactionValidator {
    /// Check one spend: the reference must be unspent and the combined
    /// unlock + lock program must leave a true value.
    pub fn check_spend(
        point: OutPoint,
        unlock_script: &str,
        output: &TxOutput,
        checksig: CheckSigPolicy,
    ) -> std::result::Result<(), TransactionError> {
        let program = script::spending_program(unlock_script, &output.lock_script);
        let binary =
            assemble(&program).map_err(|source| TransactionError::Script { point, source })?;
        let context = ScriptContext::new(checksig, Some(point.spend_message()));
        let result =
            execute(binary, context).map_err(|source| TransactionError::Execution { point, source })?;
        if !result.is_valid() {
            return Err(TransactionError::UnlockFailed(point));
        }
        Ok(())
    }

    /// Validate every input of `tx` and apply it to `utxos`.
    ///
    /// All-or-nothing: on the first failing input, references already
    /// removed for earlier inputs are restored and `utxos` is left as it
    /// was. On success the spent references are gone, the outputs of `tx`
    /// are added, and the fee is returned.
    pub fn validate_and_apply<F>(
        tx: &Transaction,
        utxos: &mut UtxoSet,
        lookup: F,
        checksig: CheckSigPolicy,
    ) -> std::result::Result<u64, TransactionError>
    where
        F: Fn(&OutPoint) -> Option<TxOutput>,
    {
        if tx.is_coinbase {
            return Err(TransactionError::UnexpectedCoinbase);
        }
        if tx.inputs.is_empty() {
            return Err(TransactionError::NoInputs);
        }

        let mut removed: Vec<OutPoint> = Vec::with_capacity(tx.inputs.len());
        let outcome = Self::spend_inputs(tx, utxos, &lookup, checksig, &mut removed);

        let fee = outcome.and_then(|inputs| {
            let outputs = tx
                .outputs
                .iter()
                .try_fold(0u64, |acc, o| acc.checked_add(o.value))
                .ok_or(TransactionError::ValueOverflow)?;
            inputs
                .checked_sub(outputs)
                .ok_or(TransactionError::Overspend { inputs, outputs })
        });

        match fee {
            Ok(fee) => {
                utxos.add_outputs(tx);
                Ok(fee)
            }
            Err(err) => {
                for point in removed {
                    utxos.add_reference(point.tx_hash, point.index);
                }
                Err(err)
            }
        }
    }

    fn spend_inputs<F>(
        tx: &Transaction,
        utxos: &mut UtxoSet,
        lookup: &F,
        checksig: CheckSigPolicy,
        removed: &mut Vec<OutPoint>,
    ) -> std::result::Result<u64, TransactionError>
    where
        F: Fn(&OutPoint) -> Option<TxOutput>,
    {
        let mut total: u64 = 0;
        for input in &tx.inputs {
            let point = input.outpoint();
            if !utxos.has_reference(point.tx_hash, point.index) {
                return Err(TransactionError::AlreadySpent(point));
            }
            let output = lookup(&point).ok_or(TransactionError::MissingOutput(point))?;
            Self::check_spend(point, &input.unlock_script, &output, checksig)?;

            utxos.remove_reference(point.tx_hash, point.index);
            removed.push(point);
            total = total
                .checked_add(output.value)
                .ok_or(TransactionError::ValueOverflow)?;
        }
        Ok(total)
    }
}

/// Block validator.
pub struct BlockValidator;

impl BlockValidator {
    /// Validate block structure and contents.
    pub fn validate_block_structure(block: &Block) -> Result<()> {
        let coinbases = block.transactions.iter().filter(|tx| tx.is_coinbase).count();
        if coinbases != 1 || block.coinbase().is_none() {
            return Err(ValidationError::InvalidCoinbase);
        }

        if !block.verify_merkle_root() {
            return Err(ValidationError::InvalidMerkleRoot);
        }

        let mut seen = HashSet::new();
        for hash in block.tx_hashes() {
            if !seen.insert(hash) {
                return Err(ValidationError::DuplicateTransaction);
            }
        }

        Ok(())
    }

    /// Validate block extends the ledger's last block.
    pub fn validate_block_extends_parent(block: &Block, ledger: &LedgerState) -> Result<()> {
        let expected = ledger.blockchain.next_height();
        if block.header.height != expected {
            return Err(ValidationError::InvalidHeight {
                expected,
                got: block.header.height,
            });
        }

        let parent = ledger.blockchain.previous_hash();
        if block.header.previous_hash != parent {
            return Err(ValidationError::InvalidPrevHash {
                expected: parent,
                got: block.header.previous_hash,
            });
        }

        Ok(())
    }

    /// The header hash must have exactly the declared number of zero bits.
    pub fn validate_proof_of_work(block: &Block) -> Result<()> {
        if !verify_pow(&block.header) {
            return Err(ValidationError::InvalidProofOfWork {
                difficulty: block.header.difficulty,
                leading_zeros: block.hash().leading_zero_bits(),
            });
        }
        Ok(())
    }

    /// Full block validation (structure + parent + proof-of-work).
    pub fn validate(block: &Block, ledger: &LedgerState) -> Result<()> {
        Self::validate_block_structure(block)?;
        Self::validate_block_extends_parent(block, ledger)?;
        Self::validate_proof_of_work(block)?;
        Ok(())
    }
}
