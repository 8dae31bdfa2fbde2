//! UTXO transactions: inputs, outputs and output references.

use crate::hash::{hash_serialized, sha256_concat, Hash};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A reference to one output of a prior transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutPoint {
    pub tx_hash: Hash,
    pub index: u32,
}

impl OutPoint {
    pub fn new(tx_hash: Hash, index: u32) -> Self {
        Self { tx_hash, index }
    }

    /// The message a spender signs to authorize consuming this output:
    /// `SHA256(tx_hash || index as u32 little-endian)`.
    pub fn spend_message(&self) -> Hash {
        sha256_concat(&[self.tx_hash.as_bytes(), &self.index.to_le_bytes()])
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tx_hash.to_hex(), self.index)
    }
}

/// A value-bearing output guarded by a lock script (script source text).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub value: u64,
    pub lock_script: String,
}

impl TxOutput {
    pub fn new(value: u64, lock_script: impl Into<String>) -> Self {
        Self {
            value,
            lock_script: lock_script.into(),
        }
    }
}

/// A spend of exactly one prior output, carrying the unlock script source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    pub source_tx_hash: Hash,
    pub output_index: u32,
    pub unlock_script: String,
}

impl TxInput {
    pub fn new(outpoint: OutPoint, unlock_script: impl Into<String>) -> Self {
        Self {
            source_tx_hash: outpoint.tx_hash,
            output_index: outpoint.index,
            unlock_script: unlock_script.into(),
        }
    }

    pub fn outpoint(&self) -> OutPoint {
        OutPoint::new(self.source_tx_hash, self.output_index)
    }
}

/// A transaction on the blockchain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub is_coinbase: bool,
    /// Block height for a coinbase, keeping coinbase hashes distinct; zero otherwise.
    pub height: u64,
}

impl Transaction {
    /// A regular transaction spending `inputs`.
    pub fn new(inputs: Vec<TxInput>, outputs: Vec<TxOutput>) -> Self {
        Self {
            inputs,
            outputs,
            is_coinbase: false,
            height: 0,
        }
    }

    /// A coinbase paying `value` to `lock_script`. Has no inputs.
    pub fn coinbase(height: u64, value: u64, lock_script: impl Into<String>) -> Self {
        Self {
            inputs: Vec::new(),
            outputs: vec![TxOutput::new(value, lock_script)],
            is_coinbase: true,
            height,
        }
    }

    /// `SHA256(bincode(tx))`.
    pub fn hash(&self) -> Hash {
        hash_serialized(self)
    }

    pub fn output(&self, index: u32) -> Option<&TxOutput> {
        self.outputs.get(index as usize)
    }

    pub fn total_output(&self) -> u64 {
        self.outputs.iter().map(|o| o.value).sum()
    }

    /// References to every output of this transaction.
    pub fn outpoints(&self) -> impl Iterator<Item = OutPoint> + '_ {
        let hash = self.hash();
        (0..self.outputs.len() as u32).map(move |i| OutPoint::new(hash, i))
    }
}
