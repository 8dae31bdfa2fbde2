//! Block and block header structures.

use crate::crypto::PublicKey;
use crate::hash::{hash_serialized, Hash};
use crate::merkle::merkle_root;
use crate::transaction::Transaction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The header of a block: the part covered by proof-of-work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Header hash of the previous block, or zero for the first block.
    pub previous_hash: Hash,
    /// Merkle root of the transaction hashes, coinbase first.
    pub merkle_root: Hash,
    /// Block height (0 for the first block).
    pub height: u64,
    /// Required number of leading zero bits in the header hash.
    pub difficulty: u32,
    pub nonce: u64,
}

impl BlockHeader {
    pub fn hash(&self) -> Hash {
        hash_serialized(self)
    }

    /// True when the header hash has exactly `difficulty` leading zero bits.
    pub fn meets_difficulty(&self) -> bool {
        self.hash().leading_zero_bits() == self.difficulty
    }
}

/// A complete block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
    /// Identity of the miner that produced the block.
    pub author: PublicKey,
    pub timestamp: DateTime<Utc>,
}

impl Block {
    pub fn new(header: BlockHeader, transactions: Vec<Transaction>, author: PublicKey) -> Self {
        Self {
            header,
            transactions,
            author,
            timestamp: Utc::now(),
        }
    }

    /// The block hash is the header hash.
    pub fn hash(&self) -> Hash {
        self.header.hash()
    }

    pub fn height(&self) -> u64 {
        self.header.height
    }

    pub fn tx_count(&self) -> usize {
        self.transactions.len()
    }

    pub fn tx_hashes(&self) -> Vec<Hash> {
        self.transactions.iter().map(|tx| tx.hash()).collect()
    }

    /// The leading coinbase, if the block has one.
    pub fn coinbase(&self) -> Option<&Transaction> {
        self.transactions.first().filter(|tx| tx.is_coinbase)
    }

    pub fn verify_merkle_root(&self) -> bool {
        merkle_root(&self.tx_hashes()) == Some(self.header.merkle_root)
    }
}
