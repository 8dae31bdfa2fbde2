//! Transaction mempool for pending transactions.
//!
//! The mempool stores submitted transactions in arrival order until a miner
//! picks them up. Nothing is validated here; miners validate candidates
//! against their own view of the ledger.

use scriptchain_core::{Hash, Transaction};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use thiserror::Error;

/// Errors that can occur during mempool operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MempoolError {
    #[error("transaction already in mempool")]
    DuplicateTransaction,

    #[error("mempool is full (capacity: {0})")]
    MempoolFull(usize),
}

pub type Result<T> = std::result::Result<T, MempoolError>;

/// Configuration for the mempool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MempoolConfig {
    /// Maximum number of transactions in the mempool.
    pub max_transactions: usize,
}

impl Default for MempoolConfig {
    fn default() -> Self {
        Self {
            max_transactions: 10_000,
        }
    }
}

/// Transaction mempool.
pub struct Mempool {
    /// Configuration.
    config: MempoolConfig,
    /// Transactions indexed by hash.
    transactions: HashMap<Hash, Transaction>,
    /// Arrival order, oldest first.
    order: VecDeque<Hash>,
}

impl Mempool {
    /// Create a new mempool with default configuration.
    pub fn new() -> Self {
        Self::with_config(MempoolConfig::default())
    }

    /// Create a new mempool with the given configuration.
    pub fn with_config(config: MempoolConfig) -> Self {
        Self {
            config,
            transactions: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    /// Get the number of transactions in the mempool.
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// Check if the mempool is empty.
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Check if a transaction is in the mempool.
    pub fn contains(&self, tx_hash: &Hash) -> bool {
        self.transactions.contains_key(tx_hash)
    }

    /// Add a transaction to the back of the queue.
    pub fn add(&mut self, tx: Transaction) -> Result<Hash> {
        let tx_hash = tx.hash();

        if self.contains(&tx_hash) {
            return Err(MempoolError::DuplicateTransaction);
        }

        if self.transactions.len() >= self.config.max_transactions {
            return Err(MempoolError::MempoolFull(self.config.max_transactions));
        }

        self.order.push_back(tx_hash);
        self.transactions.insert(tx_hash, tx);

        Ok(tx_hash)
    }

    /// Remove multiple transactions, ignoring ones already gone.
    pub fn remove_batch(&mut self, tx_hashes: &[Hash]) {
        let batch: HashSet<&Hash> = tx_hashes.iter().collect();
        for hash in &batch {
            self.transactions.remove(*hash);
        }
        self.order.retain(|h| !batch.contains(h));
    }

    /// Up to `limit` transactions, oldest first.
    pub fn get_pending(&self, limit: usize) -> Vec<Transaction> {
        self.order
            .iter()
            .take(limit)
            .filter_map(|h| self.transactions.get(h).cloned())
            .collect()
    }

    /// Get all transactions in arrival order.
    pub fn get_all(&self) -> Vec<Transaction> {
        self.get_pending(self.order.len())
    }

    /// Get mempool statistics.
    pub fn stats(&self) -> MempoolStats {
        MempoolStats {
            total_transactions: self.len(),
            capacity: self.config.max_transactions,
        }
    }
}

impl Default for Mempool {
    fn default() -> Self {
        Self::new()
    }
}

/// Mempool statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MempoolStats {
    /// Total number of transactions.
    pub total_transactions: usize,
    /// Mempool capacity.
    pub capacity: usize,
}
