//! The set of currently spendable output references.

use scriptchain_core::{Hash, OutPoint, Transaction};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// `(tx_hash, output_index)` pairs that have not been spent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoSet {
    references: BTreeSet<OutPoint>,
}

impl UtxoSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent.
    pub fn add_reference(&mut self, tx_hash: Hash, index: u32) {
        self.references.insert(OutPoint::new(tx_hash, index));
    }

    /// No-op if absent. Returns whether the reference was present.
    pub fn remove_reference(&mut self, tx_hash: Hash, index: u32) -> bool {
        self.references.remove(&OutPoint::new(tx_hash, index))
    }

    pub fn has_reference(&self, tx_hash: Hash, index: u32) -> bool {
        self.references.contains(&OutPoint::new(tx_hash, index))
    }

    /// Register every output of `tx`.
    pub fn add_outputs(&mut self, tx: &Transaction) {
        for point in tx.outpoints() {
            self.add_reference(point.tx_hash, point.index);
        }
    }

    pub fn contains(&self, point: &OutPoint) -> bool {
        self.references.contains(point)
    }

    pub fn iter(&self) -> impl Iterator<Item = &OutPoint> {
        self.references.iter()
    }

    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }
}
