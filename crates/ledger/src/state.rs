//! Ledger state and the immutable snapshots handed to wallets and miners.

use crate::chain::Blockchain;
use crate::utxo::UtxoSet;
use scriptchain_core::{Block, OutPoint, TxOutput};
use std::ops::Deref;
use std::sync::Arc;

/// The blockchain together with its spendable references.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerState {
    pub blockchain: Blockchain,
    pub utxos: UtxoSet,
}

impl LedgerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `block` and install `utxos` as the new spendable set.
    pub fn commit(&mut self, block: Block, utxos: UtxoSet) {
        self.blockchain.append(block);
        self.utxos = utxos;
    }

    /// The output behind a reference, if it exists and is unspent.
    pub fn unspent_output(&self, point: &OutPoint) -> Option<&TxOutput> {
        if !self.utxos.contains(point) {
            return None;
        }
        self.blockchain.find_output(&point.tx_hash, point.index)
    }

    /// Every unspent output, in reference order.
    pub fn unspent_outputs(&self) -> impl Iterator<Item = (OutPoint, &TxOutput)> {
        self.utxos.iter().filter_map(|point| {
            self.blockchain
                .find_output(&point.tx_hash, point.index)
                .map(|output| (*point, output))
        })
    }

    /// Freeze a copy of the current state.
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot(Arc::new(self.clone()))
    }
}

/// A read-only view of the ledger at one point in time.
///
/// Cloning shares the same frozen state; holders receive a new snapshot
/// after each accepted block instead of observing updates in place.
#[derive(Debug, Clone, Default)]
pub struct LedgerSnapshot(Arc<LedgerState>);

impl Deref for LedgerSnapshot {
    type Target = LedgerState;

    fn deref(&self) -> &LedgerState {
        &self.0
    }
}

impl PartialEq for LedgerSnapshot {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || *self.0 == *other.0
    }
}
