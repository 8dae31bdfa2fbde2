//! The append-only sequence of accepted blocks.

use scriptchain_core::{Block, Hash, Transaction, TxOutput};
use serde::{Deserialize, Serialize};

/// Ordered, append-only list of blocks.
///
/// Lookups by transaction hash scan every block in order and return the
/// first match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blockchain {
    blocks: Vec<Block>,
}

impl Blockchain {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Chain Head
    // =========================================================================

    /// Height of the last block, or `None` when empty.
    pub fn height(&self) -> Option<u64> {
        (self.blocks.len() as u64).checked_sub(1)
    }

    /// Height the next appended block must carry.
    pub fn next_height(&self) -> u64 {
        self.blocks.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Header hash of the last block, or the zero hash when empty.
    pub fn previous_hash(&self) -> Hash {
        self.blocks.last().map(Block::hash).unwrap_or(Hash::ZERO)
    }

    // =========================================================================
    // Block Access
    // =========================================================================

    pub fn block_at(&self, height: u64) -> Option<&Block> {
        usize::try_from(height).ok().and_then(|h| self.blocks.get(h))
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Append without validation. Callers validate first.
    pub fn append(&mut self, block: Block) {
        self.blocks.push(block);
    }

    // =========================================================================
    // Transaction Lookup
    // =========================================================================

    pub fn find_transaction(&self, tx_hash: &Hash) -> Option<&Transaction> {
        self.blocks
            .iter()
            .flat_map(|block| block.transactions.iter())
            .find(|tx| tx.hash() == *tx_hash)
    }

    pub fn find_output(&self, tx_hash: &Hash, index: u32) -> Option<&TxOutput> {
        self.find_transaction(tx_hash)
            .and_then(|tx| tx.output(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scriptchain_core::{BlockHeader, Keypair};

    fn block(chain: &Blockchain, value: u64) -> Block {
        let coinbase = Transaction::coinbase(chain.next_height(), value, "OP_1");
        let header = BlockHeader {
            previous_hash: chain.previous_hash(),
            merkle_root: Hash::ZERO,
            height: chain.next_height(),
            difficulty: 0,
            nonce: 0,
        };
        Block::new(header, vec![coinbase], Keypair::generate().public_key)
    }

    #[test]
    fn test_empty_chain() {
        let chain = Blockchain::new();
        assert_eq!(chain.height(), None);
        assert_eq!(chain.next_height(), 0);
        assert_eq!(chain.previous_hash(), Hash::ZERO);
        assert!(chain.block_at(0).is_none());
        assert!(chain.blocks().is_empty());
    }

    #[test]
    fn test_append_links_blocks() {
        let mut chain = Blockchain::new();
        let b0 = block(&chain, 10);
        chain.append(b0.clone());
        assert_eq!(chain.height(), Some(0));
        assert_eq!(chain.previous_hash(), b0.hash());

        let b1 = block(&chain, 20);
        assert_eq!(b1.header.previous_hash, b0.hash());
        chain.append(b1.clone());
        assert_eq!(chain.height(), Some(1));
        assert_eq!(chain.block_at(1), Some(&b1));
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn test_find_transaction_and_output() {
        let mut chain = Blockchain::new();
        let b0 = block(&chain, 10);
        let tx_hash = b0.transactions[0].hash();
        chain.append(b0);

        assert!(chain.find_transaction(&tx_hash).is_some());
        assert_eq!(chain.find_output(&tx_hash, 0).unwrap().value, 10);
        assert!(chain.find_output(&tx_hash, 1).is_none());
        assert!(chain.find_output(&Hash::ZERO, 0).is_none());
    }

    #[test]
    fn test_find_returns_first_match() {
        let mut chain = Blockchain::new();
        let b0 = block(&chain, 10);
        let dup = b0.transactions[0].clone();
        chain.append(b0);
        let mut b1 = block(&chain, 20);
        b1.transactions.push(dup.clone());
        chain.append(b1);

        let found = chain.find_transaction(&dup.hash()).unwrap();
        assert!(std::ptr::eq(found, &chain.blocks()[0].transactions[0]));
    }
}
