//! Block production.
//!
//! A mining round takes a random-sized batch from the pending pool,
//! validates it against a private copy of the spendable set, prepends a
//! coinbase paying fees plus subsidy, and searches for a nonce.

use crate::pow::{search_nonce, DifficultyPolicy, SubsidyPolicy};
use crate::validator::{TransactionError, TransactionValidator};
use rand::{rngs::StdRng, Rng, SeedableRng};
use scriptchain_core::{
    merkle_root, script, Block, BlockHeader, Hash, OutPoint, PublicKey, Transaction, TxOutput,
};
use scriptchain_ledger::{LedgerSnapshot, UtxoSet};
use scriptchain_vm::CheckSigPolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

/// Miner configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinerConfig {
    /// Smallest batch taken from the pool per round.
    pub min_batch: usize,
    /// Largest batch taken from the pool per round.
    pub max_batch: usize,
    pub difficulty: DifficultyPolicy,
    pub subsidy: SubsidyPolicy,
    /// Fixed RNG seed for reproducible rounds.
    pub seed: Option<u64>,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            min_batch: 10,
            max_batch: 100,
            difficulty: DifficultyPolicy::default(),
            subsidy: SubsidyPolicy::default(),
            seed: None,
        }
    }
}

/// Everything a round produced.
#[derive(Debug, Clone)]
pub struct MinedBlock {
    pub block: Block,
    /// Spendable set after applying the block, coinbase included.
    pub utxos: UtxoSet,
    /// Hashes of every pool transaction the round looked at.
    pub considered: Vec<Hash>,
    pub accepted: Vec<Hash>,
    pub rejected: Vec<(Hash, TransactionError)>,
    pub fees: u64,
    pub subsidy: u64,
    /// Hashes computed during the nonce search.
    pub attempts: u64,
}

/// Transactions accepted so far in a round, keyed by hash.
type RoundOutputs = HashMap<Hash, Transaction>;

/// A mining identity with its own view of the ledger.
pub struct Miner {
    identity: PublicKey,
    snapshot: LedgerSnapshot,
    config: MinerConfig,
    checksig: CheckSigPolicy,
    rng: StdRng,
}

impl Miner {
    pub fn new(
        identity: PublicKey,
        snapshot: LedgerSnapshot,
        config: MinerConfig,
        checksig: CheckSigPolicy,
    ) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            identity,
            snapshot,
            config,
            checksig,
            rng,
        }
    }

    pub fn identity(&self) -> PublicKey {
        self.identity
    }

    pub fn snapshot(&self) -> &LedgerSnapshot {
        &self.snapshot
    }

    pub fn config(&self) -> &MinerConfig {
        &self.config
    }

    /// Replace the ledger view after a block is accepted.
    pub fn sync(&mut self, snapshot: LedgerSnapshot) {
        self.snapshot = snapshot;
    }

    /// Run one mining round over `pending` (oldest first).
    ///
    /// Invalid candidates are skipped and reported in `rejected`. The block
    /// always contains at least the coinbase.
    pub fn mine(&mut self, pending: &[Transaction]) -> MinedBlock {
        let candidates = self.collect_candidates(pending);
        let considered: Vec<Hash> = candidates.iter().map(|tx| tx.hash()).collect();
        let height = self.snapshot.blockchain.next_height();
        debug!(height, candidates = candidates.len(), "collected candidates");

        let mut utxos = self.snapshot.utxos.clone();
        let (accepted, rejected, fees) = self.validate_and_apply(candidates, &mut utxos);

        let subsidy = self.config.subsidy.draw(&mut self.rng);
        let coinbase = self.build_coinbase(height, fees.saturating_add(subsidy));

        let mut transactions = Vec::with_capacity(accepted.len() + 1);
        transactions.push(coinbase);
        transactions.extend(accepted);

        let mut header = BlockHeader {
            previous_hash: self.snapshot.blockchain.previous_hash(),
            merkle_root: Self::compute_merkle_root(&transactions),
            height,
            difficulty: self.config.difficulty.draw(&mut self.rng),
            nonce: 0,
        };
        let attempts = search_nonce(&mut header);

        let block = Block::new(header, transactions, self.identity);
        Self::emit(block, utxos, considered, rejected, fees, subsidy, attempts)
    }

    /// Take the oldest `n` pool entries, `n` drawn from the batch range.
    fn collect_candidates(&mut self, pending: &[Transaction]) -> Vec<Transaction> {
        let min = self.config.min_batch;
        let max = self.config.max_batch.max(min);
        let n = self.rng.gen_range(min..=max);
        pending.iter().take(n).cloned().collect()
    }

    /// Apply candidates in order against the private spendable set.
    ///
    /// Outputs created earlier in the same batch are spendable by later
    /// candidates.
    fn validate_and_apply(
        &self,
        candidates: Vec<Transaction>,
        utxos: &mut UtxoSet,
    ) -> (Vec<Transaction>, Vec<(Hash, TransactionError)>, u64) {
        let mut round = RoundOutputs::new();
        let mut accepted = Vec::new();
        let mut rejected = Vec::new();
        let mut fees: u64 = 0;

        for tx in candidates {
            let hash = tx.hash();
            let lookup = |point: &OutPoint| self.lookup_output(&round, point);
            match TransactionValidator::validate_and_apply(&tx, utxos, lookup, self.checksig) {
                Ok(fee) => {
                    fees = fees.saturating_add(fee);
                    round.insert(hash, tx.clone());
                    accepted.push(tx);
                }
                Err(err) => {
                    debug!(tx = %hash, error = %err, "rejected candidate");
                    rejected.push((hash, err));
                }
            }
        }

        (accepted, rejected, fees)
    }

    fn lookup_output(&self, round: &RoundOutputs, point: &OutPoint) -> Option<TxOutput> {
        if let Some(tx) = round.get(&point.tx_hash) {
            return tx.output(point.index).cloned();
        }
        self.snapshot
            .blockchain
            .find_output(&point.tx_hash, point.index)
            .cloned()
    }

    fn build_coinbase(&self, height: u64, value: u64) -> Transaction {
        Transaction::coinbase(height, value, script::pay_to_pubkey(&self.identity))
    }

    fn compute_merkle_root(transactions: &[Transaction]) -> Hash {
        let hashes: Vec<Hash> = transactions.iter().map(|tx| tx.hash()).collect();
        // Never empty: the coinbase is always present.
        merkle_root(&hashes).unwrap_or(Hash::ZERO)
    }

    fn emit(
        block: Block,
        mut utxos: UtxoSet,
        considered: Vec<Hash>,
        rejected: Vec<(Hash, TransactionError)>,
        fees: u64,
        subsidy: u64,
        attempts: u64,
    ) -> MinedBlock {
        if let Some(coinbase) = block.coinbase() {
            utxos.add_outputs(coinbase);
        }
        let accepted: Vec<Hash> = block.transactions.iter().skip(1).map(|tx| tx.hash()).collect();

        info!(
            height = block.height(),
            hash = %block.hash(),
            difficulty = block.header.difficulty,
            txs = block.tx_count(),
            rejected = rejected.len(),
            attempts,
            "mined block"
        );

        MinedBlock {
            block,
            utxos,
            considered,
            accepted,
            rejected,
            fees,
            subsidy,
            attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::BlockValidator;
    use scriptchain_core::{Keypair, TxInput, COIN};
    use scriptchain_ledger::LedgerState;

    fn config(seed: u64) -> MinerConfig {
        MinerConfig {
            min_batch: 10,
            max_batch: 10,
            difficulty: DifficultyPolicy::Fixed(2),
            subsidy: SubsidyPolicy::Fixed(5 * COIN),
            seed: Some(seed),
        }
    }

    fn commit(state: &mut LedgerState, mined: &MinedBlock) {
        state.commit(mined.block.clone(), mined.utxos.clone());
    }

    #[test]
    fn test_empty_pool_mines_coinbase_only() {
        let keypair = Keypair::generate();
        let state = LedgerState::new();
        let mut miner = Miner::new(
            keypair.public_key,
            state.snapshot(),
            config(1),
            CheckSigPolicy::Stubbed,
        );

        let mined = miner.mine(&[]);
        assert_eq!(mined.block.tx_count(), 1);
        assert_eq!(mined.block.height(), 0);
        assert_eq!(mined.block.header.previous_hash, Hash::ZERO);
        assert_eq!(mined.fees, 0);

        let coinbase = mined.block.coinbase().unwrap();
        assert_eq!(coinbase.outputs[0].value, 5 * COIN);
        assert_eq!(coinbase.outputs[0].lock_script, script::pay_to_pubkey(&keypair.public_key));
        assert!(mined.utxos.has_reference(coinbase.hash(), 0));
        assert!(BlockValidator::validate(&mined.block, &state).is_ok());
    }

    #[test]
    fn test_round_collects_fees_and_chains_spends() {
        let keypair = Keypair::generate();
        let mut state = LedgerState::new();
        let mut miner = Miner::new(
            keypair.public_key,
            state.snapshot(),
            config(2),
            CheckSigPolicy::Verify,
        );
        let first = miner.mine(&[]);
        commit(&mut state, &first);
        miner.sync(state.snapshot());

        let funding = first.block.transactions[0].hash();
        let point = OutPoint::new(funding, 0);
        let spend = Transaction::new(
            vec![TxInput::new(point, script::unlock_pubkey(&keypair, &point))],
            vec![TxOutput::new(4 * COIN, "OP_TRUE")],
        );
        // Spends an output created by `spend` in the same batch.
        let chained = Transaction::new(
            vec![TxInput::new(OutPoint::new(spend.hash(), 0), "")],
            vec![TxOutput::new(3 * COIN, "OP_TRUE")],
        );
        let double = Transaction::new(
            vec![TxInput::new(point, script::unlock_pubkey(&keypair, &point))],
            vec![TxOutput::new(1, "OP_TRUE")],
        );

        let mined = miner.mine(&[spend.clone(), chained.clone(), double.clone()]);
        assert_eq!(mined.considered.len(), 3);
        assert_eq!(mined.accepted, vec![spend.hash(), chained.hash()]);
        assert_eq!(mined.rejected.len(), 1);
        assert_eq!(mined.rejected[0].0, double.hash());
        assert_eq!(mined.fees, 2 * COIN);

        let coinbase = mined.block.coinbase().unwrap();
        assert_eq!(coinbase.outputs[0].value, 7 * COIN);
        assert!(!mined.utxos.has_reference(funding, 0));
        assert!(!mined.utxos.has_reference(spend.hash(), 0));
        assert!(mined.utxos.has_reference(chained.hash(), 0));
        assert!(BlockValidator::validate(&mined.block, &state).is_ok());
    }

    #[test]
    fn test_batch_size_limits_candidates() {
        let keypair = Keypair::generate();
        let state = LedgerState::new();
        let mut cfg = config(3);
        cfg.min_batch = 2;
        cfg.max_batch = 2;
        let mut miner = Miner::new(keypair.public_key, state.snapshot(), cfg, CheckSigPolicy::Stubbed);

        let pool: Vec<Transaction> = (0..5u32)
            .map(|i| {
                let input = TxInput::new(OutPoint::new(Hash::ZERO, i), "OP_1");
                Transaction::new(vec![input], vec![TxOutput::new(1, "OP_1")])
            })
            .collect();
        let mined = miner.mine(&pool);
        assert_eq!(mined.considered, vec![pool[0].hash(), pool[1].hash()]);
    }

    #[test]
    fn test_mining_does_not_touch_snapshot() {
        let keypair = Keypair::generate();
        let state = LedgerState::new();
        let snapshot = state.snapshot();
        let mut miner = Miner::new(keypair.public_key, snapshot.clone(), config(4), CheckSigPolicy::Stubbed);
        miner.mine(&[]);
        assert!(miner.snapshot().utxos.is_empty());
        assert_eq!(miner.snapshot(), &snapshot);
    }

    #[test]
    fn test_seeded_miners_draw_alike() {
        let state = LedgerState::new();
        let cfg = MinerConfig {
            seed: Some(99),
            ..MinerConfig::default()
        };
        let key = Keypair::generate().public_key;
        let mut a = Miner::new(key, state.snapshot(), cfg.clone(), CheckSigPolicy::Stubbed);
        let mut b = Miner::new(key, state.snapshot(), cfg, CheckSigPolicy::Stubbed);
        assert_eq!(a.rng.gen::<u64>(), b.rng.gen::<u64>());
    }
}
