//! Node orchestration.
//!
//! The node owns the canonical ledger and the pending pool. Wallets and
//! miners each hold a snapshot of the ledger; after every accepted block
//! the node hands all of them a fresh one.

use crate::mempool::{Mempool, MempoolConfig, MempoolError};
use crate::wallet::{Wallet, WalletError};
use chrono::{DateTime, Utc};
use rand::{rngs::StdRng, seq::IteratorRandom, Rng, SeedableRng};
use scriptchain_consensus::{BlockValidator, MinedBlock, Miner, MinerConfig, ValidationError};
use scriptchain_core::{Block, Hash, Keypair, OutPoint, PublicKey, Transaction, TxOutput, COIN};
use scriptchain_ledger::LedgerState;
use scriptchain_vm::CheckSigPolicy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that can occur during node operations.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("wallet error: {0}")]
    Wallet(#[from] WalletError),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("mempool error: {0}")]
    Mempool(#[from] MempoolError),

    #[error("unknown wallet: {0}")]
    UnknownWallet(String),

    #[error("unknown miner: {0}")]
    UnknownMiner(String),

    #[error("wallet already exists: {0}")]
    DuplicateWallet(String),

    #[error("miner already exists: {0}")]
    DuplicateMiner(String),

    #[error("no miners registered")]
    NoMiners,

    #[error("invalid config: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, NodeError>;

/// Wallet created by [`Node::bootstrap`]; it mines the first block and
/// funds [`Node::random_transfers`].
pub const BOOTSTRAP_WALLET: &str = "satoshi";

/// Bounds of a random transfer, in base units (0.0001 to 0.001 coins).
const RANDOM_TRANSFER_MIN: u64 = COIN / 10_000;
const RANDOM_TRANSFER_MAX: u64 = COIN / 1_000;

/// Node configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub miner: MinerConfig,
    pub mempool: MempoolConfig,
    /// Lower bound of the global fee, in base units.
    pub min_fee: u64,
    /// Upper bound of the global fee, in base units.
    pub max_fee: u64,
    pub checksig: CheckSigPolicy,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            miner: MinerConfig::default(),
            mempool: MempoolConfig::default(),
            min_fee: 100,
            max_fee: 1000,
            checksig: CheckSigPolicy::default(),
        }
    }
}

impl NodeConfig {
    /// Parse a JSON config. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// One accepted block, as recorded by the node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Name of the miner that produced the block.
    pub miner: String,
    pub height: u64,
    pub hash: Hash,
    pub timestamp: DateTime<Utc>,
}

/// Main node struct that owns the ledger and all participants.
pub struct Node {
    config: NodeConfig,
    ledger: LedgerState,
    mempool: Mempool,
    wallets: BTreeMap<String, Wallet>,
    miners: BTreeMap<String, Miner>,
    history: Vec<HistoryEntry>,
    fee: u64,
    rng: StdRng,
}

impl Node {
    pub fn new(config: NodeConfig) -> Self {
        let mut rng = match config.miner.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let fee = draw_fee(&config, &mut rng);
        Self {
            mempool: Mempool::with_config(config.mempool.clone()),
            config,
            ledger: LedgerState::new(),
            wallets: BTreeMap::new(),
            miners: BTreeMap::new(),
            history: Vec::new(),
            fee,
            rng,
        }
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn ledger(&self) -> &LedgerState {
        &self.ledger
    }

    pub fn mempool(&self) -> &Mempool {
        &self.mempool
    }

    /// The fee every transfer currently pays.
    pub fn fee(&self) -> u64 {
        self.fee
    }

    /// Create a wallet with a fresh key pair.
    pub fn create_wallet(&mut self, name: &str) -> Result<PublicKey> {
        self.add_wallet(name, Keypair::generate())
    }

    /// Register a wallet for an existing key pair.
    pub fn add_wallet(&mut self, name: &str, keypair: Keypair) -> Result<PublicKey> {
        if self.wallets.contains_key(name) {
            return Err(NodeError::DuplicateWallet(name.to_string()));
        }
        let public_key = keypair.public_key;
        let wallet = Wallet::new(keypair, self.ledger.snapshot(), self.config.checksig);
        self.wallets.insert(name.to_string(), wallet);
        info!(wallet = name, key = %public_key, "created wallet");
        Ok(public_key)
    }

    /// Turn an existing wallet into a miner paying coinbases to its key.
    pub fn add_miner(&mut self, name: &str) -> Result<()> {
        if self.miners.contains_key(name) {
            return Err(NodeError::DuplicateMiner(name.to_string()));
        }
        let identity = self.wallet(name)?.public_key();

        let mut config = self.config.miner.clone();
        // Distinct seeds so seeded miners do not draw identical rounds.
        config.seed = config
            .seed
            .map(|seed| seed.wrapping_add(self.miners.len() as u64 + 1));

        let miner = Miner::new(identity, self.ledger.snapshot(), config, self.config.checksig);
        self.miners.insert(name.to_string(), miner);
        info!(miner = name, "registered miner");
        Ok(())
    }

    pub fn wallet(&self, name: &str) -> Result<&Wallet> {
        self.wallets
            .get(name)
            .ok_or_else(|| NodeError::UnknownWallet(name.to_string()))
    }

    pub fn wallet_mut(&mut self, name: &str) -> Result<&mut Wallet> {
        self.wallets
            .get_mut(name)
            .ok_or_else(|| NodeError::UnknownWallet(name.to_string()))
    }

    pub fn wallet_names(&self) -> Vec<String> {
        self.wallets.keys().cloned().collect()
    }

    pub fn miner_names(&self) -> Vec<String> {
        self.miners.keys().cloned().collect()
    }

    pub fn wallet_count(&self) -> usize {
        self.wallets.len()
    }

    /// Create the bootstrap wallet, make it a miner and mine the first block.
    pub fn bootstrap(&mut self) -> Result<MinedBlock> {
        self.create_wallet(BOOTSTRAP_WALLET)?;
        self.add_miner(BOOTSTRAP_WALLET)?;
        self.mine(Some(BOOTSTRAP_WALLET))
    }

    /// Promote up to `n` randomly chosen wallets that do not mine yet.
    ///
    /// Returns the names of the new miners.
    pub fn add_random_miners(&mut self, n: usize) -> Result<Vec<String>> {
        let chosen = self
            .wallets
            .keys()
            .filter(|name| !self.miners.contains_key(*name))
            .cloned()
            .choose_multiple(&mut self.rng, n);
        for name in &chosen {
            self.add_miner(name)?;
        }
        Ok(chosen)
    }

    /// Queue up to `n` small transfers from the bootstrap wallet to random
    /// wallets, with change back to the bootstrap wallet.
    ///
    /// Stops at the first transfer that fails, usually because the bootstrap
    /// wallet has no unreserved outputs left until the next block. Returns
    /// the hashes of the queued transactions.
    pub fn random_transfers(&mut self, n: usize) -> Result<Vec<Hash>> {
        self.wallet(BOOTSTRAP_WALLET)?;
        let targets = self.wallet_names();

        let mut queued = Vec::with_capacity(n);
        for _ in 0..n {
            let Some(target) = targets.iter().choose(&mut self.rng) else {
                break;
            };
            let amount = self.rng.gen_range(RANDOM_TRANSFER_MIN..=RANDOM_TRANSFER_MAX);
            match self.transfer(BOOTSTRAP_WALLET, target, amount, Some(BOOTSTRAP_WALLET)) {
                Ok(hash) => queued.push(hash),
                Err(err) => {
                    warn!(to = %target, amount, %err, "random transfer stopped");
                    break;
                }
            }
        }
        Ok(queued)
    }

    /// Queue a transaction for mining.
    pub fn submit(&mut self, tx: Transaction) -> Result<Hash> {
        let hash = self.mempool.add(tx)?;
        debug!(tx = %hash, pending = self.mempool.len(), "submitted transaction");
        Ok(hash)
    }

    /// Pay `amount` from one wallet to another at the current fee.
    ///
    /// Change goes to `change_to`, or back to `from` when `None`.
    pub fn transfer(
        &mut self,
        from: &str,
        to: &str,
        amount: u64,
        change_to: Option<&str>,
    ) -> Result<Hash> {
        let recipient = self.wallet(to)?.public_key();
        let change = match change_to {
            Some(name) => self.wallet(name)?.public_key(),
            None => self.wallet(from)?.public_key(),
        };
        let fee = self.fee;
        let tx = self
            .wallet_mut(from)?
            .transfer(&recipient, amount, &change, fee)?;
        info!(from, to, amount, fee, "transfer");
        self.submit(tx)
    }

    /// Run one mining round with the named miner, or a random one.
    ///
    /// The block is validated, appended, and every participant receives a
    /// new snapshot. Transactions the round looked at leave the pool whether
    /// or not they made it into the block.
    pub fn mine(&mut self, miner_name: Option<&str>) -> Result<MinedBlock> {
        let name = match miner_name {
            Some(name) if self.miners.contains_key(name) => name.to_string(),
            Some(name) => return Err(NodeError::UnknownMiner(name.to_string())),
            None => self
                .miners
                .keys()
                .choose(&mut self.rng)
                .cloned()
                .ok_or(NodeError::NoMiners)?,
        };

        let pending = self.mempool.get_all();
        let mined = self
            .miners
            .get_mut(&name)
            .ok_or_else(|| NodeError::UnknownMiner(name.clone()))?
            .mine(&pending);

        BlockValidator::validate(&mined.block, &self.ledger)?;
        for (hash, reason) in &mined.rejected {
            warn!(tx = %hash, %reason, "dropped transaction");
        }

        self.ledger.commit(mined.block.clone(), mined.utxos.clone());
        self.broadcast();
        self.fee = draw_fee(&self.config, &mut self.rng);
        self.mempool.remove_batch(&mined.considered);
        self.history.push(HistoryEntry {
            miner: name.clone(),
            height: mined.block.height(),
            hash: mined.block.hash(),
            timestamp: mined.block.timestamp,
        });

        info!(
            miner = %name,
            height = mined.block.height(),
            txs = mined.block.tx_count(),
            fee = self.fee,
            "block appended"
        );
        Ok(mined)
    }

    /// Hand every wallet and miner a snapshot of the current ledger.
    fn broadcast(&mut self) {
        let snapshot = self.ledger.snapshot();
        for wallet in self.wallets.values_mut() {
            wallet.sync(snapshot.clone());
        }
        for miner in self.miners.values_mut() {
            miner.sync(snapshot.clone());
        }
        debug!(
            wallets = self.wallets.len(),
            miners = self.miners.len(),
            "broadcast snapshot"
        );
    }

    pub fn balance(&self, name: &str) -> Result<u64> {
        Ok(self.wallet(name)?.balance())
    }

    pub fn spendable_outputs(&self, name: &str) -> Result<Vec<(OutPoint, TxOutput)>> {
        Ok(self.wallet(name)?.spendable_outputs())
    }

    pub fn block(&self, height: u64) -> Option<&Block> {
        self.ledger.blockchain.block_at(height)
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }
}

fn draw_fee<R: Rng>(config: &NodeConfig, rng: &mut R) -> u64 {
    rng.gen_range(config.min_fee..=config.max_fee.max(config.min_fee))
}
