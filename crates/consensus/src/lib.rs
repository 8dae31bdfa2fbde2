//! Proof-of-work consensus for scriptchain.
//!
//! This crate provides:
//! - Script-based transaction validation against a spendable set
//! - Block validation (structure, merkle root, parent link, proof-of-work)
//! - The miner: batch selection, coinbase, nonce search
//!
//! # Example
//!
//! ```rust,no_run
//! use scriptchain_consensus::{BlockValidator, Miner, MinerConfig};
//! use scriptchain_core::Keypair;
//! use scriptchain_ledger::LedgerState;
//! use scriptchain_vm::CheckSigPolicy;
//!
//! let mut ledger = LedgerState::new();
//! let keypair = Keypair::generate();
//! let mut miner = Miner::new(
//!     keypair.public_key,
//!     ledger.snapshot(),
//!     MinerConfig::default(),
//!     CheckSigPolicy::Stubbed,
//! );
//!
//! let mined = miner.mine(&[]);
//! BlockValidator::validate(&mined.block, &ledger).unwrap();
//! ledger.commit(mined.block, mined.utxos);
//! ```

pub mod miner;
pub mod pow;
pub mod validator;

// Re-export commonly used types
pub use miner::{MinedBlock, Miner, MinerConfig};
pub use pow::{search_nonce, verify_pow, DifficultyPolicy, SubsidyPolicy};
pub use validator::{BlockValidator, TransactionError, TransactionValidator, ValidationError};
