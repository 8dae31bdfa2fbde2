//! Core primitives for scriptchain.
//!
//! This crate provides the fundamental types used throughout the chain:
//! - Hashing (SHA-256, HASH160) over deterministic serialization
//! - Merkle trees with inclusion paths
//! - Ed25519 identities and signatures
//! - UTXO transactions
//! - Blocks and block headers
//! - Standard scripts and unit conversion

pub mod block;
pub mod crypto;
pub mod hash;
pub mod merkle;
pub mod script;
pub mod transaction;
pub mod units;

// Re-export commonly used types at the crate root
pub use block::{Block, BlockHeader};
pub use crypto::{CryptoError, Keypair, PublicKey, Signature};
pub use hash::{hash160, hash_serialized, sha256, sha256_concat, Hash, H256};
pub use merkle::{merkle_root, MerkleNode, MerklePath, MerkleTree, Side};
pub use transaction::{OutPoint, Transaction, TxInput, TxOutput};
pub use units::{to_base_units, to_display_units, UnitError, COIN};
