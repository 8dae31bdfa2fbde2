//! Node orchestration for scriptchain.
//!
//! This crate brings the components together into a running system:
//! - **Mempool**: arrival-ordered pool of pending transactions
//! - **Wallet**: staged transaction builder with coin selection
//! - **Node**: owner of the canonical ledger, wallets and miners
//!
//! # Example
//!
//! ```rust,no_run
//! use scriptchain_chain::{Node, NodeConfig};
//!
//! let mut node = Node::new(NodeConfig::default());
//! node.create_wallet("alice").unwrap();
//! node.create_wallet("bob").unwrap();
//! node.add_miner("alice").unwrap();
//!
//! // Genesis pays the miner, then alice can spend.
//! node.mine(Some("alice")).unwrap();
//! node.transfer("alice", "bob", 1_000, None).unwrap();
//! node.mine(None).unwrap();
//! ```

pub mod mempool;
pub mod node;
pub mod wallet;

// Re-export commonly used types
pub use mempool::{Mempool, MempoolConfig, MempoolError, MempoolStats};
pub use node::{HistoryEntry, Node, NodeConfig, NodeError, BOOTSTRAP_WALLET};
pub use wallet::{StagedInput, Wallet, WalletError};
