//! In-memory ledger state for scriptchain.
//!
//! This crate holds the chain's authoritative data:
//! - `Blockchain`: the append-only block list with linear lookups
//! - `UtxoSet`: the references to outputs that are still spendable
//! - `LedgerSnapshot`: frozen copies handed out after each accepted block
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                 Node (owner)                 │
//! │          LedgerState { chain, utxos }        │
//! └───────────────┬──────────────────────────────┘
//!                 │ snapshot() after each block
//!      ┌──────────┴───────────┐
//!      ▼                      ▼
//! ┌──────────┐          ┌──────────┐
//! │ Wallets  │          │  Miners  │
//! │ (read)   │          │ (copy)   │
//! └──────────┘          └──────────┘
//! ```

pub mod chain;
pub mod state;
pub mod utxo;

// Re-export commonly used types
pub use chain::Blockchain;
pub use state::{LedgerSnapshot, LedgerState};
pub use utxo::UtxoSet;
