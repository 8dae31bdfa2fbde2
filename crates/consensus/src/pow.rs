//! Proof-of-work: difficulty and subsidy policies and the nonce search.
//!
//! A header is valid when its hash has *exactly* `difficulty` leading zero
//! bits. Hashes with more zero bits than required are rejected too.

use rand::Rng;
use scriptchain_core::{BlockHeader, COIN};
use serde::{Deserialize, Serialize};

/// How a mining round picks its difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyPolicy {
    /// Uniform draw from `min..=max` each round.
    Random { min: u32, max: u32 },
    Fixed(u32),
}

impl Default for DifficultyPolicy {
    fn default() -> Self {
        DifficultyPolicy::Random { min: 1, max: 16 }
    }
}

impl DifficultyPolicy {
    pub fn draw<R: Rng>(&self, rng: &mut R) -> u32 {
        match *self {
            DifficultyPolicy::Random { min, max } => rng.gen_range(min..=max.max(min)),
            DifficultyPolicy::Fixed(d) => d,
        }
    }
}

/// How a mining round picks the newly minted block subsidy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubsidyPolicy {
    /// Whole coins drawn uniformly from `min_coins..=max_coins`.
    Random { min_coins: u64, max_coins: u64 },
    /// A constant amount in base units.
    Fixed(u64),
}

impl Default for SubsidyPolicy {
    fn default() -> Self {
        SubsidyPolicy::Random {
            min_coins: 5,
            max_coins: 10,
        }
    }
}

impl SubsidyPolicy {
    /// Subsidy in base units.
    pub fn draw<R: Rng>(&self, rng: &mut R) -> u64 {
        match *self {
            SubsidyPolicy::Random {
                min_coins,
                max_coins,
            } => rng
                .gen_range(min_coins..=max_coins.max(min_coins))
                .saturating_mul(COIN),
            SubsidyPolicy::Fixed(amount) => amount,
        }
    }
}

/// True when the header hash has exactly `header.difficulty` leading zero bits.
pub fn verify_pow(header: &BlockHeader) -> bool {
    header.meets_difficulty()
}

/// Try `nonce = 0, 1, 2, ...` until the header satisfies its difficulty.
///
/// Unbounded: a difficulty no hash can match (above 256) never returns.
/// Returns the number of hashes tried.
pub fn search_nonce(header: &mut BlockHeader) -> u64 {
    let mut attempts = 0;
    for nonce in 0u64.. {
        header.nonce = nonce;
        attempts += 1;
        if header.meets_difficulty() {
            break;
        }
    }
    attempts
}
