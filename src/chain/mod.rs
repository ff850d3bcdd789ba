pub mod block;
pub mod model;
pub mod pow;

pub use block::{Block, BlockPayload};
pub use model::{Ledger, MiningJob};

/// Base difficulty the carbon adjustment pivots around.
pub const BASE_DIFFICULTY: f64 = 4.0;

/// How strongly credited reduction discounts the difficulty.
pub const REDUCTION_SENSITIVITY: f64 = 0.8;

/// Difficulty clamp. Keep the floor above 1 so every block costs real work.
pub const MIN_DIFFICULTY: u32 = 2;
pub const MAX_DIFFICULTY: u32 = 8;

/// Starting value of the reference reduction baseline.
pub const INITIAL_REFERENCE_REDUCTION: f64 = 1000.0;

/// The baseline is re-smoothed after every block whose index is a positive
/// multiple of this interval.
pub const REFERENCE_SMOOTHING_INTERVAL: u64 = 10;

/// Low-pass weights for the baseline update: keep 0.7 of the old value,
/// blend in 0.3 of the recent mean.
pub const REFERENCE_KEEP_WEIGHT: f64 = 0.7;

/// Miner recorded on the genesis block and sender of issuance/rewards.
pub const SYSTEM_MINER: &str = crate::transaction::SYSTEM_SENTINEL;
