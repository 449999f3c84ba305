//! Approximate streaming primitives consumed by the partitioners
//!
//! The routers only depend on the traits below. Each trait ships with one
//! default implementation so a router can be built without supplying any
//! collaborators; callers with their own sketches plug them in through the
//! generic constructors on the routers.

mod frequent_items;
mod hash;
mod hll;
mod lossy_counting;

pub use frequent_items::{FrequentItems, MIN_MAP_SIZE};
pub use hash::{SeededHashFamily, DEFAULT_HASH_SEED};
pub use hll::{HllCardinality, MAX_PRECISION, MIN_PRECISION};
pub use lossy_counting::LossyCounting;

use std::fmt::Debug;

use thiserror::Error;

/// One monitored item reported by a [`TopKEstimator`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Counter {
    pub item: String,
    /// Approximate occurrence count (may overestimate by at most `error`)
    pub count: u64,
    /// Upper bound on the overestimation carried by `count`
    pub error: u64,
}

/// Heavy-hitter summary with bounded capacity
pub trait TopKEstimator: Send + Debug {
    /// Record one occurrence of `item`
    fn offer(&mut self, item: &str);

    /// Counter for `item` if the summary currently tracks it
    fn counter(&self, item: &str) -> Option<Counter>;

    /// Up to `k` monitored items, highest count first
    fn top_k(&self, k: usize) -> Vec<Counter>;

    /// Number of counters the summary can hold
    fn capacity(&self) -> usize;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrequencyError {
    #[error("frequency table overflow: {tracked} keys tracked, limit {limit}")]
    Overflow { tracked: usize, limit: usize },
}

/// Global approximate frequency counter with lossy-counting semantics
pub trait FrequencyEstimator: Send + Debug {
    /// Record one occurrence of `item`. A failed add leaves the estimator unchanged.
    fn add(&mut self, item: &str) -> Result<(), FrequencyError>;

    /// Approximate number of occurrences of `item` seen so far
    fn estimate_count(&self, item: &str) -> u64;

    /// Total number of items successfully added
    fn size(&self) -> u64;
}

/// Approximate distinct-count structure
pub trait CardinalityEstimator: Send + Debug {
    fn offer(&mut self, item: &str);

    fn cardinality(&self) -> u64;
}

/// Family of independent, deterministic seeded hash functions
pub trait HashFamily: Send + Debug {
    /// Hash `bytes` with the function at `slot`
    fn hash(&self, slot: usize, bytes: &[u8]) -> u64;

    /// Number of independent functions in the family
    fn slots(&self) -> usize;

    /// Reduce the hash at `slot` to a server index in `[0, num_servers)`
    #[inline]
    fn server_index(&self, slot: usize, bytes: &[u8], num_servers: usize) -> usize {
        (self.hash(slot, bytes) % num_servers as u64) as usize
    }
}
