use serde::{Deserialize, Serialize};

use super::ConfigResult;
use crate::sketch::DEFAULT_HASH_SEED;

/// Partitioner selection and its option set
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "policy")]
pub enum PartitionerConfig {
    #[serde(rename = "power_of_choices")]
    PowerOfChoices(PowerOfChoicesConfig),

    #[serde(rename = "sticky")]
    Sticky(StickyConfig),
}

impl PartitionerConfig {
    pub fn name(&self) -> &'static str {
        match self {
            PartitionerConfig::PowerOfChoices(_) => "power_of_choices",
            PartitionerConfig::Sticky(_) => "sticky",
        }
    }

    /// Parse a configuration document such as
    /// `{"policy": "sticky", "num_servers": 4, "delta": 0.1}`
    pub fn from_json_str(raw: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Options for the power-of-choices router with heavy-hitter bypass
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PowerOfChoicesConfig {
    /// Number of independent input streams feeding the router
    pub num_sources: usize,
    /// Baseline used to scale the heavy-hitter probability threshold
    pub threshold: u32,
    /// Hash choices sampled per ordinary key
    #[serde(default = "default_choice_count")]
    pub default_choice_count: usize,
    /// Per-source overrides of the choice count, indexed by source id
    #[serde(default)]
    pub choice_counts: Vec<usize>,
    /// Capacity of each source's heavy-hitter summary
    #[serde(default = "default_topk_capacity")]
    pub topk_capacity: usize,
    /// Base seed of the hash family
    #[serde(default = "default_hash_seed")]
    pub hash_seed: u64,
}

impl PowerOfChoicesConfig {
    pub fn new(num_sources: usize, threshold: u32) -> Self {
        Self {
            num_sources,
            threshold,
            default_choice_count: default_choice_count(),
            choice_counts: Vec::new(),
            topk_capacity: default_topk_capacity(),
            hash_seed: default_hash_seed(),
        }
    }

    /// Choice count in effect for `source`
    pub fn choice_count_for(&self, source: usize) -> usize {
        self.choice_counts
            .get(source)
            .copied()
            .unwrap_or(self.default_choice_count)
    }

    /// Largest choice count any source may use
    pub fn max_choice_count(&self) -> usize {
        self.choice_counts
            .iter()
            .copied()
            .chain(std::iter::once(self.default_choice_count))
            .max()
            .unwrap_or(self.default_choice_count)
    }
}

/// Options for the sticky skew-aware router
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StickyConfig {
    pub num_servers: usize,
    /// Frequency above which a key is treated as hot, in `(0, 1]`
    pub delta: f64,
    /// Regional load imbalance tolerated before a hot key spreads
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
    /// Lossy counting error as a fraction of `delta`
    #[serde(default = "default_error_ratio")]
    pub error_ratio: f64,
    /// Upper bound on keys tracked by the frequency estimator
    #[serde(default)]
    pub max_tracked_keys: Option<usize>,
    /// HyperLogLog precision of the global cardinality estimator
    #[serde(default = "default_global_precision")]
    pub global_precision: u8,
    /// HyperLogLog precision of each per-server cardinality estimator
    #[serde(default = "default_server_precision")]
    pub server_precision: u8,
    #[serde(default = "default_hash_seed")]
    pub hash_seed: u64,
}

impl StickyConfig {
    pub fn new(num_servers: usize, delta: f64) -> Self {
        Self {
            num_servers,
            delta,
            epsilon: default_epsilon(),
            error_ratio: default_error_ratio(),
            max_tracked_keys: None,
            global_precision: default_global_precision(),
            server_precision: default_server_precision(),
            hash_seed: default_hash_seed(),
        }
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_max_tracked_keys(mut self, limit: usize) -> Self {
        self.max_tracked_keys = Some(limit);
        self
    }

    /// Error handed to the lossy counting estimator
    pub fn lossy_counting_error(&self) -> f64 {
        self.delta * self.error_ratio
    }
}

fn default_choice_count() -> usize {
    2
}

fn default_topk_capacity() -> usize {
    100
}

fn default_hash_seed() -> u64 {
    DEFAULT_HASH_SEED
}

fn default_epsilon() -> f64 {
    0.01
}

fn default_error_ratio() -> f64 {
    0.1
}

fn default_global_precision() -> u8 {
    14
}

fn default_server_precision() -> u8 {
    12
}
