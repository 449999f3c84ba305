//! Heavy-hitter summary on the datasketches frequent-items sketch

use std::fmt;

use datasketches::frequencies::{ErrorType, FrequentItemsSketch};

use super::{Counter, TopKEstimator};

/// Smallest map the sketch accepts
pub const MIN_MAP_SIZE: usize = 8;

/// Misra-Gries style frequent-items summary
///
/// Counts are exact while fewer than `0.75 * capacity` distinct items have
/// been offered. Past that the sketch purges small counters, and each
/// reported `count` may overestimate the true count by at most `error`.
pub struct FrequentItems {
    capacity: usize,
    sketch: FrequentItemsSketch<String>,
}

impl FrequentItems {
    /// `capacity` is rounded up to a power of two of at least `MIN_MAP_SIZE`.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(MIN_MAP_SIZE).next_power_of_two();
        Self {
            capacity,
            sketch: FrequentItemsSketch::new(capacity),
        }
    }

    fn to_counter(item: String, estimate: u64, lower_bound: u64) -> Counter {
        Counter {
            item,
            count: estimate,
            error: estimate.saturating_sub(lower_bound),
        }
    }
}

impl fmt::Debug for FrequentItems {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrequentItems")
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

impl TopKEstimator for FrequentItems {
    fn offer(&mut self, item: &str) {
        self.sketch.update(item.to_string());
    }

    fn counter(&self, item: &str) -> Option<Counter> {
        let key = item.to_string();
        let estimate = self.sketch.estimate(&key);
        if estimate == 0 {
            return None;
        }
        let lower_bound = self.sketch.lower_bound(&key);
        Some(Self::to_counter(key, estimate, lower_bound))
    }

    fn top_k(&self, k: usize) -> Vec<Counter> {
        let mut counters: Vec<Counter> = self
            .sketch
            .frequent_items(ErrorType::NoFalseNegatives)
            .into_iter()
            .map(|row| Self::to_counter(row.item().clone(), row.estimate(), row.lower_bound()))
            .collect();
        counters.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.item.cmp(&b.item)));
        counters.truncate(k);
        counters
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}
