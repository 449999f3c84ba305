//! Lossy counting frequency estimator

use std::collections::HashMap;

use super::{FrequencyError, FrequencyEstimator};

#[derive(Debug, Clone, Copy)]
struct Entry {
    count: u64,
    /// Maximum possible undercount at insertion time
    delta: u64,
}

/// Manku-Motwani lossy counting
///
/// Items are grouped into buckets of width `ceil(1 / error)`. At every bucket
/// boundary entries whose `count + delta` does not exceed the current bucket
/// id are dropped, which bounds the table to `O(log(error * N) / error)`
/// entries while undercounting any item by at most `error * N`.
#[derive(Debug, Clone)]
pub struct LossyCounting {
    error: f64,
    bucket_width: u64,
    total: u64,
    entries: HashMap<String, Entry>,
    max_entries: Option<usize>,
}

impl LossyCounting {
    /// `error` must lie in `(0, 1]`; callers validate it at configuration time.
    pub fn new(error: f64) -> Self {
        let bucket_width = (1.0 / error).ceil().max(1.0) as u64;
        Self {
            error,
            bucket_width,
            total: 0,
            entries: HashMap::new(),
            max_entries: None,
        }
    }

    /// Bound the number of tracked keys; adds of new keys beyond it fail.
    pub fn with_max_entries(mut self, limit: usize) -> Self {
        self.max_entries = Some(limit);
        self
    }

    pub fn error(&self) -> f64 {
        self.error
    }

    pub fn bucket_width(&self) -> u64 {
        self.bucket_width
    }

    /// Number of keys currently tracked
    pub fn tracked(&self) -> usize {
        self.entries.len()
    }

    fn current_bucket(&self) -> u64 {
        self.total.div_ceil(self.bucket_width)
    }

    fn prune(&mut self) {
        let bucket = self.current_bucket();
        self.entries.retain(|_, e| e.count + e.delta > bucket);
    }
}

impl FrequencyEstimator for LossyCounting {
    fn add(&mut self, item: &str) -> Result<(), FrequencyError> {
        if let Some(entry) = self.entries.get_mut(item) {
            entry.count += 1;
        } else {
            if let Some(limit) = self.max_entries {
                if self.entries.len() >= limit {
                    return Err(FrequencyError::Overflow {
                        tracked: self.entries.len(),
                        limit,
                    });
                }
            }
            // Bucket id of the item being added, i.e. computed with total + 1
            let bucket = (self.total + 1).div_ceil(self.bucket_width);
            self.entries.insert(
                item.to_string(),
                Entry {
                    count: 1,
                    delta: bucket - 1,
                },
            );
        }

        self.total += 1;
        if self.total % self.bucket_width == 0 {
            self.prune();
        }
        Ok(())
    }

    fn estimate_count(&self, item: &str) -> u64 {
        self.entries.get(item).map(|e| e.count).unwrap_or(0)
    }

    fn size(&self) -> u64 {
        self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_are_exact_within_first_bucket() {
        let mut lc = LossyCounting::new(0.01);
        assert_eq!(lc.bucket_width(), 100);
        for item in ["a", "b", "a", "a"] {
            lc.add(item).unwrap();
        }
        assert_eq!(lc.estimate_count("a"), 3);
        assert_eq!(lc.estimate_count("b"), 1);
        assert_eq!(lc.estimate_count("missing"), 0);
        assert_eq!(lc.size(), 4);
    }

    #[test]
    fn test_rare_items_pruned_at_bucket_boundary() {
        let mut lc = LossyCounting::new(0.1);
        assert_eq!(lc.bucket_width(), 10);
        for _ in 0..5 {
            lc.add("hot").unwrap();
        }
        for i in 0..5 {
            lc.add(&format!("rare-{i}")).unwrap();
        }
        // Boundary at 10: rare items have count 1 + delta 0 <= bucket 1
        assert_eq!(lc.tracked(), 1);
        assert_eq!(lc.estimate_count("hot"), 5);
        assert_eq!(lc.estimate_count("rare-0"), 0);
    }

    #[test]
    fn test_undercount_bounded_by_error() {
        let error = 0.05;
        let mut lc = LossyCounting::new(error);
        let mut true_count = 0u64;
        for i in 0..2000 {
            if i % 4 == 0 {
                lc.add("frequent").unwrap();
                true_count += 1;
            } else {
                lc.add(&format!("noise-{i}")).unwrap();
            }
        }
        let estimate = lc.estimate_count("frequent");
        assert!(estimate <= true_count);
        assert!((true_count - estimate) as f64 <= error * lc.size() as f64);
    }

    #[test]
    fn test_overflow_leaves_state_untouched() {
        let mut lc = LossyCounting::new(0.01).with_max_entries(2);
        lc.add("a").unwrap();
        lc.add("b").unwrap();

        let err = lc.add("c").unwrap_err();
        assert_eq!(err, FrequencyError::Overflow { tracked: 2, limit: 2 });
        assert_eq!(lc.size(), 2);
        assert_eq!(lc.estimate_count("c"), 0);

        // Known keys keep counting
        lc.add("a").unwrap();
        assert_eq!(lc.estimate_count("a"), 2);
        assert_eq!(lc.size(), 3);
    }
}
