//! Seeded xxh3 hash family

use rand::{rngs::StdRng, Rng, SeedableRng};
use xxhash_rust::xxh3::xxh3_64_with_seed;

use super::HashFamily;

/// Default base seed used when the configuration does not provide one
pub const DEFAULT_HASH_SEED: u64 = 0x5ca1_ab1e_d15c_0b01;

/// `xxh3_64` keyed by one seed per slot
///
/// Seeds are drawn from a `StdRng` seeded with the base seed, so two families
/// built from the same base seed and slot count hash identically.
#[derive(Debug, Clone)]
pub struct SeededHashFamily {
    seeds: Vec<u64>,
}

impl SeededHashFamily {
    pub fn new(slots: usize, base_seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(base_seed);
        let seeds = (0..slots.max(1)).map(|_| rng.random::<u64>()).collect();
        Self { seeds }
    }

    /// Build a family from explicit seeds. An empty list yields one zero seed.
    pub fn with_seeds(seeds: Vec<u64>) -> Self {
        if seeds.is_empty() {
            return Self { seeds: vec![0] };
        }
        Self { seeds }
    }

    pub fn seeds(&self) -> &[u64] {
        &self.seeds
    }
}

impl HashFamily for SeededHashFamily {
    #[inline]
    fn hash(&self, slot: usize, bytes: &[u8]) -> u64 {
        let seed = self.seeds[slot % self.seeds.len()];
        xxh3_64_with_seed(bytes, seed)
    }

    fn slots(&self) -> usize {
        self.seeds.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_base_seed_is_reproducible() {
        let a = SeededHashFamily::new(4, 42);
        let b = SeededHashFamily::new(4, 42);
        assert_eq!(a.seeds(), b.seeds());
        for slot in 0..4 {
            assert_eq!(a.hash(slot, b"user-17"), b.hash(slot, b"user-17"));
        }
    }

    #[test]
    fn test_slots_are_independent() {
        let family = SeededHashFamily::new(3, 7);
        let h0 = family.hash(0, b"key");
        let h1 = family.hash(1, b"key");
        let h2 = family.hash(2, b"key");
        assert!(h0 != h1 || h1 != h2);
    }

    #[test]
    fn test_server_index_in_range() {
        let family = SeededHashFamily::new(2, DEFAULT_HASH_SEED);
        for i in 0..500 {
            let key = format!("k{i}");
            for slot in 0..2 {
                assert!(family.server_index(slot, key.as_bytes(), 7) < 7);
            }
        }
    }

    #[test]
    fn test_spread_across_servers() {
        let family = SeededHashFamily::new(1, DEFAULT_HASH_SEED);
        let mut counts = [0usize; 4];
        for i in 0..4000 {
            let key = format!("key-{i}");
            counts[family.server_index(0, key.as_bytes(), 4)] += 1;
        }
        for count in counts {
            assert!(count > 800, "poor spread: {counts:?}");
        }
    }

    #[test]
    fn test_empty_seed_list_falls_back_to_one_slot() {
        let family = SeededHashFamily::with_seeds(vec![]);
        assert_eq!(family.slots(), 1);
        assert_eq!(family.hash(0, b"x"), xxh3_64_with_seed(b"x", 0));
    }
}
