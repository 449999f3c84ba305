#![allow(dead_code)]

use rand::{rngs::StdRng, Rng, SeedableRng};
use skew_router::StickyRouter;

/// `count` keys named `{prefix}-{i}` whose cold-path server is `server`
pub fn keys_with_home(router: &StickyRouter, server: usize, count: usize, prefix: &str) -> Vec<String> {
    (0..)
        .map(|i| format!("{}-{}", prefix, i))
        .filter(|k| router.home_server(k) == server)
        .take(count)
        .collect()
}

/// Deterministic skewed key stream: roughly `hot_share` of the records carry
/// one of `hot_keys` hot keys, the rest are drawn from `cold_keys` cold keys
pub fn skewed_stream(
    seed: u64,
    len: usize,
    hot_keys: usize,
    cold_keys: usize,
    hot_share: f64,
) -> Vec<String> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len)
        .map(|_| {
            if rng.random_bool(hot_share) {
                format!("hot-{}", rng.random_range(0..hot_keys))
            } else {
                format!("cold-{}", rng.random_range(0..cold_keys))
            }
        })
        .collect()
}
