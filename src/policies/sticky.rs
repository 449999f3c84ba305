//! Sticky skew-aware routing driven by lossy counting
//!
//! Cold keys are hashed to a fixed home server. A key whose estimated global
//! frequency exceeds `delta` is hot: it is routed inside its sticky set of
//! servers while those servers stay near the average load, and spreads to the
//! globally least loaded server once their regional imbalance reaches
//! `epsilon`. A key's sticky set only ever grows.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, info, warn};

use super::{least_loaded, RouteInfo, RoutingError, StatsProvider, StreamPartitioner};
use crate::{
    config::{ConfigResult, ConfigValidator, StickyConfig},
    metrics::{RouterMetrics, PATH_COLD, PATH_HOT_BALANCED, PATH_HOT_SPREAD},
    sketch::{
        CardinalityEstimator, FrequencyEstimator, HashFamily, HllCardinality, LossyCounting,
        SeededHashFamily,
    },
};

const POLICY_NAME: &str = "sticky";

/// Lossy-counting driven router with growing per-key server sets
#[derive(Debug)]
pub struct StickyRouter<F = LossyCounting, C = HllCardinality, H = SeededHashFamily> {
    num_servers: usize,
    delta: f64,
    epsilon: f64,
    hashes: H,
    frequency: F,
    loads: Vec<u64>,
    total_cardinality: C,
    server_cardinality: Vec<C>,
    assignments: HashMap<String, BTreeSet<usize>>,
    overflows: u64,
}

impl StickyRouter {
    /// Build a router with lossy counting, HyperLogLog and a single seeded hash
    pub fn new(config: &StickyConfig) -> ConfigResult<Self> {
        ConfigValidator::validate_sticky(config)?;

        let mut frequency = LossyCounting::new(config.lossy_counting_error());
        if let Some(limit) = config.max_tracked_keys {
            frequency = frequency.with_max_entries(limit);
        }
        let server_precision = config.server_precision;

        Self::with_estimators(
            config,
            frequency,
            HllCardinality::new(config.global_precision),
            || HllCardinality::new(server_precision),
            SeededHashFamily::new(1, config.hash_seed),
        )
    }
}

impl<F, C, H> StickyRouter<F, C, H>
where
    F: FrequencyEstimator,
    C: CardinalityEstimator,
    H: HashFamily,
{
    /// Build a router from caller-supplied collaborators. `make_server_cardinality`
    /// is called once per server.
    pub fn with_estimators<M>(
        config: &StickyConfig,
        frequency: F,
        total_cardinality: C,
        mut make_server_cardinality: M,
        hashes: H,
    ) -> ConfigResult<Self>
    where
        M: FnMut() -> C,
    {
        ConfigValidator::validate_sticky(config)?;

        info!(
            "Sticky router: {} servers, delta {}, epsilon {}",
            config.num_servers, config.delta, config.epsilon
        );

        Ok(Self {
            num_servers: config.num_servers,
            delta: config.delta,
            epsilon: config.epsilon,
            hashes,
            frequency,
            loads: vec![0; config.num_servers],
            total_cardinality,
            server_cardinality: (0..config.num_servers)
                .map(|_| make_server_cardinality())
                .collect(),
            assignments: HashMap::new(),
            overflows: 0,
        })
    }

    /// Route `key` to a server index
    pub fn partition_key(&mut self, key: &str) -> usize {
        self.total_cardinality.offer(key);

        if let Err(e) = self.frequency.add(key) {
            self.overflows += 1;
            warn!("Frequency estimator rejected key {}: {}; using last estimate", key, e);
            RouterMetrics::record_estimator_overflow(POLICY_NAME);
        }

        let selected = if self.estimated_frequency(key) <= self.delta {
            RouterMetrics::record_decision(POLICY_NAME, PATH_COLD);
            self.home_server(key)
        } else if self.regional_load_imbalance(key) < self.epsilon {
            RouterMetrics::record_decision(POLICY_NAME, PATH_HOT_BALANCED);
            self.least_loaded_assigned(key)
        } else {
            let selected = least_loaded(0..self.num_servers, |s| self.loads[s]).unwrap_or_default();
            let set = self.assignments.entry(key.to_string()).or_default();
            if set.insert(selected) {
                debug!(
                    "Hot key {} spread to server {} ({} servers assigned)",
                    key,
                    selected,
                    set.len()
                );
                RouterMetrics::record_sticky_spread(POLICY_NAME);
            }
            RouterMetrics::record_decision(POLICY_NAME, PATH_HOT_SPREAD);
            selected
        };

        self.loads[selected] += 1;
        self.server_cardinality[selected].offer(key);
        selected
    }

    /// Server a key is hashed to when it is cold
    pub fn home_server(&self, key: &str) -> usize {
        self.hashes.server_index(0, key.as_bytes(), self.num_servers)
    }

    /// Estimated share of all routed records carrying `key`
    pub fn estimated_frequency(&self, key: &str) -> f64 {
        let total = self.frequency.size();
        if total == 0 {
            return 0.0;
        }
        self.frequency.estimate_count(key) as f64 / total as f64
    }

    /// Relative deviation of the key's servers' load from the average load
    fn regional_load_imbalance(&self, key: &str) -> f64 {
        let average = self.frequency.size().saturating_sub(1) as f64 / self.num_servers as f64;
        if average == 0.0 {
            return 0.0;
        }
        (self.cumulative_average_load(key) as f64 - average) / average
    }

    fn cumulative_average_load(&self, key: &str) -> u64 {
        match self.assignments.get(key) {
            Some(set) if !set.is_empty() => {
                set.iter().map(|&s| self.loads[s]).sum::<u64>() / set.len() as u64
            }
            _ => self.loads[self.home_server(key)],
        }
    }

    /// Least loaded server in the key's sticky set, seeding the set with the
    /// key's home server when it is empty.
    fn least_loaded_assigned(&mut self, key: &str) -> usize {
        if let Some(selected) = self
            .assignments
            .get(key)
            .and_then(|set| least_loaded(set.iter().copied(), |s| self.loads[s]))
        {
            return selected;
        }

        let home = self.home_server(key);
        self.assignments
            .entry(key.to_string())
            .or_default()
            .insert(home);
        debug!("Hot key {} pinned to home server {}", key, home);
        home
    }

    /// Servers ever chosen for a hot key, in ascending order
    pub fn assigned_servers(&self, key: &str) -> Option<&BTreeSet<usize>> {
        self.assignments.get(key)
    }

    /// Number of keys with a sticky assignment
    pub fn hot_keys(&self) -> usize {
        self.assignments.len()
    }

    /// Records routed to each server
    pub fn server_loads(&self) -> &[u64] {
        &self.loads
    }

    /// Approximate distinct keys routed to each server
    pub fn server_cardinalities(&self) -> Vec<u64> {
        self.server_cardinality
            .iter()
            .map(|c| c.cardinality())
            .collect()
    }

    /// Records accounted for by the frequency estimator
    pub fn total_processed(&self) -> u64 {
        self.frequency.size()
    }

    /// Frequency estimator updates rejected so far
    pub fn overflow_count(&self) -> u64 {
        self.overflows
    }

    /// Publish per-server loads and the global cardinality as gauges
    pub fn publish_loads(&self) {
        for (server, &load) in self.loads.iter().enumerate() {
            RouterMetrics::set_server_load(POLICY_NAME, server, load);
        }
        RouterMetrics::set_total_cardinality(POLICY_NAME, self.total_cardinality.cardinality());
    }
}

impl<F, C, H> StreamPartitioner for StickyRouter<F, C, H>
where
    F: FrequencyEstimator,
    C: CardinalityEstimator,
    H: HashFamily,
{
    fn partition(&mut self, info: &RouteInfo<'_>) -> Result<usize, RoutingError> {
        Ok(self.partition_key(info.key))
    }

    fn num_servers(&self) -> usize {
        self.num_servers
    }

    fn name(&self) -> &'static str {
        POLICY_NAME
    }
}

impl<F, C, H> StatsProvider for StickyRouter<F, C, H>
where
    F: FrequencyEstimator,
    C: CardinalityEstimator,
    H: HashFamily,
{
    fn total_cardinality(&self) -> u64 {
        self.total_cardinality.cardinality()
    }
}
