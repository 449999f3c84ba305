//! Power-of-d-choices routing with a heavy-hitter round-robin bypass
//!
//! Every source keeps its own heavy-hitter summary. A key whose estimated
//! share of the source's traffic exceeds `d / (N * threshold)` is a heavy
//! hitter and is sprayed across all servers by a per-source round-robin
//! cursor. Every other key samples `d` servers through independent seeded
//! hashes and goes to the one with the smallest combined load at that source.

use std::sync::Arc;

use tracing::{debug, info};

use super::{least_loaded, RouteInfo, RoutingError, StreamPartitioner};
use crate::{
    config::{ConfigError, ConfigResult, ConfigValidator, PowerOfChoicesConfig},
    core::ServerRef,
    metrics::{RouterMetrics, PATH_HEAVY_HITTER, PATH_POWER_OF_CHOICES},
    sketch::{Counter, FrequentItems, HashFamily, SeededHashFamily, TopKEstimator},
};

const POLICY_NAME: &str = "power_of_choices";

/// Routing state owned by one input stream
#[derive(Debug)]
struct SourceState<T> {
    topk: T,
    /// Next server for heavy-hitter traffic
    cursor: usize,
    heavy_load: Vec<u64>,
    normal_load: Vec<u64>,
    total_seen: u64,
    choice_count: usize,
}

impl<T: TopKEstimator> SourceState<T> {
    fn new(topk: T, num_servers: usize, choice_count: usize) -> Self {
        Self {
            topk,
            cursor: 0,
            heavy_load: vec![0; num_servers],
            normal_load: vec![0; num_servers],
            total_seen: 0,
            choice_count,
        }
    }

    #[inline]
    fn combined_load(&self, server: usize) -> u64 {
        self.normal_load[server] + self.heavy_load[server]
    }

    /// Probability a key must exceed to count as a heavy hitter
    fn probability_threshold(&self, num_servers: usize, threshold: u32) -> f64 {
        self.choice_count as f64 / (num_servers as f64 * threshold as f64)
    }

    fn is_heavy(counter: &Counter, probability: f64, total_seen: u64) -> bool {
        (counter.count + counter.error) as f64 / total_seen as f64 > probability
    }
}

/// Heavy-hitter aware power-of-d-choices router
#[derive(Debug)]
pub struct PowerOfChoicesRouter<T = FrequentItems, H = SeededHashFamily> {
    servers: Vec<Arc<dyn ServerRef>>,
    granularity: u64,
    threshold: u32,
    sources: Vec<SourceState<T>>,
    hashes: H,
    /// Scratch buffer for sampled candidates
    candidates: Vec<usize>,
}

impl PowerOfChoicesRouter {
    /// Build a router with frequent-items summaries and the seeded xxh3 family.
    ///
    /// The family gets one hash slot per server, or more if a source samples
    /// more choices than there are servers.
    pub fn new(
        config: &PowerOfChoicesConfig,
        servers: Vec<Arc<dyn ServerRef>>,
    ) -> ConfigResult<Self> {
        let capacity = config.topk_capacity;
        let slots = servers.len().max(config.max_choice_count());
        Self::with_estimators(
            config,
            servers,
            || FrequentItems::new(capacity),
            SeededHashFamily::new(slots, config.hash_seed),
        )
    }
}

impl<T: TopKEstimator, H: HashFamily> PowerOfChoicesRouter<T, H> {
    /// Build a router from caller-supplied collaborators. `make_topk` is called
    /// once per source.
    pub fn with_estimators<F>(
        config: &PowerOfChoicesConfig,
        servers: Vec<Arc<dyn ServerRef>>,
        mut make_topk: F,
        hashes: H,
    ) -> ConfigResult<Self>
    where
        F: FnMut() -> T,
    {
        ConfigValidator::validate_power_of_choices(config, servers.len())?;
        let granularities: Vec<u64> = servers.iter().map(|s| s.granularity()).collect();
        ConfigValidator::validate_granularities(&granularities)?;

        if hashes.slots() < config.max_choice_count() {
            return Err(ConfigError::IncompatibleConfig {
                reason: format!(
                    "hash family has {} slots but a source samples {} choices",
                    hashes.slots(),
                    config.max_choice_count()
                ),
            });
        }

        let num_servers = servers.len();
        let sources = (0..config.num_sources)
            .map(|s| SourceState::new(make_topk(), num_servers, config.choice_count_for(s)))
            .collect();

        info!(
            "Power-of-choices router: {} servers, {} sources, threshold {}, default choices {}",
            num_servers, config.num_sources, config.threshold, config.default_choice_count
        );

        Ok(Self {
            granularity: granularities[0],
            servers,
            threshold: config.threshold,
            sources,
            hashes,
            candidates: Vec::with_capacity(config.max_choice_count()),
        })
    }

    /// Route `key` arriving on `source` at `timestamp` to a server index
    pub fn route(&mut self, timestamp: u64, key: &str, source: usize) -> Result<usize, RoutingError> {
        let num_servers = self.servers.len();
        let num_sources = self.sources.len();
        let state = self
            .sources
            .get_mut(source)
            .ok_or(RoutingError::InvalidSource {
                source_id: source,
                num_sources,
            })?;

        state.topk.offer(key);
        state.total_seen += 1;

        let probability = state.probability_threshold(num_servers, self.threshold);
        let heavy = state
            .topk
            .counter(key)
            .is_some_and(|c| SourceState::<T>::is_heavy(&c, probability, state.total_seen));

        if heavy {
            let selected = state.cursor;
            state.heavy_load[selected] += 1;
            state.cursor = (state.cursor + 1) % num_servers;
            self.servers[selected].record_transition(timestamp);

            debug!(
                "Heavy hitter {} from source {} -> server {} (round robin)",
                key, source, selected
            );
            RouterMetrics::record_decision(POLICY_NAME, PATH_HEAVY_HITTER);
            return Ok(selected);
        }

        self.candidates.clear();
        for slot in 0..state.choice_count {
            self.candidates
                .push(self.hashes.server_index(slot, key.as_bytes(), num_servers));
        }

        // Choice counts are validated to be >= 1, so there is always a candidate
        let selected = least_loaded(self.candidates.iter().copied(), |s| state.combined_load(s))
            .unwrap_or_default();
        state.normal_load[selected] += 1;

        debug!(
            "Power-of-{} selection for {} from source {}: candidates {:?} -> server {}",
            state.choice_count, key, source, self.candidates, selected
        );
        RouterMetrics::record_decision(POLICY_NAME, PATH_POWER_OF_CHOICES);
        Ok(selected)
    }

    fn source(&self, source: usize) -> Result<&SourceState<T>, RoutingError> {
        self.sources.get(source).ok_or(RoutingError::InvalidSource {
            source_id: source,
            num_sources: self.sources.len(),
        })
    }

    /// Items the source currently classifies as heavy hitters
    pub fn heavy_hitters(&self, source: usize) -> Result<Vec<Counter>, RoutingError> {
        let state = self.source(source)?;
        if state.total_seen == 0 {
            return Ok(Vec::new());
        }
        let probability = state.probability_threshold(self.servers.len(), self.threshold);
        Ok(state
            .topk
            .top_k(state.topk.capacity())
            .into_iter()
            .filter(|c| SourceState::<T>::is_heavy(c, probability, state.total_seen))
            .collect())
    }

    /// Ordinary-key load the source has sent to each server
    pub fn normal_loads(&self, source: usize) -> Result<&[u64], RoutingError> {
        Ok(&self.source(source)?.normal_load)
    }

    /// Heavy-hitter load the source has sent to each server
    pub fn heavy_loads(&self, source: usize) -> Result<&[u64], RoutingError> {
        Ok(&self.source(source)?.heavy_load)
    }

    pub fn combined_load(&self, source: usize, server: usize) -> Result<u64, RoutingError> {
        Ok(self.source(source)?.combined_load(server))
    }

    pub fn total_seen(&self, source: usize) -> Result<u64, RoutingError> {
        Ok(self.source(source)?.total_seen)
    }

    pub fn choice_count(&self, source: usize) -> Result<usize, RoutingError> {
        Ok(self.source(source)?.choice_count)
    }

    /// Server the next heavy hitter from `source` will be sent to
    pub fn cursor(&self, source: usize) -> Result<usize, RoutingError> {
        Ok(self.source(source)?.cursor)
    }

    pub fn num_sources(&self) -> usize {
        self.sources.len()
    }

    pub fn granularity(&self) -> u64 {
        self.granularity
    }

    pub fn servers(&self) -> &[Arc<dyn ServerRef>] {
        &self.servers
    }

    /// Publish the per-server load summed over all sources as gauges
    pub fn publish_loads(&self) {
        for server in 0..self.servers.len() {
            let load: u64 = self.sources.iter().map(|s| s.combined_load(server)).sum();
            RouterMetrics::set_server_load(POLICY_NAME, server, load);
        }
    }
}

impl<T: TopKEstimator, H: HashFamily> StreamPartitioner for PowerOfChoicesRouter<T, H> {
    fn partition(&mut self, info: &RouteInfo<'_>) -> Result<usize, RoutingError> {
        self.route(info.timestamp, info.key, info.source)
    }

    fn num_servers(&self) -> usize {
        self.servers.len()
    }

    fn name(&self) -> &'static str {
        POLICY_NAME
    }
}
