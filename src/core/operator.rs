//! Pipeline operators
//!
//! An upstream [`StreamOperator`] owns a partitioner and forwards every element
//! to the downstream operator the partitioner picks. Each
//! [`DownstreamOperator`] counts what it receives, which a load-aware policy
//! can read back through [`LoadFeedback`].

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use parking_lot::Mutex;
use tracing::debug;

use crate::{
    config::{ConfigError, ConfigResult},
    policies::{RouteInfo, RoutingError, StreamPartitioner},
    sketch::{CardinalityEstimator, HllCardinality},
};

/// HyperLogLog precision used by downstream operators
pub const DOWNSTREAM_PRECISION: u8 = 12;

/// Load signals a receiver exposes to upstream routing
pub trait LoadFeedback {
    /// Number of elements received so far
    fn load(&self) -> u64;

    /// Approximate number of distinct keys received so far
    fn cardinality(&self) -> u64;
}

/// Receiving side of a partitioned edge
#[derive(Debug)]
pub struct DownstreamOperator {
    element_count: AtomicU64,
    keys: Mutex<HllCardinality>,
}

impl DownstreamOperator {
    pub fn new() -> Self {
        Self::with_precision(DOWNSTREAM_PRECISION)
    }

    pub fn with_precision(precision: u8) -> Self {
        Self {
            element_count: AtomicU64::new(0),
            keys: Mutex::new(HllCardinality::new(precision)),
        }
    }

    /// `count` fresh receivers ready to hand to a [`StreamOperator`]
    pub fn fleet(count: usize) -> Vec<Arc<DownstreamOperator>> {
        (0..count).map(|_| Arc::new(Self::new())).collect()
    }

    pub fn receive_element(&self, key: &str) {
        self.element_count.fetch_add(1, Ordering::Relaxed);
        self.keys.lock().offer(key);
    }
}

impl Default for DownstreamOperator {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadFeedback for DownstreamOperator {
    fn load(&self) -> u64 {
        self.element_count.load(Ordering::Relaxed)
    }

    fn cardinality(&self) -> u64 {
        self.keys.lock().cardinality()
    }
}

/// Upstream operator pairing a partitioner with its receivers
#[derive(Debug)]
pub struct StreamOperator<P> {
    partitioner: P,
    downstream: Vec<Arc<DownstreamOperator>>,
}

impl<P: StreamPartitioner> StreamOperator<P> {
    /// Fails when the receiver count differs from the partitioner's server count.
    pub fn new(partitioner: P, downstream: Vec<Arc<DownstreamOperator>>) -> ConfigResult<Self> {
        if downstream.len() != partitioner.num_servers() {
            return Err(ConfigError::IncompatibleConfig {
                reason: format!(
                    "{} partitioner routes to {} servers but {} downstream operators given",
                    partitioner.name(),
                    partitioner.num_servers(),
                    downstream.len()
                ),
            });
        }
        Ok(Self {
            partitioner,
            downstream,
        })
    }

    /// Route `key` from source 0 with timestamp 0
    pub fn process_element(&mut self, key: &str) -> Result<usize, RoutingError> {
        self.dispatch(&RouteInfo::new(key))
    }

    pub fn process_element_at(&mut self, timestamp: u64, key: &str) -> Result<usize, RoutingError> {
        self.dispatch(&RouteInfo::new(key).at(timestamp))
    }

    pub fn process_element_from(
        &mut self,
        timestamp: u64,
        key: &str,
        source: usize,
    ) -> Result<usize, RoutingError> {
        self.dispatch(&RouteInfo::new(key).at(timestamp).from_source(source))
    }

    fn dispatch(&mut self, info: &RouteInfo<'_>) -> Result<usize, RoutingError> {
        let selected = self.partitioner.partition(info)?;
        let receiver = self
            .downstream
            .get(selected)
            .ok_or(RoutingError::ServerOutOfRange {
                policy: self.partitioner.name(),
                selected,
                num_servers: self.downstream.len(),
            })?;
        receiver.receive_element(info.key);
        debug!(
            "{} forwarded key {} to downstream {}",
            self.partitioner.name(),
            info.key,
            selected
        );
        Ok(selected)
    }

    pub fn partitioner(&self) -> &P {
        &self.partitioner
    }

    pub fn partitioner_mut(&mut self) -> &mut P {
        &mut self.partitioner
    }

    pub fn downstream(&self) -> &[Arc<DownstreamOperator>] {
        &self.downstream
    }

    /// Received element count per downstream operator
    pub fn downstream_loads(&self) -> Vec<u64> {
        self.downstream.iter().map(|d| d.load()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct FixedPartitioner {
        servers: usize,
        target: usize,
    }

    impl StreamPartitioner for FixedPartitioner {
        fn partition(&mut self, _info: &RouteInfo<'_>) -> Result<usize, RoutingError> {
            Ok(self.target)
        }

        fn num_servers(&self) -> usize {
            self.servers
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    #[test]
    fn test_downstream_counts_and_cardinality() {
        let receiver = DownstreamOperator::new();
        for key in ["a", "b", "a", "c"] {
            receiver.receive_element(key);
        }
        assert_eq!(receiver.load(), 4);
        assert_eq!(receiver.cardinality(), 3);
    }

    #[test]
    fn test_forwards_to_selected_receiver() {
        let downstream = DownstreamOperator::fleet(3);
        let mut op = StreamOperator::new(
            FixedPartitioner {
                servers: 3,
                target: 2,
            },
            downstream.clone(),
        )
        .unwrap();

        assert_eq!(op.process_element("x").unwrap(), 2);
        assert_eq!(op.process_element_at(5, "y").unwrap(), 2);
        assert_eq!(op.downstream_loads(), vec![0, 0, 2]);
        assert_eq!(downstream[2].cardinality(), 2);
    }

    #[test]
    fn test_receiver_count_mismatch_rejected() {
        let err = StreamOperator::new(
            FixedPartitioner {
                servers: 3,
                target: 0,
            },
            DownstreamOperator::fleet(2),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::IncompatibleConfig { .. }));
    }

    #[test]
    fn test_out_of_range_selection_is_an_error() {
        let downstream = DownstreamOperator::fleet(3);
        let mut op = StreamOperator::new(
            FixedPartitioner {
                servers: 3,
                target: 7,
            },
            downstream.clone(),
        )
        .unwrap();

        assert_eq!(
            op.process_element("x"),
            Err(RoutingError::ServerOutOfRange {
                policy: "fixed",
                selected: 7,
                num_servers: 3
            })
        );
        assert_eq!(op.downstream_loads(), vec![0, 0, 0]);
    }
}
