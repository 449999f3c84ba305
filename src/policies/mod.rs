//! Skew-aware partitioning policies
//!
//! Both routers map a keyed record to a server index in `[0, N)`. They keep
//! all state locally and mutate it once per call, so a router instance is
//! single-writer; wrap it in [`SharedPartitioner`] to route from several
//! threads.

use std::fmt::Debug;

mod error;
mod factory;
mod power_of_choices;
mod shared;
mod sticky;

pub use error::RoutingError;
pub use factory::{Partitioner, PartitionerFactory};
pub use power_of_choices::PowerOfChoicesRouter;
pub use shared::SharedPartitioner;
pub use sticky::StickyRouter;

/// Core routing capability
pub trait StreamPartitioner: Send + Debug {
    /// Pick the server that receives this record
    fn partition(&mut self, info: &RouteInfo<'_>) -> Result<usize, RoutingError>;

    /// Number of servers the partitioner routes to
    fn num_servers(&self) -> usize;

    /// Get policy name for metrics and debugging
    fn name(&self) -> &'static str;
}

/// Optional statistics capability
pub trait StatsProvider {
    /// Approximate number of distinct keys routed so far
    fn total_cardinality(&self) -> u64;
}

/// Information passed to a partitioner for one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteInfo<'a> {
    /// Routing attribute of the record
    pub key: &'a str,
    /// Event time, recorded on heavy-hitter transitions
    pub timestamp: u64,
    /// Input stream the record arrived on
    pub source: usize,
}

impl<'a> RouteInfo<'a> {
    pub fn new(key: &'a str) -> Self {
        Self {
            key,
            timestamp: 0,
            source: 0,
        }
    }

    pub fn at(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn from_source(mut self, source: usize) -> Self {
        self.source = source;
        self
    }
}

/// Least loaded index among `candidates`; ties keep the first candidate seen.
pub(crate) fn least_loaded<I, F>(candidates: I, load: F) -> Option<usize>
where
    I: IntoIterator<Item = usize>,
    F: Fn(usize) -> u64,
{
    let mut best: Option<(usize, u64)> = None;
    for idx in candidates {
        let l = load(idx);
        match best {
            Some((_, min)) if l >= min => {}
            _ => best = Some((idx, l)),
        }
    }
    best.map(|(idx, _)| idx)
}
