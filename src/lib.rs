//! Skew-aware stream partitioning
//!
//! Routes every keyed record of an unbounded stream to one of `N` downstream
//! servers. Two policies are provided:
//!
//! - [`policies::PowerOfChoicesRouter`]: per-source heavy-hitter detection;
//!   heavy hitters are sprayed round robin, other keys take the least loaded
//!   of `d` hashed candidates.
//! - [`policies::StickyRouter`]: global lossy counting; hot keys are kept on
//!   a growing set of servers that widens when its load drifts above average.
//!
//! [`core::StreamOperator`] wires a partitioner to its downstream receivers.

pub mod config;
pub mod core;
pub mod logging;
pub mod metrics;
pub mod policies;
pub mod sketch;

pub use crate::config::{
    ConfigError, ConfigResult, PartitionerConfig, PowerOfChoicesConfig, StickyConfig,
};
pub use crate::core::{DownstreamOperator, LoadFeedback, Server, ServerRef, StreamOperator};
pub use crate::policies::{
    Partitioner, PartitionerFactory, PowerOfChoicesRouter, RouteInfo, RoutingError,
    SharedPartitioner, StatsProvider, StickyRouter, StreamPartitioner,
};
