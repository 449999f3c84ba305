//! Factory for creating partitioner instances

use std::sync::Arc;

use super::{
    PowerOfChoicesRouter, RouteInfo, RoutingError, StickyRouter, StreamPartitioner,
};
use crate::{
    config::{ConfigResult, ConfigValidator, PartitionerConfig},
    core::ServerRef,
};

/// One of the built-in partitioners
#[derive(Debug)]
pub enum Partitioner {
    PowerOfChoices(PowerOfChoicesRouter),
    Sticky(StickyRouter),
}

impl Partitioner {
    /// Distinct keys routed so far, for partitioners that track it
    pub fn total_cardinality(&self) -> Option<u64> {
        use super::StatsProvider;

        match self {
            Partitioner::PowerOfChoices(_) => None,
            Partitioner::Sticky(router) => Some(router.total_cardinality()),
        }
    }

    /// Publish per-server load gauges for the wrapped router
    pub fn publish_loads(&self) {
        match self {
            Partitioner::PowerOfChoices(router) => router.publish_loads(),
            Partitioner::Sticky(router) => router.publish_loads(),
        }
    }
}

impl StreamPartitioner for Partitioner {
    fn partition(&mut self, info: &RouteInfo<'_>) -> Result<usize, RoutingError> {
        match self {
            Partitioner::PowerOfChoices(router) => router.partition(info),
            Partitioner::Sticky(router) => router.partition(info),
        }
    }

    fn num_servers(&self) -> usize {
        match self {
            Partitioner::PowerOfChoices(router) => router.num_servers(),
            Partitioner::Sticky(router) => router.num_servers(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Partitioner::PowerOfChoices(router) => router.name(),
            Partitioner::Sticky(router) => router.name(),
        }
    }
}

/// Factory for creating partitioners from configuration
pub struct PartitionerFactory;

impl PartitionerFactory {
    /// Create a partitioner routing to `servers`
    pub fn create(
        config: &PartitionerConfig,
        servers: Vec<Arc<dyn ServerRef>>,
    ) -> ConfigResult<Partitioner> {
        ConfigValidator::validate(config, servers.len())?;

        match config {
            PartitionerConfig::PowerOfChoices(poc) => Ok(Partitioner::PowerOfChoices(
                PowerOfChoicesRouter::new(poc, servers)?,
            )),
            PartitionerConfig::Sticky(sticky) => {
                let granularities: Vec<u64> = servers.iter().map(|s| s.granularity()).collect();
                ConfigValidator::validate_granularities(&granularities)?;
                Ok(Partitioner::Sticky(StickyRouter::new(sticky)?))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{ConfigError, PowerOfChoicesConfig, StickyConfig},
        core::Server,
    };

    #[test]
    fn test_create_from_config() {
        let poc = PartitionerFactory::create(
            &PartitionerConfig::PowerOfChoices(PowerOfChoicesConfig::new(2, 3)),
            Server::cluster(3, 1),
        )
        .unwrap();
        assert_eq!(poc.name(), "power_of_choices");
        assert_eq!(poc.num_servers(), 3);
        assert_eq!(poc.total_cardinality(), None);

        let mut sticky = PartitionerFactory::create(
            &PartitionerConfig::Sticky(StickyConfig::new(4, 0.2)),
            Server::cluster(4, 1),
        )
        .unwrap();
        assert_eq!(sticky.name(), "sticky");
        assert!(sticky.partition(&RouteInfo::new("x")).unwrap() < 4);
        assert_eq!(sticky.total_cardinality(), Some(1));
    }

    #[test]
    fn test_create_rejects_bad_topology() {
        let err = PartitionerFactory::create(
            &PartitionerConfig::Sticky(StickyConfig::new(4, 0.2)),
            Server::cluster(3, 1),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::IncompatibleConfig { .. }));

        let err = PartitionerFactory::create(
            &PartitionerConfig::PowerOfChoices(PowerOfChoicesConfig::new(1, 3)),
            Vec::new(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_enum_dispatches_source_errors() {
        let mut poc = PartitionerFactory::create(
            &PartitionerConfig::PowerOfChoices(PowerOfChoicesConfig::new(1, 3)),
            Server::cluster(2, 1),
        )
        .unwrap();
        let err = poc
            .partition(&RouteInfo::new("k").from_source(4))
            .unwrap_err();
        assert_eq!(
            err,
            RoutingError::InvalidSource {
                source_id: 4,
                num_sources: 1
            }
        );
    }
}
