//! Serialized access to one partitioner from many threads

use std::sync::Arc;

use parking_lot::Mutex;

use super::{RouteInfo, RoutingError, StreamPartitioner};

/// Cloneable handle that routes under a mutex
///
/// Every `partition` call holds the lock for the whole decision, so the
/// router sees calls in a single total order and no caller observes a
/// half-applied update.
#[derive(Debug)]
pub struct SharedPartitioner<P> {
    inner: Arc<Mutex<P>>,
}

impl<P> Clone for SharedPartitioner<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: StreamPartitioner> SharedPartitioner<P> {
    pub fn new(partitioner: P) -> Self {
        Self {
            inner: Arc::new(Mutex::new(partitioner)),
        }
    }

    pub fn partition(&self, info: &RouteInfo<'_>) -> Result<usize, RoutingError> {
        self.inner.lock().partition(info)
    }

    /// Run `f` against the partitioner while holding the lock
    pub fn with<R>(&self, f: impl FnOnce(&mut P) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

impl<P: StreamPartitioner> StreamPartitioner for SharedPartitioner<P> {
    fn partition(&mut self, info: &RouteInfo<'_>) -> Result<usize, RoutingError> {
        SharedPartitioner::partition(self, info)
    }

    fn num_servers(&self) -> usize {
        self.inner.lock().num_servers()
    }

    fn name(&self) -> &'static str {
        self.inner.lock().name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::StickyConfig, policies::StickyRouter};

    #[test]
    fn test_concurrent_routing_accounts_every_record() {
        let shared = SharedPartitioner::new(StickyRouter::new(&StickyConfig::new(4, 0.05)).unwrap());

        std::thread::scope(|scope| {
            for t in 0..4 {
                let handle = shared.clone();
                scope.spawn(move || {
                    for i in 0..250 {
                        let key = format!("t{}-{}", t, i % 20);
                        let selected = handle.partition(&RouteInfo::new(&key)).unwrap();
                        assert!(selected < 4);
                    }
                });
            }
        });

        let total: u64 = shared.with(|r| r.server_loads().iter().sum());
        assert_eq!(total, 1000);
        assert_eq!(shared.with(|r| r.total_processed()), 1000);
    }
}
