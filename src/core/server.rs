//! Downstream server handles

use std::{fmt, sync::Arc};

use parking_lot::RwLock;

/// Handle to a downstream server as seen by a router
pub trait ServerRef: Send + Sync + fmt::Debug {
    /// Position of the server in the router's server list
    fn index(&self) -> usize;

    /// Load-sampling granularity; identical across one router's servers
    fn granularity(&self) -> u64;

    /// Note that heavy-hitter traffic was steered to this server at `timestamp`
    fn record_transition(&self, timestamp: u64);
}

/// In-process server handle with a transition log
#[derive(Debug)]
pub struct Server {
    index: usize,
    granularity: u64,
    transitions: RwLock<Vec<u64>>,
}

impl Server {
    pub fn new(index: usize, granularity: u64) -> Self {
        Self {
            index,
            granularity,
            transitions: RwLock::new(Vec::new()),
        }
    }

    /// `count` servers indexed `0..count` sharing one granularity
    pub fn cluster(count: usize, granularity: u64) -> Vec<Arc<dyn ServerRef>> {
        (0..count)
            .map(|i| Arc::new(Server::new(i, granularity)) as Arc<dyn ServerRef>)
            .collect()
    }

    /// Timestamps of recorded transitions, oldest first
    pub fn transitions(&self) -> Vec<u64> {
        self.transitions.read().clone()
    }

    pub fn transition_count(&self) -> usize {
        self.transitions.read().len()
    }
}

impl ServerRef for Server {
    fn index(&self) -> usize {
        self.index
    }

    fn granularity(&self) -> u64 {
        self.granularity
    }

    fn record_transition(&self, timestamp: u64) {
        self.transitions.write().push(timestamp);
    }
}

impl fmt::Display for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Server(index={}, granularity={})", self.index, self.granularity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_log() {
        let server = Server::new(3, 100);
        assert_eq!(server.index(), 3);
        assert_eq!(server.granularity(), 100);
        assert_eq!(server.transition_count(), 0);

        server.record_transition(10);
        server.record_transition(12);
        assert_eq!(server.transitions(), vec![10, 12]);
        assert_eq!(server.to_string(), "Server(index=3, granularity=100)");
    }

    #[test]
    fn test_cluster_indices() {
        let servers = Server::cluster(4, 50);
        assert_eq!(servers.len(), 4);
        for (i, server) in servers.iter().enumerate() {
            assert_eq!(server.index(), i);
            assert_eq!(server.granularity(), 50);
        }
    }
}
