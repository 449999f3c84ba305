use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    #[error("Invalid source id {source_id}: router has {num_sources} sources")]
    InvalidSource { source_id: usize, num_sources: usize },

    #[error("{policy} selected server {selected} but only {num_servers} are attached")]
    ServerOutOfRange {
        policy: &'static str,
        selected: usize,
        num_servers: usize,
    },
}
