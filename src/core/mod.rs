//! Topology primitives: downstream servers and the operators that feed them

pub mod operator;
pub mod server;

pub use operator::{DownstreamOperator, LoadFeedback, StreamOperator};
pub use server::{Server, ServerRef};
