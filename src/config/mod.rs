pub mod types;
pub mod validation;

pub use types::*;
pub use validation::*;

/// Errors raised while loading or checking a partitioner configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Malformed partitioner config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid value for field '{field}': {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// Two individually valid settings that cannot be used together
    #[error("Incompatible configuration: {reason}")]
    IncompatibleConfig { reason: String },

    #[error("No {what} supplied")]
    Empty { what: &'static str },
}

pub type ConfigResult<T> = Result<T, ConfigError>;
