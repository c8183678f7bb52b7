//! Error types for masonry configuration handling.

use thiserror::Error;

/// Result type alias for masonry configuration operations.
pub type MasonryResult<T> = Result<T, MasonryError>;

/// Errors raised at the configuration boundary.
///
/// Runtime anomalies (zero-height measurements, unknown observation
/// targets, failed images) are never errors; they degrade to no-ops.
#[derive(Debug, Error)]
pub enum MasonryError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}
