//! Engine error types.

use masonry_core::MasonryError;
use thiserror::Error;

/// Errors surfaced by the engine's entry points.
///
/// Measurement and image anomalies are not represented here: they are
/// absorbed as no-ops.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("configuration rejected: {0}")]
    Config(#[from] MasonryError),

    #[error("engine driver is no longer running")]
    DriverClosed,
}

pub type EngineResult<T> = Result<T, EngineError>;
