//! Error taxonomy for the simulation service.

use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced to callers of the registry and instances.
///
/// Degenerate vectors are handled inside the math layer and never surface
/// here; tick-loop cancellation is the designed stop path, not an error.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// Settings rejected at creation; never reaches a tick loop.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// No simulation with the given id.
    #[error("simulation not found: {0}")]
    NotFound(Uuid),
}

impl SimulationError {
    /// Creates an invalid-configuration error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }
}
