//! Settings accepted at simulation creation.

use crate::error::SimulationError;
use flock_core::Mode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Minimum number of agents per simulation.
pub const MIN_AGENTS: usize = 1;

/// Maximum number of agents per simulation. The engine scans all pairs, so
/// this bound keeps one tick comfortably inside the update interval.
pub const MAX_AGENTS: usize = 500;

/// Configuration for one simulation, fixed for its lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// Number of agents (1..=500)
    pub num_agents: usize,

    /// Behavioral mode
    pub mode: Mode,

    /// Integration timestep in seconds (> 0)
    pub timestep: f64,

    /// Delay between broadcast ticks in seconds (> 0)
    pub update_interval: f64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            num_agents: 20,
            mode: Mode::Swarm,
            timestep: 0.1,
            update_interval: 0.1,
        }
    }
}

impl SimulationSettings {
    /// Validates bounds. Called before any instance is constructed so an
    /// invalid configuration can never reach a tick loop.
    pub fn validate(&self) -> Result<(), SimulationError> {
        if !(MIN_AGENTS..=MAX_AGENTS).contains(&self.num_agents) {
            return Err(SimulationError::invalid(format!(
                "num_agents must be within {MIN_AGENTS}..={MAX_AGENTS}, got {}",
                self.num_agents
            )));
        }
        if !(self.timestep > 0.0) {
            return Err(SimulationError::invalid(format!(
                "timestep must be positive, got {}",
                self.timestep
            )));
        }
        if !(self.update_interval > 0.0) {
            return Err(SimulationError::invalid(format!(
                "update_interval must be positive, got {}",
                self.update_interval
            )));
        }
        Ok(())
    }

    /// Update interval as a [`Duration`] for the tick loop's sleep.
    pub fn update_interval_duration(&self) -> Duration {
        Duration::from_secs_f64(self.update_interval)
    }
}
