//! Model container: a set of agents plus the engine that advances them.

use crate::agent::Agent;
use crate::engine::{FlockEngine, Mode};
use rand::Rng;

/// A flock: agents and the update engine for their mode.
///
/// `advance` is the only mutator; it is deterministic given the current
/// agent state and the timestep, and infallible (invalid agents are
/// rejected at construction, never at integration time).
pub struct Flock {
    mode: Mode,
    agents: Vec<Agent>,
    engine: FlockEngine,
}

impl Flock {
    /// Spawns `num_agents` randomly placed agents for the given mode.
    pub fn spawn<R: Rng>(num_agents: usize, mode: Mode, rng: &mut R) -> Self {
        let agents = (0..num_agents).map(|id| Agent::spawn(id, rng)).collect();
        Self {
            mode,
            agents,
            engine: FlockEngine::new(mode.zones(), num_agents),
        }
    }

    /// Builds a flock from explicit agents (tests, fixed scenarios).
    pub fn from_agents(mode: Mode, agents: Vec<Agent>) -> Self {
        let engine = FlockEngine::new(mode.zones(), agents.len());
        Self {
            mode,
            agents,
            engine,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// Advances one tick: computes every agent's next heading, then
    /// integrates `position += heading * speed * timestep`. Heading and
    /// position are updated together.
    pub fn advance(&mut self, timestep: f64) {
        let headings = self.engine.compute_next_headings(&self.agents);
        for (agent, heading) in self.agents.iter_mut().zip(headings) {
            agent.heading = heading;
            agent.position += heading * agent.speed * timestep;
        }
    }
}
