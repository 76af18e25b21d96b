//! Zone-based flock update engine.
//!
//! One engine serves all four behavioral modes; a mode is nothing more than
//! a row in the zone-radius table. The per-tick pairwise distance/direction
//! tables are scratch state owned by the engine: rebuilt at the start of
//! every [`FlockEngine::compute_next_headings`] call and reset to sentinels
//! before it returns, so no tick can observe a previous tick's cache.

use crate::agent::Agent;
use crate::vecmath::{unit_or_self, EPSILON};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Behavioral mode. All modes run the identical update rule and differ only
/// in their zone radii.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Swarm,
    Torus,
    Hpp,
    Dpp,
}

impl Mode {
    pub const ALL: [Mode; 4] = [Mode::Swarm, Mode::Torus, Mode::Hpp, Mode::Dpp];

    /// Zone radii for this mode.
    pub fn zones(self) -> ZoneRadii {
        match self {
            Mode::Swarm => ZoneRadii::new(2.0, 3.0, 7.0),
            Mode::Torus => ZoneRadii::new(0.3, 0.8, 15.0),
            Mode::Hpp => ZoneRadii::new(0.5, 10.0, 20.0),
            Mode::Dpp => ZoneRadii::new(0.2, 4.0, 10.0),
        }
    }

    /// Lowercase wire name, matching the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Swarm => "swarm",
            Mode::Torus => "torus",
            Mode::Hpp => "hpp",
            Mode::Dpp => "dpp",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown mode name.
#[derive(Debug, Clone, Error)]
#[error("unsupported mode '{0}'; expected one of swarm, torus, hpp, dpp")]
pub struct ParseModeError(String);

impl FromStr for Mode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "swarm" => Ok(Mode::Swarm),
            "torus" => Ok(Mode::Torus),
            "hpp" => Ok(Mode::Hpp),
            "dpp" => Ok(Mode::Dpp),
            other => Err(ParseModeError(other.to_string())),
        }
    }
}

/// The three concentric zone radii, fixed at construction.
///
/// Distances partition as: repulsion `(0, zor]`, orientation `(zor, zoo]`,
/// attraction `(zoo, zoa]`, out of range beyond `zoa`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneRadii {
    pub zor: f64,
    pub zoo: f64,
    pub zoa: f64,
}

impl ZoneRadii {
    /// Creates a radius triple. Requires `0 < zor < zoo < zoa`.
    pub fn new(zor: f64, zoo: f64, zoa: f64) -> Self {
        debug_assert!(
            0.0 < zor && zor < zoo && zoo < zoa,
            "zone radii must satisfy 0 < zor < zoo < zoa"
        );
        Self { zor, zoo, zoa }
    }
}

/// Distance sentinel for an unknown pair.
const UNKNOWN_DISTANCE: f64 = f64::INFINITY;

/// Computes each agent's next heading from its neighborhood.
pub struct FlockEngine {
    zones: ZoneRadii,
    num_agents: usize,
    /// n*n pairwise distances, [`UNKNOWN_DISTANCE`] when not computed.
    distances: Vec<f64>,
    /// n*n unit directions i -> j, zero when not computed.
    directions: Vec<Vector3<f64>>,
}

impl FlockEngine {
    pub fn new(zones: ZoneRadii, num_agents: usize) -> Self {
        Self {
            zones,
            num_agents,
            distances: vec![UNKNOWN_DISTANCE; num_agents * num_agents],
            directions: vec![Vector3::zeros(); num_agents * num_agents],
        }
    }

    pub fn zones(&self) -> ZoneRadii {
        self.zones
    }

    fn idx(&self, i: usize, j: usize) -> usize {
        i * self.num_agents + j
    }

    /// Fills the pairwise tables for the current agent positions. Each
    /// unordered pair is computed once; the mirror entries reuse the same
    /// distance and the negated direction.
    fn fill_pairwise(&mut self, agents: &[Agent]) {
        for i in 0..self.num_agents {
            for j in (i + 1)..self.num_agents {
                let delta = agents[j].position - agents[i].position;
                let distance = delta.norm();
                let direction = unit_or_self(delta);
                let (ij, ji) = (self.idx(i, j), self.idx(j, i));
                self.distances[ij] = distance;
                self.distances[ji] = distance;
                self.directions[ij] = direction;
                self.directions[ji] = -direction;
            }
        }
    }

    /// Resets both scratch tables to sentinels so the next tick starts clean.
    fn reset_scratch(&mut self) {
        self.distances.fill(UNKNOWN_DISTANCE);
        self.directions.fill(Vector3::zeros());
    }

    /// Computes the new unit heading for every agent, indexed like the input
    /// slice. Does not mutate the agents; the caller applies the result.
    ///
    /// Rules, per agent `i`:
    /// - Any neighbor within `zor` puts `i` in repulsion mode: only
    ///   repulsion-zone neighbors contribute (steer directly away), all
    ///   orientation and attraction influence is suppressed.
    /// - Otherwise orientation-zone neighbors contribute half their heading
    ///   and attraction-zone neighbors half the direction toward them; if
    ///   only one of the two influences fired, the accumulated vector is
    ///   doubled.
    /// - A zero accumulated vector leaves the prior heading untouched.
    pub fn compute_next_headings(&mut self, agents: &[Agent]) -> Vec<Vector3<f64>> {
        debug_assert_eq!(agents.len(), self.num_agents);
        self.fill_pairwise(agents);

        let n = self.num_agents;
        let zones = self.zones;
        let mut headings = Vec::with_capacity(n);
        for i in 0..n {
            let repulsion_mode =
                (0..n).any(|j| j != i && self.distances[self.idx(i, j)] <= zones.zor);

            let mut direction = Vector3::zeros();
            let mut saw_orientation = false;
            let mut saw_attraction = false;
            for j in 0..n {
                if j == i {
                    continue;
                }
                let distance = self.distances[self.idx(i, j)];
                if repulsion_mode {
                    // Repulsion dominates: everything beyond zor is ignored.
                    if distance <= zones.zor {
                        direction -= self.directions[self.idx(i, j)];
                    }
                } else if distance > zones.zor && distance <= zones.zoo {
                    direction += agents[j].heading / 2.0;
                    saw_orientation = true;
                } else if distance > zones.zoo && distance <= zones.zoa {
                    direction += self.directions[self.idx(i, j)] / 2.0;
                    saw_attraction = true;
                }
            }

            // When only one of orientation/attraction fired its halved
            // contribution is amplified; when both fired their natural
            // magnitudes stand.
            if !repulsion_mode && !(saw_orientation && saw_attraction) {
                direction *= 2.0;
            }

            if direction.norm() <= EPSILON {
                // No influence: keep the prior heading exactly.
                headings.push(agents[i].heading);
            } else {
                headings.push(unit_or_self(direction));
            }
        }

        self.reset_scratch();
        headings
    }
}
