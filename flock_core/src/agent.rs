//! A single flock member's kinematic state.

use crate::vecmath::{unit_or_self, EPSILON};
use nalgebra::Vector3;
use rand::Rng;
use rand_distr::StandardNormal;
use thiserror::Error;

/// Default cruising speed for spawned agents.
pub const DEFAULT_SPEED: f64 = 1.0;

/// Default field of view in degrees.
pub const DEFAULT_VISION_DEG: f64 = 360.0;

/// Default maximum turn per tick in degrees.
pub const DEFAULT_TURNING_ANGLE_DEG: f64 = 40.0;

/// Half-width of the square agents are initially placed in.
const SPAWN_EXTENT: f64 = 15.0;

/// Errors rejected at agent construction. Integration never re-validates.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Speed must be strictly positive.
    #[error("agent speed must be positive, got {0}")]
    NonPositiveSpeed(f64),

    /// Heading with no usable direction.
    #[error("agent heading must have non-zero magnitude")]
    DegenerateHeading,
}

/// A point agent: identity, kinematics, and perception parameters.
///
/// Position and heading are mutated once per tick, always together, always
/// by the owning simulation's tick loop. The stored heading is always unit
/// length.
#[derive(Debug, Clone)]
pub struct Agent {
    /// Immutable identity, assigned 0..n-1 at spawn.
    pub id: usize,
    pub position: Vector3<f64>,
    /// Unit-length direction of travel.
    pub heading: Vector3<f64>,
    pub speed: f64,
    /// Field of view in degrees. Carried but not applied by the update rule.
    pub vision_deg: f64,
    /// Maximum turn per tick in degrees. Carried but not applied by the
    /// update rule.
    pub turning_angle_deg: f64,
}

impl Agent {
    /// Creates an agent, rejecting non-positive speed and headings that
    /// cannot be normalized.
    pub fn new(
        id: usize,
        position: Vector3<f64>,
        heading: Vector3<f64>,
        speed: f64,
    ) -> Result<Self, AgentError> {
        if speed <= 0.0 {
            return Err(AgentError::NonPositiveSpeed(speed));
        }
        if heading.norm() <= EPSILON {
            return Err(AgentError::DegenerateHeading);
        }
        Ok(Self {
            id,
            position,
            heading: unit_or_self(heading),
            speed,
            vision_deg: DEFAULT_VISION_DEG,
            turning_angle_deg: DEFAULT_TURNING_ANGLE_DEG,
        })
    }

    /// Spawns an agent at a random position in the placement square (z = 0)
    /// with a perturbed default heading.
    pub fn spawn<R: Rng>(id: usize, rng: &mut R) -> Self {
        let position = Vector3::new(
            rng.gen_range(-SPAWN_EXTENT..SPAWN_EXTENT),
            rng.gen_range(-SPAWN_EXTENT..SPAWN_EXTENT),
            0.0,
        );
        let vx = 0.1_f64;
        let vy = vx.sin() + 0.1 * rng.sample::<f64, _>(StandardNormal);
        let vz = vx.cos() + 0.1 * rng.sample::<f64, _>(StandardNormal);
        let heading = unit_or_self(Vector3::new(vx, vy, vz));
        Self {
            id,
            position,
            heading,
            speed: DEFAULT_SPEED,
            vision_deg: DEFAULT_VISION_DEG,
            turning_angle_deg: DEFAULT_TURNING_ANGLE_DEG,
        }
    }
}
