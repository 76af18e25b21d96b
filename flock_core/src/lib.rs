//! Zone-based flocking model.
//!
//! Each agent classifies every other agent into one of three concentric
//! distance zones and blends the resulting influences into a new unit
//! heading once per tick:
//!
//! ```text
//!        ┌─────────────────────────────────────┐
//!        │   zoa: attraction  (steer toward)   │
//!        │   ┌─────────────────────────────┐   │
//!        │   │ zoo: orientation (align)    │   │
//!        │   │   ┌─────────────────────┐   │   │
//!        │   │   │ zor: repulsion      │   │   │
//!        │   │   │   (steer away,      │   │   │
//!        │   │   │    dominates all)   │   │   │
//!        │   │   └─────────────────────┘   │   │
//!        │   └─────────────────────────────┘   │
//!        └─────────────────────────────────────┘
//! ```
//!
//! The four behavioral modes (swarm, torus, hpp, dpp) share this one
//! algorithm and differ only in their zone radii.
//!
//! This crate is pure computation: no async, no I/O, no clocks. The
//! concurrency layer lives in `flock_service`.

pub mod agent;
pub mod engine;
pub mod flock;
pub mod vecmath;

// Re-export key types for convenience
pub use agent::{Agent, AgentError};
pub use engine::{FlockEngine, Mode, ParseModeError, ZoneRadii};
pub use flock::Flock;
