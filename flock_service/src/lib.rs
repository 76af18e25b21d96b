//! Concurrency core for the flocking simulation service.
//!
//! One background tick task per running simulation advances the flock on a
//! fixed cadence and fans each tick out to every subscriber over its own
//! channel:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                    SimulationRegistry                      │
//! │   id ─► SimulationInstance        id ─► SimulationInstance │
//! │         ┌───────────────┐               ┌───────────────┐  │
//! │         │  tick loop    │               │  tick loop    │  │
//! │         │  (sole writer)│               │  (sole writer)│  │
//! │         └──────┬────────┘               └──────┬────────┘  │
//! │                │ fan-out                       │           │
//! │         ┌──────┴──────┐                 ┌──────┴──────┐    │
//! │         ▼             ▼                 ▼             ▼    │
//! │    subscriber    subscriber        subscriber   subscriber │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! The transport layer (HTTP/WebSocket) is an external collaborator: it
//! creates simulations through the registry, registers a channel per remote
//! observer, and relays [`StreamEvent`]s.

pub mod error;
pub mod instance;
pub mod payload;
pub mod registry;
pub mod settings;

// Re-export key types for convenience
pub use error::SimulationError;
pub use instance::{SimulationInstance, Subscription};
pub use payload::{AgentState, SimulationSummary, Snapshot, StreamEvent, TickPayload};
pub use registry::SimulationRegistry;
pub use settings::{SimulationSettings, MAX_AGENTS, MIN_AGENTS};
