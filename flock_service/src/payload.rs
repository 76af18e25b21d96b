//! Wire payloads delivered to observers.

use crate::settings::SimulationSettings;
use flock_core::{Agent, Mode};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One agent's state as observers see it. Vectors serialize as 3-arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    pub id: usize,
    pub position: Vector3<f64>,
    pub heading: Vector3<f64>,
}

impl From<&Agent> for AgentState {
    fn from(agent: &Agent) -> Self {
        Self {
            id: agent.id,
            position: agent.position,
            heading: agent.heading,
        }
    }
}

/// Point-in-time view of a simulation, taken atomically under the instance
/// lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub simulation_id: Uuid,
    pub tick: u64,
    pub params: SimulationSettings,
    pub agents: Vec<AgentState>,
}

/// Per-tick delta broadcast to every subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickPayload {
    pub simulation_id: Uuid,
    pub tick: u64,
    pub agents: Vec<AgentState>,
}

/// Events delivered over a subscription channel.
///
/// `{"type":"tick",...}` per tick; a terminal `{"type":"shutdown"}` when the
/// simulation is deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    Tick(TickPayload),
    Shutdown,
}

/// Registry listing entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub simulation_id: Uuid,
    pub num_agents: usize,
    pub mode: Mode,
    pub tick: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shutdown_wire_shape() {
        let json = serde_json::to_string(&StreamEvent::Shutdown).unwrap();
        assert_eq!(json, r#"{"type":"shutdown"}"#);
    }

    #[test]
    fn test_tick_event_wire_shape() {
        let event = StreamEvent::Tick(TickPayload {
            simulation_id: Uuid::nil(),
            tick: 3,
            agents: vec![AgentState {
                id: 0,
                position: Vector3::new(1.0, 2.0, 0.0),
                heading: Vector3::new(0.0, 1.0, 0.0),
            }],
        });
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.starts_with(r#"{"type":"tick""#));
        assert!(json.contains(r#""tick":3"#));
        assert!(json.contains(r#""position":[1.0,2.0,0.0]"#));

        let back: StreamEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
