//! Maps opaque simulation ids to running instances.

use crate::error::SimulationError;
use crate::instance::SimulationInstance;
use crate::payload::SimulationSummary;
use crate::settings::SimulationSettings;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

/// Registry of live simulations.
///
/// The map has its own lock, independent of per-instance locks: creating or
/// deleting one simulation never blocks ticking of another.
#[derive(Default)]
pub struct SimulationRegistry {
    instances: Mutex<HashMap<Uuid, Arc<SimulationInstance>>>,
}

impl SimulationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates settings and creates an idle instance.
    pub async fn create(
        &self,
        settings: SimulationSettings,
    ) -> Result<Arc<SimulationInstance>, SimulationError> {
        settings.validate()?;
        let instance = SimulationInstance::new(settings);
        self.instances
            .lock()
            .await
            .insert(instance.id(), Arc::clone(&instance));
        info!(simulation = %instance.id(), "simulation created");
        Ok(instance)
    }

    pub async fn get(&self, id: Uuid) -> Result<Arc<SimulationInstance>, SimulationError> {
        self.instances
            .lock()
            .await
            .get(&id)
            .cloned()
            .ok_or(SimulationError::NotFound(id))
    }

    /// Summaries of every live simulation.
    pub async fn list(&self) -> Vec<SimulationSummary> {
        let instances: Vec<_> = self.instances.lock().await.values().cloned().collect();
        let mut summaries = Vec::with_capacity(instances.len());
        for instance in instances {
            summaries.push(instance.summary().await);
        }
        summaries
    }

    /// Removes and closes an instance. Closing happens outside the registry
    /// lock; stopping a loop can take up to one update interval.
    pub async fn delete(&self, id: Uuid) -> Result<(), SimulationError> {
        let instance = self
            .instances
            .lock()
            .await
            .remove(&id)
            .ok_or(SimulationError::NotFound(id))?;
        instance.close().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::StreamEvent;
    use flock_core::Mode;

    fn fast_settings() -> SimulationSettings {
        SimulationSettings {
            num_agents: 3,
            mode: Mode::Hpp,
            timestep: 0.05,
            update_interval: 0.01,
        }
    }

    #[tokio::test]
    async fn test_create_get_delete() {
        let registry = SimulationRegistry::new();
        let instance = registry.create(fast_settings()).await.unwrap();
        let id = instance.id();

        let fetched = registry.get(id).await.unwrap();
        assert_eq!(fetched.id(), id);

        registry.delete(id).await.unwrap();
        assert!(matches!(
            registry.get(id).await,
            Err(SimulationError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_settings_never_construct_an_instance() {
        let registry = SimulationRegistry::new();
        let settings = SimulationSettings {
            num_agents: 0,
            ..fast_settings()
        };
        assert!(matches!(
            registry.create(settings).await,
            Err(SimulationError::InvalidConfiguration(_))
        ));
        assert!(registry.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_get_unknown_id_is_not_found() {
        let registry = SimulationRegistry::new();
        assert!(matches!(
            registry.get(Uuid::new_v4()).await,
            Err(SimulationError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_unknown_id_is_not_found() {
        let registry = SimulationRegistry::new();
        assert!(matches!(
            registry.delete(Uuid::new_v4()).await,
            Err(SimulationError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_reports_each_simulation() {
        let registry = SimulationRegistry::new();
        let first = registry.create(fast_settings()).await.unwrap();
        let second = registry
            .create(SimulationSettings {
                num_agents: 7,
                mode: Mode::Torus,
                ..fast_settings()
            })
            .await
            .unwrap();

        let summaries = registry.list().await;
        assert_eq!(summaries.len(), 2);
        let torus = summaries
            .iter()
            .find(|s| s.simulation_id == second.id())
            .unwrap();
        assert_eq!(torus.num_agents, 7);
        assert_eq!(torus.mode, Mode::Torus);
        assert!(summaries.iter().any(|s| s.simulation_id == first.id()));
    }

    #[tokio::test]
    async fn test_delete_closes_subscribers() {
        let registry = SimulationRegistry::new();
        let instance = registry.create(fast_settings()).await.unwrap();
        let mut subscription = instance.register().await;

        registry.delete(instance.id()).await.unwrap();

        loop {
            let event = subscription
                .receiver
                .recv()
                .await
                .expect("channel closed before shutdown marker");
            if event == StreamEvent::Shutdown {
                break;
            }
        }
    }

    #[tokio::test]
    async fn test_deleting_one_simulation_leaves_others_ticking() {
        let registry = SimulationRegistry::new();
        let doomed = registry.create(fast_settings()).await.unwrap();
        let survivor = registry.create(fast_settings()).await.unwrap();
        let mut subscription = survivor.register().await;

        registry.delete(doomed.id()).await.unwrap();

        let event = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            subscription.receiver.recv(),
        )
        .await
        .expect("survivor stopped ticking")
        .expect("survivor channel closed");
        assert!(matches!(event, StreamEvent::Tick(_)));

        survivor.unregister(subscription.id).await;
        registry.delete(survivor.id()).await.unwrap();
    }
}
