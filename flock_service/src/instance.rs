//! A single running simulation: tick loop, subscribers, lifecycle.
//!
//! Lifecycle state machine:
//!
//! ```text
//!            first register()                 last unregister()
//!   IDLE ──────────────────────► RUNNING ─────────────────────► STOPPING
//!    ▲                                                              │
//!    └──────────────── loop cancelled and awaited ──────────────────┘
//!
//!   IDLE | RUNNING ── close() ──► CLOSED (terminal)
//! ```
//!
//! Two locks per instance, always acquired lifecycle-then-shared:
//! - `shared` guards agent state, the tick counter, and the subscriber set;
//!   the tick loop is the sole writer of the first two.
//! - `lifecycle` guards the runner task handle. Stop-and-await happens while
//!   holding it, so a registration arriving during STOPPING waits for full
//!   quiescence and can never race a second loop into existence.
//!
//! The loop holds `shared` only across the compute-and-mutate step; the
//! broadcast fan-out and the inter-tick sleep run unlocked, so a slow
//! subscriber never delays snapshot reads or the next tick.

use crate::payload::{AgentState, SimulationSummary, Snapshot, StreamEvent, TickPayload};
use crate::settings::SimulationSettings;
use flock_core::Flock;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Receiving half of a subscription, paired with the id used to unregister.
///
/// Channels are unbounded: the tick loop never blocks on a lagging
/// consumer, at the cost of memory growth in the consumer's channel.
pub struct Subscription {
    pub id: Uuid,
    pub receiver: mpsc::UnboundedReceiver<StreamEvent>,
}

/// State guarded by the per-instance shared lock.
struct SharedState {
    flock: Flock,
    tick: u64,
    subscribers: HashMap<Uuid, mpsc::UnboundedSender<StreamEvent>>,
    /// Set when a tick panicked. The loop has exited; the last completed
    /// snapshot stays readable.
    failed: bool,
    /// Set by `close()`. Terminal.
    closed: bool,
}

/// Runner bookkeeping, held in its own lock so stop-and-await can block a
/// concurrent start without holding up snapshot reads.
struct Lifecycle {
    runner: Option<Runner>,
}

struct Runner {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// One simulation: a flock, its tick loop, and its subscribers.
pub struct SimulationInstance {
    id: Uuid,
    settings: SimulationSettings,
    shared: Arc<Mutex<SharedState>>,
    lifecycle: Mutex<Lifecycle>,
}

impl SimulationInstance {
    /// Creates an idle instance with randomly placed agents. Settings are
    /// assumed validated (the registry rejects bad ones first).
    pub fn new(settings: SimulationSettings) -> Arc<Self> {
        let flock = Flock::spawn(settings.num_agents, settings.mode, &mut rand::thread_rng());
        Arc::new(Self {
            id: Uuid::new_v4(),
            shared: Arc::new(Mutex::new(SharedState {
                flock,
                tick: 0,
                subscribers: HashMap::new(),
                failed: false,
                closed: false,
            })),
            lifecycle: Mutex::new(Lifecycle { runner: None }),
            settings,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    /// Full current state, taken atomically under the same lock the tick
    /// loop mutates under. Valid in any lifecycle state; never observes a
    /// half-applied tick.
    pub async fn snapshot(&self) -> Snapshot {
        let state = self.shared.lock().await;
        Snapshot {
            simulation_id: self.id,
            tick: state.tick,
            params: self.settings.clone(),
            agents: state.flock.agents().iter().map(AgentState::from).collect(),
        }
    }

    /// Listing entry for the registry.
    pub async fn summary(&self) -> SimulationSummary {
        let state = self.shared.lock().await;
        SimulationSummary {
            simulation_id: self.id,
            num_agents: self.settings.num_agents,
            mode: self.settings.mode,
            tick: state.tick,
        }
    }

    /// Adds a subscriber and lazily starts the tick loop.
    ///
    /// Callers should take one `snapshot()` right after registering, before
    /// consuming the channel, to establish a baseline without missing a
    /// tick. Registering on a closed or failed instance yields a channel
    /// holding only the terminal marker.
    pub async fn register(self: &Arc<Self>) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription_id = Uuid::new_v4();
        {
            let mut state = self.shared.lock().await;
            if state.closed || state.failed {
                let _ = tx.send(StreamEvent::Shutdown);
                return Subscription {
                    id: subscription_id,
                    receiver: rx,
                };
            }
            state.subscribers.insert(subscription_id, tx);
        }

        // Taking the lifecycle lock waits out any in-flight stop; the
        // re-check below covers a close() that slipped in between.
        let mut lifecycle = self.lifecycle.lock().await;
        let should_run = {
            let state = self.shared.lock().await;
            !state.closed && !state.failed && !state.subscribers.is_empty()
        };
        if should_run && lifecycle.runner.is_none() {
            self.start_locked(&mut lifecycle);
        }
        Subscription {
            id: subscription_id,
            receiver: rx,
        }
    }

    /// Removes a subscriber. Unknown or already-removed ids are a no-op.
    /// When the set becomes empty the loop is stopped asynchronously.
    pub async fn unregister(self: &Arc<Self>, subscription_id: Uuid) {
        let now_empty = {
            let mut state = self.shared.lock().await;
            state.subscribers.remove(&subscription_id);
            state.subscribers.is_empty()
        };
        if now_empty {
            tokio::spawn(Arc::clone(self).stop_if_idle());
        }
    }

    /// Stops the loop, delivers the terminal marker to every subscriber,
    /// and clears the set. Terminal; the registry calls this on delete.
    pub async fn close(&self) {
        {
            let mut lifecycle = self.lifecycle.lock().await;
            Self::stop_locked(self.id, &mut lifecycle).await;
        }
        let mut state = self.shared.lock().await;
        state.closed = true;
        for (_, subscriber) in state.subscribers.drain() {
            let _ = subscriber.send(StreamEvent::Shutdown);
        }
        info!(simulation = %self.id, "simulation closed");
    }

    /// True while the tick loop task is alive (RUNNING or STOPPING).
    pub async fn is_running(&self) -> bool {
        self.lifecycle.lock().await.runner.is_some()
    }

    pub async fn subscriber_count(&self) -> usize {
        self.shared.lock().await.subscribers.len()
    }

    /// Stops the loop if the subscriber set is still empty. Spawned by the
    /// last `unregister`; the re-check under the lifecycle lock yields to a
    /// subscriber that registered in the meantime.
    async fn stop_if_idle(self: Arc<Self>) {
        let mut lifecycle = self.lifecycle.lock().await;
        if !self.shared.lock().await.subscribers.is_empty() {
            return;
        }
        Self::stop_locked(self.id, &mut lifecycle).await;
    }

    fn start_locked(self: &Arc<Self>, lifecycle: &mut Lifecycle) {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(Self::run_loop(
            self.id,
            self.settings.clone(),
            Arc::clone(&self.shared),
            shutdown_rx,
        ));
        lifecycle.runner = Some(Runner {
            shutdown: shutdown_tx,
            task,
        });
        debug!(simulation = %self.id, "tick loop started");
    }

    /// Signals the loop and awaits its exit before declaring the instance
    /// quiesced, so no partial tick is left behind.
    async fn stop_locked(id: Uuid, lifecycle: &mut Lifecycle) {
        if let Some(runner) = lifecycle.runner.take() {
            let _ = runner.shutdown.send(true);
            let _ = runner.task.await;
            debug!(simulation = %id, "tick loop stopped");
        }
    }

    /// The background tick loop. Sole writer of agent state and the tick
    /// counter. Cancellation lands at the inter-tick select, never mid-tick.
    async fn run_loop(
        id: Uuid,
        settings: SimulationSettings,
        shared: Arc<Mutex<SharedState>>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let interval = settings.update_interval_duration();
        loop {
            if *shutdown.borrow() {
                return;
            }

            let (payload, targets) = {
                let mut state = shared.lock().await;
                let advanced =
                    catch_unwind(AssertUnwindSafe(|| state.flock.advance(settings.timestep)));
                if advanced.is_err() {
                    // Fatal to this instance only: stop the loop, keep the
                    // last completed snapshot readable, leave every other
                    // instance untouched.
                    state.failed = true;
                    error!(simulation = %id, tick = state.tick, "tick panicked; instance marked failed");
                    return;
                }
                state.tick += 1;
                let payload = TickPayload {
                    simulation_id: id,
                    tick: state.tick,
                    agents: state.flock.agents().iter().map(AgentState::from).collect(),
                };
                let targets: Vec<_> = state.subscribers.values().cloned().collect();
                (payload, targets)
            };

            // Fan-out on unbounded channels never blocks. A receiver dropped
            // without unregistering just fails the send and is skipped.
            for subscriber in &targets {
                let _ = subscriber.send(StreamEvent::Tick(payload.clone()));
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = shutdown.changed() => return,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flock_core::Mode;
    use std::time::Duration;

    fn fast_settings() -> SimulationSettings {
        SimulationSettings {
            num_agents: 5,
            mode: Mode::Swarm,
            timestep: 0.05,
            update_interval: 0.01,
        }
    }

    async fn wait_until_idle(instance: &Arc<SimulationInstance>) {
        for _ in 0..200 {
            if !instance.is_running().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("instance never returned to idle");
    }

    #[tokio::test]
    async fn test_snapshot_on_idle_instance() {
        let instance = SimulationInstance::new(fast_settings());
        let snapshot = instance.snapshot().await;
        assert_eq!(snapshot.tick, 0);
        assert_eq!(snapshot.agents.len(), 5);
        assert_eq!(snapshot.simulation_id, instance.id());
        assert!(!instance.is_running().await);
    }

    #[tokio::test]
    async fn test_register_starts_loop_and_streams_consecutive_ticks() {
        let instance = SimulationInstance::new(fast_settings());
        let mut subscription = instance.register().await;
        // Baseline snapshot before consuming, per the register contract.
        let baseline = instance.snapshot().await;
        assert!(instance.is_running().await);
        assert_eq!(baseline.agents.len(), 5);

        let mut last_tick = None;
        for _ in 0..5 {
            let event = tokio::time::timeout(Duration::from_secs(2), subscription.receiver.recv())
                .await
                .expect("no tick within timeout")
                .expect("channel closed unexpectedly");
            match event {
                StreamEvent::Tick(payload) => {
                    assert_eq!(payload.agents.len(), 5);
                    if let Some(previous) = last_tick {
                        assert_eq!(payload.tick, previous + 1);
                    }
                    last_tick = Some(payload.tick);
                }
                StreamEvent::Shutdown => panic!("unexpected shutdown"),
            }
        }

        instance.unregister(subscription.id).await;
        wait_until_idle(&instance).await;
    }

    #[tokio::test]
    async fn test_snapshot_tick_is_monotonic_while_running() {
        let instance = SimulationInstance::new(fast_settings());
        let subscription = instance.register().await;

        let first = instance.snapshot().await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        let second = instance.snapshot().await;
        assert!(second.tick >= first.tick);

        instance.unregister(subscription.id).await;
        wait_until_idle(&instance).await;
    }

    #[tokio::test]
    async fn test_unregister_last_subscriber_returns_to_idle() {
        let instance = SimulationInstance::new(fast_settings());
        let first = instance.register().await;
        let second = instance.register().await;
        assert_eq!(instance.subscriber_count().await, 2);

        instance.unregister(first.id).await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        // One subscriber left: still running.
        assert!(instance.is_running().await);

        instance.unregister(second.id).await;
        wait_until_idle(&instance).await;
        assert_eq!(instance.subscriber_count().await, 0);
    }

    #[tokio::test]
    async fn test_unregister_is_idempotent() {
        let instance = SimulationInstance::new(fast_settings());
        let subscription = instance.register().await;

        instance.unregister(subscription.id).await;
        instance.unregister(subscription.id).await;
        instance.unregister(Uuid::new_v4()).await;
        wait_until_idle(&instance).await;
    }

    #[tokio::test]
    async fn test_reregister_after_stop_restarts_loop() {
        let instance = SimulationInstance::new(fast_settings());
        let first = instance.register().await;
        instance.unregister(first.id).await;
        wait_until_idle(&instance).await;

        let mut second = instance.register().await;
        assert!(instance.is_running().await);
        let event = tokio::time::timeout(Duration::from_secs(2), second.receiver.recv())
            .await
            .expect("no tick after restart")
            .expect("channel closed");
        assert!(matches!(event, StreamEvent::Tick(_)));

        instance.unregister(second.id).await;
        wait_until_idle(&instance).await;
    }

    #[tokio::test]
    async fn test_close_delivers_shutdown_marker() {
        let instance = SimulationInstance::new(fast_settings());
        let mut subscription = instance.register().await;

        instance.close().await;
        assert!(!instance.is_running().await);

        // Drain any ticks already in flight; the terminal marker follows.
        loop {
            let event = tokio::time::timeout(Duration::from_secs(2), subscription.receiver.recv())
                .await
                .expect("no shutdown marker")
                .expect("channel closed before shutdown marker");
            if event == StreamEvent::Shutdown {
                break;
            }
        }
        assert_eq!(instance.subscriber_count().await, 0);
    }

    #[tokio::test]
    async fn test_register_after_close_gets_immediate_shutdown() {
        let instance = SimulationInstance::new(fast_settings());
        instance.close().await;

        let mut subscription = instance.register().await;
        let event = subscription.receiver.recv().await.expect("channel closed");
        assert_eq!(event, StreamEvent::Shutdown);
        assert!(!instance.is_running().await);
    }

    #[tokio::test]
    async fn test_snapshot_agents_match_settings_after_ticks() {
        let instance = SimulationInstance::new(fast_settings());
        let subscription = instance.register().await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        let snapshot = instance.snapshot().await;
        assert_eq!(snapshot.agents.len(), 5);
        for agent in &snapshot.agents {
            let magnitude = agent.heading.norm();
            assert!((magnitude - 1.0).abs() < 1e-9, "heading not unit length");
        }

        instance.unregister(subscription.id).await;
        wait_until_idle(&instance).await;
    }
}
