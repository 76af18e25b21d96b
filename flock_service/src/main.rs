//! flockd - run a flocking simulation headless and log its ticks.

use clap::Parser;
use flock_core::Mode;
use flock_service::{SimulationRegistry, SimulationSettings, StreamEvent};
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "flockd", about = "Headless flocking simulation runner")]
struct Args {
    /// Number of agents
    #[arg(long, default_value_t = 20)]
    agents: usize,

    /// Behavioral mode: swarm, torus, hpp, dpp
    #[arg(long, default_value = "swarm")]
    mode: Mode,

    /// Integration timestep in seconds
    #[arg(long, default_value_t = 0.1)]
    timestep: f64,

    /// Broadcast interval in seconds
    #[arg(long, default_value_t = 0.1)]
    interval: f64,

    /// How long to run before shutting down, in seconds
    #[arg(long, default_value_t = 5.0)]
    duration: f64,

    /// Verbose output (debug level)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    let registry = SimulationRegistry::new();
    let settings = SimulationSettings {
        num_agents: args.agents,
        mode: args.mode,
        timestep: args.timestep,
        update_interval: args.interval,
    };
    let instance = registry.create(settings).await?;
    info!(
        simulation = %instance.id(),
        agents = args.agents,
        mode = %args.mode,
        "simulation created"
    );

    let mut subscription = instance.register().await;
    // Baseline before consuming the stream, per the register contract.
    let baseline = instance.snapshot().await;
    info!(tick = baseline.tick, "baseline snapshot taken");

    let deadline = tokio::time::Instant::now() + Duration::from_secs_f64(args.duration);
    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => break,
            event = subscription.receiver.recv() => match event {
                Some(StreamEvent::Tick(payload)) => {
                    info!(tick = payload.tick, agents = payload.agents.len(), "tick");
                }
                Some(StreamEvent::Shutdown) | None => break,
            }
        }
    }

    instance.unregister(subscription.id).await;
    registry.delete(instance.id()).await?;
    info!(remaining = registry.list().await.len(), "shutdown complete");
    Ok(())
}
