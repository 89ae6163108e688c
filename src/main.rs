//! Worldcache host.
//!
//! Loads a synthetic simulation, drives it on a fixed tick and reports what
//! the caches did when each session is torn down.

use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use worldcache::config::Config;
use worldcache::session::SessionHost;
use worldcache::sim::Simulation;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Load .env file first (before anything else)
    dotenvy::dotenv().ok();

    // If RUST_LOG is not set, default to "info" level for our crate
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("worldcache=info"));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting worldcache...");

    let config = Config::from_env()?;
    info!("Configuration loaded successfully");
    info!(
        tick_ms = config.tick_interval.as_millis() as u64,
        max_ticks = config.max_ticks,
        sessions = config.sessions,
        "Run settings"
    );

    let mut host = SessionHost::new(config.clone());
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    'sessions: for _ in 0..config.sessions {
        let session = host.load();
        let mut sim = Simulation::new();
        sim.populate(session);

        let mut ticker = time::interval(config.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while config.max_ticks == 0 || sim.tick() < config.max_ticks {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = sim.step(session);
                    debug!(?report, "Step finished");
                }
                result = &mut shutdown => {
                    if let Err(err) = result {
                        warn!("Failed to listen for Ctrl-C: {}", err);
                    }
                    info!("Shutdown requested");
                    print_stats(&mut host)?;
                    break 'sessions;
                }
            }
        }

        print_stats(&mut host)?;
    }

    info!("Worldcache stopped");
    Ok(())
}

fn print_stats(host: &mut SessionHost) -> anyhow::Result<()> {
    if let Some(stats) = host.unload() {
        println!("{}", serde_json::to_string(&stats)?);
    }
    Ok(())
}
