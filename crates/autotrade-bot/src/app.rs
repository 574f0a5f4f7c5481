//! Application loop.
//!
//! One tokio task owns the engine. It consumes gateway events from an
//! unbounded channel and advances the engine's periodic tasks on a fixed
//! tick, until the shutdown future resolves. State is persisted on exit.

use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{info, warn};

use autotrade_gateway::{spawn_replay, GatewayEvent, PaperGateway};
use autotrade_persistence::FilePersistence;

use crate::config::{AppConfig, GatewayMode};
use crate::engine::Engine;
use crate::error::AppResult;

/// Resolution of the engine clock.
const ENGINE_TICK: Duration = Duration::from_millis(5);

/// Millisecond clock anchored to the wall clock at creation.
#[derive(Debug, Clone, Copy)]
struct EngineClock {
    origin: Instant,
    epoch_ms: u64,
}

impl EngineClock {
    fn new() -> Self {
        Self {
            origin: Instant::now(),
            epoch_ms: u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0),
        }
    }

    fn now_ms(&self) -> u64 {
        let elapsed = u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.epoch_ms.saturating_add(elapsed)
    }
}

/// Main application.
pub struct Application {
    config: AppConfig,
}

impl Application {
    pub fn new(config: AppConfig) -> AppResult<Self> {
        Ok(Self { config })
    }

    /// Run until ctrl-c.
    pub async fn run(self) -> AppResult<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Run until `shutdown` resolves.
    pub async fn run_until(self, shutdown: impl Future<Output = ()>) -> AppResult<()> {
        let clock = EngineClock::new();
        let (event_tx, mut event_rx) = mpsc::unbounded_channel::<GatewayEvent>();

        let gateway = match self.config.gateway.mode {
            GatewayMode::Paper => {
                PaperGateway::new(self.config.gateway.paper.clone(), event_tx.clone())
            }
        };
        let persistence = FilePersistence::new(&self.config.persistence.data_dir);

        let mut engine = Engine::new(&self.config, gateway, persistence, clock.now_ms())?;
        engine.startup(clock.now_ms())?;

        let replay = self.config.gateway.replay_path.clone().map(|path| {
            info!(path = %path.display(), "Replaying recorded events");
            spawn_replay(
                path,
                Duration::from_millis(self.config.gateway.replay_interval_ms),
                event_tx.clone(),
            )
        });
        drop(event_tx);

        let mut ticker = tokio::time::interval(ENGINE_TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!("Entering main event loop");
        let mut events_handled = 0u64;
        loop {
            tokio::select! {
                Some(event) = event_rx.recv() => {
                    engine.handle_event(event, clock.now_ms());
                    events_handled += 1;
                }

                _ = ticker.tick() => {
                    engine.advance(clock.now_ms());
                }

                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        if let Some(handle) = replay {
            handle.abort();
        }
        engine.shutdown();
        info!(events_handled, "Shutting down");
        Ok(())
    }
}
