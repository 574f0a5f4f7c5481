//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use autotrade_bot::{AppConfig, Engine};
use autotrade_core::{Price, Symbol, WatchlistTable};
use autotrade_gateway::{GatewayEvent, PaperConfig, PaperGateway, Tick};
use autotrade_persistence::{FilePersistence, PersistenceStore};
use tempfile::TempDir;
use tokio::sync::mpsc;

pub type PaperEngine = Engine<PaperGateway, FilePersistence>;

/// Paper engine wired to an event receiver and a temporary data dir.
pub struct Harness {
    pub engine: PaperEngine,
    pub events: mpsc::UnboundedReceiver<GatewayEvent>,
    pub data_dir: TempDir,
}

impl Harness {
    /// Build and start an engine at t = 0, then deliver startup events.
    pub fn start(config: AppConfig) -> Self {
        Self::start_with(config, None)
    }

    /// Like [`Harness::start`], with `watchlist` saved beforehand so the
    /// engine restores it.
    pub fn start_with(mut config: AppConfig, watchlist: Option<&WatchlistTable>) -> Self {
        let data_dir = tempfile::tempdir().unwrap();
        config.persistence.data_dir = data_dir.path().to_path_buf();

        let (tx, events) = mpsc::unbounded_channel();
        let gateway = PaperGateway::new(config.gateway.paper.clone(), tx);
        let persistence = FilePersistence::new(data_dir.path());
        if let Some(table) = watchlist {
            persistence.save_watchlist(table).unwrap();
        }
        let mut engine = Engine::new(&config, gateway, persistence, 0).unwrap();
        engine.startup(0).unwrap();

        let mut harness = Self {
            engine,
            events,
            data_dir,
        };
        harness.drain(0);
        harness
    }

    /// Watchlist as last saved to disk.
    pub fn saved_watchlist(&self) -> Option<WatchlistTable> {
        FilePersistence::new(self.data_dir.path())
            .load_watchlist()
            .unwrap()
    }

    /// Deliver every queued gateway event.
    pub fn drain(&mut self, now_ms: u64) -> usize {
        let mut delivered = 0;
        while let Ok(event) = self.events.try_recv() {
            self.engine.handle_event(event, now_ms);
            delivered += 1;
        }
        delivered
    }

    /// Advance the clock, then deliver the events the tasks produced.
    pub fn advance(&mut self, now_ms: u64) {
        self.engine.advance(now_ms);
        self.drain(now_ms);
    }

    pub fn tick(&mut self, now_ms: u64, symbol: &str, last: i64, bid: i64) {
        let tick = Tick {
            symbol: Symbol::new(symbol),
            last_price: Price::from_units(last),
            best_bid: Price::from_units(bid),
        };
        self.engine.handle_event(GatewayEvent::Tick(tick), now_ms);
        self.drain(now_ms);
    }
}

/// Config with one saved condition that is applied on list load.
pub fn paper_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.trading.auto_conditions = vec!["momentum".to_string()];
    config.gateway.paper = PaperConfig {
        conditions: "000^momentum;001^breakout;".to_string(),
        symbol_names: [("005930".to_string(), "Samsung".to_string())]
            .into_iter()
            .collect(),
        ..PaperConfig::default()
    };
    config
}
