//! Application loop against the paper broker and a replay file.

mod common;

use std::time::Duration;

use autotrade_bot::Application;
use autotrade_core::{Qty, Symbol};
use autotrade_persistence::{FilePersistence, PersistenceStore};
use common::paper_config;

const REPLAY: &str = r#"
# startup message, then a condition hit and a tick once the first account sync ran
{"type":"msg","screen":"5001","request":"login","text":"connected"}
{"type":"real_condition","symbol":"005930","event_type":"I","condition_name":"momentum","condition_index":"0"}
{"type":"real_data","symbol":"005930","real_type":"주식체결","fields":{"10":"+10000","28":"+9990"}}
"#;

#[tokio::test]
async fn test_replayed_hit_is_bought_and_persisted_on_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let replay_path = dir.path().join("session.jsonl");
    std::fs::write(&replay_path, REPLAY).unwrap();

    let mut config = paper_config();
    config.persistence.data_dir = dir.path().join("data");
    config.gateway.replay_path = Some(replay_path);
    config.gateway.replay_interval_ms = 150;

    let app = Application::new(config).unwrap();
    app.run_until(tokio::time::sleep(Duration::from_millis(1_500)))
        .await
        .unwrap();

    let store = FilePersistence::new(dir.path().join("data"));
    let table = store.load_watchlist().unwrap().unwrap();
    let entry = &table.entries[&Symbol::new("005930")];
    assert_eq!(entry.name, "Samsung");
    assert!(entry.buy_order_placed);
    assert_eq!(entry.held_qty, Qty(10));
    assert!(store.load_settings().unwrap().is_some());
}
