//! End-to-end engine scenarios against the paper broker on a virtual clock.

mod common;

use autotrade_bot::{AppError, Engine};
use autotrade_core::{
    ConditionIndex, OrderId, OrderKind, Price, Qty, Symbol, TradingSettings, WatchEntry,
    WatchState, WatchlistTable,
};
use autotrade_gateway::{ConditionMatch, GatewayEvent, MatchKind, PaperGateway};
use autotrade_persistence::{FilePersistence, PersistenceStore};
use autotrade_watchlist::WatchlistError;
use common::{paper_config, Harness};
use rust_decimal_macros::dec;
use tokio::sync::mpsc;

fn samsung() -> Symbol {
    Symbol::new("005930")
}

fn include(harness: &mut Harness, now_ms: u64, symbol: &str, index: &str) {
    let hit = ConditionMatch {
        symbol: Symbol::new(symbol),
        kind: MatchKind::Include,
        condition_name: "momentum".to_string(),
        condition_index: ConditionIndex::new(index),
    };
    harness
        .engine
        .handle_event(GatewayEvent::ConditionMatch(hit), now_ms);
    harness.drain(now_ms);
}

/// Start, run the initial account and unfilled queries, include Samsung
/// and buy it at 10,000. Returns at t = 1,000 with the buy filled.
fn holding_samsung() -> Harness {
    let mut h = Harness::start(paper_config());
    h.advance(10);
    h.advance(20);
    include(&mut h, 30, "005930", "0");
    h.tick(30, "005930", 10_000, 9_990);
    h.advance(1_000);
    h
}

#[test]
fn test_auto_condition_registered_on_list_load() {
    let h = Harness::start(paper_config());
    assert!(h.engine.conditions().is_registered(&ConditionIndex::new("000")));
    assert!(!h.engine.conditions().is_registered(&ConditionIndex::new("001")));
}

#[test]
fn test_inclusion_subscribes_and_requests_limits() {
    let mut h = Harness::start(paper_config());
    h.advance(10);
    h.advance(20);
    include(&mut h, 30, "005930", "0");

    let entry = h.engine.store().get(&samsung()).unwrap();
    assert_eq!(entry.state(), WatchState::Included);
    assert_eq!(entry.name, "Samsung");
    assert_eq!(entry.source_condition.as_deref(), Some("momentum"));
    assert!(h.engine.realtime().contains(&samsung()));
    assert!(h.engine.gateway().is_subscribed(&samsung()));
    assert_eq!(h.engine.scheduler().tr_len(), 1);

    // second hit for the same symbol changes nothing
    include(&mut h, 40, "005930", "000");
    assert_eq!(h.engine.store().len(), 1);
    assert_eq!(h.engine.scheduler().tr_len(), 1);
}

#[test]
fn test_match_for_unregistered_condition_ignored() {
    let mut h = Harness::start(paper_config());
    include(&mut h, 30, "005930", "1");
    assert!(h.engine.store().is_empty());
    assert!(!h.engine.realtime().contains(&samsung()));
}

#[test]
fn test_full_trade_lifecycle() {
    let mut h = holding_samsung();

    // bought 10 shares, limits cached
    let entry = h.engine.store().get(&samsung()).unwrap();
    assert_eq!(entry.state(), WatchState::Holding);
    assert_eq!(entry.held_qty, Qty(10));
    assert_eq!(entry.target_price, Some(Price::from_units(10_250)));
    assert_eq!(entry.stop_price, Some(Price::from_units(9_750)));
    assert_eq!(h.engine.gateway().position_qty(&samsung()), Qty(10));
    let limits = h.engine.symbol_limits(&samsung()).unwrap();
    assert_eq!(limits.upper, Price::from_units(13_000));
    assert_eq!(limits.lower, Price::from_units(7_000));

    // take-profit at the last tick
    h.tick(1_100, "005930", 10_300, 10_290);
    let entry = h.engine.store().get(&samsung()).unwrap();
    assert_eq!(entry.state(), WatchState::ExitRequested);
    let sell = h.engine.scheduler().pending_orders().next().unwrap();
    assert_eq!(sell.kind, OrderKind::LimitSell);
    assert_eq!(sell.price, Some(Price::from_units(10_300)));
    assert_eq!(sell.qty, Qty(10));

    // sell rests unfilled and is tracked
    h.advance(2_100);
    assert_eq!(h.engine.gateway().resting_count(), 1);
    assert_eq!(h.engine.unfilled().len(), 1);

    // ten seconds later the sweep amends it to the cached best bid and
    // saves the watchlist
    assert!(h.saved_watchlist().is_none());
    h.advance(12_100);
    assert!(h.engine.unfilled().is_empty());
    assert_eq!(h.engine.unfilled().amending_len(), 1);
    let amend = h.engine.scheduler().pending_orders().next().unwrap();
    assert_eq!(amend.kind, OrderKind::AmendSell);
    assert_eq!(amend.price, Some(Price::from_units(10_290)));
    assert_eq!(amend.original_order_id, Some(OrderId::new("0000002")));
    let saved = h.saved_watchlist().unwrap();
    assert_eq!(saved.entries[&samsung()].state(), WatchState::ExitRequested);

    // amendment dispatched; the replacement order is tracked again and the
    // account snapshot merges the average cost
    h.advance(12_200);
    assert_eq!(h.engine.unfilled().amending_len(), 0);
    let replacement = h.engine.unfilled().get(&OrderId::new("0000003")).unwrap();
    assert_eq!(replacement.accepted_at, 12_200);
    assert_eq!(
        h.engine.store().get(&samsung()).unwrap().avg_cost,
        Some(Price::from_units(10_000))
    );

    // bid reaches the amended price: filled, resolved, persisted
    h.tick(12_300, "005930", 10_290, 10_290);
    assert!(h.engine.unfilled().is_empty());
    assert_eq!(h.engine.gateway().position_qty(&samsung()), Qty::ZERO);
    assert_eq!(h.engine.gateway().cash(), dec!(10002900));
    let saved = FilePersistence::new(h.data_dir.path())
        .load_watchlist()
        .unwrap()
        .unwrap();
    assert!(saved.entries.contains_key(&samsung()));

    // next account sync drops the sold entry
    h.advance(17_300);
    h.advance(17_310);
    assert!(h.engine.store().is_empty());
    assert!(h.engine.symbol_limits(&samsung()).is_none());

    // an exited symbol is not bought again this session
    include(&mut h, 17_400, "005930", "0");
    assert!(h.engine.store().is_empty());
    assert!(h.engine.conditions().has_exited(&samsung()));
}

#[test]
fn test_stop_loss_sells_at_best_bid() {
    let mut h = holding_samsung();
    h.tick(1_100, "005930", 9_700, 9_693);

    let sell = h.engine.scheduler().pending_orders().next().unwrap();
    assert_eq!(sell.kind, OrderKind::LimitSell);
    assert_eq!(sell.price, Some(Price::from_units(9_690)));
    assert!(!h.engine.conditions().is_admitted(&samsung()));

    // exit is requested once
    h.tick(1_200, "005930", 9_600, 9_590);
    assert_eq!(h.engine.scheduler().order_len(), 1);
}

#[test]
fn test_unaffordable_entry_waits_for_lower_tick() {
    let mut config = paper_config();
    config.trading.buy_amount = dec!(100000);
    let mut h = Harness::start(config);
    include(&mut h, 30, "005930", "0");

    h.tick(40, "005930", 150_000, 149_900);
    assert_eq!(h.engine.store().state(&samsung()), Some(WatchState::PricedIn));
    assert_eq!(h.engine.scheduler().order_len(), 0);

    h.tick(50, "005930", 90_000, 89_900);
    let buy = h.engine.scheduler().pending_orders().next().unwrap();
    assert_eq!(buy.kind, OrderKind::MarketBuy);
    assert_eq!(buy.qty, Qty(1));
    // levels stay those of the first tick
    let entry = h.engine.store().get(&samsung()).unwrap();
    assert_eq!(entry.target_price, Some(Price::from_units(153_750)));
}

#[test]
fn test_condition_commands() {
    let mut h = Harness::start(paper_config());

    let err = h.engine.condition_in("nope").unwrap_err();
    assert!(matches!(
        err,
        AppError::Watchlist(WatchlistError::InvalidCondition(_))
    ));
    assert_eq!(h.engine.conditions().registered().count(), 1);

    // re-applying a registered condition keeps it registered
    assert!(h.engine.condition_in("momentum").unwrap());
    assert!(h.engine.condition_in("breakout").unwrap());
    assert_eq!(h.engine.conditions().registered().count(), 2);

    h.engine.condition_out("momentum").unwrap();
    include(&mut h, 30, "005930", "0");
    assert!(h.engine.store().is_empty());
    assert!(matches!(
        h.engine.condition_out("momentum"),
        Err(AppError::Watchlist(WatchlistError::NotRegistered(_)))
    ));
}

#[test]
fn test_state_survives_restart() {
    let mut h = holding_samsung();
    let custom = TradingSettings {
        buy_amount: dec!(300000),
        ..TradingSettings::default()
    };
    h.engine.set_settings(custom.clone()).unwrap();
    h.engine.shutdown();

    let (tx, _rx) = mpsc::unbounded_channel();
    let config = paper_config();
    let gateway = PaperGateway::new(config.gateway.paper.clone(), tx);
    let restarted =
        Engine::new(&config, gateway, FilePersistence::new(h.data_dir.path()), 0).unwrap();

    assert_eq!(restarted.settings(), &custom);
    let entry = restarted.store().get(&samsung()).unwrap();
    assert_eq!(entry.held_qty, Qty(10));
    assert_eq!(entry.state(), WatchState::Holding);
}

#[test]
fn test_outlier_sweep_drops_entry_and_saves() {
    let mut broken = WatchEntry::new(samsung(), "Samsung", Some("momentum".into()));
    broken.priced = true;
    broken.target_price = Some(Price::from_units(10_250));
    let mut healthy = WatchEntry::new(Symbol::new("000660"), "Hynix", None);
    healthy.priced = true;
    healthy.target_price = Some(Price::from_units(102_500));
    healthy.stop_price = Some(Price::from_units(97_500));
    let mut table = WatchlistTable::default();
    table.entries.insert(broken.symbol.clone(), broken);
    table.entries.insert(healthy.symbol.clone(), healthy);

    // keep the first account sync out of the way
    let mut config = paper_config();
    config.schedule.tr_dispatch_ms = 60_000;
    let mut h = Harness::start_with(config, Some(&table));
    assert_eq!(h.engine.store().len(), 2);

    h.advance(999);
    assert_eq!(h.engine.store().len(), 2);

    h.advance(1_000);
    assert!(!h.engine.store().contains(&samsung()));
    assert!(h.engine.store().contains(&Symbol::new("000660")));
    let saved = h.saved_watchlist().unwrap();
    assert_eq!(saved.len(), 1);
    assert!(!saved.entries.contains_key(&samsung()));
}
