//! Trading engine.
//!
//! The engine owns every component and is driven from a single task: the
//! application loop feeds it gateway events through [`Engine::handle_event`]
//! and the current time through [`Engine::advance`], which runs the
//! periodic tasks that are due. Components never reach each other
//! directly; the engine passes collaborators in on every call.

use std::collections::HashMap;
use tracing::{debug, info, warn};

use autotrade_core::{
    resolve_session_time, AccountNo, AccountSnapshot, OrderId, OrderKind, ScreenNumberAllocator,
    Symbol, SymbolLimits, TradingSettings, UnfilledOrder, UnfilledRow,
};
use autotrade_executor::{DispatchOutcome, RequestScheduler, TrRequest, UnfilledOrderMonitor};
use autotrade_gateway::{
    BrokerGateway, ConditionMatch, FillEvent, FillSide, GatewayEvent, GatewayResult, MatchKind,
    RateLimiter,
};
use autotrade_persistence::PersistenceStore;
use autotrade_telemetry::Metrics;
use autotrade_watchlist::{
    AccountSync, ConditionTable, PriceEventProcessor, ProcessorParams, RealtimeRegistry,
    WatchlistStore,
};

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::tasks::{PeriodicTasks, TaskKind};

/// Response of a dispatched TR request.
enum TrResponse {
    Account(AccountSnapshot),
    Unfilled(Vec<UnfilledRow>),
    Limits(Symbol, SymbolLimits),
}

/// Order that left the queue, kept to route the dispatch outcome.
struct SentOrder {
    kind: OrderKind,
    symbol: Symbol,
    original_order_id: Option<OrderId>,
}

/// Engine context.
pub struct Engine<G, P> {
    gateway: G,
    persistence: P,
    account: AccountNo,
    configured_account: Option<String>,
    settings: TradingSettings,
    store: WatchlistStore,
    conditions: ConditionTable,
    realtime: RealtimeRegistry,
    processor: PriceEventProcessor,
    account_sync: AccountSync,
    scheduler: RequestScheduler,
    unfilled: UnfilledOrderMonitor,
    screens: ScreenNumberAllocator,
    tasks: PeriodicTasks,
    limits: HashMap<Symbol, SymbolLimits>,
    auto_conditions: Vec<String>,
    utc_offset_secs: i32,
}

impl<G: BrokerGateway, P: PersistenceStore> Engine<G, P> {
    /// Build the engine and restore persisted state.
    ///
    /// Persisted settings win over the configured ones. A watchlist that
    /// fails to load is logged and replaced by an empty one.
    pub fn new(config: &AppConfig, gateway: G, persistence: P, now_ms: u64) -> AppResult<Self> {
        let settings = match persistence.load_settings()? {
            Some(settings) if settings.validate().is_ok() => {
                info!(?settings, "Trading settings restored");
                settings
            }
            Some(settings) => {
                warn!(?settings, "Persisted settings invalid, using configured values");
                config.trading.settings()
            }
            None => config.trading.settings(),
        };

        let store = match persistence.load_watchlist() {
            Ok(Some(table)) => {
                info!(entries = table.len(), "Watchlist restored");
                WatchlistStore::from_table(table)
            }
            Ok(None) => WatchlistStore::new(),
            Err(e) => {
                warn!(error = %e, "Persisted watchlist unreadable, starting empty");
                WatchlistStore::new()
            }
        };
        Metrics::watchlist_size(store.len());

        let processor = PriceEventProcessor::new(ProcessorParams {
            account: AccountNo::default(),
            stop_loss_order: config.trading.stop_loss_order,
            round_trip_cost_pct: config.trading.round_trip_cost_pct,
        });

        Ok(Self {
            gateway,
            persistence,
            account: AccountNo::default(),
            configured_account: config.gateway.account.clone(),
            settings,
            store,
            conditions: ConditionTable::new(),
            realtime: RealtimeRegistry::new(),
            processor,
            account_sync: AccountSync::new(),
            scheduler: RequestScheduler::new(RateLimiter::new(config.rate_limit.tiers.clone())),
            unfilled: UnfilledOrderMonitor::new(config.unfilled.amend_after_ms),
            screens: ScreenNumberAllocator::new(config.screens.base, config.screens.max),
            tasks: PeriodicTasks::from_schedule(&config.schedule, now_ms),
            limits: HashMap::new(),
            auto_conditions: config.trading.auto_conditions.clone(),
            utc_offset_secs: config.gateway.exchange_utc_offset_secs,
        })
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Connect, pick the account, resubscribe restored symbols and request
    /// the condition list. A connect failure is fatal.
    pub fn startup(&mut self, now_ms: u64) -> AppResult<()> {
        self.gateway.connect()?;
        Metrics::gateway_connected(true);

        let accounts = self.gateway.accounts()?;
        self.account = match &self.configured_account {
            Some(wanted) => accounts
                .into_iter()
                .find(|a| a.as_str() == wanted)
                .ok_or_else(|| AppError::Config(format!("account {wanted} not available")))?,
            None => accounts.into_iter().next().ok_or(AppError::NoAccount)?,
        };
        self.processor.set_account(self.account.clone());
        info!(account = %self.account, "Trading account selected");

        let restored: Vec<Symbol> = self.store.iter().map(|e| e.symbol.clone()).collect();
        for symbol in &restored {
            self.register_realtime_once(symbol);
        }

        self.gateway.load_conditions()?;
        self.scheduler.enqueue_tr(TrRequest::AccountSnapshot);
        self.scheduler.enqueue_tr(TrRequest::UnfilledOrders);

        info!(
            now_ms,
            restored = restored.len(),
            buy_amount = %self.settings.buy_amount,
            goal_return_pct = %self.settings.goal_return_pct,
            stop_loss_pct = %self.settings.stop_loss_pct,
            "Engine started"
        );
        Ok(())
    }

    /// Persist everything before exit.
    pub fn shutdown(&mut self) {
        self.persist_all();
        Metrics::gateway_connected(false);
        info!(
            watchlist = self.store.len(),
            queued_orders = self.scheduler.order_len(),
            unfilled = self.unfilled.len(),
            "Engine stopped"
        );
    }

    // ========================================================================
    // Events
    // ========================================================================

    pub fn handle_event(&mut self, event: GatewayEvent, now_ms: u64) {
        match event {
            GatewayEvent::Tick(tick) => {
                self.gateway.observe_tick(&tick);
                let report = self.processor.on_tick(
                    &tick,
                    now_ms,
                    &self.settings,
                    &mut self.store,
                    &mut self.conditions,
                    &mut self.screens,
                    &mut self.scheduler,
                );
                if report.priced {
                    Metrics::watchlist_size(self.store.len());
                }
            }
            GatewayEvent::Fill(fill) => self.on_fill(fill, now_ms),
            GatewayEvent::ConditionMatch(hit) => self.on_condition_match(hit),
            GatewayEvent::ConditionListLoaded(list) => {
                self.conditions.load(list);
                for name in self.auto_conditions.clone() {
                    if let Err(e) = self.condition_in(&name) {
                        warn!(condition = %name, error = %e, "Auto condition not applied");
                    }
                }
            }
            GatewayEvent::Message {
                screen,
                request,
                text,
            } => {
                info!(screen = %screen, request = %request, text = %text, "Broker message");
            }
        }
    }

    fn on_fill(&mut self, fill: FillEvent, now_ms: u64) {
        match fill.side {
            FillSide::Buy => {
                if fill.filled_qty.is_zero() {
                    debug!(symbol = %fill.symbol, order_id = %fill.order_id, "Buy accepted");
                    return;
                }
                if !self.store.record_fill(&fill.symbol, fill.filled_qty) {
                    debug!(symbol = %fill.symbol, "Buy fill for untracked symbol");
                }
            }
            FillSide::Sell | FillSide::SellAmend => {
                let accepted_at =
                    resolve_session_time(now_ms, &fill.order_time, self.utc_offset_secs);
                let update = UnfilledOrder {
                    symbol: fill.symbol.clone(),
                    remaining_qty: fill.remaining_qty,
                    order_price: fill.order_price,
                    accepted_at,
                };
                if self.unfilled.on_sell_update(fill.order_id.clone(), update) {
                    self.persist_watchlist();
                }
            }
            FillSide::Other => {
                debug!(symbol = %fill.symbol, order_id = %fill.order_id, "Notification ignored");
            }
        }
    }

    fn on_condition_match(&mut self, hit: ConditionMatch) {
        if !self.conditions.is_registered(&hit.condition_index) {
            debug!(
                symbol = %hit.symbol,
                index = %hit.condition_index,
                "Match for unregistered condition ignored"
            );
            return;
        }
        match hit.kind {
            MatchKind::Include => {
                let symbol = hit.symbol;
                if !self.conditions.admit(&symbol) {
                    debug!(symbol = %symbol, "Symbol exited this session, match ignored");
                    return;
                }
                self.register_realtime_once(&symbol);
                if self.store.contains(&symbol) {
                    debug!(symbol = %symbol, "Symbol already tracked");
                    return;
                }
                let name = self.gateway.symbol_name(&symbol).unwrap_or_else(|e| {
                    warn!(symbol = %symbol, error = %e, "Symbol name lookup failed");
                    symbol.to_string()
                });
                self.store
                    .include(symbol.clone(), name, Some(hit.condition_name));
                self.scheduler.enqueue_tr(TrRequest::SymbolLimits(symbol));
                Metrics::watchlist_size(self.store.len());
            }
            MatchKind::Exclude => {
                info!(symbol = %hit.symbol, condition = %hit.condition_name, "Symbol left condition");
            }
            MatchKind::Other => {
                debug!(symbol = %hit.symbol, "Unknown condition event");
            }
        }
    }

    fn register_realtime_once(&mut self, symbol: &Symbol) {
        if self.realtime.contains(symbol) {
            return;
        }
        match self.gateway.register_realtime(self.screens.next(), symbol) {
            Ok(()) => {
                self.realtime.register(symbol);
                debug!(symbol = %symbol, "Realtime registered");
            }
            Err(e) => warn!(symbol = %symbol, error = %e, "Realtime registration failed"),
        }
    }

    // ========================================================================
    // Operator commands
    // ========================================================================

    /// Start realtime matching for a saved condition.
    ///
    /// Returns whether the condition is registered afterwards. A rejection
    /// for a condition that is already registered counts as registered.
    pub fn condition_in(&mut self, name: &str) -> AppResult<bool> {
        let index = self.conditions.resolve(name)?;
        let accepted = self
            .gateway
            .send_condition(self.screens.next(), name.trim(), &index)?;
        if accepted || self.conditions.is_registered(&index) {
            self.conditions.register(index, name.trim());
            Ok(true)
        } else {
            warn!(condition = name, index = %index, "Condition rejected by broker");
            Ok(false)
        }
    }

    /// Stop realtime matching for a registered condition.
    pub fn condition_out(&mut self, name: &str) -> AppResult<()> {
        let index = self.conditions.unregister(name)?;
        self.gateway
            .stop_condition(self.screens.next(), name.trim(), &index)?;
        Ok(())
    }

    /// Replace the trading settings. Saved on the next persist cycle.
    ///
    /// Entries already priced keep their levels.
    pub fn set_settings(&mut self, settings: TradingSettings) -> AppResult<()> {
        settings.validate()?;
        info!(?settings, "Trading settings updated");
        self.settings = settings;
        Ok(())
    }

    // ========================================================================
    // Periodic tasks
    // ========================================================================

    /// Run every task due at `now_ms`. Returns the tasks that ran.
    pub fn advance(&mut self, now_ms: u64) -> Vec<TaskKind> {
        let due = self.tasks.due(now_ms);
        for kind in &due {
            self.run_task(*kind, now_ms);
        }
        due
    }

    fn run_task(&mut self, kind: TaskKind, now_ms: u64) {
        match kind {
            TaskKind::TrDispatch => self.dispatch_tr(now_ms),
            TaskKind::OrderDispatch => self.dispatch_order(now_ms),
            TaskKind::AccountSync => self.scheduler.enqueue_tr(TrRequest::AccountSnapshot),
            TaskKind::UnfilledQuery => self.scheduler.enqueue_tr(TrRequest::UnfilledOrders),
            TaskKind::UnfilledSweep => {
                let amended = self.unfilled.sweep(
                    now_ms,
                    &self.processor,
                    &mut self.screens,
                    &self.account,
                    &mut self.scheduler,
                );
                if !amended.is_empty() {
                    self.persist_watchlist();
                }
            }
            TaskKind::OutlierSweep => {
                let removed = self.store.sweep_outliers();
                if !removed.is_empty() {
                    Metrics::watchlist_removed("outlier", removed.len());
                    Metrics::watchlist_size(self.store.len());
                    self.prune_limits();
                    self.persist_watchlist();
                }
            }
            TaskKind::Persist => self.persist_all(),
        }
    }

    fn dispatch_tr(&mut self, now_ms: u64) {
        let gateway = &mut self.gateway;
        let screens = &mut self.screens;
        let account = &self.account;
        let outcome = self.scheduler.tick_tr(now_ms, |request| -> GatewayResult<TrResponse> {
            let screen = screens.next();
            match request {
                TrRequest::AccountSnapshot => gateway
                    .request_account_snapshot(screen, account)
                    .map(TrResponse::Account),
                TrRequest::UnfilledOrders => gateway
                    .request_unfilled_orders(screen, account)
                    .map(TrResponse::Unfilled),
                TrRequest::SymbolLimits(symbol) => gateway
                    .request_symbol_limits(screen, &symbol)
                    .map(|limits| TrResponse::Limits(symbol, limits)),
            }
        });
        if let DispatchOutcome::Dispatched(response) = outcome {
            self.apply_tr_response(response, now_ms);
        }
    }

    fn apply_tr_response(&mut self, response: TrResponse, now_ms: u64) {
        match response {
            TrResponse::Account(snapshot) => {
                let outcome = self.account_sync.reconcile(snapshot, &mut self.store);
                for symbol in &outcome.auto_register {
                    self.register_realtime_once(symbol);
                }
                self.prune_limits();
                Metrics::watchlist_size(self.store.len());
            }
            TrResponse::Unfilled(rows) => {
                self.unfilled.reconcile(&rows, now_ms, self.utc_offset_secs);
            }
            TrResponse::Limits(symbol, limits) => {
                debug!(symbol = %symbol, upper = %limits.upper, lower = %limits.lower, "Symbol limits cached");
                self.limits.insert(symbol, limits);
            }
        }
    }

    fn dispatch_order(&mut self, now_ms: u64) {
        let gateway = &mut self.gateway;
        let mut sent = None;
        let outcome = self.scheduler.tick_orders(now_ms, |order| {
            sent = Some(SentOrder {
                kind: order.kind,
                symbol: order.symbol.clone(),
                original_order_id: order.original_order_id.clone(),
            });
            gateway.submit_order(&order)
        });
        let Some(sent) = sent else {
            return;
        };

        match outcome {
            DispatchOutcome::Dispatched(ack) => {
                debug!(order_id = ?ack.order_id, kind = %sent.kind, "Order acknowledged");
                if let (OrderKind::AmendSell, Some(original)) = (sent.kind, &sent.original_order_id)
                {
                    self.unfilled.amend_dispatched(original);
                }
            }
            DispatchOutcome::Failed => match sent.kind {
                OrderKind::LimitSell | OrderKind::MarketSell => {
                    if self.store.cancel_exit(&sent.symbol) {
                        warn!(symbol = %sent.symbol, "Exit sell failed, exit re-evaluated on next tick");
                    }
                }
                OrderKind::AmendSell => {
                    if let Some(original) = &sent.original_order_id {
                        self.unfilled.amend_failed(original);
                    }
                }
                OrderKind::MarketBuy => {}
            },
            DispatchOutcome::Idle | DispatchOutcome::Deferred => {}
        }
    }

    /// Forget price limits of symbols no longer on the watchlist.
    fn prune_limits(&mut self) {
        let store = &self.store;
        self.limits.retain(|symbol, _| store.contains(symbol));
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    fn persist_watchlist(&self) {
        if let Err(e) = self.persistence.save_watchlist(&self.store.to_table()) {
            warn!(error = %e, "Failed to save watchlist");
        }
    }

    fn persist_all(&self) {
        self.persist_watchlist();
        if let Err(e) = self.persistence.save_settings(&self.settings) {
            warn!(error = %e, "Failed to save settings");
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn gateway_mut(&mut self) -> &mut G {
        &mut self.gateway
    }

    pub fn account(&self) -> &AccountNo {
        &self.account
    }

    pub fn settings(&self) -> &TradingSettings {
        &self.settings
    }

    pub fn store(&self) -> &WatchlistStore {
        &self.store
    }

    pub fn conditions(&self) -> &ConditionTable {
        &self.conditions
    }

    pub fn realtime(&self) -> &RealtimeRegistry {
        &self.realtime
    }

    pub fn scheduler(&self) -> &RequestScheduler {
        &self.scheduler
    }

    pub fn unfilled(&self) -> &UnfilledOrderMonitor {
        &self.unfilled
    }

    pub fn account_sync(&self) -> &AccountSync {
        &self.account_sync
    }

    pub fn symbol_limits(&self, symbol: &Symbol) -> Option<SymbolLimits> {
        self.limits.get(symbol).copied()
    }
}
