//! In-memory paper broker.
//!
//! Lets the engine run end to end without a broker transport. Market
//! orders fill immediately at the latest tick, limit sells rest until the
//! best bid reaches their price, and amendments replace the resting order.
//! Every accept and fill is reported back on the event channel exactly as
//! a live broker would.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use autotrade_core::{
    round_to_tick, AccountNo, AccountSnapshot, ConditionIndex, OrderAck, OrderId, OrderKind,
    PendingOrder, PositionRow, Price, Qty, ScreenId, Symbol, SymbolLimits, UnfilledRow,
};

use crate::decode::parse_condition_list;
use crate::error::{GatewayError, GatewayResult};
use crate::event::{FillEvent, FillSide, GatewayEvent, Tick};
use crate::gateway::BrokerGateway;

fn default_account() -> String {
    "0000000000".to_string()
}

fn default_starting_cash() -> Decimal {
    Decimal::from(10_000_000)
}

fn default_limit_band_pct() -> Decimal {
    Decimal::from(30)
}

/// Paper broker configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperConfig {
    #[serde(default = "default_account")]
    pub account: String,
    #[serde(default = "default_starting_cash")]
    pub starting_cash: Decimal,
    /// Saved condition list in broker format (`"idx^name;..."`).
    #[serde(default)]
    pub conditions: String,
    /// Symbol display names.
    #[serde(default)]
    pub symbol_names: HashMap<String, String>,
    /// Daily price limit band in percent around the latest tick.
    #[serde(default = "default_limit_band_pct")]
    pub limit_band_pct: Decimal,
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            account: default_account(),
            starting_cash: default_starting_cash(),
            conditions: String::new(),
            symbol_names: HashMap::new(),
            limit_band_pct: default_limit_band_pct(),
        }
    }
}

#[derive(Debug, Clone)]
struct PaperPosition {
    qty: Qty,
    avg_cost: Price,
}

#[derive(Debug, Clone)]
struct RestingSell {
    symbol: Symbol,
    side: FillSide,
    qty: Qty,
    price: Price,
    original_order_id: Option<OrderId>,
}

/// Simulated broker.
pub struct PaperGateway {
    config: PaperConfig,
    events: mpsc::UnboundedSender<GatewayEvent>,
    connected: bool,
    cash: Decimal,
    positions: HashMap<Symbol, PaperPosition>,
    last_prices: HashMap<Symbol, Price>,
    best_bids: HashMap<Symbol, Price>,
    resting: BTreeMap<OrderId, RestingSell>,
    active_conditions: HashSet<ConditionIndex>,
    subscriptions: HashSet<Symbol>,
    next_order_no: u64,
}

impl PaperGateway {
    #[must_use]
    pub fn new(config: PaperConfig, events: mpsc::UnboundedSender<GatewayEvent>) -> Self {
        let cash = config.starting_cash;
        Self {
            config,
            events,
            connected: false,
            cash,
            positions: HashMap::new(),
            last_prices: HashMap::new(),
            best_bids: HashMap::new(),
            resting: BTreeMap::new(),
            active_conditions: HashSet::new(),
            subscriptions: HashSet::new(),
            next_order_no: 1,
        }
    }

    /// Cash not tied up in positions.
    pub fn cash(&self) -> Decimal {
        self.cash
    }

    /// Held quantity of `symbol`.
    pub fn position_qty(&self, symbol: &Symbol) -> Qty {
        self.positions
            .get(symbol)
            .map(|p| p.qty)
            .unwrap_or(Qty::ZERO)
    }

    /// Number of resting sell orders.
    pub fn resting_count(&self) -> usize {
        self.resting.len()
    }

    pub fn is_subscribed(&self, symbol: &Symbol) -> bool {
        self.subscriptions.contains(symbol)
    }

    fn ensure_connected(&self) -> GatewayResult<()> {
        if self.connected {
            Ok(())
        } else {
            Err(GatewayError::RequestFailed("not connected".to_string()))
        }
    }

    fn next_order_id(&mut self) -> OrderId {
        let id = OrderId::new(format!("{:07}", self.next_order_no));
        self.next_order_no += 1;
        id
    }

    fn name_of(&self, symbol: &Symbol) -> String {
        self.config
            .symbol_names
            .get(symbol.as_str())
            .cloned()
            .unwrap_or_else(|| symbol.to_string())
    }

    fn emit(&self, event: GatewayEvent) {
        if self.events.send(event).is_err() {
            debug!("Event receiver dropped");
        }
    }

    /// Shares not already committed to resting sells.
    fn free_qty(&self, symbol: &Symbol) -> u64 {
        let committed: u64 = self
            .resting
            .values()
            .filter(|r| &r.symbol == symbol)
            .map(|r| r.qty.inner())
            .sum();
        self.position_qty(symbol).inner().saturating_sub(committed)
    }

    #[allow(clippy::too_many_arguments)]
    fn emit_fill(
        &self,
        order_id: &OrderId,
        original_order_id: Option<OrderId>,
        symbol: &Symbol,
        side: FillSide,
        order_qty: Qty,
        order_price: Price,
        filled_qty: Qty,
        filled_price: Price,
    ) {
        self.emit(GatewayEvent::Fill(FillEvent {
            symbol: symbol.clone(),
            name: self.name_of(symbol),
            order_id: order_id.clone(),
            original_order_id,
            side,
            order_qty,
            order_price,
            filled_qty,
            filled_price,
            remaining_qty: Qty(order_qty.inner().saturating_sub(filled_qty.inner())),
            order_time: String::new(),
        }));
    }

    fn apply_buy(&mut self, symbol: &Symbol, qty: Qty, price: Price) {
        self.cash -= qty.notional(price);
        let position = self.positions.entry(symbol.clone()).or_insert(PaperPosition {
            qty: Qty::ZERO,
            avg_cost: Price::ZERO,
        });
        let total_qty = position.qty.inner() + qty.inner();
        let total_cost = position.qty.notional(position.avg_cost) + qty.notional(price);
        position.avg_cost = Price::new(total_cost / Decimal::from(total_qty));
        position.qty = Qty(total_qty);
    }

    fn apply_sell(&mut self, symbol: &Symbol, qty: Qty, price: Price) {
        self.cash += qty.notional(price);
        if let Some(position) = self.positions.get_mut(symbol) {
            position.qty = Qty(position.qty.inner().saturating_sub(qty.inner()));
            if position.qty.is_zero() {
                self.positions.remove(symbol);
            }
        }
    }

    fn fill_market_buy(&mut self, order: &PendingOrder) -> GatewayResult<OrderId> {
        let price = *self
            .last_prices
            .get(&order.symbol)
            .ok_or_else(|| GatewayError::Rejected(format!("no quote for {}", order.symbol)))?;
        if order.qty.notional(price) > self.cash {
            return Err(GatewayError::Rejected("insufficient cash".to_string()));
        }
        let id = self.next_order_id();
        self.apply_buy(&order.symbol, order.qty, price);
        self.emit_fill(
            &id,
            None,
            &order.symbol,
            FillSide::Buy,
            order.qty,
            price,
            order.qty,
            price,
        );
        Ok(id)
    }

    fn fill_market_sell(&mut self, order: &PendingOrder) -> GatewayResult<OrderId> {
        if self.free_qty(&order.symbol) < order.qty.inner() {
            return Err(GatewayError::Rejected("insufficient shares".to_string()));
        }
        let price = self
            .best_bids
            .get(&order.symbol)
            .or_else(|| self.last_prices.get(&order.symbol))
            .copied()
            .ok_or_else(|| GatewayError::Rejected(format!("no quote for {}", order.symbol)))?;
        let id = self.next_order_id();
        self.apply_sell(&order.symbol, order.qty, price);
        self.emit_fill(
            &id,
            None,
            &order.symbol,
            FillSide::Sell,
            order.qty,
            price,
            order.qty,
            price,
        );
        Ok(id)
    }

    fn rest_limit_sell(&mut self, order: &PendingOrder) -> GatewayResult<OrderId> {
        let price = order
            .price
            .filter(Price::is_positive)
            .ok_or_else(|| GatewayError::Rejected("limit order without price".to_string()))?;
        if self.free_qty(&order.symbol) < order.qty.inner() {
            return Err(GatewayError::Rejected("insufficient shares".to_string()));
        }
        let id = self.next_order_id();
        self.resting.insert(
            id.clone(),
            RestingSell {
                symbol: order.symbol.clone(),
                side: FillSide::Sell,
                qty: order.qty,
                price,
                original_order_id: None,
            },
        );
        self.emit_fill(
            &id,
            None,
            &order.symbol,
            FillSide::Sell,
            order.qty,
            price,
            Qty::ZERO,
            Price::ZERO,
        );
        Ok(id)
    }

    fn amend_sell(&mut self, order: &PendingOrder) -> GatewayResult<OrderId> {
        let original = order
            .original_order_id
            .clone()
            .ok_or_else(|| GatewayError::Rejected("amendment without original order".to_string()))?;
        let price = order
            .price
            .filter(Price::is_positive)
            .ok_or_else(|| GatewayError::Rejected("amendment without price".to_string()))?;
        let resting = self
            .resting
            .remove(&original)
            .ok_or_else(|| GatewayError::Rejected(format!("order {original} is not resting")))?;
        let qty = Qty(order.qty.inner().min(resting.qty.inner()));
        let id = self.next_order_id();
        self.resting.insert(
            id.clone(),
            RestingSell {
                symbol: resting.symbol.clone(),
                side: FillSide::SellAmend,
                qty,
                price,
                original_order_id: Some(original.clone()),
            },
        );
        self.emit_fill(
            &id,
            Some(original),
            &resting.symbol,
            FillSide::SellAmend,
            qty,
            price,
            Qty::ZERO,
            Price::ZERO,
        );
        Ok(id)
    }

    fn match_resting(&mut self, symbol: &Symbol, best_bid: Price) {
        let crossed: Vec<OrderId> = self
            .resting
            .iter()
            .filter(|(_, r)| &r.symbol == symbol && best_bid >= r.price)
            .map(|(id, _)| id.clone())
            .collect();
        for id in crossed {
            let Some(order) = self.resting.remove(&id) else {
                continue;
            };
            self.apply_sell(&order.symbol, order.qty, order.price);
            info!(order_id = %id, symbol = %order.symbol, qty = order.qty.inner(), price = %order.price, "Paper sell filled");
            self.emit_fill(
                &id,
                order.original_order_id.clone(),
                &order.symbol,
                order.side,
                order.qty,
                order.price,
                order.qty,
                order.price,
            );
        }
    }
}

impl BrokerGateway for PaperGateway {
    fn connect(&mut self) -> GatewayResult<()> {
        self.connected = true;
        info!(account = %self.config.account, cash = %self.cash, "Paper gateway connected");
        Ok(())
    }

    fn accounts(&mut self) -> GatewayResult<Vec<AccountNo>> {
        self.ensure_connected()?;
        Ok(vec![AccountNo::new(self.config.account.clone())])
    }

    fn load_conditions(&mut self) -> GatewayResult<()> {
        self.ensure_connected()?;
        let list = parse_condition_list(&self.config.conditions);
        self.emit(GatewayEvent::ConditionListLoaded(list));
        Ok(())
    }

    fn send_condition(
        &mut self,
        _screen: ScreenId,
        name: &str,
        index: &ConditionIndex,
    ) -> GatewayResult<bool> {
        self.ensure_connected()?;
        let known = parse_condition_list(&self.config.conditions)
            .iter()
            .any(|(i, n)| i == index && n == name);
        if !known {
            warn!(condition = name, index = %index, "Paper gateway does not know condition");
            return Ok(false);
        }
        Ok(self.active_conditions.insert(index.clone()))
    }

    fn stop_condition(
        &mut self,
        _screen: ScreenId,
        _name: &str,
        index: &ConditionIndex,
    ) -> GatewayResult<()> {
        self.ensure_connected()?;
        self.active_conditions.remove(index);
        Ok(())
    }

    fn register_realtime(&mut self, _screen: ScreenId, symbol: &Symbol) -> GatewayResult<()> {
        self.ensure_connected()?;
        self.subscriptions.insert(symbol.clone());
        Ok(())
    }

    fn symbol_name(&mut self, symbol: &Symbol) -> GatewayResult<String> {
        Ok(self.name_of(symbol))
    }

    fn submit_order(&mut self, order: &PendingOrder) -> GatewayResult<OrderAck> {
        self.ensure_connected()?;
        let id = match order.kind {
            OrderKind::MarketBuy => self.fill_market_buy(order)?,
            OrderKind::MarketSell => self.fill_market_sell(order)?,
            OrderKind::LimitSell => self.rest_limit_sell(order)?,
            OrderKind::AmendSell => self.amend_sell(order)?,
        };
        debug!(order_id = %id, kind = %order.kind, symbol = %order.symbol, "Paper order accepted");
        Ok(OrderAck { order_id: Some(id) })
    }

    fn request_account_snapshot(
        &mut self,
        _screen: ScreenId,
        _account: &AccountNo,
    ) -> GatewayResult<AccountSnapshot> {
        self.ensure_connected()?;
        let mut positions: Vec<PositionRow> = self
            .positions
            .iter()
            .map(|(symbol, p)| {
                let last = self.last_prices.get(symbol).copied().unwrap_or(p.avg_cost);
                let return_pct = last
                    .pct_from(p.avg_cost)
                    .map(|pct| pct.round_dp(2))
                    .unwrap_or(Decimal::ZERO);
                PositionRow {
                    symbol: symbol.clone(),
                    name: self.name_of(symbol),
                    tradable_qty: Qty(self.free_qty(symbol)),
                    held_qty: p.qty,
                    avg_cost: p.avg_cost,
                    last_price: last,
                    return_pct,
                }
            })
            .collect();
        positions.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        let held: Decimal = positions.iter().map(PositionRow::market_value).sum();
        Ok(AccountSnapshot {
            estimated_assets: self.cash + held,
            positions,
        })
    }

    fn request_unfilled_orders(
        &mut self,
        _screen: ScreenId,
        _account: &AccountNo,
    ) -> GatewayResult<Vec<UnfilledRow>> {
        self.ensure_connected()?;
        Ok(self
            .resting
            .iter()
            .map(|(id, r)| UnfilledRow {
                order_id: id.clone(),
                symbol: r.symbol.clone(),
                side: "-매도".to_string(),
                remaining_qty: r.qty,
                order_price: r.price,
                order_time: None,
            })
            .collect())
    }

    fn request_symbol_limits(
        &mut self,
        _screen: ScreenId,
        symbol: &Symbol,
    ) -> GatewayResult<SymbolLimits> {
        self.ensure_connected()?;
        let Some(&last) = self.last_prices.get(symbol) else {
            return Ok(SymbolLimits {
                upper: Price::ZERO,
                lower: Price::ZERO,
            });
        };
        let band = self.config.limit_band_pct / Decimal::ONE_HUNDRED;
        Ok(SymbolLimits {
            upper: round_to_tick(last * (Decimal::ONE + band)),
            lower: round_to_tick(last * (Decimal::ONE - band)),
        })
    }

    fn observe_tick(&mut self, tick: &Tick) {
        if tick.last_price.is_positive() {
            self.last_prices.insert(tick.symbol.clone(), tick.last_price);
        }
        if tick.best_bid.is_positive() {
            self.best_bids.insert(tick.symbol.clone(), tick.best_bid);
            self.match_resting(&tick.symbol, tick.best_bid);
        }
    }
}
