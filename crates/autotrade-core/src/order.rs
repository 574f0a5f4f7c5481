//! Order types queued for dispatch to the broker.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::decimal::{Price, Qty};
use crate::ids::{AccountNo, OrderId, Symbol};
use crate::screen::ScreenId;

/// What an order does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderKind {
    /// New buy at market.
    MarketBuy,
    /// New sell at a limit price.
    LimitSell,
    /// New sell at market.
    MarketSell,
    /// Replace a resting sell (references the original order id).
    AmendSell,
}

impl OrderKind {
    /// Broker order-type code.
    pub fn order_type_code(&self) -> u8 {
        match self {
            Self::MarketBuy => 1,
            Self::LimitSell | Self::MarketSell => 2,
            Self::AmendSell => 6,
        }
    }

    /// Request name used to correlate broker responses.
    pub fn request_name(&self) -> &'static str {
        match self {
            Self::MarketBuy => "market_buy",
            Self::LimitSell => "limit_sell",
            Self::MarketSell => "market_sell",
            Self::AmendSell => "amend_sell",
        }
    }

    pub fn is_sell(&self) -> bool {
        !matches!(self, Self::MarketBuy)
    }
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.request_name())
    }
}

/// Price type ("hoga") of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceType {
    Limit,
    Market,
}

impl PriceType {
    /// Broker price-type code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Limit => "00",
            Self::Market => "03",
        }
    }
}

/// Order waiting in the order queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingOrder {
    pub kind: OrderKind,
    pub screen: ScreenId,
    pub account: AccountNo,
    pub symbol: Symbol,
    pub qty: Qty,
    /// Limit price; `None` for market orders.
    pub price: Option<Price>,
    pub price_type: PriceType,
    /// Order being amended (AmendSell only).
    pub original_order_id: Option<OrderId>,
    /// Enqueue timestamp (Unix milliseconds).
    pub created_at: u64,
}

impl PendingOrder {
    #[must_use]
    pub fn market_buy(
        screen: ScreenId,
        account: AccountNo,
        symbol: Symbol,
        qty: Qty,
        created_at: u64,
    ) -> Self {
        Self {
            kind: OrderKind::MarketBuy,
            screen,
            account,
            symbol,
            qty,
            price: None,
            price_type: PriceType::Market,
            original_order_id: None,
            created_at,
        }
    }

    #[must_use]
    pub fn limit_sell(
        screen: ScreenId,
        account: AccountNo,
        symbol: Symbol,
        qty: Qty,
        price: Price,
        created_at: u64,
    ) -> Self {
        Self {
            kind: OrderKind::LimitSell,
            screen,
            account,
            symbol,
            qty,
            price: Some(price),
            price_type: PriceType::Limit,
            original_order_id: None,
            created_at,
        }
    }

    #[must_use]
    pub fn market_sell(
        screen: ScreenId,
        account: AccountNo,
        symbol: Symbol,
        qty: Qty,
        created_at: u64,
    ) -> Self {
        Self {
            kind: OrderKind::MarketSell,
            screen,
            account,
            symbol,
            qty,
            price: None,
            price_type: PriceType::Market,
            original_order_id: None,
            created_at,
        }
    }

    /// Limit amendment of a resting sell.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn amend_sell(
        screen: ScreenId,
        account: AccountNo,
        symbol: Symbol,
        qty: Qty,
        price: Price,
        original_order_id: OrderId,
        created_at: u64,
    ) -> Self {
        Self {
            kind: OrderKind::AmendSell,
            screen,
            account,
            symbol,
            qty,
            price: Some(price),
            price_type: PriceType::Limit,
            original_order_id: Some(original_order_id),
            created_at,
        }
    }
}

/// Broker acknowledgement of a submitted order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderAck {
    /// Order number, when the transport reports one synchronously.
    pub order_id: Option<OrderId>,
}

/// Destination for orders produced by decision logic.
pub trait OrderSink {
    fn enqueue_order(&mut self, order: PendingOrder);
}

impl OrderSink for Vec<PendingOrder> {
    fn enqueue_order(&mut self, order: PendingOrder) {
        self.push(order);
    }
}

/// Source of the per-symbol best-bid reference price.
pub trait ReferencePrices {
    fn best_bid(&self, symbol: &Symbol) -> Option<Price>;
}

impl ReferencePrices for HashMap<Symbol, Price> {
    fn best_bid(&self, symbol: &Symbol) -> Option<Price> {
        self.get(symbol).copied()
    }
}
