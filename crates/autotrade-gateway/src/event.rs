//! Typed events delivered by the broker gateway.

use serde::{Deserialize, Serialize};

use autotrade_core::{ConditionIndex, OrderId, Price, Qty, Symbol};

// ============================================================================
// Market data
// ============================================================================

/// Trade tick for a subscribed symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tick {
    pub symbol: Symbol,
    pub last_price: Price,
    /// Best bid at the time of the trade; zero when the field was missing.
    pub best_bid: Price,
}

// ============================================================================
// Execution notifications
// ============================================================================

/// Order side reported on an execution notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FillSide {
    Buy,
    Sell,
    SellAmend,
    Other,
}

impl FillSide {
    /// Parse the broker's order-class label (sign prefixes already stripped).
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "매수" | "buy" => Self::Buy,
            "매도" | "sell" => Self::Sell,
            "매도정정" | "sell_amend" => Self::SellAmend,
            _ => Self::Other,
        }
    }

    pub fn is_sell(&self) -> bool {
        matches!(self, Self::Sell | Self::SellAmend)
    }
}

/// Order accept / execution notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillEvent {
    pub symbol: Symbol,
    pub name: String,
    pub order_id: OrderId,
    pub original_order_id: Option<OrderId>,
    pub side: FillSide,
    pub order_qty: Qty,
    pub order_price: Price,
    /// Cumulative filled quantity of the order.
    pub filled_qty: Qty,
    pub filled_price: Price,
    pub remaining_qty: Qty,
    /// Broker accept/execution time as HHMMSS; may be empty.
    pub order_time: String,
}

// ============================================================================
// Condition search
// ============================================================================

/// Whether a symbol entered or left a condition's result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchKind {
    Include,
    Exclude,
    Other,
}

impl MatchKind {
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "I" => Self::Include,
            "D" => Self::Exclude,
            _ => Self::Other,
        }
    }
}

/// Realtime condition-search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionMatch {
    pub symbol: Symbol,
    pub kind: MatchKind,
    pub condition_name: String,
    pub condition_index: ConditionIndex,
}

// ============================================================================
// Event envelope
// ============================================================================

/// Every asynchronous notification the gateway produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GatewayEvent {
    Tick(Tick),
    Fill(FillEvent),
    ConditionMatch(ConditionMatch),
    /// Saved condition list, as (index, name) pairs.
    ConditionListLoaded(Vec<(ConditionIndex, String)>),
    /// Free-form broker message.
    Message {
        screen: String,
        request: String,
        text: String,
    },
}
