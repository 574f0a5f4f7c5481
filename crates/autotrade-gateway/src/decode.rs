//! Decode boundary from raw broker callbacks to typed events.
//!
//! Broker callbacks deliver every field as text keyed by a numeric field
//! id (FID). Prices carry a direction sign (`+`/`-`), symbol codes may carry
//! an `A` prefix, and any field can arrive empty. Malformed numeric fields
//! decode to zero and malformed optional text to `None`; decoding never
//! fails on field content.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use autotrade_core::{ConditionIndex, OrderId, Price, Qty, Symbol};

use crate::event::{ConditionMatch, FillEvent, FillSide, GatewayEvent, MatchKind, Tick};

/// Realtime type carrying trade ticks.
pub const REAL_TYPE_TRADE: &str = "주식체결";

/// Execution-notification class for order accept/fill.
pub const CHEJAN_ORDER: &str = "0";

/// Field ids (FIDs) used by the decoder.
pub mod fid {
    pub const LAST_PRICE: &str = "10";
    pub const BEST_BID: &str = "28";

    pub const SYMBOL: &str = "9001";
    pub const NAME: &str = "302";
    pub const ORDER_ID: &str = "9203";
    pub const ORIGINAL_ORDER_ID: &str = "904";
    pub const ORDER_QTY: &str = "900";
    pub const ORDER_PRICE: &str = "901";
    pub const REMAINING_QTY: &str = "902";
    pub const ORDER_CLASS: &str = "905";
    pub const ORDER_TIME: &str = "908";
    pub const FILLED_PRICE: &str = "910";
    pub const FILLED_QTY: &str = "911";
}

/// Raw broker callback as recorded on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawEvent {
    /// Realtime market data.
    RealData {
        symbol: String,
        real_type: String,
        #[serde(default)]
        fields: HashMap<String, String>,
    },
    /// Order accept / execution / balance notification.
    Chejan {
        gubun: String,
        #[serde(default)]
        fields: HashMap<String, String>,
    },
    /// Realtime condition-search hit.
    RealCondition {
        symbol: String,
        event_type: String,
        condition_name: String,
        condition_index: String,
    },
    /// Saved condition list (`"idx^name;idx^name;"`).
    ConditionList { list: String },
    /// Free-form broker message.
    Msg {
        #[serde(default)]
        screen: String,
        #[serde(default)]
        request: String,
        #[serde(default)]
        text: String,
    },
}

// ============================================================================
// Field helpers
// ============================================================================

fn field<'a>(fields: &'a HashMap<String, String>, id: &str) -> &'a str {
    fields.get(id).map(|s| s.trim()).unwrap_or("")
}

/// Strip direction signs and whitespace.
fn unsigned_text(raw: &str) -> String {
    raw.trim().replace(['+', '-'], "")
}

/// Price field; zero when missing or malformed.
pub fn parse_price(raw: &str) -> Price {
    unsigned_text(raw)
        .parse::<Decimal>()
        .map(Price::new)
        .unwrap_or(Price::ZERO)
}

/// Quantity field; zero when missing or malformed.
pub fn parse_qty(raw: &str) -> Qty {
    unsigned_text(raw).parse::<u64>().map(Qty).unwrap_or(Qty::ZERO)
}

/// Symbol code with the `A` prefix removed.
pub fn parse_symbol(raw: &str) -> Symbol {
    let trimmed = raw.trim();
    Symbol::new(trimmed.strip_prefix('A').unwrap_or(trimmed))
}

fn optional_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Parse a saved condition list (`"idx^name;idx^name;"`).
///
/// Segments without a `^` separator or with an empty name are skipped.
pub fn parse_condition_list(raw: &str) -> Vec<(ConditionIndex, String)> {
    raw.split(';')
        .filter_map(|segment| {
            let (index, name) = segment.split_once('^')?;
            let name = name.trim();
            if index.trim().is_empty() || name.is_empty() {
                return None;
            }
            Some((ConditionIndex::new(index), name.to_string()))
        })
        .collect()
}

// ============================================================================
// Decoding
// ============================================================================

/// Decode a raw callback. Returns `None` for callbacks the engine does not
/// consume (non-trade realtime types, balance notifications).
pub fn decode(raw: &RawEvent) -> Option<GatewayEvent> {
    match raw {
        RawEvent::RealData {
            symbol,
            real_type,
            fields,
        } => {
            if real_type != REAL_TYPE_TRADE {
                return None;
            }
            Some(GatewayEvent::Tick(Tick {
                symbol: parse_symbol(symbol),
                last_price: parse_price(field(fields, fid::LAST_PRICE)),
                best_bid: parse_price(field(fields, fid::BEST_BID)),
            }))
        }
        RawEvent::Chejan { gubun, fields } => {
            if gubun.trim() != CHEJAN_ORDER {
                debug!(gubun = %gubun, "Balance notification ignored");
                return None;
            }
            let class = unsigned_text(field(fields, fid::ORDER_CLASS));
            Some(GatewayEvent::Fill(FillEvent {
                symbol: parse_symbol(field(fields, fid::SYMBOL)),
                name: field(fields, fid::NAME).to_string(),
                order_id: OrderId::new(field(fields, fid::ORDER_ID)),
                original_order_id: optional_text(field(fields, fid::ORIGINAL_ORDER_ID))
                    .filter(|id| id.chars().any(|c| c != '0'))
                    .map(OrderId::new),
                side: FillSide::from_label(&class),
                order_qty: parse_qty(field(fields, fid::ORDER_QTY)),
                order_price: parse_price(field(fields, fid::ORDER_PRICE)),
                filled_qty: parse_qty(field(fields, fid::FILLED_QTY)),
                filled_price: parse_price(field(fields, fid::FILLED_PRICE)),
                remaining_qty: parse_qty(field(fields, fid::REMAINING_QTY)),
                order_time: field(fields, fid::ORDER_TIME).to_string(),
            }))
        }
        RawEvent::RealCondition {
            symbol,
            event_type,
            condition_name,
            condition_index,
        } => Some(GatewayEvent::ConditionMatch(ConditionMatch {
            symbol: parse_symbol(symbol),
            kind: MatchKind::from_code(event_type),
            condition_name: condition_name.trim().to_string(),
            condition_index: ConditionIndex::new(condition_index),
        })),
        RawEvent::ConditionList { list } => {
            Some(GatewayEvent::ConditionListLoaded(parse_condition_list(list)))
        }
        RawEvent::Msg {
            screen,
            request,
            text,
        } => Some(GatewayEvent::Message {
            screen: screen.clone(),
            request: request.clone(),
            text: text.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|&(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_tick_strips_signs() {
        let raw = RawEvent::RealData {
            symbol: "005930".to_string(),
            real_type: REAL_TYPE_TRADE.to_string(),
            fields: fields(&[("10", "-71000"), ("28", "+70900")]),
        };
        let Some(GatewayEvent::Tick(tick)) = decode(&raw) else {
            panic!("expected tick");
        };
        assert_eq!(tick.last_price, Price::new(dec!(71000)));
        assert_eq!(tick.best_bid, Price::new(dec!(70900)));
    }

    #[test]
    fn test_missing_best_bid_is_zero() {
        let raw = RawEvent::RealData {
            symbol: "005930".to_string(),
            real_type: REAL_TYPE_TRADE.to_string(),
            fields: fields(&[("10", "71000")]),
        };
        let Some(GatewayEvent::Tick(tick)) = decode(&raw) else {
            panic!("expected tick");
        };
        assert!(tick.best_bid.is_zero());
    }

    #[test]
    fn test_non_trade_realtime_ignored() {
        let raw = RawEvent::RealData {
            symbol: "005930".to_string(),
            real_type: "주식호가잔량".to_string(),
            fields: HashMap::new(),
        };
        assert_eq!(decode(&raw), None);
    }

    #[test]
    fn test_fill_decodes_with_defaults() {
        let raw = RawEvent::Chejan {
            gubun: "0".to_string(),
            fields: fields(&[
                ("9001", "A005930"),
                ("302", " 삼성전자 "),
                ("9203", "0012345"),
                ("904", "0000000"),
                ("905", "-매도"),
                ("900", "10"),
                ("901", "71000"),
                ("902", "4"),
                ("911", "6"),
                ("910", ""),
                ("908", "093015"),
            ]),
        };
        let Some(GatewayEvent::Fill(fill)) = decode(&raw) else {
            panic!("expected fill");
        };
        assert_eq!(fill.symbol, Symbol::new("005930"));
        assert_eq!(fill.name, "삼성전자");
        assert_eq!(fill.side, FillSide::Sell);
        assert_eq!(fill.original_order_id, None);
        assert_eq!(fill.filled_qty, Qty(6));
        assert_eq!(fill.remaining_qty, Qty(4));
        assert!(fill.filled_price.is_zero());
        assert_eq!(fill.order_time, "093015");
    }

    #[test]
    fn test_balance_notification_ignored() {
        let raw = RawEvent::Chejan {
            gubun: "1".to_string(),
            fields: HashMap::new(),
        };
        assert_eq!(decode(&raw), None);
    }

    #[test]
    fn test_condition_list_parsing() {
        let list = parse_condition_list("0^momentum;7^breakout;bad;3^;");
        assert_eq!(
            list,
            vec![
                (ConditionIndex::new("000"), "momentum".to_string()),
                (ConditionIndex::new("007"), "breakout".to_string()),
            ]
        );
    }

    #[test]
    fn test_raw_event_json_shape() {
        let line = r#"{"type":"real_condition","symbol":"005930","event_type":"I","condition_name":"momentum","condition_index":"7"}"#;
        let raw: RawEvent = serde_json::from_str(line).unwrap();
        let Some(GatewayEvent::ConditionMatch(m)) = decode(&raw) else {
            panic!("expected condition match");
        };
        assert_eq!(m.kind, MatchKind::Include);
        assert_eq!(m.condition_index.as_str(), "007");
    }
}
