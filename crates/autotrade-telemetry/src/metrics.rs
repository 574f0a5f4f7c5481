//! Prometheus metrics for the auto-trader.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. If registration fails,
//! it indicates a fatal configuration error (e.g., duplicate metric names)
//! that should cause an immediate crash at startup rather than silent failure.
//! These panics only occur during static initialization, never at runtime.

use once_cell::sync::Lazy;
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge, register_int_gauge_vec,
    Encoder, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, TextEncoder,
};

use crate::error::TelemetryResult;

/// Orders handed to the broker.
/// Labels: kind (market_buy/limit_sell/market_sell/amend_sell)
pub static ORDERS_DISPATCHED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "autotrade_orders_dispatched_total",
        "Total orders dispatched to the broker",
        &["kind"]
    )
    .unwrap()
});

/// Dispatch attempts that failed (not retried).
/// Labels: queue (tr/order)
pub static DISPATCH_FAILED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "autotrade_dispatch_failed_total",
        "Total dispatch failures",
        &["queue"]
    )
    .unwrap()
});

/// Ticks where a queued item was held back by the rate limiter.
pub static RATE_LIMIT_DEFERRED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "autotrade_rate_limit_deferred_total",
        "Total dispatch ticks deferred by the rate limiter",
        &["queue"]
    )
    .unwrap()
});

/// Items waiting in each queue.
pub static QUEUE_DEPTH: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "autotrade_queue_depth",
        "Items waiting in the request queues",
        &["queue"]
    )
    .unwrap()
});

/// Sell amendments issued by the unfilled-order monitor.
pub static AMENDMENTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "autotrade_amendments_total",
        "Total sell amendments issued for stale unfilled orders"
    )
    .unwrap()
});

/// Unfilled orders currently tracked.
pub static UNFILLED_ORDERS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "autotrade_unfilled_orders",
        "Unfilled sell orders currently tracked"
    )
    .unwrap()
});

/// Exit sells requested.
/// Labels: reason (stop_loss/take_profit)
pub static EXITS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "autotrade_exits_total",
        "Total exit sells requested",
        &["reason"]
    )
    .unwrap()
});

/// Stop-loss evaluations skipped for lack of a best bid.
pub static MISSING_REFERENCE_PRICE_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "autotrade_missing_reference_price_total",
        "Total evaluations skipped because no best bid was cached",
        &["site"]
    )
    .unwrap()
});

/// Watchlist entries.
pub static WATCHLIST_SIZE: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("autotrade_watchlist_size", "Entries in the watchlist").unwrap()
});

/// Watchlist entries removed.
/// Labels: reason (outlier/not_held/condition_out)
pub static WATCHLIST_REMOVED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "autotrade_watchlist_removed_total",
        "Total watchlist entries removed",
        &["reason"]
    )
    .unwrap()
});

/// Account snapshots reconciled.
pub static RECONCILIATIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "autotrade_reconciliations_total",
        "Total account snapshots reconciled into the watchlist"
    )
    .unwrap()
});

/// Gateway connection state (1 = connected).
pub static GATEWAY_CONNECTED: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "autotrade_gateway_connected",
        "Broker gateway connection state (1=connected)"
    )
    .unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Record an order handed to the broker.
    pub fn order_dispatched(kind: &str) {
        ORDERS_DISPATCHED_TOTAL.with_label_values(&[kind]).inc();
    }

    /// Record a failed dispatch.
    pub fn dispatch_failed(queue: &str) {
        DISPATCH_FAILED_TOTAL.with_label_values(&[queue]).inc();
    }

    /// Record a tick deferred by the rate limiter.
    pub fn rate_limit_deferred(queue: &str) {
        RATE_LIMIT_DEFERRED_TOTAL.with_label_values(&[queue]).inc();
    }

    /// Set a queue's depth.
    pub fn queue_depth(queue: &str, depth: usize) {
        QUEUE_DEPTH
            .with_label_values(&[queue])
            .set(i64::try_from(depth).unwrap_or(i64::MAX));
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Record an amendment.
    pub fn amendment_issued() {
        AMENDMENTS_TOTAL.inc();
    }

    /// Set tracked unfilled order count.
    pub fn unfilled_orders(count: usize) {
        UNFILLED_ORDERS.set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    /// Record an exit request.
    pub fn exit_requested(reason: &str) {
        EXITS_TOTAL.with_label_values(&[reason]).inc();
    }

    /// Record a skipped evaluation for lack of a best bid.
    pub fn missing_reference_price(site: &str) {
        MISSING_REFERENCE_PRICE_TOTAL
            .with_label_values(&[site])
            .inc();
    }

    // =========================================================================
    // Watchlist
    // =========================================================================

    /// Set watchlist size.
    pub fn watchlist_size(size: usize) {
        WATCHLIST_SIZE.set(i64::try_from(size).unwrap_or(i64::MAX));
    }

    /// Record watchlist removals.
    pub fn watchlist_removed(reason: &str, count: usize) {
        WATCHLIST_REMOVED_TOTAL
            .with_label_values(&[reason])
            .inc_by(count as u64);
    }

    /// Record an account reconciliation.
    pub fn reconciled() {
        RECONCILIATIONS_TOTAL.inc();
    }

    /// Record gateway connection state.
    pub fn gateway_connected(connected: bool) {
        GATEWAY_CONNECTED.set(i64::from(connected));
    }

    // =========================================================================
    // Exposition
    // =========================================================================

    /// Render all registered metrics in the Prometheus text format.
    pub fn encode() -> TelemetryResult<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&prometheus::gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
