//! Rate-gated request scheduling.
//!
//! Two FIFO queues share one `RateLimiter`: the TR queue (account,
//! unfilled-order and symbol-info queries) and the order queue. Each queue
//! is ticked on its own period. Per tick at most one item leaves the
//! queue: if the limiter admits a send, the head item is popped, handed to
//! the dispatch callback, and the send is recorded whether or not the
//! dispatch succeeded.
//!
//! Delivery is at-most-once. A failed dispatch is logged and dropped; a
//! rate-limit denial leaves the item at the head for the next tick.

use std::collections::VecDeque;
use std::fmt;
use tracing::{debug, warn};

use autotrade_core::{OrderSink, PendingOrder, Symbol};
use autotrade_gateway::RateLimiter;
use autotrade_telemetry::Metrics;

/// Queued broker query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrRequest {
    AccountSnapshot,
    UnfilledOrders,
    SymbolLimits(Symbol),
}

impl fmt::Display for TrRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AccountSnapshot => f.write_str("account_snapshot"),
            Self::UnfilledOrders => f.write_str("unfilled_orders"),
            Self::SymbolLimits(symbol) => write!(f, "symbol_limits({symbol})"),
        }
    }
}

/// Which queue a tick drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueKind {
    Tr,
    Order,
}

impl QueueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tr => "tr",
            Self::Order => "order",
        }
    }
}

/// Result of one dispatch tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome<R> {
    /// Queue was empty.
    Idle,
    /// Head item held back by the rate limiter.
    Deferred,
    /// Head item dispatched; carries the dispatch result.
    Dispatched(R),
    /// Head item dispatched and failed; it is not retried.
    Failed,
}

impl<R> DispatchOutcome<R> {
    pub fn is_dispatched(&self) -> bool {
        matches!(self, Self::Dispatched(_))
    }
}

/// Owner of both request queues and the shared rate limiter.
#[derive(Debug, Default)]
pub struct RequestScheduler {
    limiter: RateLimiter,
    tr_queue: VecDeque<TrRequest>,
    order_queue: VecDeque<PendingOrder>,
}

impl RequestScheduler {
    #[must_use]
    pub fn new(limiter: RateLimiter) -> Self {
        Self {
            limiter,
            tr_queue: VecDeque::new(),
            order_queue: VecDeque::new(),
        }
    }

    pub fn enqueue_tr(&mut self, request: TrRequest) {
        debug!(request = %request, depth = self.tr_queue.len() + 1, "TR request queued");
        self.tr_queue.push_back(request);
        Metrics::queue_depth(QueueKind::Tr.as_str(), self.tr_queue.len());
    }

    pub fn tr_len(&self) -> usize {
        self.tr_queue.len()
    }

    pub fn order_len(&self) -> usize {
        self.order_queue.len()
    }

    /// Queued orders, head first.
    pub fn pending_orders(&self) -> impl Iterator<Item = &PendingOrder> {
        self.order_queue.iter()
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Drain at most one TR request.
    pub fn tick_tr<R, E: fmt::Display>(
        &mut self,
        now_ms: u64,
        dispatch: impl FnOnce(TrRequest) -> Result<R, E>,
    ) -> DispatchOutcome<R> {
        tick_queue(
            &mut self.limiter,
            &mut self.tr_queue,
            QueueKind::Tr,
            now_ms,
            |request| {
                debug!(request = %request, "Dispatching TR request");
                dispatch(request)
            },
        )
    }

    /// Drain at most one order.
    pub fn tick_orders<R, E: fmt::Display>(
        &mut self,
        now_ms: u64,
        dispatch: impl FnOnce(PendingOrder) -> Result<R, E>,
    ) -> DispatchOutcome<R> {
        tick_queue(
            &mut self.limiter,
            &mut self.order_queue,
            QueueKind::Order,
            now_ms,
            |order| {
                let kind = order.kind;
                debug!(kind = %kind, symbol = %order.symbol, qty = order.qty.inner(), "Dispatching order");
                let result = dispatch(order);
                if result.is_ok() {
                    Metrics::order_dispatched(kind.request_name());
                }
                result
            },
        )
    }
}

impl OrderSink for RequestScheduler {
    fn enqueue_order(&mut self, order: PendingOrder) {
        debug!(kind = %order.kind, symbol = %order.symbol, depth = self.order_queue.len() + 1, "Order queued");
        self.order_queue.push_back(order);
        Metrics::queue_depth(QueueKind::Order.as_str(), self.order_queue.len());
    }
}

fn tick_queue<T, R, E: fmt::Display>(
    limiter: &mut RateLimiter,
    queue: &mut VecDeque<T>,
    kind: QueueKind,
    now_ms: u64,
    dispatch: impl FnOnce(T) -> Result<R, E>,
) -> DispatchOutcome<R> {
    if queue.is_empty() {
        return DispatchOutcome::Idle;
    }
    if !limiter.can_send(now_ms) {
        Metrics::rate_limit_deferred(kind.as_str());
        return DispatchOutcome::Deferred;
    }
    let Some(item) = queue.pop_front() else {
        return DispatchOutcome::Idle;
    };
    Metrics::queue_depth(kind.as_str(), queue.len());

    let result = dispatch(item);
    limiter.record(now_ms);

    match result {
        Ok(response) => DispatchOutcome::Dispatched(response),
        Err(e) => {
            warn!(queue = kind.as_str(), error = %e, "Dispatch failed, item dropped");
            Metrics::dispatch_failed(kind.as_str());
            DispatchOutcome::Failed
        }
    }
}
