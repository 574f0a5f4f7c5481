//! Request dispatch for the auto-trader.
//!
//! # Key Components
//!
//! - [`RequestScheduler`]: TR and order queues drained one item per tick
//!   under the shared [`RateLimiter`](autotrade_gateway::RateLimiter)
//! - [`UnfilledOrderMonitor`]: amends sells left unfilled past the timeout

pub mod scheduler;
pub mod unfilled;

pub use scheduler::{DispatchOutcome, QueueKind, RequestScheduler, TrRequest};
pub use unfilled::{UnfilledOrderMonitor, DEFAULT_AMEND_AFTER_MS};
