//! Prometheus metrics and structured logging for the auto-trader.
//!
//! - Prometheus metrics for order dispatch, rate limiting, amendments
//!   and watchlist reconciliation
//! - Structured logging with tracing (JSON in production)

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
