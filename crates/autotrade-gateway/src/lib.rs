//! Broker gateway seam for the auto-trader.
//!
//! - `BrokerGateway`: synchronous, non-blocking request surface of the broker
//! - `RateLimiter`: multi-window send ceiling shared by every request
//! - `decode`: raw broker callbacks to typed `GatewayEvent`s
//! - `PaperGateway`: in-memory broker for running without a transport
//! - `replay`: JSON-lines event source

pub mod decode;
pub mod error;
pub mod event;
pub mod gateway;
pub mod paper;
pub mod rate_limiter;
pub mod replay;

pub use decode::{decode, parse_condition_list, RawEvent};
pub use error::{GatewayError, GatewayResult};
pub use event::{ConditionMatch, FillEvent, FillSide, GatewayEvent, MatchKind, Tick};
pub use gateway::BrokerGateway;
pub use paper::{PaperConfig, PaperGateway};
pub use rate_limiter::{RateLimiter, RateTier, DEFAULT_TIERS};
pub use replay::{read_replay, spawn_replay};
