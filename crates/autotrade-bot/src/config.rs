//! Application configuration.

use crate::error::{AppError, AppResult};
use autotrade_core::screen::{DEFAULT_SCREEN_BASE, DEFAULT_SCREEN_MAX};
use autotrade_core::time::DEFAULT_EXCHANGE_UTC_OFFSET_SECS;
use autotrade_core::TradingSettings;
use autotrade_executor::DEFAULT_AMEND_AFTER_MS;
use autotrade_gateway::{PaperConfig, RateTier, DEFAULT_TIERS};
use autotrade_watchlist::{StopLossOrder, DEFAULT_ROUND_TRIP_COST_PCT};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

// ============================================================================
// Trading
// ============================================================================

/// Trading parameters. Buy amount and thresholds are only the initial
/// values; persisted settings take precedence at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingConfig {
    #[serde(default = "default_buy_amount")]
    pub buy_amount: Decimal,
    #[serde(default = "default_goal_return_pct")]
    pub goal_return_pct: Decimal,
    #[serde(default = "default_stop_loss_pct")]
    pub stop_loss_pct: Decimal,
    /// Fees and tax deducted from the displayed return, in percentage points.
    #[serde(default = "default_round_trip_cost_pct")]
    pub round_trip_cost_pct: Decimal,
    #[serde(default)]
    pub stop_loss_order: StopLossOrder,
    /// Condition names registered as soon as the condition list loads.
    #[serde(default)]
    pub auto_conditions: Vec<String>,
}

fn default_buy_amount() -> Decimal {
    TradingSettings::default().buy_amount
}

fn default_goal_return_pct() -> Decimal {
    TradingSettings::default().goal_return_pct
}

fn default_stop_loss_pct() -> Decimal {
    TradingSettings::default().stop_loss_pct
}

fn default_round_trip_cost_pct() -> Decimal {
    DEFAULT_ROUND_TRIP_COST_PCT
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            buy_amount: default_buy_amount(),
            goal_return_pct: default_goal_return_pct(),
            stop_loss_pct: default_stop_loss_pct(),
            round_trip_cost_pct: default_round_trip_cost_pct(),
            stop_loss_order: StopLossOrder::default(),
            auto_conditions: Vec::new(),
        }
    }
}

impl TradingConfig {
    pub fn settings(&self) -> TradingSettings {
        TradingSettings {
            buy_amount: self.buy_amount,
            goal_return_pct: self.goal_return_pct,
            stop_loss_pct: self.stop_loss_pct,
        }
    }
}

// ============================================================================
// Rate limit
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_rate_tiers")]
    pub tiers: Vec<RateTier>,
}

fn default_rate_tiers() -> Vec<RateTier> {
    DEFAULT_TIERS.to_vec()
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            tiers: default_rate_tiers(),
        }
    }
}

// ============================================================================
// Schedule
// ============================================================================

/// Periods of the engine's periodic tasks, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_tr_dispatch_ms")]
    pub tr_dispatch_ms: u64,
    #[serde(default = "default_order_dispatch_ms")]
    pub order_dispatch_ms: u64,
    #[serde(default = "default_account_sync_ms")]
    pub account_sync_ms: u64,
    #[serde(default = "default_unfilled_query_ms")]
    pub unfilled_query_ms: u64,
    #[serde(default = "default_unfilled_sweep_ms")]
    pub unfilled_sweep_ms: u64,
    #[serde(default = "default_outlier_sweep_ms")]
    pub outlier_sweep_ms: u64,
    #[serde(default = "default_persist_ms")]
    pub persist_ms: u64,
}

fn default_tr_dispatch_ms() -> u64 {
    10
}

fn default_order_dispatch_ms() -> u64 {
    10
}

fn default_account_sync_ms() -> u64 {
    5_000
}

fn default_unfilled_query_ms() -> u64 {
    60_000
}

fn default_unfilled_sweep_ms() -> u64 {
    100
}

fn default_outlier_sweep_ms() -> u64 {
    1_000
}

fn default_persist_ms() -> u64 {
    30_000
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            tr_dispatch_ms: default_tr_dispatch_ms(),
            order_dispatch_ms: default_order_dispatch_ms(),
            account_sync_ms: default_account_sync_ms(),
            unfilled_query_ms: default_unfilled_query_ms(),
            unfilled_sweep_ms: default_unfilled_sweep_ms(),
            outlier_sweep_ms: default_outlier_sweep_ms(),
            persist_ms: default_persist_ms(),
        }
    }
}

// ============================================================================
// Unfilled orders, screens, persistence, telemetry
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnfilledConfig {
    /// Age after which an unfilled sell is amended to the best bid.
    #[serde(default = "default_amend_after_ms")]
    pub amend_after_ms: u64,
}

fn default_amend_after_ms() -> u64 {
    DEFAULT_AMEND_AFTER_MS
}

impl Default for UnfilledConfig {
    fn default() -> Self {
        Self {
            amend_after_ms: default_amend_after_ms(),
        }
    }
}

/// Screen number band handed to the broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenConfig {
    #[serde(default = "default_screen_base")]
    pub base: u16,
    #[serde(default = "default_screen_max")]
    pub max: u16,
}

fn default_screen_base() -> u16 {
    DEFAULT_SCREEN_BASE
}

fn default_screen_max() -> u16 {
    DEFAULT_SCREEN_MAX
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            base: default_screen_base(),
            max: default_screen_max(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistenceConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

// ============================================================================
// Gateway
// ============================================================================

/// Which broker the engine talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayMode {
    /// In-memory paper broker.
    #[default]
    Paper,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub mode: GatewayMode,
    /// Trading account; the first account reported by the broker when unset.
    #[serde(default)]
    pub account: Option<String>,
    /// JSON-lines file of recorded broker events fed into the engine.
    #[serde(default)]
    pub replay_path: Option<PathBuf>,
    #[serde(default = "default_replay_interval_ms")]
    pub replay_interval_ms: u64,
    /// Exchange local time offset used to resolve broker HHMMSS stamps.
    #[serde(default = "default_exchange_utc_offset_secs")]
    pub exchange_utc_offset_secs: i32,
    #[serde(default)]
    pub paper: PaperConfig,
}

fn default_replay_interval_ms() -> u64 {
    50
}

fn default_exchange_utc_offset_secs() -> i32 {
    DEFAULT_EXCHANGE_UTC_OFFSET_SECS
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            mode: GatewayMode::default(),
            account: None,
            replay_path: None,
            replay_interval_ms: default_replay_interval_ms(),
            exchange_utc_offset_secs: default_exchange_utc_offset_secs(),
            paper: PaperConfig::default(),
        }
    }
}

// ============================================================================
// Root
// ============================================================================

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub trading: TradingConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub unfilled: UnfilledConfig,
    #[serde(default)]
    pub screens: ScreenConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

impl AppConfig {
    /// Load from `path`, falling back to defaults when the file is missing.
    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::warn!(path = %path.display(), "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> AppResult<()> {
        let schedule = &self.schedule;
        let periods = [
            ("tr_dispatch_ms", schedule.tr_dispatch_ms),
            ("order_dispatch_ms", schedule.order_dispatch_ms),
            ("account_sync_ms", schedule.account_sync_ms),
            ("unfilled_query_ms", schedule.unfilled_query_ms),
            ("unfilled_sweep_ms", schedule.unfilled_sweep_ms),
            ("outlier_sweep_ms", schedule.outlier_sweep_ms),
            ("persist_ms", schedule.persist_ms),
        ];
        if let Some((name, _)) = periods.iter().find(|(_, ms)| *ms == 0) {
            return Err(AppError::Config(format!("schedule.{name} must be positive")));
        }
        if self.screens.max < self.screens.base {
            return Err(AppError::Config(
                "screens.max must not be below screens.base".to_string(),
            ));
        }
        self.trading.settings().validate()?;
        if self.rate_limit.tiers.iter().all(|t| t.max_sends == 0) {
            return Err(AppError::Config(
                "rate_limit.tiers must contain a non-zero tier".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.schedule.account_sync_ms, 5_000);
        assert_eq!(config.unfilled.amend_after_ms, 10_000);
        assert_eq!(config.trading.round_trip_cost_pct, dec!(0.21));
        assert_eq!(config.rate_limit.tiers.len(), 3);
        assert_eq!(config.trading.settings(), TradingSettings::default());
    }

    #[test]
    fn test_partial_sections() {
        let config = AppConfig::from_toml(
            r#"
[trading]
buy_amount = 250000
stop_loss_order = "market"
auto_conditions = ["momentum"]

[schedule]
unfilled_sweep_ms = 50

[gateway.paper]
conditions = "000^momentum;"
"#,
        )
        .unwrap();
        assert_eq!(config.trading.buy_amount, dec!(250000));
        assert_eq!(config.trading.goal_return_pct, dec!(2.5));
        assert_eq!(config.trading.stop_loss_order, StopLossOrder::Market);
        assert_eq!(config.trading.auto_conditions, vec!["momentum".to_string()]);
        assert_eq!(config.schedule.unfilled_sweep_ms, 50);
        assert_eq!(config.schedule.persist_ms, 30_000);
        assert_eq!(config.gateway.paper.conditions, "000^momentum;");
    }

    #[test]
    fn test_zero_period_rejected() {
        let err = AppConfig::from_toml("[schedule]\npersist_ms = 0\n").unwrap_err();
        assert!(matches!(err, AppError::Config(msg) if msg.contains("persist_ms")));
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let err = AppConfig::from_toml("[trading]\nstop_loss_pct = 5\n").unwrap_err();
        assert!(matches!(err, AppError::Core(_)));
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load("/nonexistent/autotrade.toml").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_default_file_parses() {
        let content = include_str!("../../../config/default.toml");
        AppConfig::from_toml(content).unwrap();
    }
}
