//! Operator-tunable trading settings.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::{Price, Qty};
use crate::error::{CoreError, Result};

fn default_buy_amount() -> Decimal {
    Decimal::from(100_000)
}

fn default_goal_return_pct() -> Decimal {
    Decimal::new(25, 1)
}

fn default_stop_loss_pct() -> Decimal {
    Decimal::new(-25, 1)
}

/// Per-entry buy budget and exit thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingSettings {
    /// Currency amount spent on each new buy.
    #[serde(default = "default_buy_amount")]
    pub buy_amount: Decimal,
    /// Take-profit threshold in percent above the pricing tick.
    #[serde(default = "default_goal_return_pct")]
    pub goal_return_pct: Decimal,
    /// Stop-loss threshold in percent relative to the pricing tick (negative).
    #[serde(default = "default_stop_loss_pct")]
    pub stop_loss_pct: Decimal,
}

impl Default for TradingSettings {
    fn default() -> Self {
        Self {
            buy_amount: default_buy_amount(),
            goal_return_pct: default_goal_return_pct(),
            stop_loss_pct: default_stop_loss_pct(),
        }
    }
}

impl TradingSettings {
    /// Take-profit level for an entry priced at `tick`.
    pub fn target_price(&self, tick: Price) -> Price {
        tick * (Decimal::ONE + self.goal_return_pct / Decimal::ONE_HUNDRED)
    }

    /// Stop-loss level for an entry priced at `tick`.
    pub fn stop_price(&self, tick: Price) -> Price {
        tick * (Decimal::ONE + self.stop_loss_pct / Decimal::ONE_HUNDRED)
    }

    /// Whole shares bought at `tick` with the configured budget.
    pub fn buy_qty(&self, tick: Price) -> Qty {
        tick.affordable_qty(self.buy_amount)
    }

    /// Reject settings that can never trade: a non-positive budget or a
    /// stop level at or above the take-profit level.
    pub fn validate(&self) -> Result<()> {
        if self.buy_amount <= Decimal::ZERO {
            return Err(CoreError::InvalidSettings(format!(
                "buy_amount must be positive, got {}",
                self.buy_amount
            )));
        }
        if self.stop_loss_pct >= self.goal_return_pct {
            return Err(CoreError::InvalidSettings(format!(
                "stop_loss_pct {} must be below goal_return_pct {}",
                self.stop_loss_pct, self.goal_return_pct
            )));
        }
        Ok(())
    }
}
