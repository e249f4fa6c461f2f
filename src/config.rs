//! Plain configuration knobs for the daily and portfolio drivers. No
//! env-var or CLI parsing lives here (out of scope); callers construct and
//! serialize these directly.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Withdrawal frequency, mapping to a fixed `periods_per_year` divisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum Cadence {
    Monthly,
    Quarterly,
    Annual,
}

impl Cadence {
    pub fn periods_per_year(self) -> u32 {
        match self {
            Cadence::Monthly => 12,
            Cadence::Quarterly => 4,
            Cadence::Annual => 1,
        }
    }

    /// Calendar-day approximation of one period, used to gate the "has it
    /// been long enough since the last withdrawal" check.
    pub fn cadence_days(self) -> u32 {
        match self {
            Cadence::Monthly => 30,
            Cadence::Quarterly => 90,
            Cadence::Annual => 365,
        }
    }
}

/// Knobs for a single-asset [`crate::backtest::run`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// Annual withdrawal rate as a fraction of initial value (`0.0` disables).
    pub withdrawal_rate: f64,
    pub withdrawal_cadence: Cadence,
    /// Disables interest accrual/opportunity-cost accounting when set.
    pub simple_mode: bool,
    /// Flat daily risk-free rate used when no risk-free price series is supplied.
    pub flat_risk_free_rate: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            withdrawal_rate: 0.0,
            withdrawal_cadence: Cadence::Monthly,
            simple_mode: false,
            flat_risk_free_rate: 0.0,
        }
    }
}

/// Knobs for [`crate::backtest::portfolio::run`], layered on top of
/// per-asset allocations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioBacktestConfig {
    pub withdrawal_rate: f64,
    pub withdrawal_cadence: Cadence,
    pub simple_mode: bool,
    pub flat_risk_free_rate: f64,
    /// When `false` (default), a BUY that would drive shared cash negative
    /// is skipped rather than executed on margin.
    pub allow_margin: bool,
}

impl Default for PortfolioBacktestConfig {
    fn default() -> Self {
        Self {
            withdrawal_rate: 0.0,
            withdrawal_cadence: Cadence::Monthly,
            simple_mode: false,
            flat_risk_free_rate: 0.0,
            allow_margin: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cadence_periods_per_year() {
        assert_eq!(Cadence::Monthly.periods_per_year(), 12);
        assert_eq!(Cadence::Quarterly.periods_per_year(), 4);
        assert_eq!(Cadence::Annual.periods_per_year(), 1);
    }

    #[test]
    fn default_configs_disable_withdrawals_and_margin() {
        assert_eq!(BacktestConfig::default().withdrawal_rate, 0.0);
        assert!(!PortfolioBacktestConfig::default().allow_margin);
    }

    #[test]
    fn default_cadence_is_monthly() {
        assert_eq!(BacktestConfig::default().withdrawal_cadence, Cadence::Monthly);
    }
}
