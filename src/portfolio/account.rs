//! A brokerage account: [`Portfolio`] (assets owned) plus signed `debt`
//! (liabilities). `debt > 0` means borrowed; `debt < 0` means cash surplus.
//! Net worth = portfolio value − debt.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::Portfolio;
use crate::domain::{Cash, Price};
use crate::error::{LedgerError, SynthDivResult};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DebtStatistics {
    pub min_debt: Cash,
    pub max_debt: Cash,
    pub avg_debt: Cash,
    pub current_debt: Cash,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub portfolio_value: Cash,
    pub debt: Cash,
    pub cash_balance: Cash,
    pub net_worth: Cash,
    pub leverage_ratio: f64,
    pub debt_stats: DebtStatistics,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Account {
    pub portfolio: Portfolio,
    pub debt: Cash,
    pub debt_history: Vec<(NaiveDate, Cash)>,
}

impl Account {
    pub fn new() -> Self {
        Self::default()
    }

    fn require_positive(amount: Cash) -> SynthDivResult<()> {
        if amount.0 <= 0.0 {
            return Err(LedgerError::NonPositiveAmount(amount).into());
        }
        Ok(())
    }

    pub fn borrow(&mut self, amount: Cash, date: NaiveDate) -> SynthDivResult<()> {
        Self::require_positive(amount)?;
        self.debt = self.debt + amount;
        self.debt_history.push((date, self.debt));
        Ok(())
    }

    pub fn repay(&mut self, amount: Cash, date: NaiveDate) -> SynthDivResult<()> {
        Self::require_positive(amount)?;
        self.debt = self.debt - amount;
        self.debt_history.push((date, self.debt));
        Ok(())
    }

    pub fn deposit_cash(&mut self, amount: Cash, date: NaiveDate) -> SynthDivResult<()> {
        Self::require_positive(amount)?;
        self.debt = self.debt - amount;
        self.debt_history.push((date, self.debt));
        Ok(())
    }

    pub fn withdraw_cash(&mut self, amount: Cash, date: NaiveDate) -> SynthDivResult<()> {
        Self::require_positive(amount)?;
        self.debt = self.debt + amount;
        self.debt_history.push((date, self.debt));
        Ok(())
    }

    pub fn cash_balance(&self) -> Cash {
        -self.debt
    }

    pub fn has_margin_debt(&self) -> bool {
        self.debt.0 > 0.0
    }

    pub fn has_cash(&self) -> bool {
        self.debt.0 < 0.0
    }

    pub fn net_worth(&self, prices: &BTreeMap<String, Price>) -> SynthDivResult<Cash> {
        Ok(self.portfolio.total_value(prices)? - self.debt)
    }

    pub fn debt_statistics(&self) -> DebtStatistics {
        if self.debt_history.is_empty() {
            return DebtStatistics {
                min_debt: Cash::ZERO,
                max_debt: Cash::ZERO,
                avg_debt: Cash::ZERO,
                current_debt: self.debt,
            };
        }
        let balances: Vec<f64> = self.debt_history.iter().map(|(_, d)| d.0).collect();
        let min = balances.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = balances.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let avg = balances.iter().sum::<f64>() / balances.len() as f64;
        DebtStatistics {
            min_debt: Cash(min),
            max_debt: Cash(max),
            avg_debt: Cash(avg),
            current_debt: self.debt,
        }
    }

    /// `portfolio_value / net_worth`, or `+inf` when `net_worth <= 0`
    /// (reported as a sentinel, never raised).
    pub fn leverage_ratio(&self, prices: &BTreeMap<String, Price>) -> SynthDivResult<f64> {
        let portfolio_value = self.portfolio.total_value(prices)?;
        let net = self.net_worth(prices)?;
        Ok(if net.0 > 0.0 {
            portfolio_value.0 / net.0
        } else {
            f64::INFINITY
        })
    }

    pub fn summary(&self, prices: &BTreeMap<String, Price>) -> SynthDivResult<AccountSummary> {
        let portfolio_value = self.portfolio.total_value(prices)?;
        let net_worth = self.net_worth(prices)?;
        Ok(AccountSummary {
            portfolio_value,
            debt: self.debt,
            cash_balance: self.cash_balance(),
            net_worth,
            leverage_ratio: self.leverage_ratio(prices)?,
            debt_stats: self.debt_statistics(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn borrow_increases_debt_and_repay_decreases_it() {
        let mut a = Account::new();
        a.borrow(Cash(1_000_000.0), d("2024-01-01")).unwrap();
        assert_eq!(a.debt, Cash(1_000_000.0));
        a.repay(Cash(110_000.0), d("2024-02-01")).unwrap();
        assert_eq!(a.debt, Cash(890_000.0));
    }

    #[test]
    fn deposit_cash_reduces_debt_below_zero() {
        let mut a = Account::new();
        a.deposit_cash(Cash(500.0), d("2024-01-01")).unwrap();
        assert_eq!(a.debt, Cash(-500.0));
        assert_eq!(a.cash_balance(), Cash(500.0));
        assert!(a.has_cash());
    }

    #[test]
    fn net_worth_is_portfolio_value_minus_debt() {
        let mut a = Account::new();
        a.portfolio
            .buy("NVDA", crate::domain::Shares(10000.0), d("2024-01-01"), Price(100.0), "");
        a.borrow(Cash(1_000_000.0), d("2024-01-01")).unwrap();

        let mut prices = BTreeMap::new();
        prices.insert("NVDA".to_string(), Price(110.0));

        assert_eq!(a.net_worth(&prices).unwrap(), Cash(1_100_000.0 - 1_000_000.0));
    }

    #[test]
    fn leverage_ratio_is_infinite_when_net_worth_non_positive() {
        let mut a = Account::new();
        a.borrow(Cash(100.0), d("2024-01-01")).unwrap();
        let prices = BTreeMap::new();
        assert_eq!(a.leverage_ratio(&prices).unwrap(), f64::INFINITY);
    }

    #[test]
    fn non_positive_amount_is_rejected() {
        let mut a = Account::new();
        assert!(a.borrow(Cash(0.0), d("2024-01-01")).is_err());
        assert!(a.borrow(Cash(-5.0), d("2024-01-01")).is_err());
    }
}
