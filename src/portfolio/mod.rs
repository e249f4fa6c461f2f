//! Portfolio-level aggregation: a [`Portfolio`] is a `BTreeMap<String, Holding>`
//! (ordered, matching the deterministic-iteration preference elsewhere in this
//! crate) plus cross-ticker value/allocation queries.

pub mod account;

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub use account::Account;

use crate::domain::{Cash, Price, Rate, Shares};
use crate::error::{LedgerError, SynthDivResult};
use crate::ledger::{Holding, LotSelection, Transaction};

/// A single position snapshot, derived for reporting (never stored).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub ticker: String,
    pub shares: Shares,
    pub price: Price,
    pub value: Cash,
    pub cost_basis: Cash,
    pub unrealized_pl: Cash,
    pub unrealized_pl_pct: f64,
    pub average_cost: Price,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Portfolio {
    pub holdings: BTreeMap<String, Holding>,
}

impl Portfolio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_holding(&mut self, ticker: &str) -> SynthDivResult<&mut Holding> {
        if self.holdings.contains_key(ticker) {
            return Err(LedgerError::DuplicateTicker(ticker.to_string()).into());
        }
        Ok(self
            .holdings
            .entry(ticker.to_string())
            .or_insert_with(|| Holding::new(ticker)))
    }

    pub fn get_holding(&self, ticker: &str) -> Option<&Holding> {
        self.holdings.get(ticker)
    }

    pub fn has_holding(&self, ticker: &str) -> bool {
        self.holdings.contains_key(ticker)
    }

    /// Buys shares, creating the holding on first use (auto-vivifying).
    pub fn buy(
        &mut self,
        ticker: &str,
        shares: Shares,
        date: NaiveDate,
        price: Price,
        note: impl Into<String>,
    ) -> &Transaction {
        let holding = self
            .holdings
            .entry(ticker.to_string())
            .or_insert_with(|| Holding::new(ticker));
        holding.add_buy(shares, date, price, note)
    }

    pub fn sell(
        &mut self,
        ticker: &str,
        shares: Shares,
        date: NaiveDate,
        price: Price,
        note: impl Into<String>,
        lot_selection: LotSelection,
    ) -> SynthDivResult<Vec<Transaction>> {
        let holding = self
            .holdings
            .get_mut(ticker)
            .ok_or_else(|| LedgerError::UnknownTicker(ticker.to_string()))?;
        holding.add_sell(shares, date, price, note, lot_selection)
    }

    pub fn total_shares(&self, ticker: &str) -> Shares {
        self.holdings
            .get(ticker)
            .map(Holding::current_shares)
            .unwrap_or(Shares::ZERO)
    }

    pub fn total_value(&self, prices: &BTreeMap<String, Price>) -> SynthDivResult<Cash> {
        let mut total = Cash::ZERO;
        for (ticker, holding) in &self.holdings {
            if holding.current_shares().0 == 0.0 {
                continue;
            }
            let price = prices
                .get(ticker)
                .ok_or_else(|| LedgerError::PriceMissing(ticker.clone()))?;
            total = total + holding.market_value(*price);
        }
        Ok(total)
    }

    pub fn total_cost_basis(&self) -> Cash {
        self.holdings
            .values()
            .map(Holding::cost_basis)
            .fold(Cash::ZERO, |acc, v| acc + v)
    }

    pub fn total_unrealized_gain_loss(&self, prices: &BTreeMap<String, Price>) -> SynthDivResult<Cash> {
        let mut total = Cash::ZERO;
        for (ticker, holding) in &self.holdings {
            if holding.current_shares().0 == 0.0 {
                continue;
            }
            let price = prices
                .get(ticker)
                .ok_or_else(|| LedgerError::PriceMissing(ticker.clone()))?;
            total = total + holding.unrealized_gain_loss(*price);
        }
        Ok(total)
    }

    pub fn total_realized_gain_loss(&self) -> Cash {
        self.holdings
            .values()
            .map(Holding::realized_gain_loss)
            .fold(Cash::ZERO, |acc, v| acc + v)
    }

    /// Allocations by market value, summing to ~1.0 when total value > 0.
    pub fn allocations(&self, prices: &BTreeMap<String, Price>) -> SynthDivResult<BTreeMap<String, Rate>> {
        let total = self.total_value(prices)?;
        let mut out = BTreeMap::new();
        for ticker in self.holdings.keys() {
            let weight = if total.0 == 0.0 {
                Rate(0.0)
            } else {
                let price = prices
                    .get(ticker)
                    .ok_or_else(|| LedgerError::PriceMissing(ticker.clone()))?;
                Rate(self.holdings[ticker].market_value(*price).0 / total.0)
            };
            out.insert(ticker.clone(), weight);
        }
        Ok(out)
    }

    /// Non-empty positions sorted by market value, descending.
    pub fn positions(&self, prices: &BTreeMap<String, Price>) -> SynthDivResult<Vec<Position>> {
        let mut out = Vec::new();
        for (ticker, holding) in &self.holdings {
            let shares = holding.current_shares();
            if shares.0 == 0.0 {
                continue;
            }
            let price = *prices
                .get(ticker)
                .ok_or_else(|| LedgerError::PriceMissing(ticker.clone()))?;
            let value = holding.market_value(price);
            let cost_basis = holding.cost_basis();
            let unrealized_pl = holding.unrealized_gain_loss(price);
            let unrealized_pl_pct = if cost_basis.0 > 0.0 {
                unrealized_pl.0 / cost_basis.0 * 100.0
            } else {
                0.0
            };
            out.push(Position {
                ticker: ticker.clone(),
                shares,
                price,
                value,
                cost_basis,
                unrealized_pl,
                unrealized_pl_pct,
                average_cost: holding.average_cost_basis(),
            });
        }
        out.sort_by(|a, b| b.value.0.partial_cmp(&a.value.0).unwrap());
        Ok(out)
    }
}
