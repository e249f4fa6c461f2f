//! Transaction-based ledger: a [`Holding`] is a ticker plus its complete
//! append-only transaction history. Current shares, cost basis, and P&L are
//! always derived from that history, never stored redundantly.

pub mod lot_selector;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub use lot_selector::{Fifo, HighestCost, Lifo, LotSelection, LotSelector, LowestCost};

use crate::domain::{Cash, Price, Shares};
use crate::error::{LedgerError, SynthDivResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxnKind {
    Buy,
    Sell,
}

/// The close side of a transaction: when and at what price a BUY was matched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Close {
    pub date: NaiveDate,
    pub price: Price,
}

/// A single buy or sell record. A BUY is open until fully matched by a SELL;
/// partial sales split it (see [`Holding::add_sell`]) rather than mutating
/// shares in place on the original lot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub kind: TxnKind,
    pub shares: Shares,
    pub open_date: NaiveDate,
    pub open_price: Price,
    pub close: Option<Close>,
    pub note: String,
}

impl Transaction {
    fn buy(shares: Shares, open_date: NaiveDate, open_price: Price, note: String) -> Self {
        Self {
            kind: TxnKind::Buy,
            shares,
            open_date,
            open_price,
            close: None,
            note,
        }
    }

    fn sell(
        shares: Shares,
        sale_date: NaiveDate,
        sale_price: Price,
        note: String,
    ) -> Self {
        Self {
            kind: TxnKind::Sell,
            shares,
            open_date: sale_date,
            open_price: sale_price,
            close: Some(Close {
                date: sale_date,
                price: sale_price,
            }),
            note,
        }
    }

    pub fn is_open(&self) -> bool {
        self.close.is_none()
    }

    pub fn is_closed(&self) -> bool {
        self.close.is_some()
    }

    /// Open BUYs are worth `shares * current_price`; everything else (closed
    /// BUYs, SELL records) no longer represents held inventory.
    pub fn market_value(&self, current_price: Price) -> Cash {
        if self.kind == TxnKind::Buy && self.is_open() {
            self.shares.value_at(current_price)
        } else {
            Cash::ZERO
        }
    }

    pub fn realized_gain_loss(&self) -> Option<Cash> {
        let close = self.close?;
        if self.kind != TxnKind::Buy {
            return None;
        }
        let cost_basis = self.shares.value_at(self.open_price);
        let proceeds = self.shares.value_at(close.price);
        Some(proceeds - cost_basis)
    }

    pub fn unrealized_gain_loss(&self, current_price: Price) -> Option<Cash> {
        if self.kind != TxnKind::Buy || self.is_closed() {
            return None;
        }
        let cost_basis = self.shares.value_at(self.open_price);
        let current_value = self.shares.value_at(current_price);
        Some(current_value - cost_basis)
    }
}

/// Summary statistics for a [`Holding`], used for reporting (not persisted).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionSummary {
    pub ticker: String,
    pub total_transactions: usize,
    pub open_lots: usize,
    pub closed_lots: usize,
    pub sell_transactions: usize,
    pub current_shares: Shares,
    pub cost_basis: Cash,
    pub realized_gain_loss: Cash,
}

/// A position in a single ticker, tracked through all transactions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Holding {
    pub ticker: String,
    pub transactions: Vec<Transaction>,
}

impl Holding {
    pub fn new(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            transactions: Vec::new(),
        }
    }

    pub fn add_buy(
        &mut self,
        shares: Shares,
        date: NaiveDate,
        price: Price,
        note: impl Into<String>,
    ) -> &Transaction {
        self.transactions
            .push(Transaction::buy(shares, date, price, note.into()));
        self.transactions.last().expect("just pushed")
    }

    /// Matches `shares` against open BUYs in the order `lot_selection`
    /// yields them, splitting a lot when it exceeds remaining demand.
    pub fn add_sell(
        &mut self,
        shares: Shares,
        date: NaiveDate,
        price: Price,
        note: impl Into<String>,
        lot_selection: LotSelection,
    ) -> SynthDivResult<Vec<Transaction>> {
        let held = self.current_shares();
        if shares.0 > held.0 {
            return Err(LedgerError::InsufficientShares {
                ticker: self.ticker.clone(),
                requested: shares,
                held,
            }
            .into());
        }

        let note = note.into();
        let mut remaining = shares;
        let mut sold = Vec::new();

        let order = lot_selection.select_open_indices(&self.transactions);
        for idx in order {
            if remaining.0 <= 0.0 {
                break;
            }

            let lot_shares = self.transactions[idx].shares;
            let from_this_lot = Shares(remaining.0.min(lot_shares.0));

            if from_this_lot.0 < lot_shares.0 {
                let lot = &self.transactions[idx];
                let split_note = if lot.note.is_empty() {
                    "split lot".to_string()
                } else {
                    format!("split from {}", lot.note)
                };
                let sibling = Transaction::buy(
                    Shares(lot_shares.0 - from_this_lot.0),
                    lot.open_date,
                    lot.open_price,
                    split_note,
                );
                self.transactions[idx].shares = from_this_lot;
                self.transactions.insert(idx + 1, sibling);
            }

            self.transactions[idx].close = Some(Close { date, price });

            let sell_note = if note.is_empty() {
                format!("sold lot from {}", self.transactions[idx].open_date)
            } else {
                note.clone()
            };
            let sell_txn = Transaction::sell(from_this_lot, date, price, sell_note);
            self.transactions.push(sell_txn.clone());
            sold.push(sell_txn);

            remaining = Shares(remaining.0 - from_this_lot.0);
        }

        Ok(sold)
    }

    pub fn current_shares(&self) -> Shares {
        self.transactions
            .iter()
            .filter(|t| t.kind == TxnKind::Buy && t.is_open())
            .map(|t| t.shares)
            .fold(Shares::ZERO, |acc, s| acc + s)
    }

    pub fn market_value(&self, current_price: Price) -> Cash {
        self.transactions
            .iter()
            .map(|t| t.market_value(current_price))
            .fold(Cash::ZERO, |acc, v| acc + v)
    }

    pub fn cost_basis(&self) -> Cash {
        self.transactions
            .iter()
            .filter(|t| t.kind == TxnKind::Buy && t.is_open())
            .map(|t| t.shares.value_at(t.open_price))
            .fold(Cash::ZERO, |acc, v| acc + v)
    }

    pub fn unrealized_gain_loss(&self, current_price: Price) -> Cash {
        self.market_value(current_price) - self.cost_basis()
    }

    pub fn realized_gain_loss(&self) -> Cash {
        self.transactions
            .iter()
            .filter_map(Transaction::realized_gain_loss)
            .fold(Cash::ZERO, |acc, v| acc + v)
    }

    pub fn total_gain_loss(&self, current_price: Price) -> Cash {
        self.realized_gain_loss() + self.unrealized_gain_loss(current_price)
    }

    pub fn average_cost_basis(&self) -> Price {
        let shares = self.current_shares();
        if shares.0 == 0.0 {
            Price(0.0)
        } else {
            Price(self.cost_basis().0 / shares.0)
        }
    }

    pub fn open_lots(&self) -> Vec<&Transaction> {
        self.transactions
            .iter()
            .filter(|t| t.kind == TxnKind::Buy && t.is_open())
            .collect()
    }

    pub fn closed_lots(&self) -> Vec<&Transaction> {
        self.transactions
            .iter()
            .filter(|t| t.kind == TxnKind::Buy && t.is_closed())
            .collect()
    }

    pub fn sell_transactions(&self) -> Vec<&Transaction> {
        self.transactions
            .iter()
            .filter(|t| t.kind == TxnKind::Sell)
            .collect()
    }

    pub fn transaction_summary(&self) -> TransactionSummary {
        TransactionSummary {
            ticker: self.ticker.clone(),
            total_transactions: self.transactions.len(),
            open_lots: self.open_lots().len(),
            closed_lots: self.closed_lots().len(),
            sell_transactions: self.sell_transactions().len(),
            current_shares: self.current_shares(),
            cost_basis: self.cost_basis(),
            realized_gain_loss: self.realized_gain_loss(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn buy_then_full_sell_closes_lot_and_realizes_gain() {
        let mut h = Holding::new("NVDA");
        h.add_buy(Shares(100.0), d("2024-01-01"), Price(50.0), "");
        let sold = h
            .add_sell(Shares(100.0), d("2024-06-01"), Price(75.0), "", LotSelection::Fifo)
            .unwrap();

        assert_eq!(sold.len(), 1);
        assert_eq!(h.current_shares(), Shares::ZERO);
        assert_eq!(h.realized_gain_loss(), Cash(2500.0));
    }

    #[test]
    fn partial_sell_splits_lot_and_keeps_remainder_open() {
        let mut h = Holding::new("NVDA");
        h.add_buy(Shares(100.0), d("2024-01-01"), Price(50.0), "");
        h.add_sell(Shares(40.0), d("2024-06-01"), Price(75.0), "", LotSelection::Fifo)
            .unwrap();

        assert_eq!(h.current_shares(), Shares(60.0));
        assert_eq!(h.open_lots().len(), 1);
        assert_eq!(h.open_lots()[0].shares, Shares(60.0));
        assert_eq!(h.closed_lots().len(), 1);
    }

    #[test]
    fn selling_more_than_held_errors() {
        let mut h = Holding::new("NVDA");
        h.add_buy(Shares(10.0), d("2024-01-01"), Price(50.0), "");
        let err = h
            .add_sell(Shares(11.0), d("2024-01-02"), Price(60.0), "", LotSelection::Fifo)
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::SynthDivError::Ledger(LedgerError::InsufficientShares { .. })
        ));
    }

    #[test]
    fn lifo_sells_most_recent_lot_first() {
        let mut h = Holding::new("NVDA");
        h.add_buy(Shares(10.0), d("2024-01-01"), Price(50.0), "");
        h.add_buy(Shares(10.0), d("2024-02-01"), Price(60.0), "");
        h.add_sell(Shares(10.0), d("2024-03-01"), Price(70.0), "", LotSelection::Lifo)
            .unwrap();

        let remaining = h.open_lots();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].open_price, Price(50.0));
    }

    #[test]
    fn unrealized_gain_loss_reflects_open_lots_only() {
        let mut h = Holding::new("NVDA");
        h.add_buy(Shares(10.0), d("2024-01-01"), Price(50.0), "");
        assert_eq!(h.unrealized_gain_loss(Price(60.0)), Cash(100.0));
    }
}
