//! Pluggable strategies for choosing which open lots a sale consumes first.
//!
//! The strategy set is closed (four fixed methods), so dispatch is a plain
//! enum match rather than a registry of trait objects — no need to
//! register new strategies at runtime.

use super::{Transaction, TxnKind};

pub trait LotSelector {
    /// Indices into `txns` of open BUYs, in the order they should be sold.
    fn select_open_indices(&self, txns: &[Transaction]) -> Vec<usize>;

    fn name(&self) -> &'static str;
}

fn open_buy_indices(txns: &[Transaction]) -> impl Iterator<Item = usize> + '_ {
    txns.iter()
        .enumerate()
        .filter(|(_, t)| t.kind == TxnKind::Buy && t.is_open())
        .map(|(i, _)| i)
}

/// Sell oldest purchases first. The default, and most conservative for tax
/// purposes (sells appreciated long-term holdings first).
#[derive(Debug, Clone, Copy, Default)]
pub struct Fifo;

impl LotSelector for Fifo {
    fn select_open_indices(&self, txns: &[Transaction]) -> Vec<usize> {
        open_buy_indices(txns).collect()
    }

    fn name(&self) -> &'static str {
        "FIFO"
    }
}

/// Sell newest purchases first.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lifo;

impl LotSelector for Lifo {
    fn select_open_indices(&self, txns: &[Transaction]) -> Vec<usize> {
        let mut idx: Vec<usize> = open_buy_indices(txns).collect();
        idx.reverse();
        idx
    }

    fn name(&self) -> &'static str {
        "LIFO"
    }
}

/// Sell the highest cost-basis lots first — minimizes realized gains.
#[derive(Debug, Clone, Copy, Default)]
pub struct HighestCost;

impl LotSelector for HighestCost {
    fn select_open_indices(&self, txns: &[Transaction]) -> Vec<usize> {
        let mut idx: Vec<usize> = open_buy_indices(txns).collect();
        idx.sort_by(|&a, &b| {
            txns[b]
                .open_price
                .0
                .partial_cmp(&txns[a].open_price.0)
                .unwrap()
        });
        idx
    }

    fn name(&self) -> &'static str {
        "HIGHEST_COST"
    }
}

/// Sell the lowest cost-basis lots first — maximizes realized gains.
#[derive(Debug, Clone, Copy, Default)]
pub struct LowestCost;

impl LotSelector for LowestCost {
    fn select_open_indices(&self, txns: &[Transaction]) -> Vec<usize> {
        let mut idx: Vec<usize> = open_buy_indices(txns).collect();
        idx.sort_by(|&a, &b| {
            txns[a]
                .open_price
                .0
                .partial_cmp(&txns[b].open_price.0)
                .unwrap()
        });
        idx
    }

    fn name(&self) -> &'static str {
        "LOWEST_COST"
    }
}

/// Closed set of the four lot-selection strategies above, dispatched without
/// a `Box<dyn LotSelector>` since there are only ever these four variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LotSelection {
    #[default]
    Fifo,
    Lifo,
    HighestCost,
    LowestCost,
}

impl LotSelection {
    pub fn select_open_indices(&self, txns: &[Transaction]) -> Vec<usize> {
        match self {
            LotSelection::Fifo => Fifo.select_open_indices(txns),
            LotSelection::Lifo => Lifo.select_open_indices(txns),
            LotSelection::HighestCost => HighestCost.select_open_indices(txns),
            LotSelection::LowestCost => LowestCost.select_open_indices(txns),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LotSelection::Fifo => Fifo.name(),
            LotSelection::Lifo => Lifo.name(),
            LotSelection::HighestCost => HighestCost.name(),
            LotSelection::LowestCost => LowestCost.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Price, Shares};
    use chrono::NaiveDate;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn sample_txns() -> Vec<Transaction> {
        vec![
            Transaction {
                kind: TxnKind::Buy,
                shares: Shares(10.0),
                open_date: d("2024-01-01"),
                open_price: Price(50.0),
                close: None,
                note: String::new(),
            },
            Transaction {
                kind: TxnKind::Buy,
                shares: Shares(10.0),
                open_date: d("2024-02-01"),
                open_price: Price(70.0),
                close: None,
                note: String::new(),
            },
            Transaction {
                kind: TxnKind::Buy,
                shares: Shares(10.0),
                open_date: d("2024-03-01"),
                open_price: Price(40.0),
                close: None,
                note: String::new(),
            },
        ]
    }

    #[test]
    fn fifo_orders_oldest_first() {
        let txns = sample_txns();
        assert_eq!(Fifo.select_open_indices(&txns), vec![0, 1, 2]);
    }

    #[test]
    fn lifo_orders_newest_first() {
        let txns = sample_txns();
        assert_eq!(Lifo.select_open_indices(&txns), vec![2, 1, 0]);
    }

    #[test]
    fn highest_cost_orders_by_price_descending() {
        let txns = sample_txns();
        assert_eq!(HighestCost.select_open_indices(&txns), vec![1, 0, 2]);
    }

    #[test]
    fn lowest_cost_orders_by_price_ascending() {
        let txns = sample_txns();
        assert_eq!(LowestCost.select_open_indices(&txns), vec![2, 0, 1]);
    }
}
