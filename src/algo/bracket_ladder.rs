//! The bracket-ladder algorithm: prices a symmetric buy/sell pair around
//! the last transaction price and re-arms at the executed fill after every
//! trade, converting volatility into realized cash flow.

use chrono::NaiveDate;

use super::sizing::next_orders;
use super::{Algorithm, Order, OrderKind, bar_is_valid};
use crate::domain::{Cash, Price, Rate, Shares};
use crate::error::{AlgoError, SynthDivResult};
use crate::provider::Bar;

/// A record of a sell whose buyback has not yet (fully) happened. Pushed on
/// every SELL, popped on the BUY that reverses it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuybackEntry {
    pub bought_price: Price,
    pub bought_qty: Shares,
    pub parent_sell_price: Price,
    pub parent_sell_qty: Shares,
}

fn validate_params(rebalance_size: f64, profit_sharing: f64) -> SynthDivResult<()> {
    if !(rebalance_size > 0.0 && rebalance_size < 1.0) {
        return Err(AlgoError::InvalidRebalanceSize(rebalance_size).into());
    }
    if !(profit_sharing > -0.25 && profit_sharing < 2.0) {
        return Err(AlgoError::InvalidProfitSharing(profit_sharing).into());
    }
    Ok(())
}

/// Snaps `price` onto the discrete ladder `{seed * (1+r)^n : n in Z}`
/// nearest to it, so independent runs sharing a `(seed, r)` land on the
/// same bracket boundaries.
fn snap_to_seed(price: Price, seed: Option<Price>, rebalance_size: f64) -> Price {
    let Some(seed) = seed else { return price };
    if seed.0 <= 0.0 || price.0 <= 0.0 {
        return price;
    }
    let log_base = (1.0 + rebalance_size).ln();
    if log_base.abs() < f64::EPSILON {
        return price;
    }
    let n = ((price.0 / seed.0).ln() / log_base).round_ties_even();
    Price(seed.0 * (1.0 + rebalance_size).powf(n))
}

/// The full bracket-ladder algorithm: buys dips, sells rips, re-arms at
/// each executed fill.
#[derive(Debug, Clone)]
pub struct BracketLadderFull {
    rebalance_size: Rate,
    profit_sharing: Rate,
    bracket_seed: Option<Price>,

    last_txn_price: Price,
    next_buy_price: Price,
    next_buy_qty: Shares,
    next_sell_price: Price,
    next_sell_qty: Shares,
    ath_price: Price,
    buyback_stack: Vec<BuybackEntry>,
    total_volatility_alpha: f64,
}

impl BracketLadderFull {
    pub fn new(rebalance_size: f64, profit_sharing: f64) -> SynthDivResult<Self> {
        validate_params(rebalance_size, profit_sharing)?;
        Ok(Self {
            rebalance_size: Rate(rebalance_size),
            profit_sharing: Rate(profit_sharing),
            bracket_seed: None,
            last_txn_price: Price(0.0),
            next_buy_price: Price(0.0),
            next_buy_qty: Shares(0.0),
            next_sell_price: Price(0.0),
            next_sell_qty: Shares(0.0),
            ath_price: Price(0.0),
            buyback_stack: Vec::new(),
            total_volatility_alpha: 0.0,
        })
    }

    pub fn with_seed(mut self, seed: Price) -> Self {
        self.bracket_seed = Some(seed);
        self
    }

    pub fn total_volatility_alpha(&self) -> f64 {
        self.total_volatility_alpha
    }

    pub fn buyback_stack(&self) -> &[BuybackEntry] {
        &self.buyback_stack
    }

    fn place_orders(&mut self, holdings: Shares, current_price: Price) {
        let anchor = snap_to_seed(current_price, self.bracket_seed, self.rebalance_size.0);
        self.last_txn_price = anchor;
        let orders = next_orders(holdings, anchor, self.rebalance_size, self.profit_sharing);
        self.next_buy_price = orders.next_buy_price;
        self.next_buy_qty = orders.next_buy_qty;
        self.next_sell_price = orders.next_sell_price;
        self.next_sell_qty = orders.next_sell_qty;
    }
}

impl Algorithm for BracketLadderFull {
    fn on_new_holdings(&mut self, holdings: Shares, price: Price) {
        self.ath_price = price;
        self.place_orders(holdings, price);
    }

    fn on_day(&mut self, date: NaiveDate, bar: Bar, holdings: Shares, _cash: Cash, _history: &[Bar]) -> Option<Order> {
        if !bar_is_valid(&bar) {
            tracing::warn!(%date, "skipping invalid bar for bracket ladder");
            return None;
        }
        if bar.high.0 > self.ath_price.0 {
            self.ath_price = bar.high;
        }

        if bar.low.0 <= self.next_buy_price.0 {
            let fill = Price(self.next_buy_price.0.min(bar.open.0));
            let qty = self.next_buy_qty;
            let current_value = holdings.0 * fill.0;
            if current_value != 0.0 {
                let profit = (self.last_txn_price.0 - fill.0) * qty.0;
                self.total_volatility_alpha += profit / current_value;
            }
            let note = format!(
                "buying back: limit price = {:.4}, actual price = {:.4}",
                self.next_buy_price.0, fill.0
            );
            self.buyback_stack.pop();
            self.place_orders(Shares(holdings.0 + qty.0), fill);
            return Some(Order {
                kind: OrderKind::Buy,
                shares: qty,
                fill_price: fill,
                note,
            });
        }

        if bar.high.0 >= self.next_sell_price.0 {
            let fill = Price(self.next_sell_price.0.max(bar.open.0));
            let qty = self.next_sell_qty;
            let note = format!(
                "taking profits: limit price = {:.4}, actual price = {:.4}",
                self.next_sell_price.0, fill.0
            );
            let parent_sell_price = fill;
            let parent_sell_qty = qty;
            self.place_orders(Shares(holdings.0 - qty.0), fill);
            self.buyback_stack.push(BuybackEntry {
                bought_price: self.next_buy_price,
                bought_qty: self.next_buy_qty,
                parent_sell_price,
                parent_sell_qty,
            });
            return Some(Order {
                kind: OrderKind::Sell,
                shares: qty,
                fill_price: fill,
                note,
            });
        }

        None
    }

    fn on_end_holding(&mut self) {
        tracing::info!(alpha_pct = self.total_volatility_alpha * 100.0, "bracket ladder closed out");
    }
}

/// Sells only at new all-time highs; never re-buys. Used as a baseline to
/// decompose synthetic alpha (ATH-only vs. buy-and-hold) from volatility
/// alpha (full ladder vs. ATH-only).
#[derive(Debug, Clone)]
pub struct BracketLadderAthOnly {
    rebalance_size: Rate,
    profit_sharing: Rate,

    last_txn_price: Price,
    next_sell_price: Price,
    next_sell_qty: Shares,
    ath_price: Price,
}

impl BracketLadderAthOnly {
    pub fn new(rebalance_size: f64, profit_sharing: f64) -> SynthDivResult<Self> {
        validate_params(rebalance_size, profit_sharing)?;
        Ok(Self {
            rebalance_size: Rate(rebalance_size),
            profit_sharing: Rate(profit_sharing),
            last_txn_price: Price(0.0),
            next_sell_price: Price(0.0),
            next_sell_qty: Shares(0.0),
            ath_price: Price(0.0),
        })
    }

    fn place_orders(&mut self, holdings: Shares, current_price: Price) {
        self.last_txn_price = current_price;
        let orders = next_orders(holdings, current_price, self.rebalance_size, self.profit_sharing);
        self.next_sell_price = orders.next_sell_price;
        self.next_sell_qty = orders.next_sell_qty;
    }
}

impl Algorithm for BracketLadderAthOnly {
    fn on_new_holdings(&mut self, holdings: Shares, price: Price) {
        self.ath_price = price;
        self.place_orders(holdings, price);
    }

    fn on_day(&mut self, date: NaiveDate, bar: Bar, holdings: Shares, _cash: Cash, _history: &[Bar]) -> Option<Order> {
        if !bar_is_valid(&bar) {
            tracing::warn!(%date, "skipping invalid bar for ATH-only ladder");
            return None;
        }
        if bar.high.0 <= self.ath_price.0 {
            return None;
        }
        self.ath_price = bar.high;

        if bar.high.0 >= self.next_sell_price.0 {
            let fill = Price(self.next_sell_price.0.max(bar.open.0));
            let qty = self.next_sell_qty;
            let note = format!(
                "ATH-only sell: limit price = {:.4}, actual price = {:.4}, new ATH = {:.4}",
                self.next_sell_price.0, fill.0, self.ath_price.0
            );
            self.place_orders(Shares(holdings.0 - qty.0), fill);
            return Some(Order {
                kind: OrderKind::Sell,
                shares: qty,
                fill_price: fill,
                note,
            });
        }
        None
    }

    fn on_end_holding(&mut self) {
        tracing::info!(ath = self.ath_price.0, "ATH-only ladder closed out");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn bar(date: NaiveDate, open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            date,
            open: Price(open),
            high: Price(high),
            low: Price(low),
            close: Price(close),
        }
    }

    #[test]
    fn full_ladder_sells_at_ramp_up_and_rebuys_on_dip() {
        let mut algo = BracketLadderFull::new(0.10, 0.5).unwrap();
        algo.on_new_holdings(Shares(1000.0), Price(100.0));

        let up = bar(d(2024, 1, 2), 100.0, 115.0, 99.0, 112.0);
        let sell = algo
            .on_day(up.date, up, Shares(1000.0), Cash(0.0), &[])
            .expect("sell should fire");
        assert_eq!(sell.kind, OrderKind::Sell);
        assert_eq!(algo.buyback_stack().len(), 1);

        let down = bar(d(2024, 1, 3), 108.0, 109.0, 95.0, 98.0);
        let buy = algo
            .on_day(down.date, down, Shares(1000.0 - sell.shares.0), Cash(0.0), &[])
            .expect("buy should fire");
        assert_eq!(buy.kind, OrderKind::Buy);
    }

    #[test]
    fn no_trade_when_price_stays_within_bracket() {
        let mut algo = BracketLadderFull::new(0.10, 0.5).unwrap();
        algo.on_new_holdings(Shares(1000.0), Price(100.0));
        let flat = bar(d(2024, 1, 2), 100.0, 101.0, 99.0, 100.0);
        assert!(algo.on_day(flat.date, flat, Shares(1000.0), Cash(0.0), &[]).is_none());
    }

    #[test]
    fn invalid_bar_is_skipped_without_panicking() {
        let mut algo = BracketLadderFull::new(0.10, 0.5).unwrap();
        algo.on_new_holdings(Shares(1000.0), Price(100.0));
        let bad = bar(d(2024, 1, 2), 100.0, 50.0, 99.0, 100.0);
        assert!(algo.on_day(bad.date, bad, Shares(1000.0), Cash(0.0), &[]).is_none());
    }

    #[test]
    fn invalid_rebalance_size_is_rejected() {
        assert!(BracketLadderFull::new(0.0, 0.5).is_err());
        assert!(BracketLadderFull::new(1.0, 0.5).is_err());
    }

    #[test]
    fn ath_only_never_rebuys() {
        let mut algo = BracketLadderAthOnly::new(0.10, 0.5).unwrap();
        algo.on_new_holdings(Shares(1000.0), Price(100.0));

        let up = bar(d(2024, 1, 2), 100.0, 115.0, 99.0, 112.0);
        let sell = algo.on_day(up.date, up, Shares(1000.0), Cash(0.0), &[]);
        assert!(sell.is_some());

        let down = bar(d(2024, 1, 3), 108.0, 109.0, 50.0, 98.0);
        assert!(algo.on_day(down.date, down, Shares(900.0), Cash(0.0), &[]).is_none());
    }

    #[test]
    fn bracket_seed_snaps_anchor_to_ladder_grid() {
        let mut a = BracketLadderFull::new(0.10, 0.5).unwrap().with_seed(Price(100.0));
        let mut b = BracketLadderFull::new(0.10, 0.5).unwrap().with_seed(Price(100.0));
        a.on_new_holdings(Shares(1000.0), Price(104.0));
        b.on_new_holdings(Shares(1000.0), Price(107.0));
        assert!((a.last_txn_price.0 - b.last_txn_price.0).abs() < 1e-9);
    }
}
