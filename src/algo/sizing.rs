//! The symmetric buy/sell sizing law at the heart of the bracket ladder,
//! kept as a pure function so the ladder symmetry can be tested in
//! isolation from algorithm state.

use crate::domain::{Price, Rate, Shares};

/// The four order parameters derived from a bracket's anchor price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orders {
    pub next_buy_price: Price,
    pub next_buy_qty: Shares,
    pub next_sell_price: Price,
    pub next_sell_qty: Shares,
}

/// `next_buy_price = P*/(1+r)`, `next_buy_qty = round(r·H·s)`,
/// `next_sell_price = P*(1+r)`, `next_sell_qty = round(r·H·s/(1+r))`.
/// Chosen so that buying `next_buy_qty` at `next_buy_price` and selling it
/// back at `P*` is exact, and symmetrically for a sell-then-buyback cycle.
pub fn next_orders(holdings: Shares, last_txn_price: Price, rebalance_size: Rate, profit_sharing: Rate) -> Orders {
    let r = rebalance_size.0;
    let h = holdings.0;
    let s = profit_sharing.0;
    let p = last_txn_price.0;

    let next_buy_price = p / (1.0 + r);
    let next_buy_qty = (r * h * s).round_ties_even();
    let next_sell_price = p * (1.0 + r);
    let next_sell_qty = (r * h * s / (1.0 + r)).round_ties_even();

    Orders {
        next_buy_price: Price(next_buy_price),
        next_buy_qty: Shares(next_buy_qty),
        next_sell_price: Price(next_sell_price),
        next_sell_qty: Shares(next_sell_qty),
    }
}
