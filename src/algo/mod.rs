//! The bracket-ladder rebalancing algorithm and its siblings: a closed set
//! of per-asset strategies, dispatched as `Box<dyn Algorithm>` trait objects
//! rather than a tagged enum.

pub mod bracket_ladder;
pub mod buy_and_hold;
pub mod factory;
pub mod sizing;

pub use bracket_ladder::{BracketLadderAthOnly, BracketLadderFull, BuybackEntry};
pub use buy_and_hold::BuyAndHold;
pub use factory::build;

use chrono::NaiveDate;

use crate::domain::{Cash, Price, Shares};
use crate::provider::Bar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderKind {
    Buy,
    Sell,
}

/// A single fill an algorithm chose to execute on a given day, already
/// resolved against the bar's gap-handling rules.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub kind: OrderKind,
    pub shares: Shares,
    pub fill_price: Price,
    pub note: String,
}

/// The per-asset strategy interface. Implementors never propagate errors
/// from `on_day`: invalid bars are skipped with a log line and `None`.
pub trait Algorithm: Send {
    fn on_new_holdings(&mut self, holdings: Shares, price: Price);

    fn on_day(
        &mut self,
        date: NaiveDate,
        bar: Bar,
        holdings: Shares,
        cash: Cash,
        history: &[Bar],
    ) -> Option<Order>;

    fn on_end_holding(&mut self);
}

pub(crate) fn bar_is_valid(bar: &Bar) -> bool {
    bar.open.0 > 0.0 && bar.high.0 > 0.0 && bar.low.0 > 0.0 && bar.close.0 > 0.0 && bar.low.0 <= bar.high.0
}
