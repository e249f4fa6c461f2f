//! The trivial baseline: hold the initial position, never trade again.

use chrono::NaiveDate;

use super::{Algorithm, Order};
use crate::domain::{Cash, Price, Shares};
use crate::provider::Bar;

#[derive(Debug, Clone, Copy, Default)]
pub struct BuyAndHold;

impl Algorithm for BuyAndHold {
    fn on_new_holdings(&mut self, _holdings: Shares, _price: Price) {}

    fn on_day(&mut self, _date: NaiveDate, _bar: Bar, _holdings: Shares, _cash: Cash, _history: &[Bar]) -> Option<Order> {
        None
    }

    fn on_end_holding(&mut self) {}
}
