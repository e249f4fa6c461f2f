//! Strong newtypes for the monetary/quantity axes of the simulation.
//!
//! Wrapping `f64` in these types keeps the bracket-ladder sizing law and the
//! ledger's cost-basis arithmetic from silently mixing units (a price added
//! to a share count, a rate multiplied by a date delta, etc).

use serde::{Deserialize, Serialize};

use crate::{impl_add_sub_mul_div_primitive, impl_from_primitive, impl_neg_primitive};

/// A price per share/unit, in the asset's quote currency.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Price(pub f64);
impl_from_primitive!(Price, f64);
impl_add_sub_mul_div_primitive!(Price, f64);
impl_neg_primitive!(Price, f64);

impl Price {
    pub fn is_finite_positive(self) -> bool {
        self.0.is_finite() && self.0 > 0.0
    }
}

/// A quantity of shares/units. Not restricted to integers: the provider
/// declares whether an asset supports fractional shares (see [`Granularity`]).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Shares(pub f64);
impl_from_primitive!(Shares, f64);
impl_add_sub_mul_div_primitive!(Shares, f64);
impl_neg_primitive!(Shares, f64);

impl Shares {
    pub const ZERO: Shares = Shares(0.0);

    pub fn value_at(self, price: Price) -> Cash {
        Cash(self.0 * price.0)
    }
}

/// A signed dollar amount: cash balance, P&L, withdrawal, debt.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Cash(pub f64);
impl_from_primitive!(Cash, f64);
impl_add_sub_mul_div_primitive!(Cash, f64);
impl_neg_primitive!(Cash, f64);

impl Cash {
    pub const ZERO: Cash = Cash(0.0);
}

/// A dimensionless fraction: rebalance size `r`, profit-sharing `s`, an
/// interest or withdrawal rate. Never a percent internally (see GLOSSARY).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Rate(pub f64);
impl_from_primitive!(Rate, f64);
impl_add_sub_mul_div_primitive!(Rate, f64);
impl_neg_primitive!(Rate, f64);

/// Declares whether an asset trades in whole shares or supports fractional
/// quantities (e.g. crypto). The provider is the authority on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Granularity {
    WholeShares,
    /// Fixed to 4 decimal digits, per the numeric-semantics note in the design.
    FractionalFourDp,
}

impl Granularity {
    pub fn round(self, shares: Shares) -> Shares {
        match self {
            Granularity::WholeShares => Shares(shares.0.round_ties_even()),
            Granularity::FractionalFourDp => Shares((shares.0 * 10_000.0).round_ties_even() / 10_000.0),
        }
    }
}
