//! Synthetic-dividend backtesting engine.
//!
//! A bracket-ladder rebalancing algorithm sized from a rebalance fraction `r`
//! and a profit-sharing fraction `s`, run day-by-day over a per-lot ledger,
//! with pluggable price providers, a dual-format on-disk cache, and an
//! inflation-indexed withdrawal layer for retirement-style simulation.

mod macros;

pub mod domain;
pub mod error;

pub mod provider;
pub mod cache;
pub mod ledger;
pub mod portfolio;
pub mod algo;
pub mod backtest;
pub mod returns;
pub mod withdrawal;
pub mod config;

pub use domain::{Cash, Granularity, Price, Rate, Shares};
pub use error::{SynthDivError, SynthDivResult};
