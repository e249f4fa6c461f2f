//! Price-provider registry: pattern-matched, priority-ordered lookup from
//! ticker to a boxed [`PriceProvider`], plus the built-in provider set.

pub mod builtin;

use std::sync::{Arc, Mutex, OnceLock};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{Granularity, Price};
use crate::error::{ProviderError, SynthDivResult};

/// One day of OHLC data. `low <= open,close <= high`, all strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
}

/// A per-share cash distribution on its ex-date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dividend {
    pub ex_date: NaiveDate,
    pub cash_per_share: Price,
}

/// Checks that `bars` are strictly date-ascending with no duplicate dates
/// and that each bar's OHLC is internally consistent and positive.
pub fn validate_bars(ticker: &str, bars: &[Bar]) -> SynthDivResult<()> {
    let mut prev: Option<NaiveDate> = None;
    for bar in bars {
        if let Some(p) = prev {
            if bar.date <= p {
                return Err(ProviderError::UnorderedBars {
                    ticker: ticker.to_string(),
                    date: bar.date,
                }
                .into());
            }
        }
        prev = Some(bar.date);

        let ok = bar.low.0 > 0.0
            && bar.high.0 > 0.0
            && bar.open.0 > 0.0
            && bar.close.0 > 0.0
            && bar.low.0 <= bar.open.0
            && bar.open.0 <= bar.high.0
            && bar.low.0 <= bar.close.0
            && bar.close.0 <= bar.high.0;
        if !ok {
            return Err(ProviderError::InvalidBar {
                ticker: ticker.to_string(),
                date: bar.date,
                open: bar.open.0,
                high: bar.high.0,
                low: bar.low.0,
                close: bar.close.0,
            }
            .into());
        }
    }
    Ok(())
}

/// A ticker-matching pattern: exact, prefix-wildcard (`"BTC-*"`), or
/// universal (`"*"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    Universal,
    PrefixWildcard(String),
    Exact(String),
}

impl Pattern {
    pub fn parse(pattern: &str) -> Self {
        let upper = pattern.to_uppercase();
        if upper == "*" {
            Pattern::Universal
        } else if let Some(prefix) = upper.strip_suffix('*') {
            Pattern::PrefixWildcard(prefix.to_string())
        } else {
            Pattern::Exact(upper)
        }
    }

    pub fn matches(&self, ticker: &str) -> bool {
        match self {
            Pattern::Universal => true,
            Pattern::Exact(exact) => exact == ticker,
            Pattern::PrefixWildcard(prefix) => ticker.starts_with(prefix.as_str()),
        }
    }
}

pub trait PriceProvider: Send + Sync {
    fn get_prices(&self, start: NaiveDate, end: NaiveDate) -> SynthDivResult<Vec<Bar>>;

    fn get_dividends(&self, start: NaiveDate, end: NaiveDate) -> SynthDivResult<Vec<Dividend>>;

    /// Share-count precision this ticker trades at. Whole-share by default;
    /// providers backing fractional-share assets override it.
    fn granularity(&self) -> Granularity {
        Granularity::WholeShares
    }
}

type Factory = Arc<dyn Fn(&str) -> Box<dyn PriceProvider> + Send + Sync>;

/// Priority-ordered, pattern-matched provider registry. Kept as a plain
/// `Vec` of `(pattern, priority, factory)` tuples rather than a trait-object
/// map keyed by pattern string, matching the flat registration style used
/// elsewhere in this crate for small, rarely-mutated tables.
#[derive(Default)]
pub struct Registry {
    entries: Vec<(Pattern, i32, Factory)>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory` for `pattern` at `priority` (lower runs first).
    /// Re-registering the same textual pattern replaces the prior entry.
    pub fn register(
        &mut self,
        pattern: &str,
        priority: i32,
        factory: impl Fn(&str) -> Box<dyn PriceProvider> + Send + Sync + 'static,
    ) {
        let parsed = Pattern::parse(pattern);
        self.entries.retain(|(p, _, _)| *p != parsed);
        self.entries.push((parsed, priority, Arc::new(factory)));
        self.entries.sort_by_key(|(_, priority, _)| *priority);
    }

    pub fn resolve(&self, ticker: &str) -> SynthDivResult<Box<dyn PriceProvider>> {
        let ticker = ticker.to_uppercase();
        self.entries
            .iter()
            .find(|(pattern, _, _)| pattern.matches(&ticker))
            .map(|(_, _, factory)| factory(&ticker))
            .ok_or_else(|| ProviderError::NoProviderRegistered(ticker).into())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

static GLOBAL_REGISTRY: OnceLock<Mutex<Registry>> = OnceLock::new();

/// The process-wide registry. Effectively immutable once the caller has
/// finished registering providers at startup; [`Registry::clear`] resets it
/// for test isolation.
pub fn global() -> &'static Mutex<Registry> {
    GLOBAL_REGISTRY.get_or_init(|| Mutex::new(Registry::new()))
}
