//! Built-in [`PriceProvider`] implementations: flat cash, a network-backed
//! provider that persists through the cache, committed static snapshots, and
//! deterministic mock data for tests and mathematical scenarios.

mod mock;

pub use mock::MockProvider;

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Duration, NaiveDate};

use crate::cache::Cache;
use crate::domain::Price;
use crate::error::SynthDivResult;

use super::{Bar, Dividend, PriceProvider};

/// Flat `$1.00` OHLC every calendar day; pays no dividends. Lets cash behave
/// as just another ticker in a portfolio.
#[derive(Debug, Clone)]
pub struct CashProvider;

impl PriceProvider for CashProvider {
    fn get_prices(&self, start: NaiveDate, end: NaiveDate) -> SynthDivResult<Vec<Bar>> {
        if start > end {
            return Ok(vec![]);
        }
        let mut bars = Vec::new();
        let mut day = start;
        while day <= end {
            bars.push(Bar {
                date: day,
                open: Price(1.0),
                high: Price(1.0),
                low: Price(1.0),
                close: Price(1.0),
            });
            day += Duration::days(1);
        }
        Ok(bars)
    }

    fn get_dividends(&self, _start: NaiveDate, _end: NaiveDate) -> SynthDivResult<Vec<Dividend>> {
        Ok(vec![])
    }
}

/// Fetches bars via an injected closure (the core never speaks HTTP itself)
/// and persists whatever it fetches through the dual-format [`Cache`] on the
/// way out. Tolerant of an empty fetch response.
pub struct NetworkProvider<F>
where
    F: Fn(&str, NaiveDate, NaiveDate) -> SynthDivResult<Vec<Bar>> + Send + Sync,
{
    ticker: String,
    fetch: F,
    cache: Option<Arc<Cache>>,
}

impl<F> NetworkProvider<F>
where
    F: Fn(&str, NaiveDate, NaiveDate) -> SynthDivResult<Vec<Bar>> + Send + Sync,
{
    pub fn new(ticker: impl Into<String>, fetch: F, cache: Option<Arc<Cache>>) -> Self {
        Self {
            ticker: ticker.into(),
            fetch,
            cache,
        }
    }
}

impl<F> PriceProvider for NetworkProvider<F>
where
    F: Fn(&str, NaiveDate, NaiveDate) -> SynthDivResult<Vec<Bar>> + Send + Sync,
{
    #[tracing::instrument(skip(self), fields(ticker = %self.ticker))]
    fn get_prices(&self, start: NaiveDate, end: NaiveDate) -> SynthDivResult<Vec<Bar>> {
        let fetched = (self.fetch)(&self.ticker, start, end)?;
        if fetched.is_empty() {
            tracing::debug!("network fetch returned no bars");
            return Ok(fetched);
        }
        if let Some(cache) = &self.cache {
            cache.merge_write_bars(&self.ticker, &fetched)?;
        }
        Ok(fetched)
    }

    fn get_dividends(&self, _start: NaiveDate, _end: NaiveDate) -> SynthDivResult<Vec<Dividend>> {
        Ok(vec![])
    }
}

/// Reads committed historical snapshots from a directory:
/// `{dir}/{ticker}.csv` for bars, `{dir}/{ticker}_dividends.csv` for
/// dividends. Returns empty data (not an error) when the file is absent.
#[derive(Debug, Clone)]
pub struct StaticProvider {
    ticker: String,
    dir: PathBuf,
}

impl StaticProvider {
    pub fn new(ticker: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            ticker: ticker.into(),
            dir: dir.into(),
        }
    }

    fn bars_path(&self) -> PathBuf {
        self.dir.join(format!("{}.csv", self.ticker))
    }

    fn dividends_path(&self) -> PathBuf {
        self.dir.join(format!("{}_dividends.csv", self.ticker))
    }
}

impl PriceProvider for StaticProvider {
    fn get_prices(&self, start: NaiveDate, end: NaiveDate) -> SynthDivResult<Vec<Bar>> {
        let path = self.bars_path();
        if !path.exists() {
            return Ok(vec![]);
        }
        let text = fs::read_to_string(&path).map_err(|e| crate::error::CacheError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        let mut bars = Vec::new();
        for line in text.lines().skip(1) {
            if line.trim().is_empty() {
                continue;
            }
            let mut cols = line.split(',');
            let date = NaiveDate::parse_from_str(cols.next().unwrap_or_default(), "%Y-%m-%d")
                .map_err(|e| crate::error::CacheError::Decode {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })?;
            if date < start || date > end {
                continue;
            }
            let parse_f64 = |s: Option<&str>| -> SynthDivResult<f64> {
                s.unwrap_or_default()
                    .trim()
                    .parse::<f64>()
                    .map_err(|e| {
                        crate::error::CacheError::Decode {
                            path: path.display().to_string(),
                            message: e.to_string(),
                        }
                        .into()
                    })
            };
            bars.push(Bar {
                date,
                open: Price(parse_f64(cols.next())?),
                high: Price(parse_f64(cols.next())?),
                low: Price(parse_f64(cols.next())?),
                close: Price(parse_f64(cols.next())?),
            });
        }
        Ok(bars)
    }

    fn get_dividends(&self, start: NaiveDate, end: NaiveDate) -> SynthDivResult<Vec<Dividend>> {
        let path = self.dividends_path();
        if !path.exists() {
            return Ok(vec![]);
        }
        let text = fs::read_to_string(&path).map_err(|e| crate::error::CacheError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        let mut out = Vec::new();
        for line in text.lines().skip(1) {
            if line.trim().is_empty() {
                continue;
            }
            let mut cols = line.split(',');
            let ex_date = NaiveDate::parse_from_str(cols.next().unwrap_or_default(), "%Y-%m-%d")
                .map_err(|e| crate::error::CacheError::Decode {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })?;
            if ex_date < start || ex_date > end {
                continue;
            }
            let amount: f64 = cols
                .next()
                .unwrap_or_default()
                .trim()
                .parse()
                .map_err(|e: std::num::ParseFloatError| crate::error::CacheError::Decode {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })?;
            out.push(Dividend {
                ex_date,
                cash_per_share: Price(amount),
            });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn cash_provider_is_flat_every_day() {
        let bars = CashProvider.get_prices(d("2024-01-01"), d("2024-01-03")).unwrap();
        assert_eq!(bars.len(), 3);
        assert!(bars.iter().all(|b| b.close == Price(1.0)));
    }

    #[test]
    fn cash_provider_pays_no_dividends() {
        assert!(CashProvider
            .get_dividends(d("2024-01-01"), d("2024-01-03"))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn static_provider_returns_empty_when_file_absent() {
        let provider = StaticProvider::new("NOPE", std::env::temp_dir());
        assert!(provider
            .get_prices(d("2024-01-01"), d("2024-01-03"))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn network_provider_persists_fetched_bars_to_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(Cache::new(dir.path()));
        let provider = NetworkProvider::new(
            "NVDA",
            |_, start, _| {
                Ok(vec![Bar {
                    date: start,
                    open: Price(10.0),
                    high: Price(11.0),
                    low: Price(9.0),
                    close: Price(10.5),
                }])
            },
            Some(cache.clone()),
        );

        let bars = provider.get_prices(d("2024-01-01"), d("2024-01-01")).unwrap();
        assert_eq!(bars.len(), 1);

        let cached = cache.read_bars("NVDA").unwrap();
        assert_eq!(cached.len(), 1);
    }
}
