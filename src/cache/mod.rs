//! Dual-format on-disk bar cache: a binary `{ticker}.postcard` file for fast
//! round-tripping and a textual `{ticker}.csv` twin for inspection, kept in
//! sync by merging (never overwriting) on every write.

mod lock;

pub use lock::{ExclusiveLock, SharedLock};

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CacheError, SynthDivResult};
use crate::provider::Bar;

const CSV_HEADER: &str = "Date,Open,High,Low,Close";

/// A directory of per-ticker cached bars, each backed by a binary/CSV pair.
#[derive(Debug, Clone)]
pub struct Cache {
    dir: PathBuf,
}

impl Cache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn postcard_path(&self, ticker: &str) -> PathBuf {
        self.dir.join(format!("{ticker}.postcard"))
    }

    fn csv_path(&self, ticker: &str) -> PathBuf {
        self.dir.join(format!("{ticker}.csv"))
    }

    /// Reads cached bars for `ticker`, preferring the binary file and
    /// falling back to the CSV twin if it's missing. Returns an empty `Vec`
    /// if neither file exists.
    pub fn read_bars(&self, ticker: &str) -> SynthDivResult<Vec<Bar>> {
        let postcard_path = self.postcard_path(ticker);
        if postcard_path.exists() {
            let _guard = SharedLock::acquire(&postcard_path)?;
            return Self::read_postcard(&postcard_path);
        }
        let csv_path = self.csv_path(ticker);
        if csv_path.exists() {
            let _guard = SharedLock::acquire(&csv_path)?;
            return Self::read_csv(&csv_path);
        }
        Ok(vec![])
    }

    /// Merges `bars` into whatever is already cached for `ticker` (union of
    /// dates, last-write-wins on a collision, sorted ascending by date),
    /// then rewrites both the binary and CSV files.
    pub fn merge_write_bars(&self, ticker: &str, bars: &[Bar]) -> SynthDivResult<()> {
        fs::create_dir_all(&self.dir).map_err(|e| CacheError::Io {
            path: self.dir.display().to_string(),
            source: e,
        })?;

        let postcard_path = self.postcard_path(ticker);
        let _guard = ExclusiveLock::acquire(&postcard_path)?;

        let mut existing = if postcard_path.exists() {
            Self::read_postcard(&postcard_path)?
        } else {
            let csv_path = self.csv_path(ticker);
            if csv_path.exists() {
                Self::read_csv(&csv_path)?
            } else {
                vec![]
            }
        };

        let mut by_date = std::collections::BTreeMap::new();
        for bar in existing.drain(..) {
            by_date.insert(bar.date, bar);
        }
        for bar in bars {
            by_date.insert(bar.date, *bar);
        }
        let merged: Vec<Bar> = by_date.into_values().collect();

        Self::write_postcard(&postcard_path, &merged)?;
        Self::write_csv(&self.csv_path(ticker), &merged)?;
        Ok(())
    }

    fn read_postcard(path: &Path) -> SynthDivResult<Vec<Bar>> {
        let bytes = fs::read(path).map_err(|e| CacheError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        postcard::from_bytes(&bytes)
            .map_err(|e| {
                CacheError::Decode {
                    path: path.display().to_string(),
                    message: e.to_string(),
                }
                .into()
            })
    }

    fn write_postcard(path: &Path, bars: &[Bar]) -> SynthDivResult<()> {
        let bytes = postcard::to_allocvec(bars).map_err(|e| CacheError::Decode {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        fs::write(path, bytes).map_err(|e| {
            CacheError::Io {
                path: path.display().to_string(),
                source: e,
            }
            .into()
        })
    }

    fn read_csv(path: &Path) -> SynthDivResult<Vec<Bar>> {
        let text = fs::read_to_string(path).map_err(|e| CacheError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        let mut bars = Vec::new();
        for line in text.lines().skip(1) {
            if line.trim().is_empty() {
                continue;
            }
            let mut cols = line.split(',');
            let decode_err = |message: String| -> crate::error::SynthDivError {
                CacheError::Decode {
                    path: path.display().to_string(),
                    message,
                }
                .into()
            };
            let date = chrono::NaiveDate::parse_from_str(cols.next().unwrap_or_default(), "%Y-%m-%d")
                .map_err(|e| decode_err(e.to_string()))?;
            let mut next_f64 = || -> SynthDivResult<f64> {
                cols.next()
                    .unwrap_or_default()
                    .trim()
                    .parse::<f64>()
                    .map_err(|e| decode_err(e.to_string()))
            };
            bars.push(Bar {
                date,
                open: crate::domain::Price(next_f64()?),
                high: crate::domain::Price(next_f64()?),
                low: crate::domain::Price(next_f64()?),
                close: crate::domain::Price(next_f64()?),
            });
        }
        Ok(bars)
    }

    fn write_csv(path: &Path, bars: &[Bar]) -> SynthDivResult<()> {
        let mut text = String::from(CSV_HEADER);
        text.push('\n');
        for bar in bars {
            text.push_str(&format!(
                "{},{},{},{},{}\n",
                bar.date, bar.open.0, bar.high.0, bar.low.0, bar.close.0
            ));
        }
        fs::write(path, text).map_err(|e| {
            CacheError::Io {
                path: path.display().to_string(),
                source: e,
            }
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn bar(date: &str, close: f64) -> Bar {
        Bar {
            date: d(date),
            open: crate::domain::Price(close),
            high: crate::domain::Price(close + 1.0),
            low: crate::domain::Price(close - 1.0),
            close: crate::domain::Price(close),
        }
    }

    #[test]
    fn write_then_read_round_trips_via_binary() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(dir.path());
        let bars = vec![bar("2024-01-01", 100.0), bar("2024-01-02", 101.0)];
        cache.merge_write_bars("NVDA", &bars).unwrap();

        let read = cache.read_bars("NVDA").unwrap();
        assert_eq!(read, bars);
    }

    #[test]
    fn csv_twin_is_written_and_readable_on_its_own() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(dir.path());
        cache.merge_write_bars("NVDA", &[bar("2024-01-01", 100.0)]).unwrap();

        std::fs::remove_file(cache.postcard_path("NVDA")).unwrap();
        let read = cache.read_bars("NVDA").unwrap();
        assert_eq!(read.len(), 1);
        assert_eq!(read[0].close.0, 100.0);
    }

    #[test]
    fn merge_unions_dates_and_last_write_wins_on_collision() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(dir.path());
        cache
            .merge_write_bars("NVDA", &[bar("2024-01-01", 100.0), bar("2024-01-02", 101.0)])
            .unwrap();
        cache
            .merge_write_bars("NVDA", &[bar("2024-01-02", 999.0), bar("2024-01-03", 102.0)])
            .unwrap();

        let read = cache.read_bars("NVDA").unwrap();
        assert_eq!(read.len(), 3);
        assert_eq!(read[1].close.0, 999.0);
    }

    #[test]
    fn read_bars_returns_empty_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(dir.path());
        assert!(cache.read_bars("NOPE").unwrap().is_empty());
    }
}
