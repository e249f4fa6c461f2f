//! Deterministic synthetic price series for tests and mathematical
//! scenarios, parsed from a `MOCK-{PATTERN}-{params}` ticker grammar.

use chrono::{Duration, NaiveDate};
use rand::{Rng, SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, Normal};

use crate::domain::Price;
use crate::error::{ProviderError, SynthDivResult};

use super::super::{Bar, Dividend, PriceProvider};

#[derive(Debug, Clone, PartialEq)]
enum PatternKind {
    Flat { price: f64 },
    Linear { start: f64, end: f64 },
    Sine { base: f64, amplitude: f64 },
    Step { base: f64, step: f64 },
    Walk { start: f64 },
}

/// `MOCK-FLAT-{p}` / `MOCK-LINEAR-{a}-{b}` / `MOCK-SINE-{base}-{amp}` /
/// `MOCK-STEP-{base}-{step}` / `MOCK-WALK-{start}`.
#[derive(Debug, Clone)]
pub struct MockProvider {
    ticker: String,
    kind: PatternKind,
}

impl MockProvider {
    pub fn parse(ticker: &str) -> SynthDivResult<Self> {
        let upper = ticker.to_uppercase();
        let parts: Vec<&str> = upper.split('-').collect();
        if parts.len() < 2 || parts[0] != "MOCK" {
            return Err(ProviderError::InvalidMockPattern(ticker.to_string()).into());
        }
        let params = &parts[2..];
        let param = |i: usize, default: f64| -> f64 {
            params.get(i).and_then(|s| s.parse().ok()).unwrap_or(default)
        };

        let kind = match parts[1] {
            "FLAT" => PatternKind::Flat {
                price: param(0, 100.0),
            },
            "LINEAR" => PatternKind::Linear {
                start: param(0, 100.0),
                end: param(1, 200.0),
            },
            "SINE" => PatternKind::Sine {
                base: param(0, 100.0),
                amplitude: param(1, 20.0),
            },
            "STEP" => PatternKind::Step {
                base: param(0, 100.0),
                step: param(1, 10.0),
            },
            "WALK" => PatternKind::Walk {
                start: param(0, 100.0),
            },
            _ => return Err(ProviderError::InvalidMockPattern(ticker.to_string()).into()),
        };

        Ok(Self {
            ticker: upper,
            kind,
        })
    }

    fn seed_for(seed_key: &str) -> u64 {
        let hash = blake3::hash(seed_key.as_bytes());
        u64::from_le_bytes(hash.as_bytes()[..8].try_into().expect("8 bytes"))
    }

    fn closes(&self, start: NaiveDate, n: usize) -> Vec<f64> {
        match self.kind {
            PatternKind::Flat { price } => vec![price; n],
            PatternKind::Linear { start: a, end: b } => {
                if n <= 1 {
                    vec![a; n]
                } else {
                    (0..n)
                        .map(|i| a + (b - a) * (i as f64) / ((n - 1) as f64))
                        .collect()
                }
            }
            PatternKind::Sine { base, amplitude } => {
                if n <= 1 {
                    vec![base; n]
                } else {
                    let two_pi = std::f64::consts::PI * 2.0;
                    (0..n)
                        .map(|i| {
                            let t = (i as f64) / ((n - 1) as f64) * 4.0 * two_pi;
                            base + amplitude * t.sin()
                        })
                        .collect()
                }
            }
            PatternKind::Step { base, step } => (0..n)
                .map(|i| base + ((i / 30) as f64) * step)
                .collect(),
            PatternKind::Walk { start: start_price } => {
                let mut rng = StdRng::seed_from_u64(Self::seed_for(&self.ticker));
                let normal = Normal::new(0.0, 0.01).expect("valid normal params");
                let mut closes = Vec::with_capacity(n);
                let mut level = start_price;
                for i in 0..n {
                    if i == 0 {
                        closes.push(level);
                    } else {
                        let r: f64 = normal.sample(&mut rng);
                        level *= 1.0 + r;
                        closes.push(level);
                    }
                }
                closes
            }
        }
    }
}

impl PriceProvider for MockProvider {
    fn get_prices(&self, start: NaiveDate, end: NaiveDate) -> SynthDivResult<Vec<Bar>> {
        if start > end {
            return Err(ProviderError::InvalidDateRange { start, end }.into());
        }
        let n = (end - start).num_days() as usize + 1;
        let closes = self.closes(start, n);

        let noise_seed_key = format!("{}{}", self.ticker, start);
        let mut rng = StdRng::seed_from_u64(Self::seed_for(&noise_seed_key));

        let mut bars = Vec::with_capacity(n);
        for (i, close) in closes.into_iter().enumerate() {
            let noise: f64 = rng.random_range(-0.005..0.005);
            let open = close * (1.0 - noise.abs() / 2.0);
            let high = close * (1.0 + noise.abs());
            let low = close * (1.0 - noise.abs());
            bars.push(Bar {
                date: start + Duration::days(i as i64),
                open: Price(open),
                high: Price(high),
                low: Price(low),
                close: Price(close),
            });
        }
        Ok(bars)
    }

    fn get_dividends(&self, _start: NaiveDate, _end: NaiveDate) -> SynthDivResult<Vec<Dividend>> {
        Ok(vec![])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn flat_pattern_has_constant_close() {
        let p = MockProvider::parse("MOCK-FLAT-50").unwrap();
        let bars = p.get_prices(d("2024-01-01"), d("2024-01-10")).unwrap();
        assert!(bars.iter().all(|b| (b.close.0 - 50.0).abs() < 1e-9));
    }

    #[test]
    fn linear_pattern_interpolates_start_to_end() {
        let p = MockProvider::parse("MOCK-LINEAR-100-200").unwrap();
        let bars = p.get_prices(d("2024-01-01"), d("2024-01-11")).unwrap();
        assert!((bars.first().unwrap().close.0 - 100.0).abs() < 1e-6);
        assert!((bars.last().unwrap().close.0 - 200.0).abs() < 1e-6);
    }

    #[test]
    fn walk_pattern_is_deterministic_for_same_ticker() {
        let p1 = MockProvider::parse("MOCK-WALK-100").unwrap();
        let p2 = MockProvider::parse("MOCK-WALK-100").unwrap();
        let b1 = p1.get_prices(d("2024-01-01"), d("2024-03-01")).unwrap();
        let b2 = p2.get_prices(d("2024-01-01"), d("2024-03-01")).unwrap();
        assert_eq!(b1, b2);
    }

    #[test]
    fn invalid_pattern_errors() {
        assert!(MockProvider::parse("MOCK-BOGUS-1").is_err());
        assert!(MockProvider::parse("NOTMOCK-FLAT-1").is_err());
    }

    #[test]
    fn ohlc_bounds_respected() {
        let p = MockProvider::parse("MOCK-SINE-100-20").unwrap();
        let bars = p.get_prices(d("2024-01-01"), d("2024-02-01")).unwrap();
        for b in bars {
            assert!(b.low.0 <= b.open.0 && b.open.0 <= b.high.0);
            assert!(b.low.0 <= b.close.0 && b.close.0 <= b.high.0);
        }
    }
}
