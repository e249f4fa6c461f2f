//! Stateless withdrawal-cadence helper plus retirement-analysis supplements:
//! a safe-withdrawal-rate search and a cross-strategy comparison table.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::Cadence;
use crate::domain::Cash;

/// Forward-fills `cpi` up to `date`: the last known index on or before
/// `date`, or `None` if `date` precedes every entry.
pub fn cpi_index_at(cpi: &BTreeMap<NaiveDate, f64>, date: NaiveDate) -> Option<f64> {
    cpi.range(..=date).next_back().map(|(_, v)| *v)
}

/// Tracks when the next withdrawal is due and computes its (possibly
/// CPI-scaled) amount. Carries no ledger state of its own — the caller
/// debits cash and calls [`WithdrawalSchedule::record`].
#[derive(Debug, Clone)]
pub struct WithdrawalSchedule {
    cadence: Cadence,
    rate: f64,
    initial_value: Cash,
    start_date: NaiveDate,
    last_withdrawal: Option<NaiveDate>,
}

impl WithdrawalSchedule {
    pub fn new(cadence: Cadence, rate: f64, initial_value: Cash, start_date: NaiveDate) -> Self {
        Self {
            cadence,
            rate,
            initial_value,
            start_date,
            last_withdrawal: None,
        }
    }

    /// True if `rate > 0` and at least one cadence period has elapsed since
    /// the last withdrawal (or since `start_date`, before any withdrawal).
    pub fn is_due(&self, date: NaiveDate) -> bool {
        if self.rate <= 0.0 {
            return false;
        }
        let since = self.last_withdrawal.unwrap_or(self.start_date);
        (date - since).num_days() >= i64::from(self.cadence.cadence_days())
    }

    /// `initial_value * rate / periods_per_year`, scaled by `cpi[date] /
    /// cpi[start_date]` when a CPI series is supplied.
    pub fn amount(&self, date: NaiveDate, cpi: Option<&BTreeMap<NaiveDate, f64>>) -> Cash {
        let base = self.initial_value.0 * self.rate / f64::from(self.cadence.periods_per_year());
        let scaled = match cpi {
            Some(series) => match (cpi_index_at(series, date), cpi_index_at(series, self.start_date)) {
                (Some(at_date), Some(at_start)) if at_start != 0.0 => base * (at_date / at_start),
                _ => base,
            },
            None => base,
        };
        Cash(scaled)
    }

    /// Marks a withdrawal as taken on `date`.
    pub fn record(&mut self, date: NaiveDate) {
        self.last_withdrawal = Some(date);
    }
}

/// `final_value > 0`: either shares are worth something or cash is positive.
pub fn portfolio_survived(final_value: Cash) -> bool {
    final_value.0 > 0.0
}

/// Binary-searches the highest withdrawal rate in `[0, 0.20]` for which
/// `run` reports portfolio survival and a final value at least
/// `target_final_value`. `run` receives a candidate rate and returns
/// `(survived, final_value)`.
pub fn safe_withdrawal_rate(target_final_value: Cash, mut run: impl FnMut(f64) -> (bool, Cash)) -> f64 {
    const TOLERANCE: f64 = 0.0001;
    let mut low = 0.0_f64;
    let mut high = 0.20_f64;

    while high - low > TOLERANCE {
        let mid = (low + high) / 2.0;
        let (survived, final_value) = run(mid);
        if survived && final_value.0 >= target_final_value.0 {
            low = mid;
        } else {
            high = mid;
        }
    }
    low
}

/// One row of a strategy-comparison table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyComparisonRow {
    pub algorithm: String,
    pub withdrawal_rate: f64,
    pub final_value: Cash,
    pub total_withdrawn: Cash,
    pub survived: bool,
}

/// Cross product of `algorithms x withdrawal_rates`, evaluated by `run`.
pub fn compare_strategies(
    algorithms: &[String],
    withdrawal_rates: &[f64],
    mut run: impl FnMut(&str, f64) -> (Cash, Cash, bool),
) -> Vec<StrategyComparisonRow> {
    let mut rows = Vec::with_capacity(algorithms.len() * withdrawal_rates.len());
    for algorithm in algorithms {
        for &rate in withdrawal_rates {
            let (final_value, total_withdrawn, survived) = run(algorithm, rate);
            rows.push(StrategyComparisonRow {
                algorithm: algorithm.clone(),
                withdrawal_rate: rate,
                final_value,
                total_withdrawn,
                survived,
            });
        }
    }
    rows
}
