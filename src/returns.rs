//! Pure return-adjustment arithmetic: nominal vs. inflation-adjusted return,
//! and alpha against a benchmark. Never fails — missing or single-point
//! series degrade the relevant output fields to `None` plus an advisory
//! `warning`, matching the "data gaps are not errors" tier of this crate's
//! error model.

use serde::{Deserialize, Serialize};

use crate::domain::Cash;

/// Earliest and latest value of a date-ordered series, or `None` if the
/// series has fewer than two points.
fn endpoints(series: &[f64]) -> Option<(f64, f64)> {
    match (series.first(), series.last()) {
        (Some(&first), Some(&last)) if series.len() >= 2 => Some((first, last)),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReturnAdjustment {
    pub nominal_return: f64,
    pub nominal_dollars: Cash,
    pub real_return: Option<f64>,
    pub purchasing_power_lost: Option<Cash>,
    pub alpha: Option<f64>,
    pub alpha_dollars: Option<Cash>,
    pub warning: Option<String>,
}

/// `start_value`/`end_value` are the backtest's own totals; `cpi_series` and
/// `benchmark_series` are optional, ordered-by-date index series over the
/// same window (CPI: price index; benchmark: total value, e.g. a
/// buy-and-hold baseline).
pub fn adjust(start_value: Cash, end_value: Cash, cpi_series: &[f64], benchmark_series: &[f64]) -> ReturnAdjustment {
    let nominal_dollars = end_value - start_value;
    let nominal_return = if start_value.0 != 0.0 {
        nominal_dollars.0 / start_value.0
    } else {
        0.0
    };

    let mut warnings = Vec::new();

    let real_return = match endpoints(cpi_series) {
        Some((cpi_start, cpi_end)) if cpi_start != 0.0 => {
            let cpi_ratio = cpi_end / cpi_start;
            let real_end = end_value.0 / cpi_ratio;
            Some((real_end - start_value.0) / start_value.0)
        }
        _ => {
            warnings.push("cpi series missing or has fewer than two points; real_return omitted".to_string());
            None
        }
    };

    let purchasing_power_lost = real_return.map(|real| {
        let real_dollars = real * start_value.0;
        Cash(nominal_dollars.0 - real_dollars)
    });

    let (alpha, alpha_dollars) = match endpoints(benchmark_series) {
        Some((bench_start, bench_end)) if bench_start != 0.0 => {
            let benchmark_return = (bench_end - bench_start) / bench_start;
            let alpha = nominal_return - benchmark_return;
            (Some(alpha), Some(Cash(alpha * start_value.0)))
        }
        _ => {
            warnings.push("benchmark series missing or has fewer than two points; alpha omitted".to_string());
            (None, None)
        }
    };

    ReturnAdjustment {
        nominal_return,
        nominal_dollars,
        real_return,
        purchasing_power_lost,
        alpha,
        alpha_dollars,
        warning: if warnings.is_empty() { None } else { Some(warnings.join("; ")) },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nominal_return_with_no_cpi_or_benchmark_carries_a_warning() {
        let out = adjust(Cash(1000.0), Cash(1100.0), &[], &[]);
        assert!((out.nominal_return - 0.10).abs() < 1e-9);
        assert!(out.real_return.is_none());
        assert!(out.alpha.is_none());
        assert!(out.warning.is_some());
    }

    #[test]
    fn real_return_discounts_by_cpi_ratio() {
        let out = adjust(Cash(1000.0), Cash(1100.0), &[100.0, 110.0], &[]);
        let real = out.real_return.unwrap();
        // end_value deflated by 1.10 = 1000.0 -> flat real return
        assert!(real.abs() < 1e-9);
    }

    #[test]
    fn alpha_is_nominal_minus_benchmark_return() {
        let out = adjust(Cash(1000.0), Cash(1200.0), &[], &[1000.0, 1100.0]);
        assert!((out.alpha.unwrap() - 0.10).abs() < 1e-9);
    }

    #[test]
    fn single_point_series_are_treated_as_missing() {
        let out = adjust(Cash(1000.0), Cash(1100.0), &[100.0], &[1000.0]);
        assert!(out.real_return.is_none());
        assert!(out.alpha.is_none());
    }
}
