//! Single-ticker daily backtest driver (C6): advances one bar at a time
//! through interest accrual, withdrawal, the algorithm hook, and a
//! mark-to-market snapshot, in that fixed order.

pub mod portfolio;

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::algo::{Algorithm, OrderKind};
use crate::config::BacktestConfig;
use crate::domain::{Cash, Price, Shares};
use crate::error::{ConfigError, SynthDivResult};
use crate::ledger::{Holding, LotSelection};
use crate::provider::Bar;
use crate::withdrawal::WithdrawalSchedule;

/// The buy-and-hold reference result the driver computes automatically for
/// `volatility_alpha`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BuyAndHoldTotals {
    pub end_value: Cash,
    pub total_return: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSummary {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_price: Price,
    pub end_price: Price,
    pub holdings: Shares,
    pub cash_final: Cash,
    pub cash_min: Cash,
    pub cash_max: Cash,
    pub cash_avg: Cash,
    pub days_negative_cash: u32,
    pub days_positive_cash: u32,
    pub total_value: Cash,
    pub total_withdrawn: Cash,
    pub withdrawal_count: u32,
    pub total_return: f64,
    pub annualized_return: f64,
    pub volatility_alpha: f64,
    pub baseline: BuyAndHoldTotals,
}

impl BacktestSummary {
    fn empty(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
            start_price: Price(0.0),
            end_price: Price(0.0),
            holdings: Shares::ZERO,
            cash_final: Cash::ZERO,
            cash_min: Cash::ZERO,
            cash_max: Cash::ZERO,
            cash_avg: Cash::ZERO,
            days_negative_cash: 0,
            days_positive_cash: 0,
            total_value: Cash::ZERO,
            total_withdrawn: Cash::ZERO,
            withdrawal_count: 0,
            total_return: 0.0,
            annualized_return: 0.0,
            volatility_alpha: 0.0,
            baseline: BuyAndHoldTotals {
                end_value: Cash::ZERO,
                total_return: 0.0,
            },
        }
    }
}

/// Inputs to [`run`]. `risk_free_daily_returns`, when supplied, is a
/// date-keyed table of pre-computed daily returns; a day absent from it
/// accrues zero interest (data-gap tier 2 behavior). With no table at all,
/// every day uses `config.flat_risk_free_rate`.
pub struct BacktestParams {
    pub ticker: String,
    pub bars: Vec<Bar>,
    pub initial_qty: Shares,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub algorithm: Box<dyn Algorithm>,
    pub config: BacktestConfig,
    pub cpi: Option<BTreeMap<NaiveDate, f64>>,
    pub risk_free_daily_returns: Option<BTreeMap<NaiveDate, f64>>,
}

#[tracing::instrument(skip(params), fields(ticker = %params.ticker, start = %params.start_date, end = %params.end_date))]
pub fn run(params: BacktestParams) -> SynthDivResult<BacktestSummary> {
    let BacktestParams {
        ticker,
        bars,
        initial_qty,
        start_date,
        end_date,
        mut algorithm,
        config,
        cpi,
        risk_free_daily_returns,
    } = params;

    if start_date > end_date {
        return Err(ConfigError::InvalidDateRange {
            start: start_date,
            end: end_date,
        }
        .into());
    }

    let window: Vec<Bar> = bars
        .into_iter()
        .filter(|b| b.date >= start_date && b.date <= end_date)
        .collect();

    if window.is_empty() {
        return Ok(BacktestSummary::empty(start_date, end_date));
    }

    let mut holding = Holding::new(ticker);
    let mut cash = Cash::ZERO;
    let first_bar = window[0];
    let last_index = window.len() - 1;

    holding.add_buy(initial_qty, first_bar.date, first_bar.open, "initial buy");
    algorithm.on_new_holdings(holding.current_shares(), first_bar.open);

    let initial_value = initial_qty.value_at(first_bar.open);
    let mut withdrawal_schedule = (config.withdrawal_rate > 0.0).then(|| {
        WithdrawalSchedule::new(config.withdrawal_cadence, config.withdrawal_rate, initial_value, start_date)
    });

    let mut total_withdrawn = Cash::ZERO;
    let mut withdrawal_count = 0u32;
    let mut cash_samples: Vec<Cash> = Vec::with_capacity(window.len());
    let mut days_negative = 0u32;
    let mut days_positive = 0u32;
    let mut history: Vec<Bar> = Vec::with_capacity(window.len());

    for (i, bar) in window.iter().enumerate() {
        if !config.simple_mode {
            let rf = risk_free_daily_returns
                .as_ref()
                .and_then(|m| m.get(&bar.date).copied())
                .unwrap_or(config.flat_risk_free_rate);
            cash = cash + Cash(cash.0 * rf);
        }

        if let Some(sched) = withdrawal_schedule.as_mut() {
            if sched.is_due(bar.date) {
                let amount = sched.amount(bar.date, cpi.as_ref());
                cash = cash - amount;
                total_withdrawn = total_withdrawn + amount;
                withdrawal_count += 1;
                sched.record(bar.date);
            }
        }

        if i > 0 {
            if let Some(order) = algorithm.on_day(bar.date, *bar, holding.current_shares(), cash, &history) {
                match order.kind {
                    OrderKind::Buy => {
                        let cost = order.shares.value_at(order.fill_price);
                        holding.add_buy(order.shares, bar.date, order.fill_price, order.note);
                        cash = cash - cost;
                    }
                    OrderKind::Sell => {
                        holding.add_sell(order.shares, bar.date, order.fill_price, order.note, LotSelection::Fifo)?;
                        cash = cash + order.shares.value_at(order.fill_price);
                    }
                }
            }
        }

        cash_samples.push(cash);
        if cash.0 < 0.0 {
            days_negative += 1;
        } else if cash.0 > 0.0 {
            days_positive += 1;
        }

        history.push(*bar);

        if i == last_index {
            algorithm.on_end_holding();
        }
    }

    let last_bar = window[last_index];
    let end_price = last_bar.close;
    let holdings = holding.current_shares();
    let total_value = holdings.value_at(end_price) + cash;

    let cash_min = cash_samples.iter().copied().fold(Cash(f64::INFINITY), |a, b| if b.0 < a.0 { b } else { a });
    let cash_max = cash_samples
        .iter()
        .copied()
        .fold(Cash(f64::NEG_INFINITY), |a, b| if b.0 > a.0 { b } else { a });
    let cash_avg = Cash(cash_samples.iter().map(|c| c.0).sum::<f64>() / cash_samples.len() as f64);

    let total_return = if initial_value.0 != 0.0 {
        (total_value.0 - initial_value.0) / initial_value.0
    } else {
        0.0
    };
    let years = (last_bar.date - first_bar.date).num_days() as f64 / 365.25;
    let annualized_return = if years > 0.0 {
        (1.0 + total_return).powf(1.0 / years) - 1.0
    } else {
        total_return
    };

    let baseline_end_value = initial_qty.value_at(end_price);
    let baseline_total_return = if initial_value.0 != 0.0 {
        (baseline_end_value.0 - initial_value.0) / initial_value.0
    } else {
        0.0
    };
    let volatility_alpha = total_return - baseline_total_return;

    Ok(BacktestSummary {
        start_date: first_bar.date,
        end_date: last_bar.date,
        start_price: first_bar.open,
        end_price,
        holdings,
        cash_final: cash,
        cash_min,
        cash_max,
        cash_avg,
        days_negative_cash: days_negative,
        days_positive_cash: days_positive,
        total_value,
        total_withdrawn,
        withdrawal_count,
        total_return,
        annualized_return,
        volatility_alpha,
        baseline: BuyAndHoldTotals {
            end_value: baseline_end_value,
            total_return: baseline_total_return,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::BuyAndHold;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn flat_bars(start: &str, days: i64, price: f64) -> Vec<Bar> {
        let start = d(start);
        (0..days)
            .map(|n| Bar {
                date: start + chrono::Duration::days(n),
                open: Price(price),
                high: Price(price),
                low: Price(price),
                close: Price(price),
            })
            .collect()
    }

    #[test]
    fn empty_price_series_yields_zeroed_summary_without_error() {
        let summary = run(BacktestParams {
            ticker: "NVDA".to_string(),
            bars: vec![],
            initial_qty: Shares(10.0),
            start_date: d("2024-01-01"),
            end_date: d("2024-12-31"),
            algorithm: Box::new(BuyAndHold),
            config: BacktestConfig::default(),
            cpi: None,
            risk_free_daily_returns: None,
        })
        .unwrap();
        assert_eq!(summary.holdings, Shares::ZERO);
        assert_eq!(summary.withdrawal_count, 0);
    }

    #[test]
    fn single_day_window_produces_one_snapshot_and_initial_buy_only() {
        let bars = flat_bars("2024-01-01", 1, 100.0);
        let summary = run(BacktestParams {
            ticker: "NVDA".to_string(),
            bars,
            initial_qty: Shares(10.0),
            start_date: d("2024-01-01"),
            end_date: d("2024-01-01"),
            algorithm: Box::new(BuyAndHold),
            config: BacktestConfig::default(),
            cpi: None,
            risk_free_daily_returns: None,
        })
        .unwrap();
        assert_eq!(summary.holdings, Shares(10.0));
        assert_eq!(summary.start_date, summary.end_date);
    }

    #[test]
    fn zero_withdrawal_rate_withdraws_nothing() {
        let bars = flat_bars("2024-01-01", 400, 100.0);
        let summary = run(BacktestParams {
            ticker: "NVDA".to_string(),
            bars,
            initial_qty: Shares(10.0),
            start_date: d("2024-01-01"),
            end_date: d("2025-01-01"),
            algorithm: Box::new(BuyAndHold),
            config: BacktestConfig::default(),
            cpi: None,
            risk_free_daily_returns: None,
        })
        .unwrap();
        assert_eq!(summary.total_withdrawn, Cash::ZERO);
        assert_eq!(summary.withdrawal_count, 0);
    }

    #[test]
    fn simple_mode_disables_interest_accrual() {
        let bars = flat_bars("2024-01-01", 30, 100.0);
        let mut config = BacktestConfig::default();
        config.simple_mode = true;
        config.flat_risk_free_rate = 0.01;
        let summary = run(BacktestParams {
            ticker: "NVDA".to_string(),
            bars,
            initial_qty: Shares(10.0),
            start_date: d("2024-01-01"),
            end_date: d("2024-01-30"),
            algorithm: Box::new(BuyAndHold),
            config,
            cpi: None,
            risk_free_daily_returns: None,
        })
        .unwrap();
        assert_eq!(summary.cash_final, Cash::ZERO);
    }

    #[test]
    fn buy_and_hold_has_zero_volatility_alpha_against_itself() {
        let bars = flat_bars("2024-01-01", 30, 100.0);
        let summary = run(BacktestParams {
            ticker: "NVDA".to_string(),
            bars,
            initial_qty: Shares(10.0),
            start_date: d("2024-01-01"),
            end_date: d("2024-01-30"),
            algorithm: Box::new(BuyAndHold),
            config: BacktestConfig::default(),
            cpi: None,
            risk_free_daily_returns: None,
        })
        .unwrap();
        assert!((summary.volatility_alpha).abs() < 1e-9);
    }
}
