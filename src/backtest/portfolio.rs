//! Multi-asset portfolio backtest composer (C7): a single shared cash
//! account funds every asset's algorithm, evaluated under a fixed
//! SELL-pass-then-BUY-pass ordering across assets each day.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::algo::{Algorithm, OrderKind};
use crate::config::PortfolioBacktestConfig;
use crate::domain::{Cash, Price, Rate, Shares};
use crate::error::{ConfigError, SynthDivResult};
use crate::ledger::{Holding, LotSelection};
use crate::provider::Bar;
use crate::withdrawal::WithdrawalSchedule;

pub struct AssetSpec {
    pub ticker: String,
    pub weight: Rate,
    pub bars: Vec<Bar>,
    pub algorithm: Box<dyn Algorithm>,
}

pub struct PortfolioBacktestParams {
    pub assets: Vec<AssetSpec>,
    pub initial_cash: Cash,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub config: PortfolioBacktestConfig,
    pub cpi: Option<BTreeMap<NaiveDate, f64>>,
    pub risk_free_daily_returns: Option<BTreeMap<NaiveDate, f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetSummary {
    pub ticker: String,
    pub holdings: Shares,
    pub end_price: Price,
    pub value: Cash,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioBacktestSummary {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub assets: Vec<AssetSummary>,
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
}

impl PortfolioBacktestSummary {
    fn empty(start_date: NaiveDate, end_date: NaiveDate, tickers: &[String]) -> Self {
        Self {
            start_date,
            end_date,
            assets: tickers
                .iter()
                .map(|t| AssetSummary {
                    ticker: t.clone(),
                    holdings: Shares::ZERO,
                    end_price: Price(0.0),
                    value: Cash::ZERO,
                })
                .collect(),
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
        }
    }
}

struct AssetState {
    ticker: String,
    weight: Rate,
    bars: BTreeMap<NaiveDate, Bar>,
    algorithm: Box<dyn Algorithm>,
    holding: Holding,
    history: Vec<Bar>,
}

#[tracing::instrument(
    skip(params),
    fields(assets = params.assets.len(), start = %params.start_date, end = %params.end_date)
)]
pub fn run(params: PortfolioBacktestParams) -> SynthDivResult<PortfolioBacktestSummary> {
    let PortfolioBacktestParams {
        assets,
        initial_cash,
        start_date,
        end_date,
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

    let weight_sum: f64 = assets.iter().map(|a| a.weight.0).sum();
    if (weight_sum - 1.0).abs() > 0.01 {
        return Err(ConfigError::AllocationSumInvalid(weight_sum).into());
    }

    let tickers: Vec<String> = assets.iter().map(|a| a.ticker.clone()).collect();

    let mut states: Vec<AssetState> = assets
        .into_iter()
        .map(|a| {
            let bars = a
                .bars
                .into_iter()
                .filter(|b| b.date >= start_date && b.date <= end_date)
                .map(|b| (b.date, b))
                .collect::<BTreeMap<_, _>>();
            AssetState {
                ticker: a.ticker.clone(),
                weight: a.weight,
                bars,
                algorithm: a.algorithm,
                holding: Holding::new(a.ticker),
                history: Vec::new(),
            }
        })
        .collect();

    let joint_days: Vec<NaiveDate> = {
        let mut iter = states.iter();
        let Some(first) = iter.next() else {
            return Ok(PortfolioBacktestSummary::empty(start_date, end_date, &tickers));
        };
        let mut days: BTreeSet<NaiveDate> = first.bars.keys().copied().collect();
        for s in iter {
            let other: BTreeSet<NaiveDate> = s.bars.keys().copied().collect();
            days = days.intersection(&other).copied().collect();
        }
        days.into_iter().collect()
    };

    if joint_days.is_empty() {
        return Ok(PortfolioBacktestSummary::empty(start_date, end_date, &tickers));
    }

    let first_day = joint_days[0];
    let last_day_idx = joint_days.len() - 1;

    let mut cash = initial_cash;
    for s in &mut states {
        let bar = s.bars[&first_day];
        let qty = Shares((s.weight.0 * initial_cash.0 / bar.open.0).floor().max(0.0));
        if qty.0 > 0.0 {
            s.holding.add_buy(qty, first_day, bar.open, "capital initialization");
            cash = cash - qty.value_at(bar.open);
        }
        s.algorithm.on_new_holdings(s.holding.current_shares(), bar.open);
    }

    let mut withdrawal_schedule = (config.withdrawal_rate > 0.0)
        .then(|| WithdrawalSchedule::new(config.withdrawal_cadence, config.withdrawal_rate, initial_cash, start_date));

    let mut total_withdrawn = Cash::ZERO;
    let mut withdrawal_count = 0u32;
    let mut cash_samples: Vec<Cash> = Vec::with_capacity(joint_days.len());
    let mut days_negative = 0u32;
    let mut days_positive = 0u32;

    for (i, day) in joint_days.iter().copied().enumerate() {
        if i > 0 {
            let mut orders: Vec<(usize, crate::algo::Order)> = Vec::new();
            for (idx, s) in states.iter_mut().enumerate() {
                let bar = s.bars[&day];
                if let Some(order) = s.algorithm.on_day(day, bar, s.holding.current_shares(), cash, &s.history) {
                    orders.push((idx, order));
                }
            }

            for (idx, order) in orders.iter().filter(|(_, o)| o.kind == OrderKind::Sell) {
                let s = &mut states[*idx];
                s.holding
                    .add_sell(order.shares, day, order.fill_price, order.note.clone(), LotSelection::Fifo)?;
                cash = cash + order.shares.value_at(order.fill_price);
            }

            for (idx, order) in orders.iter().filter(|(_, o)| o.kind == OrderKind::Buy) {
                let cost = order.shares.value_at(order.fill_price);
                if !config.allow_margin && (cash - cost).0 < 0.0 {
                    tracing::debug!(ticker = %states[*idx].ticker, "skipping buy: would drive shared cash negative");
                    continue;
                }
                let s = &mut states[*idx];
                s.holding.add_buy(order.shares, day, order.fill_price, order.note.clone());
                cash = cash - cost;
            }
        }

        if !config.simple_mode {
            let rf = risk_free_daily_returns
                .as_ref()
                .and_then(|m| m.get(&day).copied())
                .unwrap_or(config.flat_risk_free_rate);
            cash = cash + Cash(cash.0 * rf);
        }

        if let Some(sched) = withdrawal_schedule.as_mut() {
            if sched.is_due(day) {
                let amount = sched.amount(day, cpi.as_ref());
                cash = cash - amount;
                total_withdrawn = total_withdrawn + amount;
                withdrawal_count += 1;
                sched.record(day);
            }
        }

        cash_samples.push(cash);
        if cash.0 < 0.0 {
            days_negative += 1;
        } else if cash.0 > 0.0 {
            days_positive += 1;
        }

        for s in &mut states {
            s.history.push(s.bars[&day]);
        }

        if i == last_day_idx {
            for s in &mut states {
                s.algorithm.on_end_holding();
            }
        }
    }

    let last_day = joint_days[last_day_idx];
    let asset_summaries: Vec<AssetSummary> = states
        .iter()
        .map(|s| {
            let end_price = s.bars[&last_day].close;
            let holdings = s.holding.current_shares();
            AssetSummary {
                ticker: s.ticker.clone(),
                holdings,
                end_price,
                value: holdings.value_at(end_price),
            }
        })
        .collect();

    let assets_value = asset_summaries.iter().map(|a| a.value).fold(Cash::ZERO, |acc, v| acc + v);
    let total_value = assets_value + cash;

    let cash_min = cash_samples.iter().copied().fold(Cash(f64::INFINITY), |a, b| if b.0 < a.0 { b } else { a });
    let cash_max = cash_samples
        .iter()
        .copied()
        .fold(Cash(f64::NEG_INFINITY), |a, b| if b.0 > a.0 { b } else { a });
    let cash_avg = Cash(cash_samples.iter().map(|c| c.0).sum::<f64>() / cash_samples.len() as f64);

    let total_return = if initial_cash.0 != 0.0 {
        (total_value.0 - initial_cash.0) / initial_cash.0
    } else {
        0.0
    };

    Ok(PortfolioBacktestSummary {
        start_date: first_day,
        end_date: last_day,
        assets: asset_summaries,
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
    })
}
