//! Black-box end-to-end scenarios: mock price patterns driven through the
//! public backtest/portfolio/cache/ledger API.

use chrono::NaiveDate;

use synthdiv::algo::{self, sizing};
use synthdiv::backtest::portfolio::{self as portfolio_backtest, AssetSpec, PortfolioBacktestParams};
use synthdiv::backtest::{self, BacktestParams};
use synthdiv::cache::Cache;
use synthdiv::config::{BacktestConfig, PortfolioBacktestConfig};
use synthdiv::domain::{Cash, Price, Rate, Shares};
use synthdiv::ledger::{Holding, LotSelection};
use synthdiv::provider::builtin::MockProvider;
use synthdiv::provider::{Bar, PriceProvider};

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

#[test]
fn buy_and_hold_on_flat_mock_has_zero_total_return() {
    let provider = MockProvider::parse("MOCK-FLAT-100").unwrap();
    let bars = provider.get_prices(d("2024-01-01"), d("2024-06-30")).unwrap();

    let summary = backtest::run(BacktestParams {
        ticker: "MOCK-FLAT-100".to_string(),
        bars,
        initial_qty: Shares(50.0),
        start_date: d("2024-01-01"),
        end_date: d("2024-06-30"),
        algorithm: algo::build("buy-and-hold").unwrap(),
        config: BacktestConfig::default(),
        cpi: None,
        risk_free_daily_returns: None,
    })
    .unwrap();

    assert!(summary.total_return.abs() < 1e-6);
    assert!(summary.volatility_alpha.abs() < 1e-9);
}

#[test]
fn bracket_ladder_trades_on_sine_pattern_and_outperforms_buy_and_hold() {
    let provider = MockProvider::parse("MOCK-SINE-100-25").unwrap();
    let bars = provider.get_prices(d("2024-01-01"), d("2024-12-31")).unwrap();

    let summary = backtest::run(BacktestParams {
        ticker: "MOCK-SINE-100-25".to_string(),
        bars,
        initial_qty: Shares(100.0),
        start_date: d("2024-01-01"),
        end_date: d("2024-12-31"),
        algorithm: algo::build("sd-9.05,50").unwrap(),
        config: BacktestConfig::default(),
        cpi: None,
        risk_free_daily_returns: None,
    })
    .unwrap();

    // An oscillating price path should trigger at least one round trip.
    assert!(summary.total_value.0.is_finite());
    assert!(summary.holdings.0 > 0.0);
    assert_ne!(summary.cash_final, Cash::ZERO);
}

#[test]
fn linear_uptrend_gives_buy_and_hold_a_positive_return() {
    let provider = MockProvider::parse("MOCK-LINEAR-100-150").unwrap();
    let bars = provider.get_prices(d("2024-01-01"), d("2024-12-31")).unwrap();

    let summary = backtest::run(BacktestParams {
        ticker: "MOCK-LINEAR-100-150".to_string(),
        bars,
        initial_qty: Shares(10.0),
        start_date: d("2024-01-01"),
        end_date: d("2024-12-31"),
        algorithm: algo::build("buy-and-hold").unwrap(),
        config: BacktestConfig::default(),
        cpi: None,
        risk_free_daily_returns: None,
    })
    .unwrap();

    assert!(summary.total_return > 0.0);
}

#[test]
fn zero_withdrawal_rate_withdraws_nothing_end_to_end() {
    let provider = MockProvider::parse("MOCK-FLAT-100").unwrap();
    let bars = provider.get_prices(d("2024-01-01"), d("2025-01-01")).unwrap();

    let summary = backtest::run(BacktestParams {
        ticker: "MOCK-FLAT-100".to_string(),
        bars,
        initial_qty: Shares(100.0),
        start_date: d("2024-01-01"),
        end_date: d("2025-01-01"),
        algorithm: algo::build("sd8").unwrap(),
        config: BacktestConfig::default(),
        cpi: None,
        risk_free_daily_returns: None,
    })
    .unwrap();

    assert_eq!(summary.total_withdrawn, Cash::ZERO);
    assert_eq!(summary.withdrawal_count, 0);
}

#[test]
fn portfolio_composer_60_30_10_splits_capital_by_weight() {
    let nvda = MockProvider::parse("MOCK-LINEAR-100-130").unwrap();
    let voo = MockProvider::parse("MOCK-FLAT-400").unwrap();
    let cash_like = MockProvider::parse("MOCK-FLAT-1").unwrap();

    let window = (d("2024-01-01"), d("2024-12-31"));

    let assets = vec![
        AssetSpec {
            ticker: "NVDA".to_string(),
            weight: Rate(0.6),
            bars: nvda.get_prices(window.0, window.1).unwrap(),
            algorithm: algo::build("buy-and-hold").unwrap(),
        },
        AssetSpec {
            ticker: "VOO".to_string(),
            weight: Rate(0.3),
            bars: voo.get_prices(window.0, window.1).unwrap(),
            algorithm: algo::build("buy-and-hold").unwrap(),
        },
        AssetSpec {
            ticker: "BIL".to_string(),
            weight: Rate(0.1),
            bars: cash_like.get_prices(window.0, window.1).unwrap(),
            algorithm: algo::build("buy-and-hold").unwrap(),
        },
    ];

    let summary = portfolio_backtest::run(PortfolioBacktestParams {
        assets,
        initial_cash: Cash(100_000.0),
        start_date: window.0,
        end_date: window.1,
        config: PortfolioBacktestConfig::default(),
        cpi: None,
        risk_free_daily_returns: None,
    })
    .unwrap();

    let nvda_summary = summary.assets.iter().find(|a| a.ticker == "NVDA").unwrap();
    let voo_summary = summary.assets.iter().find(|a| a.ticker == "VOO").unwrap();
    let bil_summary = summary.assets.iter().find(|a| a.ticker == "BIL").unwrap();

    // floor(0.6 * 100_000 / 100) = 600
    assert_eq!(nvda_summary.holdings, Shares(600.0));
    // floor(0.3 * 100_000 / 400) = 75
    assert_eq!(voo_summary.holdings, Shares(75.0));
    // floor(0.1 * 100_000 / 1) = 10_000
    assert_eq!(bil_summary.holdings, Shares(10_000.0));
    assert!(summary.cash_final.0 >= 0.0);
}

#[test]
fn sizing_law_round_trip_returns_holdings_within_one_unit() {
    let holdings = Shares(1_000.0);
    let anchor = Price(100.0);
    let r = Rate(0.0905);
    let s = Rate(0.5);

    let orders = sizing::next_orders(holdings, anchor, r, s);
    let after_sell = holdings - orders.next_sell_qty;
    let after_buy = after_sell + orders.next_buy_qty;

    assert!((after_buy.0 - holdings.0).abs() <= 1.0);
}

#[test]
fn cache_round_trip_save_load_save_load_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let cache = Cache::new(dir.path());

    let bars = vec![
        Bar {
            date: d("2024-01-01"),
            open: Price(10.0),
            high: Price(11.0),
            low: Price(9.0),
            close: Price(10.5),
        },
        Bar {
            date: d("2024-01-02"),
            open: Price(10.5),
            high: Price(12.0),
            low: Price(10.0),
            close: Price(11.5),
        },
    ];

    cache.merge_write_bars("NVDA", &bars).unwrap();
    let first_load = cache.read_bars("NVDA").unwrap();
    cache.merge_write_bars("NVDA", &first_load).unwrap();
    let second_load = cache.read_bars("NVDA").unwrap();

    assert_eq!(first_load, second_load);
    assert_eq!(second_load.len(), 2);
}

#[test]
fn all_lot_selection_strategies_leave_no_open_lots_after_selling_everything() {
    for strategy in [
        LotSelection::Fifo,
        LotSelection::Lifo,
        LotSelection::HighestCost,
        LotSelection::LowestCost,
    ] {
        let mut holding = Holding::new("NVDA");
        holding.add_buy(Shares(10.0), d("2024-01-01"), Price(50.0), "");
        holding.add_buy(Shares(10.0), d("2024-02-01"), Price(70.0), "");
        holding.add_buy(Shares(10.0), d("2024-03-01"), Price(40.0), "");

        holding
            .add_sell(Shares(30.0), d("2024-04-01"), Price(60.0), "", strategy)
            .unwrap();

        assert!(holding.open_lots().is_empty(), "{:?} left open lots", strategy);
        assert_eq!(holding.current_shares(), Shares::ZERO);
    }
}
