use thiserror::Error;

pub type SynthDivResult<T> = Result<T, SynthDivError>;

#[derive(Debug, Error)]
pub enum SynthDivError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Algo(#[from] AlgoError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors from the price-provider registry and its built-in providers.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("no provider registered for ticker '{0}'")]
    NoProviderRegistered(String),

    #[error("invalid date range: start {start} is after end {end}")]
    InvalidDateRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    #[error("invalid mock ticker pattern: '{0}'")]
    InvalidMockPattern(String),

    #[error("bars for ticker '{ticker}' are not strictly date-ascending or contain a duplicate date at {date}")]
    UnorderedBars {
        ticker: String,
        date: chrono::NaiveDate,
    },

    #[error("bar for '{ticker}' on {date} has invalid OHLC (open={open}, high={high}, low={low}, close={close})")]
    InvalidBar {
        ticker: String,
        date: chrono::NaiveDate,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    },
}

/// Errors from the dual-format cache and its file locking.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("io error accessing cache at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode cached data at {path}: {message}")]
    Decode { path: String, message: String },

    #[error("could not acquire lock on {path:?} after {seconds}s")]
    LockTimeout { path: std::path::PathBuf, seconds: f64 },
}

/// Errors from the transaction/holding ledger and portfolio/account layer.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("cannot sell {requested:?} shares of '{ticker}': only {held:?} held")]
    InsufficientShares {
        ticker: String,
        requested: crate::domain::Shares,
        held: crate::domain::Shares,
    },

    #[error("no price available for ticker '{0}'")]
    PriceMissing(String),

    #[error("ticker '{0}' already exists in the portfolio")]
    DuplicateTicker(String),

    #[error("ticker '{0}' not found in the portfolio")]
    UnknownTicker(String),

    #[error("amount must be positive, got {0:?}")]
    NonPositiveAmount(crate::domain::Cash),
}

/// Errors from algorithm construction and evaluation.
#[derive(Debug, Error)]
pub enum AlgoError {
    #[error("unrecognized algorithm identifier: '{0}'")]
    UnknownAlgorithm(String),

    #[error("rebalance_size must lie in (0, 1), got {0}")]
    InvalidRebalanceSize(f64),

    #[error("profit_sharing must lie in (-0.25, 2.0), got {0}")]
    InvalidProfitSharing(f64),
}

/// Errors from backtest configuration (allocations, withdrawal cadence, ...).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("allocation weights must sum to 1.0 (±1%), got {0}")]
    AllocationSumInvalid(f64),

    #[error("empty price series supplied for backtest")]
    EmptyPriceSeries,

    #[error("start_date {start} is after end_date {end}")]
    InvalidDateRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },
}
