//! Parquet chain loader.
//!
//! Loads option chain snapshots from parquet files with one row per
//! contract (separate rows for calls and puts):
//! - trade_date, expir_date, strike, option_type
//! - stock_price, bid, ask, open_interest, mid_iv
//!
//! Dates may be stored as `YYYY-MM-DD` strings or as polars `Date`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use polars::prelude::*;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::info;

use crate::error::{EngineError, EngineResult};

use super::calendar::is_trading_day;
use super::types::{OptionQuote, OptionType, OptionsChain, OptionsSnapshot, TermStructure};

/// Expected columns in the parquet files.
pub const EXPECTED_COLUMNS: &[&str] = &[
    "trade_date",
    "expir_date",
    "strike",
    "option_type",
    "stock_price",
    "bid",
    "ask",
    "open_interest",
    "mid_iv",
];

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Parquet loader for a single chain file.
pub struct ChainLoader {
    path: PathBuf,
}

impl ChainLoader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Scan the file lazily.
    pub fn load_lazy(&self) -> Result<LazyFrame, LoaderError> {
        if !self.path.exists() {
            return Err(LoaderError::FileNotFound(self.path.display().to_string()));
        }
        let lf = LazyFrame::scan_parquet(&self.path, ScanArgsParquet::default())?;
        Ok(lf)
    }

    pub fn load_dataframe(&self) -> Result<DataFrame, LoaderError> {
        let df = self.load_lazy()?.collect()?;
        for name in EXPECTED_COLUMNS {
            if df.column(name).is_err() {
                return Err(LoaderError::InvalidData(format!(
                    "missing column '{}' in {}",
                    name,
                    self.path.display()
                )));
            }
        }
        Ok(df)
    }

    /// Get unique trade dates, sorted.
    pub fn trading_dates(&self, df: &DataFrame) -> Result<Vec<NaiveDate>, LoaderError> {
        let mut dates: Vec<NaiveDate> = date_values(df, "trade_date")?
            .into_iter()
            .flatten()
            .collect();
        dates.sort();
        dates.dedup();
        Ok(dates)
    }

    /// Load the snapshot for `date`, or for the latest trade date in the
    /// file when `date` is `None`.
    pub fn load_snapshot(
        &self,
        ticker: &str,
        date: Option<NaiveDate>,
    ) -> Result<OptionsSnapshot, LoaderError> {
        let df = self.load_dataframe()?;
        let dates = self.trading_dates(&df)?;
        let date = match date {
            Some(d) => d,
            None => *dates.last().ok_or_else(|| {
                LoaderError::InvalidData(format!("no trade dates in {}", self.path.display()))
            })?,
        };
        if !dates.contains(&date) {
            return Err(LoaderError::InvalidData(format!(
                "No data for {} on {}",
                ticker, date
            )));
        }

        let mask: BooleanChunked = date_values(&df, "trade_date")?
            .into_iter()
            .map(|d| d == Some(date))
            .collect();
        let day_df = df.filter(&mask)?;

        let snapshot = dataframe_to_snapshot(&day_df, ticker, date)?;
        info!(
            ticker,
            %date,
            expiries = snapshot.chains.len(),
            quotes = snapshot.total_quotes(),
            "loaded chain snapshot"
        );
        Ok(snapshot)
    }
}

/// Convert days since Unix epoch to NaiveDate.
fn date_from_days(days: i32) -> NaiveDate {
    NaiveDate::from_num_days_from_ce_opt(days + 719163).unwrap_or_default()
}

/// Read a date column stored either as strings or as polars dates.
fn date_values(df: &DataFrame, name: &str) -> Result<Vec<Option<NaiveDate>>, LoaderError> {
    let column = df.column(name)?;
    if let Ok(str_col) = column.str() {
        Ok(str_col
            .into_iter()
            .map(|s| s.and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()))
            .collect())
    } else if let Ok(date_col) = column.date() {
        Ok(date_col
            .into_iter()
            .map(|d| d.map(date_from_days))
            .collect())
    } else {
        Err(LoaderError::InvalidData(format!(
            "{} column has unexpected type",
            name
        )))
    }
}

fn f64_values(df: &DataFrame, name: &str) -> Result<Float64Chunked, LoaderError> {
    let column = df.column(name)?.cast(&DataType::Float64)?;
    Ok(column.f64()?.clone())
}

fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64_retain(value)
        .map(|d| d.round_dp(4))
        .unwrap_or_default()
}

/// Convert a single-day DataFrame to an OptionsSnapshot.
fn dataframe_to_snapshot(
    df: &DataFrame,
    ticker: &str,
    date: NaiveDate,
) -> Result<OptionsSnapshot, LoaderError> {
    let expirations = date_values(df, "expir_date")?;
    let strikes = f64_values(df, "strike")?;
    let stock_prices = f64_values(df, "stock_price")?;
    let bids = f64_values(df, "bid")?;
    let asks = f64_values(df, "ask")?;
    let ivs = f64_values(df, "mid_iv")?;
    let oi_col = df.column("open_interest")?.cast(&DataType::Int64)?;
    let open_interest = oi_col.i64()?;
    let opt_type_col = df.column("option_type")?;
    let option_types = opt_type_col.str()?;

    let stock_price = stock_prices.get(0).ok_or_else(|| {
        LoaderError::InvalidData(format!("no stock_price for {} on {}", ticker, date))
    })?;
    let mut snapshot = OptionsSnapshot::new(date, ticker.to_string(), to_decimal(stock_price));

    let mut chains_map: HashMap<NaiveDate, OptionsChain> = HashMap::new();

    for idx in 0..df.height() {
        let expiration = expirations[idx].ok_or_else(|| {
            LoaderError::InvalidData(format!("row {}: missing or malformed expir_date", idx))
        })?;
        let option_type = option_types
            .get(idx)
            .and_then(OptionType::from_str)
            .ok_or_else(|| {
                LoaderError::InvalidData(format!("row {}: unknown option_type", idx))
            })?;
        let strike = strikes
            .get(idx)
            .ok_or_else(|| LoaderError::InvalidData(format!("row {}: missing strike", idx)))?;

        let bid = bids.get(idx).unwrap_or(0.0);
        let ask = asks.get(idx).unwrap_or(0.0);
        let oi = open_interest.get(idx).unwrap_or(0);
        let mid_iv = ivs.get(idx).unwrap_or(0.0);

        let dte = (expiration - date).num_days() as i32;
        let chain = chains_map
            .entry(expiration)
            .or_insert_with(|| OptionsChain::new(expiration, dte));

        chain.add_quote(OptionQuote::new(
            expiration,
            to_decimal(strike),
            option_type,
            to_decimal(bid),
            to_decimal(ask),
            oi,
            mid_iv,
        ));
    }

    let mut chains: Vec<_> = chains_map.into_values().collect();
    chains.sort_by_key(|c| c.expiration);
    snapshot.chains = chains;

    Ok(snapshot)
}

/// Pick front, back1 and back2 as the first three expiries strictly after
/// the event date.
pub fn select_term_structure(
    snapshot: &OptionsSnapshot,
    event_date: NaiveDate,
    valuation_date: NaiveDate,
) -> EngineResult<TermStructure> {
    let post_event: Vec<&OptionsChain> = snapshot
        .chains_after(event_date)
        .into_iter()
        .filter(|c| !c.is_empty() && is_trading_day(c.expiration))
        .collect();

    if post_event.len() < 2 {
        return Err(EngineError::data(format!(
            "need at least two expiries after {}, found {}",
            event_date,
            post_event.len()
        )));
    }

    Ok(TermStructure::new(
        valuation_date,
        post_event[0].clone(),
        post_event[1].clone(),
        post_event.get(2).map(|c| (*c).clone()),
    ))
}
