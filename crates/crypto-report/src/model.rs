//! Domain Models
//!
//! Core data types for the daily report.
//! Uses `rust_decimal` for all monetary values - never use f64 for money!

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ReportError;

/// One daily bar as returned by the quote API
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    /// Calendar date (UTC) of the bar
    pub date: NaiveDate,

    pub open: Option<Decimal>,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,
    pub close: Option<Decimal>,

    /// Close adjusted for dividends/splits; bars without one are dropped
    pub adj_close: Decimal,

    pub volume: Option<u64>,
}

impl PriceBar {
    /// Bar where every price equals `price` (handy for mocks and tests)
    pub fn flat(date: NaiveDate, price: Decimal) -> Self {
        Self {
            date,
            open: Some(price),
            high: Some(price),
            low: Some(price),
            close: Some(price),
            adj_close: price,
            volume: None,
        }
    }
}

/// A bar plus the indicators computed over the window ending at it
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRow {
    #[serde(flatten)]
    pub bar: PriceBar,

    /// Short-window simple moving average, `None` until the window fills
    pub sma_short: Option<Decimal>,

    /// Long-window simple moving average, `None` until the window fills
    pub sma_long: Option<Decimal>,

    /// Percent change of the adjusted close vs. the previous bar
    pub daily_change_pct: Option<Decimal>,
}

/// Direction of the short SMA relative to the long SMA
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Upward,
    Downward,
    Neutral,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Trend::Upward => "Upward",
            Trend::Downward => "Downward",
            Trend::Neutral => "Neutral",
        };
        f.write_str(label)
    }
}

/// A single extrapolated price
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub date: NaiveDate,
    pub predicted_price: Decimal,
}

/// Everything the report says about one symbol
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssetAnalysis {
    pub symbol: String,

    /// Indicator rows, oldest first
    pub rows: Vec<IndicatorRow>,

    /// Latest adjusted close
    pub current_price: Decimal,

    /// Daily change of the latest bar
    pub daily_change_pct: Option<Decimal>,

    pub trend: Trend,

    pub predictions: Vec<Prediction>,
}

impl AssetAnalysis {
    /// The most recent indicator row
    pub fn latest(&self) -> Option<&IndicatorRow> {
        self.rows.last()
    }

    /// Last `n` rows, oldest first
    pub fn tail(&self, n: usize) -> &[IndicatorRow] {
        let start = self.rows.len().saturating_sub(n);
        &self.rows[start..]
    }
}

/// Output format of an archived report
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Pdf,
    Md,
}

impl ReportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ReportFormat::Pdf => "pdf",
            ReportFormat::Md => "md",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ReportFormat::Pdf => "application/pdf",
            ReportFormat::Md => "text/markdown; charset=utf-8",
        }
    }
}

impl FromStr for ReportFormat {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pdf" => Ok(ReportFormat::Pdf),
            "md" => Ok(ReportFormat::Md),
            other => Err(ReportError::InvalidFormat(other.to_string())),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Asset slug used in file names: `BTC-USD` -> `btc`
pub fn asset_slug(symbol: &str) -> String {
    let lower = symbol.to_lowercase();
    lower.strip_suffix("-usd").unwrap_or(&lower).to_string()
}
