//! Quote Sources
//!
//! Abstractions and implementations for daily price history providers.

mod mock;
mod yahoo;

pub use mock::MockQuoteSource;
pub use yahoo::{YahooChartClient, YahooConfig};

use async_trait::async_trait;

use crate::error::Result;
use crate::model::PriceBar;

/// Daily price history provider (Strategy pattern)
///
/// Implement this for each upstream: Yahoo Finance, CoinGecko, etc.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Daily bars for `symbol` over `range` (e.g. "10d"), oldest first
    async fn daily_history(&self, symbol: &str, range: &str) -> Result<Vec<PriceBar>>;

    /// Check if the upstream is reachable
    async fn health_check(&self) -> bool;

    /// Source name
    fn name(&self) -> &str;
}

/// The most recent `window` bars for a symbol; upstream errors are returned
pub async fn recent_history(
    source: &dyn QuoteSource,
    symbol: &str,
    range: &str,
    window: usize,
) -> Result<Vec<PriceBar>> {
    let mut bars = source.daily_history(symbol, range).await?;
    let excess = bars.len().saturating_sub(window);
    bars.drain(..excess);
    Ok(bars)
}

/// Fetch the most recent `window` bars for a symbol.
///
/// A single guarded call: any error is logged and yields an empty set so the
/// caller can report the symbol as having insufficient data.
pub async fn fetch_recent_bars(
    source: &dyn QuoteSource,
    symbol: &str,
    range: &str,
    window: usize,
) -> Vec<PriceBar> {
    tracing::info!(symbol, range, source = source.name(), "Fetching price history");

    match recent_history(source, symbol, range, window).await {
        Ok(bars) => {
            if bars.is_empty() {
                tracing::warn!(symbol, "No data returned");
            }
            bars
        }
        Err(e) => {
            tracing::error!(symbol, error = %e, retryable = e.is_retryable(), "Error fetching data");
            Vec::new()
        }
    }
}

/// Number of days in a range string such as `"10d"`, `"1wk"`, `"3mo"` or `"1y"`
pub fn parse_range_days(range: &str) -> Option<u32> {
    let range = range.trim().to_lowercase();
    let split = range.find(|c: char| !c.is_ascii_digit())?;
    let (count, unit) = range.split_at(split);
    let count: u32 = count.parse().ok()?;

    let days_per_unit = match unit {
        "d" => 1,
        "wk" | "w" => 7,
        "mo" => 30,
        "y" => 365,
        _ => return None,
    };
    count.checked_mul(days_per_unit)
}
