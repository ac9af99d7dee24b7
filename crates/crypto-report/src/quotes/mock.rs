//! Mock Quote Source
//!
//! For testing and offline runs. Returns deterministic daily series.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::{parse_range_days, QuoteSource};
use crate::error::{ReportError, Result};
use crate::model::PriceBar;

/// Day-over-day moves (percent) cycled through by generated series
const DAILY_MOVES: [Decimal; 7] = [
    dec!(0.8),
    dec!(-0.5),
    dec!(1.2),
    dec!(-0.3),
    dec!(0.6),
    dec!(-0.9),
    dec!(0.4),
];

/// Longest generated history (ten years of daily bars)
const MAX_GENERATED_DAYS: u32 = 3650;

/// Mock quote source with static base prices
pub struct MockQuoteSource {
    /// Last date of generated series
    anchor: NaiveDate,

    /// Explicit series that override generated ones
    series: HashMap<String, Vec<PriceBar>>,
}

impl Default for MockQuoteSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockQuoteSource {
    pub fn new() -> Self {
        Self {
            anchor: Utc::now().date_naive(),
            series: HashMap::new(),
        }
    }

    /// Generated series end on `anchor` instead of today
    pub fn with_anchor(mut self, anchor: NaiveDate) -> Self {
        self.anchor = anchor;
        self
    }

    /// Serve exactly `bars` for `symbol`
    pub fn with_series(mut self, symbol: &str, bars: Vec<PriceBar>) -> Self {
        self.series.insert(symbol.to_uppercase(), bars);
        self
    }

    /// (base price, daily volume)
    fn base_quote(symbol: &str) -> Option<(Decimal, u64)> {
        match symbol {
            "BTC-USD" => Some((dec!(97500), 25_000_000_000)),
            "ETH-USD" => Some((dec!(3450), 15_000_000_000)),
            "SOL-USD" => Some((dec!(195), 3_000_000_000)),
            "ADA-USD" => Some((dec!(0.95), 600_000_000)),
            "XRP-USD" => Some((dec!(2.35), 2_000_000_000)),
            _ => None,
        }
    }

    fn generate(&self, base: Decimal, volume: u64, days: u32) -> Result<Vec<PriceBar>> {
        if days > MAX_GENERATED_DAYS {
            return Err(ReportError::Config(format!(
                "range of {days} days exceeds the {MAX_GENERATED_DAYS} day limit"
            )));
        }
        let days = i64::from(days.max(1));
        let mut price = base;
        let mut bars = Vec::with_capacity(usize::try_from(days).unwrap_or_default());

        for (i, offset) in (0..days).rev().enumerate() {
            let date = self
                .anchor
                .checked_sub_signed(Duration::days(offset))
                .ok_or_else(|| {
                    ReportError::Config(format!("date out of range: {offset} days before {}", self.anchor))
                })?;
            let open = price;
            let change = DAILY_MOVES[i % DAILY_MOVES.len()];
            price = (price * (Decimal::ONE + change / dec!(100))).round_dp(2);

            bars.push(PriceBar {
                date,
                open: Some(open),
                high: Some(open.max(price) * dec!(1.005)),
                low: Some(open.min(price) * dec!(0.995)),
                close: Some(price),
                adj_close: price,
                volume: Some(volume),
            });
        }

        Ok(bars)
    }
}

#[async_trait]
impl QuoteSource for MockQuoteSource {
    async fn daily_history(&self, symbol: &str, range: &str) -> Result<Vec<PriceBar>> {
        let symbol = symbol.to_uppercase();

        if let Some(bars) = self.series.get(&symbol) {
            return Ok(bars.clone());
        }

        let (base, volume) = Self::base_quote(&symbol)
            .ok_or_else(|| ReportError::UnsupportedAsset(symbol.clone()))?;
        let days = parse_range_days(range)
            .ok_or_else(|| ReportError::Config(format!("unsupported range '{range}'")))?;

        self.generate(base, volume, days)
    }

    async fn health_check(&self) -> bool {
        true // Mock always healthy
    }

    fn name(&self) -> &str {
        "MockQuotes"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_generated_series() {
        let anchor = NaiveDate::from_ymd_opt(2025, 5, 8).unwrap();
        let source = MockQuoteSource::new().with_anchor(anchor);

        let bars = source.daily_history("btc-usd", "10d").await.unwrap();
        assert_eq!(bars.len(), 10);
        assert_eq!(bars.last().unwrap().date, anchor);
        assert_eq!(bars[0].date, anchor - Duration::days(9));
        assert!(bars.iter().all(|b| b.adj_close > Decimal::ZERO));
    }

    #[tokio::test]
    async fn test_range_is_capped() {
        let anchor = NaiveDate::from_ymd_opt(2025, 5, 8).unwrap();
        let source = MockQuoteSource::new().with_anchor(anchor);

        let bars = source.daily_history("BTC-USD", "10y").await.unwrap();
        assert_eq!(bars.len(), 3650);

        for range in ["11y", "800000y"] {
            let result = source.daily_history("BTC-USD", range).await;
            assert!(matches!(result, Err(ReportError::Config(_))), "{range} should be rejected");
        }
    }

    #[tokio::test]
    async fn test_anchor_near_min_date() {
        let anchor = NaiveDate::MIN + Duration::days(5);
        let source = MockQuoteSource::new().with_anchor(anchor);

        let result = source.daily_history("ETH-USD", "1mo").await;
        assert!(matches!(result, Err(ReportError::Config(_))));
    }

    #[tokio::test]
    async fn test_unsupported_asset() {
        let source = MockQuoteSource::new();
        let result = source.daily_history("NOTREAL-USD", "10d").await;
        assert!(matches!(result, Err(ReportError::UnsupportedAsset(_))));
    }

    #[tokio::test]
    async fn test_explicit_series_wins() {
        let date = NaiveDate::from_ymd_opt(2025, 5, 8).unwrap();
        let source = MockQuoteSource::new()
            .with_series("BTC-USD", vec![PriceBar::flat(date, dec!(42))]);

        let bars = source.daily_history("BTC-USD", "10d").await.unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].adj_close, dec!(42));
    }
}
