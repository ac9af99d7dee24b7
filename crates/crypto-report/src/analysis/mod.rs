//! Price Analysis
//!
//! Indicators and the naive forecast for one symbol's recent history.

mod forecast;
mod indicators;

pub use forecast::extrapolate;
pub use indicators::{classify_trend, compute_indicators, pct_change, simple_moving_average};

use serde::{Deserialize, Serialize};

use crate::model::{AssetAnalysis, PriceBar};

/// Window and horizon settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalysisParams {
    /// Short SMA window (days)
    pub sma_short: usize,

    /// Long SMA window (days), also the minimum history required
    pub sma_long: usize,

    /// Days to extrapolate
    pub horizon_days: u32,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            sma_short: 3,
            sma_long: 7,
            horizon_days: 3,
        }
    }
}

/// Analyze one symbol.
///
/// Returns `None` when there are fewer bars than the long window.
pub fn analyze(symbol: &str, bars: &[PriceBar], params: &AnalysisParams) -> Option<AssetAnalysis> {
    if bars.is_empty() || bars.len() < params.sma_long {
        return None;
    }

    let rows = compute_indicators(bars, params.sma_short, params.sma_long);
    let latest = rows.last()?;

    let current_price = latest.bar.adj_close;
    let daily_change_pct = latest.daily_change_pct;
    let trend = classify_trend(latest.sma_short, latest.sma_long);
    let predictions = extrapolate(&rows, current_price, params.horizon_days);

    Some(AssetAnalysis {
        symbol: symbol.to_string(),
        rows,
        current_price,
        daily_change_pct,
        trend,
        predictions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Trend;
    use chrono::{Duration, NaiveDate};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn rising(days: i64) -> Vec<PriceBar> {
        let start = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        (0..days)
            .map(|i| PriceBar::flat(start + Duration::days(i), Decimal::from(100 + 10 * i)))
            .collect()
    }

    #[test]
    fn test_insufficient_data() {
        let params = AnalysisParams::default();
        assert!(analyze("BTC-USD", &rising(6), &params).is_none());
        assert!(analyze("BTC-USD", &[], &params).is_none());
    }

    #[test]
    fn test_rising_series_is_upward() {
        let analysis = analyze("BTC-USD", &rising(10), &AnalysisParams::default()).unwrap();

        assert_eq!(analysis.symbol, "BTC-USD");
        assert_eq!(analysis.rows.len(), 10);
        assert_eq!(analysis.current_price, dec!(190));
        assert_eq!(analysis.trend, Trend::Upward);
        assert!(analysis.daily_change_pct.unwrap() > Decimal::ZERO);

        // SMA-3 at the end is 180 and rises by 10 a day
        let prices: Vec<Decimal> = analysis.predictions.iter().map(|p| p.predicted_price).collect();
        assert_eq!(prices, vec![dec!(190), dec!(200), dec!(210)]);
    }

    #[test]
    fn test_flat_series_is_neutral() {
        let start = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        let bars: Vec<PriceBar> = (0..7)
            .map(|i| PriceBar::flat(start + Duration::days(i), dec!(50)))
            .collect();

        let analysis = analyze("ETH-USD", &bars, &AnalysisParams::default()).unwrap();
        assert_eq!(analysis.trend, Trend::Neutral);
        assert_eq!(analysis.daily_change_pct, Some(Decimal::ZERO));
        assert!(analysis.predictions.iter().all(|p| p.predicted_price == dec!(50)));
    }
}
