//! Moving-average trend indicators

use rust_decimal::Decimal;

use crate::model::{IndicatorRow, PriceBar, Trend};

/// Rolling mean over `window` values.
///
/// Position `i` holds the mean of `values[i + 1 - window..=i]`, or `None`
/// while fewer than `window` values have been seen.
pub fn simple_moving_average(values: &[Decimal], window: usize) -> Vec<Option<Decimal>> {
    if window == 0 {
        return vec![None; values.len()];
    }

    let divisor = Decimal::from(window);
    let mut sum = Decimal::ZERO;

    values
        .iter()
        .enumerate()
        .map(|(i, value)| {
            sum += *value;
            if i >= window {
                sum -= values[i - window];
            }
            (i + 1 >= window).then(|| sum / divisor)
        })
        .collect()
}

/// Percent change vs. the previous value; `None` for the first value and
/// after a zero.
pub fn pct_change(values: &[Decimal]) -> Vec<Option<Decimal>> {
    let mut changes = Vec::with_capacity(values.len());
    changes.push(None);

    for pair in values.windows(2) {
        let (prev, cur) = (pair[0], pair[1]);
        let change = (!prev.is_zero()).then(|| (cur - prev) / prev * Decimal::ONE_HUNDRED);
        changes.push(change);
    }

    changes.truncate(values.len());
    changes
}

/// Attach short/long SMAs and the daily change to each bar
pub fn compute_indicators(bars: &[PriceBar], short: usize, long: usize) -> Vec<IndicatorRow> {
    let closes: Vec<Decimal> = bars.iter().map(|b| b.adj_close).collect();
    let sma_short = simple_moving_average(&closes, short);
    let sma_long = simple_moving_average(&closes, long);
    let changes = pct_change(&closes);

    bars.iter()
        .enumerate()
        .map(|(i, bar)| IndicatorRow {
            bar: bar.clone(),
            sma_short: sma_short[i],
            sma_long: sma_long[i],
            daily_change_pct: changes[i],
        })
        .collect()
}

/// Short SMA above long SMA is an upward trend, below is downward
pub fn classify_trend(short: Option<Decimal>, long: Option<Decimal>) -> Trend {
    match (short, long) {
        (Some(s), Some(l)) if s > l => Trend::Upward,
        (Some(s), Some(l)) if s < l => Trend::Downward,
        _ => Trend::Neutral,
    }
}
