//! Naive SMA Extrapolation
//!
//! Projects the short SMA forward along the slope of its last two points.

use chrono::Duration;
use rust_decimal::Decimal;

use crate::model::{IndicatorRow, Prediction};

/// Linear extrapolation of the short SMA for `horizon_days` after the last row.
///
/// With fewer than two short SMA values the slope is zero and the base is the
/// last short SMA, or `current_price` when there is none.
pub fn extrapolate(
    rows: &[IndicatorRow],
    current_price: Decimal,
    horizon_days: u32,
) -> Vec<Prediction> {
    let Some(last_row) = rows.last() else {
        return Vec::new();
    };

    let smas: Vec<Decimal> = rows.iter().filter_map(|r| r.sma_short).collect();
    let (base, slope) = match smas.as_slice() {
        [.., prev, last] => (*last, *last - *prev),
        [only] => (*only, Decimal::ZERO),
        [] => (current_price, Decimal::ZERO),
    };

    (1..=horizon_days)
        .map(|step| Prediction {
            date: last_row.bar.date + Duration::days(i64::from(step)),
            predicted_price: base + slope * Decimal::from(step),
        })
        .collect()
}
