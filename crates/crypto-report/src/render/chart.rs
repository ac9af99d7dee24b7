//! Price Trend Charts
//!
//! One chart per symbol: adjusted close, both SMAs and the extrapolation.
//! Written as SVG with plotters; the PDF renderer draws the same
//! [`ChartData`] as vector paths.

use std::path::Path;

use chrono::{Duration, NaiveDate};
use plotters::element::DashedPathElement;
use plotters::prelude::*;
use plotters::series::DashedLineSeries;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::analysis::AnalysisParams;
use crate::error::{ReportError, Result};
use crate::model::{asset_slug, AssetAnalysis};

const WIDTH: u32 = 1200;
const HEIGHT: u32 = 600;

/// Dash and gap length in pixels for dashed series
const DASH: i32 = 6;
const GAP: i32 = 4;

/// Series colors as RGB triples, shared with the PDF renderer
pub const CLOSE_COLOR: (u8, u8, u8) = (31, 119, 180);
pub const SMA_SHORT_COLOR: (u8, u8, u8) = (255, 127, 14);
pub const SMA_LONG_COLOR: (u8, u8, u8) = (44, 160, 44);
pub const PREDICTION_COLOR: (u8, u8, u8) = (214, 39, 40);

/// A named line on a chart
#[derive(Clone, Debug)]
pub struct ChartSeries {
    pub label: String,
    pub color: (u8, u8, u8),
    pub points: Vec<(NaiveDate, f64)>,
    /// Drawn with a broken stroke (extrapolated values)
    pub dashed: bool,
}

/// Everything needed to draw one price chart
#[derive(Clone, Debug)]
pub struct ChartData {
    pub title: String,
    pub series: Vec<ChartSeries>,
}

impl ChartData {
    pub fn from_analysis(analysis: &AssetAnalysis, params: &AnalysisParams) -> Self {
        let collect = |value: fn(&crate::model::IndicatorRow) -> Option<Decimal>| {
            analysis
                .rows
                .iter()
                .filter_map(|row| Some((row.bar.date, value(row)?.to_f64()?)))
                .collect::<Vec<_>>()
        };

        let predictions = analysis
            .predictions
            .iter()
            .filter_map(|p| Some((p.date, p.predicted_price.to_f64()?)))
            .collect();

        Self {
            title: format!(
                "{} Price Trend and {}-day Prediction",
                analysis.symbol, params.sma_short
            ),
            series: vec![
                ChartSeries {
                    label: "Adjusted Close".into(),
                    color: CLOSE_COLOR,
                    points: collect(|row| Some(row.bar.adj_close)),
                    dashed: false,
                },
                ChartSeries {
                    label: format!("SMA-{}", params.sma_short),
                    color: SMA_SHORT_COLOR,
                    points: collect(|row| row.sma_short),
                    dashed: false,
                },
                ChartSeries {
                    label: format!("SMA-{}", params.sma_long),
                    color: SMA_LONG_COLOR,
                    points: collect(|row| row.sma_long),
                    dashed: false,
                },
                ChartSeries {
                    label: "SMA Prediction".into(),
                    color: PREDICTION_COLOR,
                    points: predictions,
                    dashed: true,
                },
            ],
        }
    }

    /// First and last date across all series
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let dates = self.series.iter().flat_map(|s| s.points.iter().map(|p| p.0));
        let first = dates.clone().min()?;
        let last = dates.max()?;
        Some((first, last))
    }

    /// Lowest and highest value with 5% headroom on both sides
    pub fn value_bounds(&self) -> Option<(f64, f64)> {
        let values = self.series.iter().flat_map(|s| s.points.iter().map(|p| p.1));
        let (min, max) = values.fold(None, |acc: Option<(f64, f64)>, v| match acc {
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            None => Some((v, v)),
        })?;

        let pad = if max > min { (max - min) * 0.05 } else { min.abs().max(1.0) * 0.05 };
        Some((min - pad, max + pad))
    }
}

/// `btc_price_trend_2025-05-08.svg`
pub fn chart_file_name(symbol: &str, date: NaiveDate) -> String {
    format!("{}_price_trend_{}.svg", asset_slug(symbol), date.format("%Y-%m-%d"))
}

/// Render `data` as an SVG file at `path`
pub fn render_chart(data: &ChartData, path: &Path) -> Result<()> {
    let (first, last) = data
        .date_bounds()
        .ok_or_else(|| ReportError::Chart("no points to plot".into()))?;
    let (y_min, y_max) = data
        .value_bounds()
        .ok_or_else(|| ReportError::Chart("no points to plot".into()))?;
    let span = i32::try_from((last - first).num_days()).map_err(chart_err)?.max(1);

    let root = SVGBackend::new(path, (WIDTH, HEIGHT)).into_drawing_area();
    root.fill(&WHITE).map_err(chart_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(&data.title, ("sans-serif", 28))
        .margin(20)
        .x_label_area_size(70)
        .y_label_area_size(100)
        .build_cartesian_2d(0..span, y_min..y_max)
        .map_err(chart_err)?;

    let y_decimals = axis_decimals(y_max);
    let date_label = |x: &i32| (first + Duration::days(i64::from(*x))).format("%Y-%m-%d").to_string();
    chart
        .configure_mesh()
        .x_desc("Date")
        .y_desc("Price (USD)")
        .x_labels(usize::try_from(span).unwrap_or(1) + 1)
        .x_label_formatter(&date_label)
        .y_label_formatter(&|y| format!("{y:.y_decimals$}"))
        .draw()
        .map_err(chart_err)?;

    for series in data.series.iter().filter(|s| !s.points.is_empty()) {
        let (r, g, b) = series.color;
        let color = RGBColor(r, g, b);
        let points: Vec<(i32, f64)> = series
            .points
            .iter()
            .filter_map(|(date, value)| {
                let x = i32::try_from((*date - first).num_days()).ok()?;
                Some((x, *value))
            })
            .collect();

        let style = color.stroke_width(2);
        if series.dashed {
            chart
                .draw_series(DashedLineSeries::new(points.clone(), DASH, GAP, style))
                .map_err(chart_err)?
                .label(series.label.as_str())
                .legend(move |(x, y)| {
                    DashedPathElement::new(vec![(x, y), (x + 20, y)].into_iter(), DASH, GAP, style)
                });
            chart
                .draw_series(points.iter().map(|p| Cross::new(*p, 5, style)))
                .map_err(chart_err)?;
            continue;
        }

        chart
            .draw_series(LineSeries::new(points.clone(), style))
            .map_err(chart_err)?
            .label(series.label.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));

        if series.label == "Adjusted Close" {
            chart
                .draw_series(points.iter().map(|p| Circle::new(*p, 3, color.filled())))
                .map_err(chart_err)?;
        }
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(chart_err)?;

    root.present().map_err(chart_err)?;
    tracing::info!(path = %path.display(), "Plot saved");
    Ok(())
}

/// Two decimals from a dollar up, otherwise enough for four significant digits
fn axis_decimals(max: f64) -> usize {
    let max = max.abs();
    if max >= 1.0 || max == 0.0 || !max.is_finite() {
        return 2;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let zeros = (-max.log10()).floor().clamp(0.0, 12.0) as usize;
    zeros + 4
}

fn chart_err<E: std::fmt::Display>(e: E) -> ReportError {
    ReportError::Chart(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze;
    use crate::model::PriceBar;

    fn sample() -> (AssetAnalysis, AnalysisParams) {
        let start = NaiveDate::from_ymd_opt(2025, 4, 29).unwrap();
        let bars: Vec<PriceBar> = (0..10)
            .map(|i| PriceBar::flat(start + Duration::days(i), Decimal::from(95_000 + 250 * i)))
            .collect();
        let params = AnalysisParams::default();
        (analyze("BTC-USD", &bars, &params).unwrap(), params)
    }

    #[test]
    fn test_chart_data_series() {
        let (analysis, params) = sample();
        let data = ChartData::from_analysis(&analysis, &params);

        assert_eq!(data.title, "BTC-USD Price Trend and 3-day Prediction");
        assert_eq!(data.series.len(), 4);
        assert_eq!(data.series[0].points.len(), 10);
        assert_eq!(data.series[1].points.len(), 8);
        assert_eq!(data.series[2].points.len(), 4);
        assert_eq!(data.series[3].points.len(), 3);
        assert!(data.series[3].dashed);

        let (first, last) = data.date_bounds().unwrap();
        assert_eq!(first, NaiveDate::from_ymd_opt(2025, 4, 29).unwrap());
        assert_eq!(last, NaiveDate::from_ymd_opt(2025, 5, 11).unwrap());
    }

    #[test]
    fn test_axis_decimals() {
        assert_eq!(axis_decimals(97_500.0), 2);
        assert_eq!(axis_decimals(0.95), 4);
        assert_eq!(axis_decimals(0.000_022_3), 8);
        assert_eq!(format!("{:.*}", axis_decimals(0.000_022_3), 0.000_022_34), "0.00002234");
    }

    #[test]
    fn test_chart_file_name() {
        let date = NaiveDate::from_ymd_opt(2025, 5, 8).unwrap();
        assert_eq!(chart_file_name("BTC-USD", date), "btc_price_trend_2025-05-08.svg");
    }

    #[test]
    fn test_render_svg() {
        let (analysis, params) = sample();
        let data = ChartData::from_analysis(&analysis, &params);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("btc.svg");

        render_chart(&data, &path).unwrap();

        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Adjusted Close"));
        assert!(svg.contains("SMA Prediction"));
    }

    #[test]
    fn test_prediction_is_dashed() {
        let (analysis, params) = sample();
        let mut data = ChartData::from_analysis(&analysis, &params);
        let dir = tempfile::tempdir().unwrap();

        // Count stroke elements in the prediction color, dashed and solid
        let prediction_strokes = |data: &ChartData, name: &str| {
            let path = dir.path().join(name);
            render_chart(data, &path).unwrap();
            let svg = std::fs::read_to_string(&path).unwrap().to_lowercase();
            svg.matches("stroke=\"#d62728\"").count()
        };

        let dashed = prediction_strokes(&data, "dashed.svg");
        data.series[3].dashed = false;
        let solid = prediction_strokes(&data, "solid.svg");

        // A solid line is one path plus its legend; dashes split both into segments
        assert_eq!(solid, 2);
        assert!(dashed > solid + 6, "expected dash segments, got {dashed}");
    }

    #[test]
    fn test_render_empty_chart_fails() {
        let data = ChartData { title: "empty".into(), series: Vec::new() };
        let dir = tempfile::tempdir().unwrap();
        assert!(render_chart(&data, &dir.path().join("x.svg")).is_err());
    }
}
