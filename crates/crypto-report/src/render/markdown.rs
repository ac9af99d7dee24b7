//! Markdown Report Text

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::analysis::AnalysisParams;
use crate::model::AssetAnalysis;

/// Rows shown in the per-symbol price table
pub const PRICE_TABLE_ROWS: usize = 7;

const INTRO: &str = "This report provides a summary of recent market activity and price trends for selected cryptocurrencies.";
const DISCLAIMER: &str = "**Disclaimer:** This information is for educational purposes only and should not be considered financial advice. Cryptocurrency markets are highly volatile.";

/// Significant digits kept for prices below one dollar
const SUB_DOLLAR_DIGITS: u32 = 4;

/// `$97,500.25`, or `$0.00002234` below a dollar
pub fn format_usd(value: Decimal) -> String {
    if value.abs() < Decimal::ONE {
        return format!("${}", price_text(value));
    }
    format!("${}", group_thousands(value))
}

/// `1.23%`, or `N/A` when there is no previous bar
pub fn format_pct(value: Option<Decimal>) -> String {
    match value {
        Some(v) => format!("{:.2}%", v.round_dp(2)),
        None => "N/A".into(),
    }
}

/// Two decimals with comma thousands separators
fn group_thousands(value: Decimal) -> String {
    let fixed = format!("{:.2}", value.round_dp(2).abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value.is_sign_negative() && !value.round_dp(2).is_zero() { "-" } else { "" };
    format!("{sign}{grouped}.{frac_part}")
}

/// Cents from a dollar up; below that, significant digits with at least two decimals
fn price_text(value: Decimal) -> String {
    if value.abs() >= Decimal::ONE || value.is_zero() {
        return format!("{:.2}", value.round_dp(2));
    }
    let rounded = value.round_sf(SUB_DOLLAR_DIGITS).unwrap_or(value).normalize();
    if rounded.scale() < 2 {
        format!("{rounded:.2}")
    } else {
        rounded.to_string()
    }
}

fn fmt_price(value: Option<Decimal>) -> String {
    value.map(price_text).unwrap_or_default()
}

/// A pipe table; numeric columns are right-aligned
#[derive(Debug, Default)]
pub struct MarkdownTable {
    headers: Vec<String>,
    numeric: Vec<bool>,
    rows: Vec<Vec<String>>,
}

impl MarkdownTable {
    pub fn new(columns: &[(&str, bool)]) -> Self {
        Self {
            headers: columns.iter().map(|(h, _)| (*h).to_string()).collect(),
            numeric: columns.iter().map(|(_, n)| *n).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn render(&self) -> String {
        let widths: Vec<usize> = self
            .headers
            .iter()
            .enumerate()
            .map(|(i, h)| {
                self.rows
                    .iter()
                    .filter_map(|r| r.get(i))
                    .map(String::len)
                    .chain(std::iter::once(h.len()))
                    .max()
                    .unwrap_or(0)
                    .max(3)
            })
            .collect();

        let line = |cells: &[String]| {
            let padded: Vec<String> = widths
                .iter()
                .enumerate()
                .map(|(i, w)| {
                    let cell = cells.get(i).map_or("", String::as_str);
                    if self.numeric[i] {
                        format!("{cell:>w$}")
                    } else {
                        format!("{cell:<w$}")
                    }
                })
                .collect();
            format!("| {} |", padded.join(" | "))
        };

        let separator: Vec<String> = widths
            .iter()
            .zip(&self.numeric)
            .map(|(w, numeric)| {
                if *numeric {
                    format!("{}:", "-".repeat(w + 1))
                } else {
                    format!(":{}", "-".repeat(w + 1))
                }
            })
            .collect();

        let mut out = line(&self.headers);
        out.push('\n');
        out.push_str(&format!("|{}|", separator.join("|")));
        for row in &self.rows {
            out.push('\n');
            out.push_str(&line(row));
        }
        out
    }
}

/// Last days of price data as a table
pub fn price_table(analysis: &AssetAnalysis) -> String {
    let mut table = MarkdownTable::new(&[
        ("date", false),
        ("open", true),
        ("high", true),
        ("low", true),
        ("close", true),
        ("adj_close", true),
        ("volume", true),
    ]);

    for row in analysis.tail(PRICE_TABLE_ROWS) {
        let bar = &row.bar;
        table.push_row(vec![
            bar.date.format("%Y-%m-%d").to_string(),
            fmt_price(bar.open),
            fmt_price(bar.high),
            fmt_price(bar.low),
            fmt_price(bar.close),
            fmt_price(Some(bar.adj_close)),
            bar.volume.map(|v| v.to_string()).unwrap_or_default(),
        ]);
    }

    table.render()
}

/// Predicted prices as a table, `None` when there are none
pub fn prediction_table(analysis: &AssetAnalysis) -> Option<String> {
    if analysis.predictions.is_empty() {
        return None;
    }

    let mut table = MarkdownTable::new(&[("date", false), ("predicted_price", true)]);
    for p in &analysis.predictions {
        table.push_row(vec![
            p.date.format("%Y-%m-%d").to_string(),
            fmt_price(Some(p.predicted_price)),
        ]);
    }
    Some(table.render())
}

/// Report section for one analyzed symbol
pub fn symbol_section(
    analysis: &AssetAnalysis,
    params: &AnalysisParams,
    date: NaiveDate,
    chart_file: &str,
) -> String {
    let symbol = &analysis.symbol;
    let mut md = format!("## {symbol} Analysis ({})\n\n", date.format("%Y-%m-%d"));

    md.push_str(&format!("**Current Price:** {}\n", format_usd(analysis.current_price)));
    md.push_str(&format!("**Daily Change:** {}\n", format_pct(analysis.daily_change_pct)));
    md.push_str(&format!(
        "**Trend (SMA {} vs SMA {}):** {}\n\n",
        params.sma_short, params.sma_long, analysis.trend
    ));

    md.push_str(&format!("**Price Data (Last {PRICE_TABLE_ROWS} days):**\n"));
    md.push_str(&price_table(analysis));
    md.push_str("\n\n");

    md.push_str(&format!(
        "**Predicted Prices (SMA-{} based, next {} days):**\n",
        params.sma_short, params.horizon_days
    ));
    match prediction_table(analysis) {
        Some(table) => {
            md.push_str(&table);
            md.push_str("\n\n");
        }
        None => md.push_str("Prediction data not available.\n\n"),
    }

    md.push_str(&format!("![{symbol} Price Trend]({chart_file})\n\n"));
    md
}

/// Section for a symbol without enough history
pub fn insufficient_section(symbol: &str) -> String {
    format!("## {symbol}\n\nInsufficient data to generate analysis.\n")
}

/// Full report document
pub fn assemble_report(date: NaiveDate, sections: &[String]) -> String {
    let mut md = format!("# Daily Crypto Market Report - {}\n\n", date.format("%Y-%m-%d"));
    md.push_str(INTRO);
    md.push_str("\n\n");
    md.push_str(DISCLAIMER);
    md.push_str("\n\n---\n\n");
    md.push_str(&sections.join("\n\n"));
    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze;
    use crate::model::PriceBar;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn analysis() -> AssetAnalysis {
        let start = NaiveDate::from_ymd_opt(2025, 4, 29).unwrap();
        let bars: Vec<PriceBar> = (0..10)
            .map(|i| PriceBar {
                volume: Some(1_000 + i as u64),
                ..PriceBar::flat(start + Duration::days(i), Decimal::from(100 + i))
            })
            .collect();
        analyze("BTC-USD", &bars, &AnalysisParams::default()).unwrap()
    }

    #[test]
    fn test_format_usd() {
        assert_eq!(format_usd(dec!(97500.256)), "$97,500.26");
        assert_eq!(format_usd(dec!(1234567.5)), "$1,234,567.50");
        assert_eq!(format_usd(dec!(999)), "$999.00");
        assert_eq!(format_usd(dec!(0.95)), "$0.95");
        assert_eq!(format_usd(dec!(-1500)), "$-1,500.00");
        assert_eq!(format_usd(dec!(0.0000223456)), "$0.00002235");
    }

    #[test]
    fn test_sub_dollar_prices_keep_digits() {
        assert_eq!(fmt_price(Some(dec!(0.00002234))), "0.00002234");
        assert_eq!(fmt_price(Some(dec!(0.5))), "0.50");
        assert_eq!(fmt_price(Some(dec!(0.9999999))), "1.00");
        assert_eq!(fmt_price(Some(dec!(0))), "0.00");
        assert_eq!(fmt_price(None), "");
    }

    #[test]
    fn test_sub_cent_price_table() {
        let start = NaiveDate::from_ymd_opt(2025, 4, 29).unwrap();
        let bars: Vec<PriceBar> = (0..10)
            .map(|i| PriceBar::flat(start + Duration::days(i), dec!(0.00002200) + Decimal::new(i, 8)))
            .collect();
        let analysis = analyze("SHIB-USD", &bars, &AnalysisParams::default()).unwrap();

        let table = price_table(&analysis);
        assert!(table.contains("| 2025-05-08 |"));
        assert!(table.contains(" 0.00002209 |"));
        assert!(!table.contains(" 0.00 |"));
        assert_eq!(format_usd(analysis.current_price), "$0.00002209");
    }

    #[test]
    fn test_format_pct() {
        assert_eq!(format_pct(Some(dec!(2.456))), "2.46%");
        assert_eq!(format_pct(Some(dec!(-0.5))), "-0.50%");
        assert_eq!(format_pct(None), "N/A");
    }

    #[test]
    fn test_table_alignment() {
        let mut table = MarkdownTable::new(&[("date", false), ("price", true)]);
        table.push_row(vec!["2025-05-08".into(), "1.00".into()]);

        let rendered = table.render();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "| date       | price |");
        assert_eq!(lines[1], "|:-----------|------:|");
        assert_eq!(lines[2], "| 2025-05-08 |  1.00 |");
    }

    #[test]
    fn test_symbol_section() {
        let analysis = analysis();
        let date = NaiveDate::from_ymd_opt(2025, 5, 8).unwrap();
        let md = symbol_section(&analysis, &AnalysisParams::default(), date, "btc_price_trend_2025-05-08.svg");

        assert!(md.starts_with("## BTC-USD Analysis (2025-05-08)\n\n"));
        assert!(md.contains("**Current Price:** $109.00\n"));
        assert!(md.contains("**Trend (SMA 3 vs SMA 7):** Upward\n"));
        assert!(md.contains("**Price Data (Last 7 days):**\n| date"));
        assert!(md.contains("| 2025-05-02 |"));
        assert!(!md.contains("| 2025-05-01 |"));
        assert!(md.contains("**Predicted Prices (SMA-3 based, next 3 days):**\n"));
        assert!(md.contains("| 2025-05-11 |"));
        assert!(md.ends_with("![BTC-USD Price Trend](btc_price_trend_2025-05-08.svg)\n\n"));
    }

    #[test]
    fn test_missing_predictions_text() {
        let mut analysis = analysis();
        analysis.predictions.clear();
        let md = symbol_section(
            &analysis,
            &AnalysisParams::default(),
            NaiveDate::from_ymd_opt(2025, 5, 8).unwrap(),
            "x.svg",
        );
        assert!(md.contains("Prediction data not available.\n\n"));
    }

    #[test]
    fn test_assemble_report() {
        let date = NaiveDate::from_ymd_opt(2025, 5, 8).unwrap();
        let md = assemble_report(date, &[insufficient_section("ETH-USD"), "## B".into()]);

        assert!(md.starts_with("# Daily Crypto Market Report - 2025-05-08\n\n"));
        assert!(md.contains("**Disclaimer:**"));
        assert!(md.contains("---\n\n## ETH-USD\n\nInsufficient data to generate analysis.\n\n\n## B"));
    }
}
