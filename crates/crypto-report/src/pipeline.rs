//! Daily Report Pipeline
//!
//! fetch -> indicators -> extrapolation -> chart -> report, once per symbol,
//! in order. Writes the markdown report into the output directory and derives
//! the HTML and PDF documents from it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::analysis::{analyze, AnalysisParams};
use crate::archive::report_file_name;
use crate::error::Result;
use crate::model::{ReportFormat, Trend};
use crate::quotes::{fetch_recent_bars, QuoteSource};
use crate::render::{
    assemble_report, chart_file_name, insufficient_section, markdown_to_html, render_chart,
    render_pdf, symbol_section, ChartData,
};

const REPORT_TITLE: &str = "Daily Crypto Market Report";

/// Pipeline configuration
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Symbols in report order
    pub symbols: Vec<String>,

    /// Archive directory; charts go to its `plots/` subdirectory
    pub output_dir: PathBuf,

    /// Range requested from the quote source
    pub history_range: String,

    /// Bars kept per symbol after fetching
    pub history_window: usize,

    pub params: AnalysisParams,

    /// Report date, today (local) when unset
    pub report_date: Option<NaiveDate>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            symbols: vec!["BTC-USD".into(), "ETH-USD".into()],
            output_dir: PathBuf::from("reports_archive"),
            history_range: "10d".into(),
            history_window: 10,
            params: AnalysisParams::default(),
            report_date: None,
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let symbols = std::env::var("REPORT_SYMBOLS")
            .ok()
            .map(|s| parse_symbols(&s))
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.symbols);
        let output_dir = std::env::var("REPORT_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.output_dir);
        let history_range = std::env::var("REPORT_HISTORY_RANGE").unwrap_or(defaults.history_range);

        Self {
            symbols,
            output_dir,
            history_range,
            ..defaults
        }
    }

    pub fn with_symbols(mut self, symbols: Vec<String>) -> Self {
        self.symbols = symbols;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.report_date = Some(date);
        self
    }

    pub fn plots_dir(&self) -> PathBuf {
        self.output_dir.join("plots")
    }
}

/// Split a comma separated symbol list, upper-casing each entry
pub fn parse_symbols(list: &str) -> Vec<String> {
    list.split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// What happened to one symbol
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SymbolStatus {
    Analyzed {
        trend: Trend,
        current_price: Decimal,
        /// `None` when chart rendering failed
        chart: Option<PathBuf>,
    },
    InsufficientData {
        bars: usize,
    },
}

#[derive(Clone, Debug, Serialize)]
pub struct SymbolOutcome {
    pub symbol: String,
    #[serde(flatten)]
    pub status: SymbolStatus,
}

/// Files written by one run
#[derive(Clone, Debug, Serialize)]
pub struct PipelineOutcome {
    pub date: NaiveDate,
    pub markdown_path: PathBuf,
    pub html_path: Option<PathBuf>,
    pub pdf_path: Option<PathBuf>,
    pub symbols: Vec<SymbolOutcome>,
}

/// Daily report generator
pub struct ReportPipeline {
    source: Arc<dyn QuoteSource>,
    config: PipelineConfig,
}

impl ReportPipeline {
    pub fn new(source: Arc<dyn QuoteSource>, config: PipelineConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub async fn run(&self) -> Result<PipelineOutcome> {
        let config = &self.config;
        let date = config.report_date.unwrap_or_else(|| Local::now().date_naive());
        let plots_dir = config.plots_dir();
        tokio::fs::create_dir_all(&plots_dir).await?;

        tracing::info!(
            %date,
            symbols = ?config.symbols,
            source = self.source.name(),
            "Starting daily report generation"
        );

        let mut sections = Vec::with_capacity(config.symbols.len());
        let mut figures = HashMap::new();
        let mut outcomes = Vec::with_capacity(config.symbols.len());

        for symbol in &config.symbols {
            let bars = fetch_recent_bars(
                self.source.as_ref(),
                symbol,
                &config.history_range,
                config.history_window,
            )
            .await;

            let Some(analysis) = analyze(symbol, &bars, &config.params) else {
                tracing::warn!(symbol, bars = bars.len(), "Insufficient data to generate analysis");
                sections.push(insufficient_section(symbol));
                outcomes.push(SymbolOutcome {
                    symbol: symbol.clone(),
                    status: SymbolStatus::InsufficientData { bars: bars.len() },
                });
                continue;
            };

            let file_name = chart_file_name(symbol, date);
            let data = ChartData::from_analysis(&analysis, &config.params);
            let chart_path = plots_dir.join(&file_name);
            let chart = match render_chart(&data, &chart_path) {
                Ok(()) => Some(chart_path),
                Err(e) => {
                    tracing::error!(symbol, error = %e, "Chart rendering failed");
                    None
                }
            };

            tracing::info!(
                symbol,
                price = %analysis.current_price,
                trend = %analysis.trend,
                "Symbol analyzed"
            );

            sections.push(symbol_section(&analysis, &config.params, date, &file_name));
            figures.insert(file_name, data);
            outcomes.push(SymbolOutcome {
                symbol: symbol.clone(),
                status: SymbolStatus::Analyzed {
                    trend: analysis.trend,
                    current_price: analysis.current_price,
                    chart,
                },
            });
        }

        let markdown = assemble_report(date, &sections);
        let markdown_path = config
            .output_dir
            .join(report_file_name(date, ReportFormat::Md.extension()));
        tokio::fs::write(&markdown_path, &markdown).await?;
        tracing::info!(path = %markdown_path.display(), "Markdown report saved");

        let html_path = config.output_dir.join(report_file_name(date, "html"));
        let pdf_path = config
            .output_dir
            .join(report_file_name(date, ReportFormat::Pdf.extension()));

        let html_path = match write_html(&markdown, &plots_dir, &html_path).await {
            Ok(()) => Some(html_path),
            Err(e) => {
                tracing::error!(error = %e, "HTML conversion failed");
                None
            }
        };
        let pdf_path = match write_pdf(&markdown, &figures, &pdf_path).await {
            Ok(()) => {
                tracing::info!(path = %pdf_path.display(), "PDF report saved");
                Some(pdf_path)
            }
            Err(e) => {
                tracing::error!(error = %e, "PDF conversion failed, markdown report kept");
                None
            }
        };

        tracing::info!(%date, "Daily report generation finished");

        Ok(PipelineOutcome {
            date,
            markdown_path,
            html_path,
            pdf_path,
            symbols: outcomes,
        })
    }
}

async fn write_html(markdown: &str, plots_dir: &Path, path: &Path) -> Result<()> {
    let html = markdown_to_html(markdown, REPORT_TITLE, plots_dir);
    tokio::fs::write(path, html).await?;
    Ok(())
}

async fn write_pdf(markdown: &str, figures: &HashMap<String, ChartData>, path: &Path) -> Result<()> {
    let pdf = render_pdf(markdown, REPORT_TITLE, figures)?;
    tracing::debug!(pages = pdf.page_count, bytes = pdf.bytes.len(), "PDF rendered");
    tokio::fs::write(path, pdf.bytes).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PriceBar;
    use crate::quotes::MockQuoteSource;
    use chrono::Duration;

    fn report_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 8).unwrap()
    }

    fn pipeline(source: MockQuoteSource, dir: &Path, symbols: &[&str]) -> ReportPipeline {
        let config = PipelineConfig::default()
            .with_symbols(symbols.iter().map(|s| (*s).to_string()).collect())
            .with_output_dir(dir)
            .with_date(report_date());
        ReportPipeline::new(Arc::new(source), config)
    }

    #[test]
    fn test_parse_symbols() {
        assert_eq!(parse_symbols(" btc-usd, ETH-USD ,,"), vec!["BTC-USD", "ETH-USD"]);
        assert!(parse_symbols("").is_empty());
    }

    #[tokio::test]
    async fn test_full_run_writes_all_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let source = MockQuoteSource::new().with_anchor(report_date());

        let outcome = pipeline(source, dir.path(), &["BTC-USD", "ETH-USD"]).run().await.unwrap();

        assert_eq!(outcome.markdown_path, dir.path().join("daily_crypto_report_2025-05-08.md"));
        let md = std::fs::read_to_string(&outcome.markdown_path).unwrap();
        assert!(md.starts_with("# Daily Crypto Market Report - 2025-05-08"));
        assert!(md.contains("## BTC-USD Analysis (2025-05-08)"));
        assert!(md.contains("## ETH-USD Analysis (2025-05-08)"));
        assert!(md.find("BTC-USD Analysis").unwrap() < md.find("ETH-USD Analysis").unwrap());
        assert!(md.contains("![ETH-USD Price Trend](eth_price_trend_2025-05-08.svg)"));

        assert!(dir.path().join("plots/btc_price_trend_2025-05-08.svg").exists());
        assert!(dir.path().join("plots/eth_price_trend_2025-05-08.svg").exists());

        let html = std::fs::read_to_string(outcome.html_path.unwrap()).unwrap();
        assert!(html.contains("eth_price_trend_2025-05-08.svg"));
        assert!(html.contains("file://"));

        let pdf = std::fs::read(outcome.pdf_path.unwrap()).unwrap();
        assert!(pdf.starts_with(b"%PDF"));

        assert_eq!(outcome.symbols.len(), 2);
        assert!(outcome
            .symbols
            .iter()
            .all(|s| matches!(s.status, SymbolStatus::Analyzed { chart: Some(_), .. })));
    }

    #[tokio::test]
    async fn test_short_history_gets_insufficient_section() {
        let dir = tempfile::tempdir().unwrap();
        let short: Vec<PriceBar> = (0..3)
            .map(|i| PriceBar::flat(report_date() - Duration::days(2 - i), Decimal::from(3000 + i)))
            .collect();
        let source = MockQuoteSource::new()
            .with_anchor(report_date())
            .with_series("ETH-USD", short);

        let outcome = pipeline(source, dir.path(), &["BTC-USD", "ETH-USD"]).run().await.unwrap();

        let md = std::fs::read_to_string(&outcome.markdown_path).unwrap();
        assert!(md.contains("## ETH-USD\n\nInsufficient data to generate analysis.\n"));
        assert!(!dir.path().join("plots/eth_price_trend_2025-05-08.svg").exists());
        assert!(matches!(
            outcome.symbols[1].status,
            SymbolStatus::InsufficientData { bars: 3 }
        ));
    }

    #[tokio::test]
    async fn test_fetch_failure_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let source = MockQuoteSource::new().with_anchor(report_date());

        let outcome = pipeline(source, dir.path(), &["DOGE-USD"]).run().await.unwrap();

        let md = std::fs::read_to_string(&outcome.markdown_path).unwrap();
        assert!(md.contains("## DOGE-USD\n\nInsufficient data to generate analysis.\n"));
        assert!(outcome.pdf_path.is_some());
    }

    #[tokio::test]
    async fn test_pdf_and_html_failures_keep_markdown() {
        let dir = tempfile::tempdir().unwrap();
        // Directories in place of the output files make both writes fail
        std::fs::create_dir(dir.path().join("daily_crypto_report_2025-05-08.pdf")).unwrap();
        std::fs::create_dir(dir.path().join("daily_crypto_report_2025-05-08.html")).unwrap();
        let source = MockQuoteSource::new().with_anchor(report_date());

        let outcome = pipeline(source, dir.path(), &["BTC-USD"]).run().await.unwrap();

        assert!(outcome.pdf_path.is_none());
        assert!(outcome.html_path.is_none());
        assert!(outcome.markdown_path.exists());
        let md = std::fs::read_to_string(&outcome.markdown_path).unwrap();
        assert!(md.contains("## BTC-USD Analysis (2025-05-08)"));
    }
}
