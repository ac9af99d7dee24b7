//! Daily Report Runner
//!
//! Generates one report and exits. Scheduling is left to cron or a similar
//! external scheduler.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crypto_report::pipeline::parse_symbols;
use crypto_report::render::format_usd;
use crypto_report::{
    MockQuoteSource, PipelineConfig, QuoteSource, ReportPipeline, SymbolStatus, YahooChartClient,
};

#[derive(Parser, Debug)]
#[command(name = "report-runner")]
#[command(about = "Generate the daily crypto market report (markdown, HTML, PDF and charts)")]
struct Args {
    /// Comma separated symbols, e.g. BTC-USD,ETH-USD (default: REPORT_SYMBOLS)
    #[arg(short, long)]
    symbols: Option<String>,

    /// Archive directory for reports and plots (default: REPORT_OUTPUT_DIR)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Report date (YYYY-MM-DD), today when omitted
    #[arg(short, long)]
    date: Option<NaiveDate>,

    /// Use the built-in mock quotes instead of the Yahoo chart API
    #[arg(long)]
    mock: bool,
}

/// Yahoo by default; mock series end on the report date when one is given
fn quote_source(mock: bool, report_date: Option<NaiveDate>) -> anyhow::Result<Arc<dyn QuoteSource>> {
    if !mock {
        return Ok(Arc::new(YahooChartClient::from_env()?));
    }

    tracing::info!("Using mock quotes");
    let source = match report_date {
        Some(date) => MockQuoteSource::new().with_anchor(date),
        None => MockQuoteSource::new(),
    };
    Ok(Arc::new(source))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut config = PipelineConfig::from_env();
    if let Some(symbols) = args.symbols.as_deref() {
        config = config.with_symbols(parse_symbols(symbols));
    }
    if let Some(dir) = args.output_dir {
        config = config.with_output_dir(dir);
    }
    if let Some(date) = args.date {
        config = config.with_date(date);
    }
    anyhow::ensure!(!config.symbols.is_empty(), "no symbols configured");

    let source = quote_source(args.mock, config.report_date)?;

    let outcome = ReportPipeline::new(source, config).run().await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("Daily report for {}", outcome.date);
    for symbol in &outcome.symbols {
        match &symbol.status {
            SymbolStatus::Analyzed { trend, current_price, .. } => {
                tracing::info!("  {:<10} {:>14} {}", symbol.symbol, format_usd(*current_price), trend);
            }
            SymbolStatus::InsufficientData { bars } => {
                tracing::warn!("  {:<10} insufficient data ({} bars)", symbol.symbol, bars);
            }
        }
    }
    tracing::info!("  markdown: {}", outcome.markdown_path.display());
    match &outcome.pdf_path {
        Some(path) => tracing::info!("  pdf:      {}", path.display()),
        None => tracing::warn!("  pdf:      not generated"),
    }
    tracing::info!("══════════════════════════════════════════════════");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_follows_report_date() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let source = quote_source(true, Some(date)).unwrap();

        let bars = source.daily_history("BTC-USD", "7d").await.unwrap();
        assert_eq!(bars.len(), 7);
        assert_eq!(bars.last().unwrap().date, date);
    }
}
