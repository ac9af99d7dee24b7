//! # crypto-report
//!
//! Daily crypto market report: recent price history per symbol, moving-average
//! trend, a naive short-horizon extrapolation, one chart per symbol and a
//! combined markdown report with HTML and PDF renditions.
//!
//! ## Pipeline
//!
//! ```text
//! ┌──────────────┐   ┌────────────┐   ┌─────────────┐   ┌──────────────────┐
//! │ QuoteSource  │──▶│ indicators │──▶│ extrapolate │──▶│ chart + markdown │
//! │ (Yahoo/mock) │   │ SMA 3 / 7  │   │ SMA-3 slope │   │  → html → pdf    │
//! └──────────────┘   └────────────┘   └─────────────┘   └──────────────────┘
//!        once per symbol, in order            reports_archive/
//!                                               daily_crypto_report_{date}.md
//!                                               daily_crypto_report_{date}.pdf
//!                                               plots/{asset}_price_trend_{date}.svg
//! ```
//!
//! The predictions are a straight line through the last two short SMA values.
//! They are illustrative only and not financial advice.

pub mod analysis;
pub mod archive;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod quotes;
pub mod render;

pub use analysis::{analyze, AnalysisParams};
pub use archive::{ReportArchive, ReportEntry};
pub use error::{ReportError, Result};
pub use model::{AssetAnalysis, IndicatorRow, Prediction, PriceBar, ReportFormat, Trend};
pub use pipeline::{PipelineConfig, PipelineOutcome, ReportPipeline, SymbolOutcome, SymbolStatus};
pub use quotes::{MockQuoteSource, QuoteSource, YahooChartClient, YahooConfig};
