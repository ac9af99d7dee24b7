//! Application State

use std::sync::Arc;

use crypto_report::{PipelineConfig, QuoteSource, ReportArchive};

use crate::alerts::MemorySubscriptionStore;
use crate::settings::MemorySettingsStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Market data for the crypto endpoints
    pub quotes: Arc<dyn QuoteSource>,

    /// Generated reports
    pub archive: Arc<ReportArchive>,

    /// History range, window and SMA settings used by the analysis endpoints
    pub report_config: Arc<PipelineConfig>,

    pub subscriptions: Arc<MemorySubscriptionStore>,

    pub settings: Arc<MemorySettingsStore>,
}

impl AppState {
    pub fn new(quotes: Arc<dyn QuoteSource>, report_config: PipelineConfig) -> Self {
        Self {
            quotes,
            archive: Arc::new(ReportArchive::new(report_config.output_dir.clone())),
            report_config: Arc::new(report_config),
            subscriptions: Arc::new(MemorySubscriptionStore::new()),
            settings: Arc::new(MemorySettingsStore::new()),
        }
    }
}
