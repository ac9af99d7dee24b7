//! Error Types for the Report Pipeline

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReportError>;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Quote source error: {0}")]
    Upstream(String),

    #[error("No price data for {0}")]
    NoData(String),

    #[error("Asset not supported: {0}")]
    UnsupportedAsset(String),

    #[error("Invalid report format: {0}")]
    InvalidFormat(String),

    #[error("Chart rendering failed: {0}")]
    Chart(String),

    #[error("PDF rendering failed: {0}")]
    Pdf(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReportError {
    /// Whether a later run might succeed without any change on our side
    pub fn is_retryable(&self) -> bool {
        matches!(self, ReportError::Upstream(_) | ReportError::Network(_))
    }

    /// Short message that is safe to show to API clients
    pub fn user_message(&self) -> String {
        match self {
            ReportError::Upstream(_) | ReportError::Network(_) => {
                "The market data service is currently unavailable.".into()
            }
            ReportError::NoData(symbol) => format!("No price data available for {symbol}."),
            ReportError::UnsupportedAsset(symbol) => format!("Symbol '{symbol}' is not supported."),
            ReportError::InvalidFormat(_) => "Invalid format. Choose pdf or md.".into(),
            _ => "An unexpected error occurred.".into(),
        }
    }
}
