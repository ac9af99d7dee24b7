//! Server Configuration

use crypto_report::PipelineConfig;

/// Where quotes come from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuoteBackend {
    Yahoo,
    Mock,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub quote_backend: QuoteBackend,
    /// Archive location and analysis settings, shared with the runner
    pub report: PipelineConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".into(),
            quote_backend: QuoteBackend::Yahoo,
            report: PipelineConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let bind_addr = std::env::var("BIND_ADDR").unwrap_or(defaults.bind_addr);
        let quote_backend = match std::env::var("QUOTE_SOURCE").as_deref() {
            Ok("mock") => QuoteBackend::Mock,
            _ => QuoteBackend::Yahoo,
        };

        Self {
            bind_addr,
            quote_backend,
            report: PipelineConfig::from_env(),
        }
    }
}
