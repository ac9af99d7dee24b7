//! Crypto Report Server
//!
//! Axum server for the report archive, market data and alert endpoints.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crypto_report::{MockQuoteSource, QuoteSource, YahooChartClient};
use report_server::{app, AppState, QuoteBackend, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();
    let config = ServerConfig::from_env();

    let quotes: Arc<dyn QuoteSource> = match config.quote_backend {
        QuoteBackend::Yahoo => Arc::new(YahooChartClient::from_env()?),
        QuoteBackend::Mock => Arc::new(MockQuoteSource::new()),
    };

    if quotes.health_check().await {
        tracing::info!("✓ Quote source {} reachable", quotes.name());
    } else {
        tracing::warn!("⚠ Quote source {} not reachable - market endpoints will fail", quotes.name());
    }

    let report_dir = config.report.output_dir.clone();
    let state = AppState::new(quotes, config.report);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 crypto report server running on http://{}", config.bind_addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("Report archive: {}", report_dir.display());
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health                         - Health check");
    tracing::info!("  GET  /api/crypto/prices              - Price history");
    tracing::info!("  GET  /api/crypto/analysis            - SMA trend");
    tracing::info!("  GET  /api/crypto/prediction          - Naive extrapolation");
    tracing::info!("  GET  /api/reports/latest             - Latest report (pdf|md)");
    tracing::info!("  GET  /api/reports/archive            - Archived reports");
    tracing::info!("  GET  /api/reports/download/{{id}}     - Download a report");
    tracing::info!("  GET  /api/user/settings              - User settings");
    tracing::info!("  POST /api/alerts/subscribe           - Subscribe to alerts");
    tracing::info!("");

    axum::serve(listener, app(state)).await?;

    Ok(())
}
