//! Crypto Report HTTP API
//!
//! Serves the generated report archive, live price/analysis/prediction data
//! from the quote source, and in-memory user settings and alert subscriptions.

pub mod alerts;
pub mod config;
pub mod error;
pub mod handlers;
pub mod settings;
pub mod state;

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use config::{QuoteBackend, ServerConfig};
pub use error::{ApiError, ErrorResponse};
pub use state::AppState;

use crate::handlers::{
    crypto_analysis, crypto_prediction, crypto_prices, download_report, get_settings,
    health_check, hello, index, latest_report, list_subscriptions, reports_archive, subscribe,
    unsubscribe, update_settings,
};

/// Build the application router
pub fn app(state: AppState) -> Router {
    // CORS open to every origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health & info
        .route("/hello", get(hello))
        .route("/health", get(health_check))
        .route("/api", get(index))
        .route("/api/", get(index))

        // Market data
        .route("/api/crypto/prices", get(crypto_prices))
        .route("/api/crypto/analysis", get(crypto_analysis))
        .route("/api/crypto/prediction", get(crypto_prediction))

        // Reports
        .route("/api/reports/latest", get(latest_report))
        .route("/api/reports/archive", get(reports_archive))
        .route("/api/reports/download/{report_id}", get(download_report))

        // Users & alerts
        .route("/api/user/settings", get(get_settings).post(update_settings))
        .route("/api/alerts/subscriptions", get(list_subscriptions))
        .route("/api/alerts/subscribe", post(subscribe))
        .route("/api/alerts/unsubscribe", post(unsubscribe))

        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
