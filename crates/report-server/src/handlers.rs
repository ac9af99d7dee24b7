//! HTTP Handlers

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crypto_report::quotes::recent_history;
use crypto_report::{
    analyze, AssetAnalysis, PriceBar, Prediction, ReportEntry, ReportFormat, Trend,
};

use crate::alerts::{AlertCondition, AlertSubscription, SubscribeOutcome, SubscriptionStore};
use crate::error::{ApiError, Result};
use crate::settings::{SettingsStore, UserSettings};
use crate::state::AppState;

const DEFAULT_SYMBOL: &str = "BTC-USD";
const DEFAULT_RANGE: &str = "7d";

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct PriceQuery {
    pub symbol: Option<String>,
    pub range: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SymbolQuery {
    pub symbol: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FormatQuery {
    pub format: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRequest {
    pub user_id: Option<String>,
    pub crypto_symbol: Option<String>,
    pub alert_condition: Option<String>,
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub quote_source: String,
    pub quotes_available: bool,
}

#[derive(Serialize)]
pub struct PricesResponse {
    pub symbol: String,
    pub range: String,
    pub data: Vec<PriceBar>,
}

#[derive(Serialize)]
pub struct AnalysisResponse {
    pub symbol: String,
    pub as_of: NaiveDate,
    pub current_price: Decimal,
    pub daily_change_pct: Option<Decimal>,
    pub sma_short: Option<Decimal>,
    pub sma_long: Option<Decimal>,
    pub sma_short_window: usize,
    pub sma_long_window: usize,
    pub trend: Trend,
}

#[derive(Serialize)]
pub struct PredictionResponse {
    pub symbol: String,
    pub method: &'static str,
    pub horizon_days: u32,
    pub predictions: Vec<Prediction>,
}

#[derive(Serialize)]
pub struct ArchiveResponse {
    pub archive: Vec<ReportEntry>,
}

#[derive(Serialize)]
pub struct SettingsResponse {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub settings: UserSettings,
}

#[derive(Serialize)]
pub struct SubscriptionsResponse {
    pub status: &'static str,
    pub subscriptions: Vec<AlertSubscription>,
}

#[derive(Serialize)]
pub struct AlertResponse {
    pub status: &'static str,
    pub message: String,
    pub outcome: Option<SubscribeOutcome>,
    pub subscription: AlertSubscription,
}

// ============================================================================
// Helpers
// ============================================================================

fn parse_format(format: Option<&str>) -> Result<ReportFormat> {
    let raw = format.unwrap_or("pdf");
    raw.parse().map_err(|_| ApiError::InvalidFormat(raw.to_string()))
}

fn require_user(user_id: Option<String>, message: &str) -> Result<String> {
    user_id
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::BadRequest(message.into()))
}

fn symbol_or_default(symbol: Option<String>) -> String {
    symbol
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_SYMBOL.into())
}

/// Fetch recent history and analyze it with the report settings
async fn load_analysis(state: &AppState, symbol: &str) -> Result<AssetAnalysis> {
    let config = &state.report_config;
    let bars = recent_history(
        state.quotes.as_ref(),
        symbol,
        &config.history_range,
        config.history_window,
    )
    .await?;

    analyze(symbol, &bars, &config.params).ok_or_else(|| ApiError::InsufficientData(symbol.into()))
}

/// Archived report file as a download
async fn report_file(state: &AppState, entry: &ReportEntry, format: ReportFormat) -> Result<Response> {
    let path = state.archive.file_path(entry, format).ok_or_else(|| {
        ApiError::NotFound(format!("Report {} is not available as {format}", entry.id))
    })?;
    let bytes = tokio::fs::read(&path).await?;
    let file_name = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{file_name}\"")),
        ],
        bytes,
    )
        .into_response())
}

fn alert_fields(payload: AlertRequest, action: &str) -> Result<(String, String, AlertCondition)> {
    let missing = || {
        ApiError::BadRequest(format!(
            "Missing data for alert {action} (userId, cryptoSymbol, alertCondition required)"
        ))
    };
    let field = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

    let user = field(payload.user_id).ok_or_else(missing)?;
    let symbol = field(payload.crypto_symbol).ok_or_else(missing)?.to_uppercase();
    let condition = field(payload.alert_condition).ok_or_else(missing)?.parse()?;
    Ok((user, symbol, condition))
}

// ============================================================================
// Handlers
// ============================================================================

/// Plain text liveness probe
pub async fn hello() -> &'static str {
    "Hello from the crypto report server!"
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        quote_source: state.quotes.name().to_string(),
        quotes_available: state.quotes.health_check().await,
    })
}

pub async fn index() -> Json<Value> {
    Json(json!({"message": "Welcome to the Crypto Analysis API!"}))
}

/// Daily bars for a symbol and range
pub async fn crypto_prices(
    State(state): State<AppState>,
    Query(query): Query<PriceQuery>,
) -> Result<Json<PricesResponse>> {
    let symbol = symbol_or_default(query.symbol);
    let range = query.range.unwrap_or_else(|| DEFAULT_RANGE.into());
    let data = state.quotes.daily_history(&symbol, &range).await?;

    Ok(Json(PricesResponse { symbol, range, data }))
}

/// Latest indicators and trend
pub async fn crypto_analysis(
    State(state): State<AppState>,
    Query(query): Query<SymbolQuery>,
) -> Result<Json<AnalysisResponse>> {
    let symbol = symbol_or_default(query.symbol);
    let analysis = load_analysis(&state, &symbol).await?;
    let latest = analysis
        .latest()
        .ok_or_else(|| ApiError::InsufficientData(symbol.clone()))?;
    let params = &state.report_config.params;

    Ok(Json(AnalysisResponse {
        as_of: latest.bar.date,
        sma_short: latest.sma_short,
        sma_long: latest.sma_long,
        sma_short_window: params.sma_short,
        sma_long_window: params.sma_long,
        current_price: analysis.current_price,
        daily_change_pct: analysis.daily_change_pct,
        trend: analysis.trend,
        symbol,
    }))
}

/// Extrapolated prices
pub async fn crypto_prediction(
    State(state): State<AppState>,
    Query(query): Query<SymbolQuery>,
) -> Result<Json<PredictionResponse>> {
    let symbol = symbol_or_default(query.symbol);
    let analysis = load_analysis(&state, &symbol).await?;

    Ok(Json(PredictionResponse {
        symbol,
        method: "sma_linear_extrapolation",
        horizon_days: state.report_config.params.horizon_days,
        predictions: analysis.predictions,
    }))
}

/// Newest archived report in the requested format
pub async fn latest_report(
    State(state): State<AppState>,
    Query(query): Query<FormatQuery>,
) -> Result<Response> {
    let format = parse_format(query.format.as_deref())?;
    let entry = state
        .archive
        .latest(format)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No {format} report available")))?;

    report_file(&state, &entry, format).await
}

pub async fn reports_archive(State(state): State<AppState>) -> Result<Json<ArchiveResponse>> {
    Ok(Json(ArchiveResponse {
        archive: state.archive.list().await?,
    }))
}

/// Archived report by id (its date)
pub async fn download_report(
    State(state): State<AppState>,
    Path(report_id): Path<String>,
    Query(query): Query<FormatQuery>,
) -> Result<Response> {
    let format = parse_format(query.format.as_deref())?;
    let entry = state
        .archive
        .find(&report_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Report {report_id} not found")))?;

    report_file(&state, &entry, format).await
}

pub async fn get_settings(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<SettingsResponse>> {
    let user_id = require_user(query.user_id, "User identifier is required")?;
    let settings = state
        .settings
        .get(&user_id)?
        .map(|p| p.settings)
        .unwrap_or_default();

    Ok(Json(SettingsResponse { user_id, settings }))
}

/// Replace a user's settings and echo what was stored
pub async fn update_settings(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
    Json(payload): Json<UserSettings>,
) -> Result<Json<SettingsResponse>> {
    let user_id = require_user(query.user_id, "User identifier is required")?;
    let stored = state.settings.put(&user_id, payload)?;
    tracing::info!(user = %user_id, "User settings updated");

    Ok(Json(SettingsResponse {
        user_id,
        settings: stored.settings,
    }))
}

pub async fn list_subscriptions(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<SubscriptionsResponse>> {
    let user_id = require_user(
        query.user_id,
        "User identifier is required for fetching subscriptions",
    )?;

    Ok(Json(SubscriptionsResponse {
        status: "success",
        subscriptions: state.subscriptions.active_for_user(&user_id)?,
    }))
}

pub async fn subscribe(
    State(state): State<AppState>,
    Json(payload): Json<AlertRequest>,
) -> Result<Json<AlertResponse>> {
    let (user, symbol, condition) = alert_fields(payload, "subscription")?;
    let (outcome, subscription) = state.subscriptions.subscribe(&user, &symbol, condition)?;
    tracing::info!(%user, %symbol, %condition, ?outcome, "Alert subscription");

    Ok(Json(AlertResponse {
        status: "success",
        message: format!("Successfully subscribed {user} to {symbol} alerts for {condition}."),
        outcome: Some(outcome),
        subscription,
    }))
}

pub async fn unsubscribe(
    State(state): State<AppState>,
    Json(payload): Json<AlertRequest>,
) -> Result<Json<AlertResponse>> {
    let (user, symbol, condition) = alert_fields(payload, "unsubscription")?;
    let subscription = state
        .subscriptions
        .unsubscribe(&user, &symbol, condition)?
        .ok_or_else(|| {
            ApiError::NotFound(format!("No active {symbol} subscription for {condition}"))
        })?;
    tracing::info!(%user, %symbol, %condition, "Alert unsubscription");

    Ok(Json(AlertResponse {
        status: "success",
        message: format!("Successfully unsubscribed {user} from {symbol} alerts for {condition}."),
        outcome: None,
        subscription,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_format_defaults_to_pdf() {
        assert_eq!(parse_format(None).unwrap(), ReportFormat::Pdf);
        assert_eq!(parse_format(Some("MD")).unwrap(), ReportFormat::Md);
        assert!(matches!(parse_format(Some("html")), Err(ApiError::InvalidFormat(_))));
    }

    #[test]
    fn test_alert_fields_required() {
        let missing = AlertRequest {
            user_id: Some("u1".into()),
            crypto_symbol: None,
            alert_condition: Some("price_exceeds_1".into()),
        };
        assert!(matches!(alert_fields(missing, "subscription"), Err(ApiError::BadRequest(_))));

        let ok = AlertRequest {
            user_id: Some(" u1 ".into()),
            crypto_symbol: Some("btc-usd".into()),
            alert_condition: Some("price_exceeds_1".into()),
        };
        let (user, symbol, _) = alert_fields(ok, "subscription").unwrap();
        assert_eq!(user, "u1");
        assert_eq!(symbol, "BTC-USD");
    }
}
