//! API Error Types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crypto_report::ReportError;

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Not enough history to analyze the symbol
    #[error("Insufficient data for {0}")]
    InsufficientData(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Report(#[from] ReportError),
}

impl From<std::io::Error> for ApiError {
    fn from(e: std::io::Error) -> Self {
        ApiError::Report(ReportError::Io(e))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::InvalidFormat(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InsufficientData(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Report(e) => match e {
                ReportError::UnsupportedAsset(_) | ReportError::NoData(_) => StatusCode::NOT_FOUND,
                ReportError::InvalidFormat(_) | ReportError::Config(_) => StatusCode::BAD_REQUEST,
                ReportError::Upstream(_) | ReportError::Network(_) => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::InvalidFormat(_) => "INVALID_FORMAT",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InsufficientData(_) => "INSUFFICIENT_DATA",
            ApiError::Storage(_) => "STORAGE_ERROR",
            ApiError::Report(e) => match e {
                ReportError::UnsupportedAsset(_) => "UNSUPPORTED_ASSET",
                ReportError::NoData(_) => "NO_DATA",
                ReportError::InvalidFormat(_) => "INVALID_FORMAT",
                ReportError::Config(_) => "BAD_REQUEST",
                ReportError::Upstream(_) | ReportError::Network(_) => "UPSTREAM_ERROR",
                _ => "INTERNAL_ERROR",
            },
        }
    }

    /// Message that is safe to return to clients
    pub fn user_message(&self) -> String {
        match self {
            ApiError::BadRequest(msg) | ApiError::NotFound(msg) => msg.clone(),
            ApiError::InvalidFormat(_) => "Invalid format. Choose pdf or md.".into(),
            ApiError::InsufficientData(symbol) => {
                format!("Insufficient data to generate analysis for {symbol}.")
            }
            ApiError::Storage(_) => "An error occurred processing your request.".into(),
            ApiError::Report(ReportError::Config(msg)) => msg.clone(),
            ApiError::Report(e) => e.user_message(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        let body = ErrorResponse {
            error: self.user_message(),
            code: self.code().into(),
        };
        (status, Json(body)).into_response()
    }
}
