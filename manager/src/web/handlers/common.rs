// Common types and utilities for API handlers

use axum::{extract::rejection::JsonRejection, http::StatusCode, response::Json};
use chrono::Utc;
use serde::Serialize;
use tracing::warn;

use crate::errors::MaintenanceError;

pub type ApiError = (StatusCode, Json<ApiResponse<()>>);

// Helper type for API responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl ApiResponse<()> {
    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

pub fn error_response(err: MaintenanceError) -> ApiError {
    let status = err.status_code();
    if status.is_server_error() {
        tracing::error!("Request failed: {}", err);
    } else {
        warn!("Request rejected ({}): {}", status, err);
    }
    (status, Json(ApiResponse::error(err.to_string())))
}

pub fn bad_request(message: impl Into<String>) -> ApiError {
    let message = message.into();
    warn!("Bad request: {}", message);
    (StatusCode::BAD_REQUEST, Json(ApiResponse::error(message)))
}

/// Malformed bodies are a 400 regardless of which extractor check failed
pub fn parse_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| bad_request(rejection.body_text()))
}
