// Maintenance window endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::info;

use super::common::{bad_request, error_response, parse_body, ApiError, ApiResponse, ApiResult};
use crate::window::{MaintenanceWindow, NewWindow, WindowUpdate};
use crate::web::AppState;

pub async fn list_windows(State(state): State<AppState>) -> ApiResult<Vec<MaintenanceWindow>> {
    let windows = state.scheduler.list().await.map_err(error_response)?;
    Ok(Json(ApiResponse::success(windows)))
}

pub async fn get_window(
    Path(mw_id): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<MaintenanceWindow> {
    let window = state.scheduler.get(&mw_id).await.map_err(error_response)?;
    Ok(Json(ApiResponse::success(window)))
}

pub async fn create_window(
    State(state): State<AppState>,
    payload: Result<Json<NewWindow>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Value>>), ApiError> {
    let payload = parse_body(payload)?;
    let force = payload.force;
    let window = payload.into_window(Utc::now()).map_err(error_response)?;

    let stored = state
        .scheduler
        .add(window, force)
        .await
        .map_err(error_response)?;

    info!("Maintenance window {} created via API", stored.id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(json!({ "mw_id": stored.id }))),
    ))
}

pub async fn update_window(
    Path(mw_id): Path<String>,
    State(state): State<AppState>,
    payload: Result<Json<WindowUpdate>, JsonRejection>,
) -> ApiResult<MaintenanceWindow> {
    let patch = parse_body(payload)?;
    let updated = state
        .scheduler
        .update(&mw_id, patch)
        .await
        .map_err(error_response)?;

    Ok(Json(
        ApiResponse::success(updated).with_message(format!("Maintenance {} updated", mw_id)),
    ))
}

pub async fn remove_window(
    Path(mw_id): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<Value> {
    state
        .scheduler
        .remove(&mw_id)
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(json!({
        "response": format!("Maintenance with id {} successfully removed", mw_id)
    }))))
}

pub async fn end_window(
    Path(mw_id): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<Value> {
    let finished = state
        .scheduler
        .end_maintenance_early(&mw_id)
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(json!({
        "response": format!("Maintenance window {} finished", mw_id),
        "status": finished.status,
    }))))
}

/// Body: `{"minutes": <integer>}`
pub async fn extend_window(
    Path(mw_id): Path<String>,
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<MaintenanceWindow> {
    let body = parse_body(payload)?;
    let minutes = match body.get("minutes") {
        None | Some(Value::Null) => {
            return Err(bad_request("Minutes of extension must be sent"));
        }
        Some(value) => value
            .as_i64()
            .ok_or_else(|| bad_request("Minutes of extension must be integer"))?,
    };

    let extended = state
        .scheduler
        .extend(&mw_id, minutes)
        .await
        .map_err(error_response)?;

    Ok(Json(
        ApiResponse::success(extended)
            .with_message(format!("Maintenance {} extended by {} minutes", mw_id, minutes)),
    ))
}
