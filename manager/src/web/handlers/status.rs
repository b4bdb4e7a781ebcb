// Device maintenance status endpoints

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::Serialize;
use std::collections::BTreeSet;

use super::common::{error_response, ApiResponse, ApiResult};
use crate::maintenance_tracker::{DeviceKind, MaintenanceSnapshot};
use crate::topology::EntityStatus;
use crate::web::AppState;

#[derive(Debug, Serialize)]
pub struct DeviceStatus {
    pub kind: DeviceKind,
    pub id: String,
    pub status: EntityStatus,
    pub status_reason: BTreeSet<String>,
}

pub async fn get_device_status(
    Path((kind, device_id)): Path<(String, String)>,
    State(state): State<AppState>,
) -> ApiResult<DeviceStatus> {
    let kind: DeviceKind = kind.parse().map_err(error_response)?;
    let tracker = state.tracker();

    Ok(Json(ApiResponse::success(DeviceStatus {
        kind,
        status: tracker.status(kind, &device_id).await,
        status_reason: tracker.status_reason(kind, &device_id).await,
        id: device_id,
    })))
}

pub async fn get_maintenance_counts(
    State(state): State<AppState>,
) -> ApiResult<MaintenanceSnapshot> {
    Ok(Json(ApiResponse::success(state.tracker().snapshot().await)))
}
