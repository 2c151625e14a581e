use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{get, put},
};
use db::models::device::{Device, DeviceWithStatus};
use serde::Serialize;
use services::services::{device::RegisterDevice, task::RenameTask};
use ts_rs::TS;

use crate::{DeploymentImpl, error::ApiError, http::extract::JsonBody, routes::history};

#[derive(Debug, Serialize, TS)]
pub struct DeviceResponse {
    pub message: String,
    pub device: Device,
}

#[derive(Debug, Serialize, TS)]
pub struct DeviceListResponse {
    pub devices: Vec<DeviceWithStatus>,
}

#[derive(Debug, Serialize, TS)]
pub struct MessageResponse {
    pub message: String,
}

pub async fn register_device(
    State(deployment): State<DeploymentImpl>,
    JsonBody(payload): JsonBody<RegisterDevice>,
) -> Result<(StatusCode, ResponseJson<DeviceResponse>), ApiError> {
    let device = deployment.devices().register(payload).await?;
    Ok((
        StatusCode::CREATED,
        ResponseJson(DeviceResponse {
            message: "Device registered successfully.".to_string(),
            device,
        }),
    ))
}

pub async fn list_devices(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<DeviceListResponse>, ApiError> {
    let devices = deployment.devices().list().await?;
    Ok(ResponseJson(DeviceListResponse { devices }))
}

pub async fn get_device(
    State(deployment): State<DeploymentImpl>,
    Path(device_id): Path<String>,
) -> Result<ResponseJson<DeviceWithStatus>, ApiError> {
    let device = deployment.devices().get(&device_id).await?;
    Ok(ResponseJson(device))
}

pub async fn delete_device(
    State(deployment): State<DeploymentImpl>,
    Path(device_id): Path<String>,
) -> Result<ResponseJson<MessageResponse>, ApiError> {
    deployment.devices().delete(&device_id).await?;
    Ok(ResponseJson(MessageResponse {
        message: "Device and associated data deleted successfully.".to_string(),
    }))
}

pub async fn update_task(
    State(deployment): State<DeploymentImpl>,
    Path(device_id): Path<String>,
    JsonBody(payload): JsonBody<RenameTask>,
) -> Result<ResponseJson<DeviceResponse>, ApiError> {
    let device = deployment.tasks().rename(&device_id, payload).await?;
    Ok(ResponseJson(DeviceResponse {
        message: "Device information updated successfully.".to_string(),
        device,
    }))
}

pub fn router() -> Router<DeploymentImpl> {
    let device_router = Router::new()
        .route("/", get(list_devices).post(register_device))
        .route("/{device_id}", get(get_device).delete(delete_device))
        .route("/{device_id}/task", put(update_task))
        .route("/{device_id}/history", get(history::get_history));

    Router::new().nest("/devices", device_router)
}
