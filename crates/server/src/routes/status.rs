use axum::{Router, extract::State, http::StatusCode, response::Json as ResponseJson, routing::post};
use db::models::task_status_log::TaskStatusLog;
use serde::Serialize;
use services::services::status::RecordStatus;
use ts_rs::TS;

use crate::{DeploymentImpl, error::ApiError, http::extract::JsonBody};

#[derive(Debug, Serialize, TS)]
pub struct StatusResponse {
    pub message: String,
    pub log: TaskStatusLog,
}

/// Ingestion endpoint called by the devices themselves.
pub async fn record_status(
    State(deployment): State<DeploymentImpl>,
    JsonBody(payload): JsonBody<RecordStatus>,
) -> Result<(StatusCode, ResponseJson<StatusResponse>), ApiError> {
    let log = deployment.status().record(payload).await?;
    Ok((
        StatusCode::CREATED,
        ResponseJson(StatusResponse {
            message: "Status recorded successfully.".to_string(),
            log,
        }),
    ))
}

pub fn router() -> Router<DeploymentImpl> {
    Router::new().route("/status", post(record_status))
}
