use axum::{
    extract::{Path, Query, State, rejection::QueryRejection},
    response::Json as ResponseJson,
};
use db::models::task_status_log::DeviceHistory;
use services::services::history::HistoryQuery;

use crate::{DeploymentImpl, error::ApiError};

pub async fn get_history(
    State(deployment): State<DeploymentImpl>,
    Path(device_id): Path<String>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<ResponseJson<DeviceHistory>, ApiError> {
    let Query(query) = query?;
    let history = deployment.history().get_history(&device_id, query).await?;
    Ok(ResponseJson(history))
}
