use std::sync::Arc;

use db::models::device::Device;
use serde::Deserialize;
use ts_rs::TS;

use super::{
    device::require_device_id,
    error::{Result, ServiceError, non_blank},
    store::DeviceStore,
};

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct RenameTask {
    #[ts(optional)]
    pub task_name: Option<String>,
    #[serde(default)]
    pub reset_history: bool,
}

impl RenameTask {
    pub fn new(task_name: &str, reset_history: bool) -> Self {
        Self {
            task_name: Some(task_name.to_string()),
            reset_history,
        }
    }
}

/// Task management: renaming a device's task, optionally wiping its history.
#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn DeviceStore>,
}

impl TaskService {
    pub fn new(store: Arc<dyn DeviceStore>) -> Self {
        Self { store }
    }

    /// After a reset the device has no logs, so its derived status falls back
    /// to `NOT_DONE` on the next read.
    pub async fn rename(&self, device_id: &str, payload: RenameTask) -> Result<Device> {
        let device_id = require_device_id(device_id)?;
        let task_name = non_blank(payload.task_name.as_deref()).ok_or_else(|| {
            ServiceError::validation("Task name is required and must be a non-empty string.")
        })?;

        let device = self
            .store
            .rename_task(&device_id, &task_name, payload.reset_history)
            .await?
            .ok_or_else(|| ServiceError::device_not_found(&device_id))?;
        tracing::info!(
            device_id = %device.device_id,
            reset_history = payload.reset_history,
            "Updated task name"
        );
        Ok(device)
    }
}
