use std::sync::Arc;

use db::models::device::{CreateDevice, Device, DeviceWithStatus};
use serde::Deserialize;
use ts_rs::TS;

use super::{
    error::{Result, ServiceError, non_blank},
    store::DeviceStore,
};

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDevice {
    #[ts(optional)]
    pub device_id: Option<String>,
    #[ts(optional)]
    pub task_name: Option<String>,
}

impl RegisterDevice {
    pub fn new(device_id: &str, task_name: &str) -> Self {
        Self {
            device_id: Some(device_id.to_string()),
            task_name: Some(task_name.to_string()),
        }
    }
}

/// Device registry: registration, lookup with derived status, removal.
#[derive(Clone)]
pub struct DeviceService {
    store: Arc<dyn DeviceStore>,
}

impl DeviceService {
    pub fn new(store: Arc<dyn DeviceStore>) -> Self {
        Self { store }
    }

    pub async fn register(&self, payload: RegisterDevice) -> Result<Device> {
        let (Some(device_id), Some(task_name)) = (
            non_blank(payload.device_id.as_deref()),
            non_blank(payload.task_name.as_deref()),
        ) else {
            return Err(ServiceError::validation(
                "Device ID and task name are required.",
            ));
        };

        if self.store.find_device(&device_id).await?.is_some() {
            return Err(ServiceError::duplicate_device());
        }

        // A concurrent registration can still win between the check above and
        // this insert; the store reports that as a conflict too.
        let device = self
            .store
            .insert_device(&CreateDevice {
                device_id,
                task_name,
            })
            .await?;
        tracing::info!(device_id = %device.device_id, "Registered device");
        Ok(device)
    }

    pub async fn get(&self, device_id: &str) -> Result<DeviceWithStatus> {
        let device_id = require_device_id(device_id)?;
        self.store
            .find_device(&device_id)
            .await?
            .ok_or_else(|| ServiceError::device_not_found(&device_id))
    }

    pub async fn list(&self) -> Result<Vec<DeviceWithStatus>> {
        Ok(self.store.list_devices().await?)
    }

    pub async fn delete(&self, device_id: &str) -> Result<()> {
        let device_id = require_device_id(device_id)?;
        if !self.store.delete_device(&device_id).await? {
            return Err(ServiceError::device_not_found(&device_id));
        }
        tracing::info!(device_id = %device_id, "Deleted device and its status history");
        Ok(())
    }
}

pub(crate) fn require_device_id(device_id: &str) -> Result<String> {
    non_blank(Some(device_id)).ok_or_else(|| ServiceError::validation("Device ID is required."))
}
