use std::{str::FromStr, sync::Arc};

use db::{
    models::task_status_log::{CreateStatusLog, TaskStatusLog},
    types::TaskStatus,
};
use serde::Deserialize;
use ts_rs::TS;

use super::{
    error::{Result, ServiceError, non_blank},
    store::DeviceStore,
};

/// Body of a device status report. Fields stay optional so missing values
/// produce a validation message instead of a decode failure.
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct RecordStatus {
    #[ts(optional)]
    pub device_id: Option<String>,
    #[ts(optional)]
    pub status: Option<String>,
    #[ts(optional)]
    pub timestamp: Option<String>,
}

impl RecordStatus {
    pub fn new(device_id: &str, status: &str, timestamp: &str) -> Self {
        Self {
            device_id: Some(device_id.to_string()),
            status: Some(status.to_string()),
            timestamp: Some(timestamp.to_string()),
        }
    }

    fn validate(&self) -> Result<CreateStatusLog> {
        let (Some(device_id), Some(status), Some(timestamp)) = (
            non_blank(self.device_id.as_deref()),
            non_blank(self.status.as_deref()),
            non_blank(self.timestamp.as_deref()),
        ) else {
            return Err(ServiceError::validation(
                "Device ID, status, and timestamp are required.",
            ));
        };

        let status = TaskStatus::from_str(&status).map_err(|_| {
            ServiceError::validation(r#"Status must be either "DONE" or "NOT_DONE"."#)
        })?;
        let timestamp = utils::time::parse_instant(&timestamp)
            .ok_or_else(|| ServiceError::validation("Invalid timestamp format."))?;

        Ok(CreateStatusLog {
            device_id,
            status,
            timestamp,
        })
    }
}

/// Status ingestion. Every accepted report becomes a new immutable log row.
#[derive(Clone)]
pub struct StatusService {
    store: Arc<dyn DeviceStore>,
}

impl StatusService {
    pub fn new(store: Arc<dyn DeviceStore>) -> Self {
        Self { store }
    }

    pub async fn record(&self, payload: RecordStatus) -> Result<TaskStatusLog> {
        let data = payload.validate()?;
        let log = self
            .store
            .append_log(&data)
            .await?
            .ok_or_else(|| ServiceError::device_not_found(&data.device_id))?;
        tracing::debug!(
            device_id = %log.device_id,
            status = %log.status,
            timestamp = %log.timestamp,
            "Recorded task status"
        );
        Ok(log)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::services::{
        device::{DeviceService, RegisterDevice},
        history::{HistoryQuery, HistoryService},
        store::test_support::all_stores,
    };

    #[tokio::test]
    async fn latest_timestamp_drives_current_status() {
        for (name, store) in all_stores().await {
            let devices = DeviceService::new(store.clone());
            let status = StatusService::new(store);
            devices
                .register(RegisterDevice::new("dev-1", "Feed fish"))
                .await
                .unwrap();

            status
                .record(RecordStatus::new("dev-1", "NOT_DONE", "2024-01-01T00:00:00Z"))
                .await
                .unwrap();
            let log = status
                .record(RecordStatus::new("dev-1", "DONE", "2024-01-01T08:00:00Z"))
                .await
                .unwrap();
            assert_eq!(log.device_id, "dev-1");
            assert_eq!(log.status, TaskStatus::Done);

            let device = devices.get("dev-1").await.unwrap();
            assert_eq!(device.current_status, TaskStatus::Done, "{name}");
            assert_eq!(
                utils::time::format_timestamp(&device.last_updated_at),
                "2024-01-01T08:00:00Z",
                "{name}"
            );
        }
    }

    #[tokio::test]
    async fn out_of_order_reports_do_not_regress_current_status() {
        for (name, store) in all_stores().await {
            let devices = DeviceService::new(store.clone());
            let status = StatusService::new(store);
            devices
                .register(RegisterDevice::new("dev-1", "Feed fish"))
                .await
                .unwrap();

            for (value, timestamp) in [
                ("DONE", "2024-01-03T00:00:00Z"),
                ("NOT_DONE", "2024-01-01T00:00:00Z"),
                ("NOT_DONE", "2024-01-02T00:00:00Z"),
            ] {
                status
                    .record(RecordStatus::new("dev-1", value, timestamp))
                    .await
                    .unwrap();
            }

            let device = devices.get("dev-1").await.unwrap();
            assert_eq!(device.current_status, TaskStatus::Done, "{name}");
            assert_eq!(
                device.last_updated_at,
                Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap()
            );
        }
    }

    #[tokio::test]
    async fn unknown_device_is_not_found_and_writes_nothing() {
        for (name, store) in all_stores().await {
            let devices = DeviceService::new(store.clone());
            let status = StatusService::new(store.clone());
            let history = HistoryService::new(store);

            let err = status
                .record(RecordStatus::new("ghost", "DONE", "2024-01-01T00:00:00Z"))
                .await
                .unwrap_err();
            assert!(matches!(err, ServiceError::NotFound(_)), "{name}");

            // Registering afterwards must not reveal a stray row.
            devices
                .register(RegisterDevice::new("ghost", "Feed fish"))
                .await
                .unwrap();
            let page = history
                .get_history("ghost", HistoryQuery::default())
                .await
                .unwrap();
            assert!(page.history.is_empty(), "{name}");
        }
    }

    #[tokio::test]
    async fn invalid_reports_are_rejected_before_storage() {
        for (name, store) in all_stores().await {
            let status = StatusService::new(store);
            let cases = [
                (RecordStatus::default(), "Device ID, status, and timestamp are required."),
                (
                    RecordStatus::new("dev-1", "done-ish", "2024-01-01T00:00:00Z"),
                    r#"Status must be either "DONE" or "NOT_DONE"."#,
                ),
                (
                    RecordStatus::new("dev-1", "DONE", "yesterday"),
                    "Invalid timestamp format.",
                ),
            ];
            for (payload, message) in cases {
                let err = status.record(payload).await.unwrap_err();
                assert!(matches!(err, ServiceError::Validation(_)), "{name}");
                assert_eq!(err.to_string(), message, "{name}");
            }
        }
    }
}
