use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryResult,
    Set,
};
use sea_orm::sea_query::{Alias, Expr, ExprTrait, JoinType, Order, Query};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::task_status_log::TaskStatusLog;
use crate::{
    entities::{device, task_status_log},
    types::TaskStatus,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub device_id: String,
    pub task_name: String,
    #[serde(with = "utils::time::rfc3339")]
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "utils::time::rfc3339")]
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// A device together with the status derived from its most recent log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct DeviceWithStatus {
    #[serde(flatten)]
    pub device: Device,
    pub current_status: TaskStatus,
    #[serde(with = "utils::time::rfc3339")]
    #[ts(type = "string")]
    pub last_updated_at: DateTime<Utc>,
}

impl std::ops::Deref for DeviceWithStatus {
    type Target = Device;
    fn deref(&self) -> &Self::Target {
        &self.device
    }
}

impl DeviceWithStatus {
    /// Without a log the device reads as `NOT_DONE`, last touched when the
    /// device row itself was.
    pub fn derive(device: Device, latest: Option<(TaskStatus, DateTime<Utc>)>) -> Self {
        let (current_status, last_updated_at) = match latest {
            Some((status, timestamp)) => (status, timestamp),
            None => (TaskStatus::NotDone, device.updated_at),
        };
        Self {
            device,
            current_status,
            last_updated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateDevice {
    pub device_id: String,
    pub task_name: String,
}

impl Device {
    fn from_model(model: device::Model) -> Self {
        Self {
            device_id: model.device_id,
            task_name: model.task_name,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }

    pub(crate) async fn find_model<C: ConnectionTrait>(
        db: &C,
        device_id: &str,
    ) -> Result<Option<device::Model>, DbErr> {
        device::Entity::find()
            .filter(device::Column::DeviceId.eq(device_id))
            .one(db)
            .await
    }

    pub async fn create<C: ConnectionTrait>(db: &C, data: &CreateDevice) -> Result<Self, DbErr> {
        let now = Utc::now();
        let active = device::ActiveModel {
            device_id: Set(data.device_id.clone()),
            task_name: Set(data.task_name.clone()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let model = active.insert(db).await?;
        Ok(Self::from_model(model))
    }

    pub async fn find_all_with_status<C: ConnectionTrait>(
        db: &C,
    ) -> Result<Vec<DeviceWithStatus>, DbErr> {
        Self::query_with_status(db, None).await
    }

    pub async fn find_with_status<C: ConnectionTrait>(
        db: &C,
        device_id: &str,
    ) -> Result<Option<DeviceWithStatus>, DbErr> {
        Ok(Self::query_with_status(db, Some(device_id))
            .await?
            .into_iter()
            .next())
    }

    /// Devices joined with their latest log in a single statement.
    ///
    /// The latest log is picked by a correlated subquery ordered by report
    /// timestamp and then by insertion sequence, so two reports for the same
    /// instant resolve to the one stored last.
    async fn query_with_status<C: ConnectionTrait>(
        db: &C,
        device_id: Option<&str>,
    ) -> Result<Vec<DeviceWithStatus>, DbErr> {
        let latest = Alias::new("latest");
        let latest_log_id = Query::select()
            .column((latest.clone(), task_status_log::Column::Id))
            .from_as(task_status_log::Entity, latest.clone())
            .and_where(
                Expr::col((latest.clone(), task_status_log::Column::DeviceId))
                    .equals((device::Entity, device::Column::Id)),
            )
            .order_by((latest.clone(), task_status_log::Column::Timestamp), Order::Desc)
            .order_by((latest.clone(), task_status_log::Column::Id), Order::Desc)
            .limit(1)
            .to_owned();

        let mut query = Query::select()
            .column((device::Entity, device::Column::DeviceId))
            .column((device::Entity, device::Column::TaskName))
            .column((device::Entity, device::Column::CreatedAt))
            .column((device::Entity, device::Column::UpdatedAt))
            .column((task_status_log::Entity, task_status_log::Column::Status))
            .column((task_status_log::Entity, task_status_log::Column::Timestamp))
            .from(device::Entity)
            .join(
                JoinType::LeftJoin,
                task_status_log::Entity,
                Expr::col((task_status_log::Entity, task_status_log::Column::Id))
                    .in_subquery(latest_log_id),
            )
            .order_by((device::Entity, device::Column::CreatedAt), Order::Desc)
            .order_by((device::Entity, device::Column::Id), Order::Desc)
            .to_owned();

        if let Some(device_id) = device_id {
            query.and_where(Expr::col((device::Entity, device::Column::DeviceId)).eq(device_id));
        }

        let rows = db.query_all(&query).await?;
        rows.iter().map(Self::from_status_row).collect()
    }

    fn from_status_row(row: &QueryResult) -> Result<DeviceWithStatus, DbErr> {
        let device = Device {
            device_id: row.try_get("", "device_id")?,
            task_name: row.try_get("", "task_name")?,
            created_at: row.try_get("", "created_at")?,
            updated_at: row.try_get("", "updated_at")?,
        };
        let status: Option<TaskStatus> = row.try_get("", "status")?;
        let timestamp: Option<DateTime<Utc>> = row.try_get("", "timestamp")?;
        Ok(DeviceWithStatus::derive(device, status.zip(timestamp)))
    }

    /// Renames the task, purging the device's history when `reset_history`
    /// is set. Run inside a transaction so both writes land together.
    pub async fn rename_task<C: ConnectionTrait>(
        db: &C,
        device_id: &str,
        task_name: &str,
        reset_history: bool,
    ) -> Result<Option<Self>, DbErr> {
        let Some(record) = Self::find_model(db, device_id).await? else {
            return Ok(None);
        };

        let row_id = record.id;
        let mut active: device::ActiveModel = record.into();
        active.task_name = Set(task_name.to_string());
        active.updated_at = Set(Utc::now());
        let updated = active.update(db).await?;

        if reset_history {
            let purged = TaskStatusLog::delete_by_device_row(db, row_id).await?;
            tracing::debug!(device_id, purged, "Purged status history");
        }
        Ok(Some(Self::from_model(updated)))
    }

    /// Removes the device and every log it owns. Run inside a transaction so
    /// both deletes land together. Returns the number of device rows removed.
    pub async fn delete<C: ConnectionTrait>(db: &C, device_id: &str) -> Result<u64, DbErr> {
        let Some(record) = Self::find_model(db, device_id).await? else {
            return Ok(0);
        };

        let logs_removed = TaskStatusLog::delete_by_device_row(db, record.id).await?;
        let result = device::Entity::delete_many()
            .filter(device::Column::Id.eq(record.id))
            .exec(db)
            .await?;
        tracing::debug!(device_id, logs_removed, "Deleted device rows");
        Ok(result.rows_affected)
    }
}
