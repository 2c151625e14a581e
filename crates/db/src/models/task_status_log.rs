use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Select, Set,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use super::device::Device;
use crate::{
    entities::task_status_log,
    types::{HistoryOrder, TaskStatus},
};

/// A stored status report as returned by the ingestion endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusLog {
    pub log_id: Uuid,
    pub device_id: String,
    #[serde(with = "utils::time::rfc3339")]
    #[ts(type = "string")]
    pub timestamp: DateTime<Utc>,
    pub status: TaskStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub log_id: Uuid,
    #[serde(with = "utils::time::rfc3339")]
    #[ts(type = "string")]
    pub timestamp: DateTime<Utc>,
    pub status: TaskStatus,
}

impl From<TaskStatusLog> for HistoryEntry {
    fn from(log: TaskStatusLog) -> Self {
        Self {
            log_id: log.log_id,
            timestamp: log.timestamp,
            status: log.status,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateStatusLog {
    pub device_id: String,
    pub status: TaskStatus,
    pub timestamp: DateTime<Utc>,
}

/// Largest `limit`/`offset` SQLite can bind; values above it are rejected
/// before they reach a query.
pub const MAX_WINDOW: u64 = i64::MAX as u64;

/// Already-validated history filter. Both bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryOptions {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub order: HistoryOrder,
}

impl HistoryOptions {
    pub fn contains(&self, timestamp: &DateTime<Utc>) -> bool {
        self.start.is_none_or(|start| *timestamp >= start)
            && self.end.is_none_or(|end| *timestamp <= end)
    }

    pub fn is_paginated(&self) -> bool {
        self.limit.is_some() || self.offset.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub total_count: u64,
    pub current_page: u64,
    pub total_pages: u64,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

impl PageInfo {
    /// Pagination metadata, present only when the caller asked for a window.
    pub fn new(total_count: u64, limit: Option<u64>, offset: Option<u64>) -> Option<Self> {
        if limit.is_none() && offset.is_none() {
            return None;
        }

        let current_page = match (limit, offset) {
            (Some(limit), Some(offset)) if limit > 0 => (offset / limit).saturating_add(1),
            _ => 1,
        };
        let total_pages = match limit {
            Some(limit) if limit > 0 => total_count.div_ceil(limit),
            _ => 1,
        };
        let has_next_page =
            limit.is_some_and(|limit| offset.unwrap_or(0).saturating_add(limit) < total_count);
        let has_previous_page = offset.is_some_and(|offset| offset > 0);

        Some(Self {
            total_count,
            current_page,
            total_pages,
            has_next_page,
            has_previous_page,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct DeviceHistory {
    pub device_id: String,
    pub task_name: String,
    pub history: Vec<HistoryEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub page_info: Option<PageInfo>,
}

impl TaskStatusLog {
    fn from_model(model: task_status_log::Model, device_id: &str) -> Self {
        Self {
            log_id: model.uuid,
            device_id: device_id.to_string(),
            timestamp: model.timestamp,
            status: model.status,
        }
    }

    /// Appends a log row. Returns `None` when the device is not registered;
    /// ingestion never creates devices implicitly.
    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateStatusLog,
    ) -> Result<Option<Self>, DbErr> {
        let Some(device) = Device::find_model(db, &data.device_id).await? else {
            return Ok(None);
        };

        let active = task_status_log::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            device_id: Set(device.id),
            status: Set(data.status),
            timestamp: Set(data.timestamp),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        let model = active.insert(db).await?;
        Ok(Some(Self::from_model(model, &device.device_id)))
    }

    pub(crate) async fn delete_by_device_row<C: ConnectionTrait>(
        db: &C,
        device_row_id: i64,
    ) -> Result<u64, DbErr> {
        let result = task_status_log::Entity::delete_many()
            .filter(task_status_log::Column::DeviceId.eq(device_row_id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }
}

impl DeviceHistory {
    /// Filtered, ordered and optionally windowed history of one device.
    /// Returns `None` when the device does not exist.
    pub async fn find<C: ConnectionTrait>(
        db: &C,
        device_id: &str,
        options: &HistoryOptions,
    ) -> Result<Option<Self>, DbErr> {
        let Some(device) = Device::find_model(db, device_id).await? else {
            return Ok(None);
        };

        let filtered = Self::filtered(device.id, options);
        let page_info = if options.is_paginated() {
            let total_count = filtered.clone().count(db).await?;
            PageInfo::new(total_count, options.limit, options.offset)
        } else {
            None
        };

        let mut select = match options.order {
            HistoryOrder::Asc => filtered
                .order_by_asc(task_status_log::Column::Timestamp)
                .order_by_asc(task_status_log::Column::Id),
            HistoryOrder::Desc => filtered
                .order_by_desc(task_status_log::Column::Timestamp)
                .order_by_desc(task_status_log::Column::Id),
        };
        // SQLite only accepts OFFSET after a LIMIT.
        match (options.limit, options.offset) {
            (Some(limit), offset) => {
                select = select
                    .limit(limit.min(MAX_WINDOW))
                    .offset(offset.map(|offset| offset.min(MAX_WINDOW)));
            }
            (None, Some(offset)) => {
                select = select.limit(MAX_WINDOW).offset(offset.min(MAX_WINDOW));
            }
            (None, None) => {}
        }

        let history = select
            .all(db)
            .await?
            .into_iter()
            .map(|model| HistoryEntry {
                log_id: model.uuid,
                timestamp: model.timestamp,
                status: model.status,
            })
            .collect();

        Ok(Some(Self {
            device_id: device.device_id,
            task_name: device.task_name,
            history,
            page_info,
        }))
    }

    fn filtered(device_row_id: i64, options: &HistoryOptions) -> Select<task_status_log::Entity> {
        let mut select = task_status_log::Entity::find()
            .filter(task_status_log::Column::DeviceId.eq(device_row_id));
        if let Some(start) = options.start {
            select = select.filter(task_status_log::Column::Timestamp.gte(start));
        }
        if let Some(end) = options.end {
            select = select.filter(task_status_log::Column::Timestamp.lte(end));
        }
        select
    }
}
