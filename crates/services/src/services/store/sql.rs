use async_trait::async_trait;
use db::{
    DBService, DbErr, TransactionTrait,
    models::{
        device::{CreateDevice, Device, DeviceWithStatus},
        task_status_log::{CreateStatusLog, DeviceHistory, HistoryOptions, TaskStatusLog},
    },
    retry::retry_on_sqlite_busy,
};

use super::{DeviceStore, StoreError, StoreResult};

/// `DeviceStore` backed by the relational database.
#[derive(Clone)]
pub struct SqlDeviceStore {
    db: DBService,
}

impl SqlDeviceStore {
    pub fn new(db: DBService) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DeviceStore for SqlDeviceStore {
    async fn insert_device(&self, data: &CreateDevice) -> StoreResult<Device> {
        let pool = &self.db.pool;
        retry_on_sqlite_busy(move || Device::create(pool, data))
            .await
            .map_err(|err| StoreError::from_db(err, &data.device_id))
    }

    async fn find_device(&self, device_id: &str) -> StoreResult<Option<DeviceWithStatus>> {
        Ok(Device::find_with_status(&self.db.pool, device_id).await?)
    }

    async fn list_devices(&self) -> StoreResult<Vec<DeviceWithStatus>> {
        Ok(Device::find_all_with_status(&self.db.pool).await?)
    }

    async fn delete_device(&self, device_id: &str) -> StoreResult<bool> {
        let pool = &self.db.pool;
        let removed = retry_on_sqlite_busy(move || async move {
            let tx = pool.begin().await?;
            let removed = Device::delete(&tx, device_id).await?;
            tx.commit().await?;
            Ok::<_, DbErr>(removed)
        })
        .await?;
        Ok(removed > 0)
    }

    async fn append_log(&self, data: &CreateStatusLog) -> StoreResult<Option<TaskStatusLog>> {
        // The existence check and the insert share a transaction so a
        // concurrent delete cannot leave the new row behind.
        let pool = &self.db.pool;
        let log = retry_on_sqlite_busy(move || async move {
            let tx = pool.begin().await?;
            let log = TaskStatusLog::create(&tx, data).await?;
            tx.commit().await?;
            Ok::<_, DbErr>(log)
        })
        .await?;
        Ok(log)
    }

    async fn history(
        &self,
        device_id: &str,
        options: &HistoryOptions,
    ) -> StoreResult<Option<DeviceHistory>> {
        Ok(DeviceHistory::find(&self.db.pool, device_id, options).await?)
    }

    async fn rename_task(
        &self,
        device_id: &str,
        task_name: &str,
        reset_history: bool,
    ) -> StoreResult<Option<Device>> {
        let pool = &self.db.pool;
        let device = retry_on_sqlite_busy(move || async move {
            let tx = pool.begin().await?;
            let device = Device::rename_task(&tx, device_id, task_name, reset_history).await?;
            tx.commit().await?;
            Ok::<_, DbErr>(device)
        })
        .await?;
        Ok(device)
    }
}
