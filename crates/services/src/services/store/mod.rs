use async_trait::async_trait;
use db::{
    DbErr, SqlErr,
    models::{
        device::{CreateDevice, Device, DeviceWithStatus},
        task_status_log::{CreateStatusLog, DeviceHistory, HistoryOptions, TaskStatusLog},
    },
};
use thiserror::Error;

mod memory;
mod sql;

pub use memory::InMemoryDeviceStore;
pub use sql::SqlDeviceStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("device '{0}' already exists")]
    Conflict(String),
    #[error(transparent)]
    Database(DbErr),
}

impl StoreError {
    /// Unique-key violations surface as `Conflict` so a registration that
    /// loses a race reads the same as one rejected by the pre-check.
    pub fn from_db(err: DbErr, device_id: &str) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => Self::Conflict(device_id.to_string()),
            _ => Self::Database(err),
        }
    }
}

impl From<DbErr> for StoreError {
    fn from(err: DbErr) -> Self {
        Self::Database(err)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence seam behind the device services. Every method is atomic with
/// respect to the others on the same store.
#[async_trait]
pub trait DeviceStore: Send + Sync {
    /// Insert a new device; `Conflict` if the id is taken.
    async fn insert_device(&self, data: &CreateDevice) -> StoreResult<Device>;

    async fn find_device(&self, device_id: &str) -> StoreResult<Option<DeviceWithStatus>>;

    /// All devices, newest registration first.
    async fn list_devices(&self) -> StoreResult<Vec<DeviceWithStatus>>;

    /// Remove a device with all of its logs. `false` if it did not exist.
    async fn delete_device(&self, device_id: &str) -> StoreResult<bool>;

    /// Append a log; `None` if the device is not registered.
    async fn append_log(&self, data: &CreateStatusLog) -> StoreResult<Option<TaskStatusLog>>;

    async fn history(
        &self,
        device_id: &str,
        options: &HistoryOptions,
    ) -> StoreResult<Option<DeviceHistory>>;

    /// Rename the task and, when asked, purge the device's logs in the same
    /// unit of work.
    async fn rename_task(
        &self,
        device_id: &str,
        task_name: &str,
        reset_history: bool,
    ) -> StoreResult<Option<Device>>;
}
