use db::DbErr;
use thiserror::Error;

use super::store::StoreError;

/// Failure taxonomy shared by every device service. The display string is
/// the message shown to API clients for the first three variants.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Storage(DbErr),
}

pub type Result<T> = std::result::Result<T, ServiceError>;

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn device_not_found(device_id: &str) -> Self {
        Self::NotFound(format!("Device with ID {device_id} not found."))
    }

    pub fn duplicate_device() -> Self {
        Self::Conflict("This device ID already exists.".to_string())
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(_) => Self::duplicate_device(),
            StoreError::Database(err) => Self::Storage(err),
        }
    }
}

impl From<DbErr> for ServiceError {
    fn from(err: DbErr) -> Self {
        Self::Storage(err)
    }
}

/// Trimmed value of a required text field, or `None` when it is missing or
/// blank.
pub(crate) fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|trimmed| !trimmed.is_empty())
        .map(str::to_string)
}
