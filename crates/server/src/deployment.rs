use std::sync::Arc;

use db::{DBService, DbErr};
use services::services::{
    config::{Config, StorageBackend, load_config},
    device::DeviceService,
    history::HistoryService,
    status::StatusService,
    store::{DeviceStore, InMemoryDeviceStore, SqlDeviceStore},
    task::TaskService,
};
use thiserror::Error;
use utils::assets::{config_path, database_path};

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error(transparent)]
    Database(#[from] DbErr),
}

/// Everything a request handler needs: configuration plus the four device
/// services, all sharing one `DeviceStore`.
#[derive(Clone)]
pub struct DeploymentImpl {
    config: Arc<Config>,
    devices: DeviceService,
    status: StatusService,
    history: HistoryService,
    tasks: TaskService,
}

impl DeploymentImpl {
    /// Loads `config.json` from the asset directory, applies environment
    /// overrides and opens the configured store.
    pub async fn new() -> Result<Self, DeploymentError> {
        let config = load_config(&config_path()).await;
        Self::from_config(config).await
    }

    pub async fn from_config(config: Config) -> Result<Self, DeploymentError> {
        let store: Arc<dyn DeviceStore> = match config.storage {
            StorageBackend::Sqlite => {
                let database_url = config.database_url_or(&database_path());
                let db = DBService::new(&database_url).await?;
                tracing::info!("Using SQLite device store");
                Arc::new(SqlDeviceStore::new(db))
            }
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory device store; data is lost on restart");
                Arc::new(InMemoryDeviceStore::new())
            }
        };
        Ok(Self::with_store(config, store))
    }

    pub fn with_store(config: Config, store: Arc<dyn DeviceStore>) -> Self {
        Self {
            config: Arc::new(config),
            devices: DeviceService::new(store.clone()),
            status: StatusService::new(store.clone()),
            history: HistoryService::new(store.clone()),
            tasks: TaskService::new(store),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn devices(&self) -> &DeviceService {
        &self.devices
    }

    pub fn status(&self) -> &StatusService {
        &self.status
    }

    pub fn history(&self) -> &HistoryService {
        &self.history
    }

    pub fn tasks(&self) -> &TaskService {
        &self.tasks
    }
}
