use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use db::{
    models::{
        device::{CreateDevice, Device, DeviceWithStatus},
        task_status_log::{
            CreateStatusLog, DeviceHistory, HistoryEntry, HistoryOptions, PageInfo, TaskStatusLog,
        },
    },
    types::HistoryOrder,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{DeviceStore, StoreError, StoreResult};

struct StoredLog {
    seq: u64,
    log: TaskStatusLog,
}

struct StoredDevice {
    seq: u64,
    device: Device,
    logs: Vec<StoredLog>,
}

impl StoredDevice {
    fn with_status(&self) -> DeviceWithStatus {
        let latest = self
            .logs
            .iter()
            .max_by_key(|stored| (stored.log.timestamp, stored.seq))
            .map(|stored| (stored.log.status, stored.log.timestamp));
        DeviceWithStatus::derive(self.device.clone(), latest)
    }
}

#[derive(Default)]
struct State {
    devices: HashMap<String, StoredDevice>,
    next_seq: u64,
}

impl State {
    fn next_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }
}

/// Process-local `DeviceStore`. Every operation holds the lock for its whole
/// duration, which gives the same all-or-nothing behaviour as a transaction.
#[derive(Clone, Default)]
pub struct InMemoryDeviceStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryDeviceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeviceStore for InMemoryDeviceStore {
    async fn insert_device(&self, data: &CreateDevice) -> StoreResult<Device> {
        let mut state = self.state.write().await;
        if state.devices.contains_key(&data.device_id) {
            return Err(StoreError::Conflict(data.device_id.clone()));
        }

        let now = Utc::now();
        let device = Device {
            device_id: data.device_id.clone(),
            task_name: data.task_name.clone(),
            created_at: now,
            updated_at: now,
        };
        let seq = state.next_seq();
        state.devices.insert(
            data.device_id.clone(),
            StoredDevice {
                seq,
                device: device.clone(),
                logs: Vec::new(),
            },
        );
        Ok(device)
    }

    async fn find_device(&self, device_id: &str) -> StoreResult<Option<DeviceWithStatus>> {
        let state = self.state.read().await;
        Ok(state.devices.get(device_id).map(StoredDevice::with_status))
    }

    async fn list_devices(&self) -> StoreResult<Vec<DeviceWithStatus>> {
        let state = self.state.read().await;
        let mut devices: Vec<&StoredDevice> = state.devices.values().collect();
        devices.sort_by(|a, b| (b.device.created_at, b.seq).cmp(&(a.device.created_at, a.seq)));
        Ok(devices.into_iter().map(StoredDevice::with_status).collect())
    }

    async fn delete_device(&self, device_id: &str) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        Ok(state.devices.remove(device_id).is_some())
    }

    async fn append_log(&self, data: &CreateStatusLog) -> StoreResult<Option<TaskStatusLog>> {
        let mut state = self.state.write().await;
        let seq = state.next_seq();
        let Some(stored) = state.devices.get_mut(&data.device_id) else {
            return Ok(None);
        };

        let log = TaskStatusLog {
            log_id: Uuid::new_v4(),
            device_id: data.device_id.clone(),
            timestamp: data.timestamp,
            status: data.status,
        };
        stored.logs.push(StoredLog {
            seq,
            log: log.clone(),
        });
        Ok(Some(log))
    }

    async fn history(
        &self,
        device_id: &str,
        options: &HistoryOptions,
    ) -> StoreResult<Option<DeviceHistory>> {
        let state = self.state.read().await;
        let Some(stored) = state.devices.get(device_id) else {
            return Ok(None);
        };

        let mut matching: Vec<&StoredLog> = stored
            .logs
            .iter()
            .filter(|entry| options.contains(&entry.log.timestamp))
            .collect();
        matching.sort_by_key(|entry| (entry.log.timestamp, entry.seq));
        if options.order == HistoryOrder::Desc {
            matching.reverse();
        }

        let total_count = matching.len() as u64;
        let offset = usize::try_from(options.offset.unwrap_or(0)).unwrap_or(usize::MAX);
        let limit = options
            .limit
            .map_or(usize::MAX, |limit| usize::try_from(limit).unwrap_or(usize::MAX));
        let history = matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|entry| HistoryEntry::from(entry.log.clone()))
            .collect();

        Ok(Some(DeviceHistory {
            device_id: stored.device.device_id.clone(),
            task_name: stored.device.task_name.clone(),
            history,
            page_info: PageInfo::new(total_count, options.limit, options.offset),
        }))
    }

    async fn rename_task(
        &self,
        device_id: &str,
        task_name: &str,
        reset_history: bool,
    ) -> StoreResult<Option<Device>> {
        let mut state = self.state.write().await;
        let Some(stored) = state.devices.get_mut(device_id) else {
            return Ok(None);
        };

        stored.device.task_name = task_name.to_string();
        stored.device.updated_at = Utc::now();
        if reset_history {
            stored.logs.clear();
        }
        Ok(Some(stored.device.clone()))
    }
}
