use std::{str::FromStr, sync::Arc};

use db::{
    models::task_status_log::{DeviceHistory, HistoryOptions, MAX_WINDOW},
    types::HistoryOrder,
};
use serde::Deserialize;
use ts_rs::TS;

use super::{
    device::require_device_id,
    error::{Result, ServiceError, non_blank},
    store::DeviceStore,
};

/// Raw history query string. Values are validated by [`HistoryQuery::parse`].
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    #[ts(optional)]
    pub start_date: Option<String>,
    #[ts(optional)]
    pub end_date: Option<String>,
    #[ts(optional)]
    pub limit: Option<String>,
    #[ts(optional)]
    pub offset: Option<String>,
    #[ts(optional)]
    pub order: Option<String>,
}

impl HistoryQuery {
    pub fn parse(&self) -> Result<HistoryOptions> {
        let start = match non_blank(self.start_date.as_deref()) {
            Some(raw) => Some(
                utils::time::parse_range_start(&raw)
                    .ok_or_else(|| ServiceError::validation("Invalid startDate format."))?,
            ),
            None => None,
        };
        let end = match non_blank(self.end_date.as_deref()) {
            Some(raw) => Some(
                utils::time::parse_range_end(&raw)
                    .ok_or_else(|| ServiceError::validation("Invalid endDate format."))?,
            ),
            None => None,
        };

        let limit = match non_blank(self.limit.as_deref()) {
            Some(raw) => Some(
                parse_window(&raw, 1)
                    .ok_or_else(|| ServiceError::validation("limit must be a positive integer."))?,
            ),
            None => None,
        };
        let offset = match non_blank(self.offset.as_deref()) {
            Some(raw) => Some(parse_window(&raw, 0).ok_or_else(|| {
                ServiceError::validation("offset must be a non-negative integer.")
            })?),
            None => None,
        };
        let order = match non_blank(self.order.as_deref()) {
            Some(raw) => HistoryOrder::from_str(&raw).map_err(|_| {
                ServiceError::validation(r#"order must be either "asc" or "desc"."#)
            })?,
            None => HistoryOrder::default(),
        };

        Ok(HistoryOptions {
            start,
            end,
            limit,
            offset,
            order,
        })
    }
}

/// Window bounds must also fit the signed range the database binds.
fn parse_window(raw: &str, min: u64) -> Option<u64> {
    raw.parse::<u64>()
        .ok()
        .filter(|value| (min..=MAX_WINDOW).contains(value))
}

#[derive(Clone)]
pub struct HistoryService {
    store: Arc<dyn DeviceStore>,
}

impl HistoryService {
    pub fn new(store: Arc<dyn DeviceStore>) -> Self {
        Self { store }
    }

    pub async fn get_history(&self, device_id: &str, query: HistoryQuery) -> Result<DeviceHistory> {
        let device_id = require_device_id(device_id)?;
        let options = query.parse()?;
        self.store
            .history(&device_id, &options)
            .await?
            .ok_or_else(|| ServiceError::device_not_found(&device_id))
    }
}
