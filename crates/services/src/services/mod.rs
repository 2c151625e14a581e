pub mod config;
pub mod device;
pub mod error;
pub mod history;
pub mod status;
pub mod store;
pub mod task;
