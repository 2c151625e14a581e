pub mod device;
pub mod task_status_log;
