pub mod auth;
pub mod devices;
pub mod health;
pub mod history;
pub mod status;
