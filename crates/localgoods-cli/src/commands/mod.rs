pub mod auth_cmd;
pub mod common;
pub mod config;
pub mod favorites;
pub mod reset;
pub mod status;
pub mod sync;
pub mod views;
