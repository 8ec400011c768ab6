pub mod api;
pub mod config;
pub mod core;
pub mod domain;
pub mod issuance;
pub mod renewal;
