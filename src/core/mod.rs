//! Provisioning workflow, stores, and supporting infrastructure.

pub mod access_key;
pub mod audit_log;
pub mod config;
pub mod database;
pub mod file_lock;
pub mod paths;
pub mod provision;
pub mod retryable;
pub mod sqlite_store;
pub mod store;
