//! Shopmon provisioning CLI.
//!
//! Creates the ACL role and API integration the Shopmon monitoring service
//! authenticates with, and assigns the role to the integration.
//!
//! ## Modules
//! - `cli`: Command-line handlers
//! - `core`: Provisioning workflow, stores, audit trail
//! - `models`: Data structures
//! - `util`: Filesystem and journald helpers

pub mod cli;
pub mod constants;
pub mod core;
pub mod models;
pub mod util;
