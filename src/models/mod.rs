//! Data structures.

pub mod acl_role;
pub mod config;
pub mod integration;
