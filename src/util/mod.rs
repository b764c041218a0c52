//! Filesystem and journald helpers.

pub mod fs;
pub mod journald;
