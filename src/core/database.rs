//! SQLite connection setup and schema migration.

use crate::constants;
use crate::util::fs as shopmon_fs;
use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

const SCHEMA_SQL: &str = include_str!("../../migrations/001_integration.sql");

/// Open the platform database, creating the schema when missing.
pub fn open(path: &Path, busy_timeout_ms: u64) -> Result<Connection> {
    let existed = path.exists();
    let conn = Connection::open(path)
        .with_context(|| format!("open database {}", path.display()))?;
    conn.busy_timeout(Duration::from_millis(busy_timeout_ms))
        .context("set busy timeout")?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
        .context("database pragma")?;
    migrate(&conn)?;
    if !existed {
        shopmon_fs::set_permissions(path, constants::DATABASE_FILE_MODE)?;
    }
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("open in-memory database")?;
    conn.execute_batch("PRAGMA foreign_keys=ON;")
        .context("database pragma")?;
    migrate(&conn)?;
    Ok(conn)
}

/// Idempotent: every statement is `CREATE ... IF NOT EXISTS`.
pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA_SQL)
        .context("integration schema migration failed")
}
