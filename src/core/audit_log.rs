//! Append-only, hash-chained audit trail of provisioning events.

use crate::constants;
use crate::core::file_lock::FileLock;
use crate::core::paths::ShopmonPaths;
use crate::util::fs as shopmon_fs;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub actor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration_label: Option<String>,
    pub acl_role_id: String,
    pub integration_id: String,
    #[serde(default)]
    pub atomic: bool,
    pub result: AuditResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_hash: Option<String>,
}

/// What happened, before actor, chain, and timestamp are filled in.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub action: &'static str,
    pub integration_label: Option<String>,
    pub atomic: bool,
}

fn detect_actor() -> String {
    match std::env::var("SUDO_USER") {
        Ok(user) if !user.is_empty() => format!("{}(sudo)", user),
        _ => std::env::var("USER").unwrap_or_else(|_| "unknown".to_string()),
    }
}

/// Append one entry; returns the JSON line that was written.
pub fn record(
    paths: &ShopmonPaths,
    event: AuditEvent,
    success: bool,
    errors: Vec<String>,
) -> Result<String> {
    let _lock = FileLock::exclusive(&paths.audit_lock)?;

    let mut entry = AuditEntry {
        timestamp: Utc::now(),
        action: event.action.to_string(),
        actor: detect_actor(),
        integration_label: event.integration_label,
        acl_role_id: constants::ACL_ROLE_ID.simple().to_string(),
        integration_id: constants::INTEGRATION_ID.simple().to_string(),
        atomic: event.atomic,
        result: AuditResult { success, errors },
        prev_hash: last_entry_hash(&paths.audit_log)?,
        entry_hash: None,
    };
    entry.entry_hash = Some(entry_hash(&entry)?);

    let line = serde_json::to_string(&entry).context("serialize audit entry")?;
    append_line(&paths.audit_log, &line)?;
    Ok(line)
}

/// SHA-256 over the entry serialized without `entry_hash`, keys sorted.
fn entry_hash(entry: &AuditEntry) -> Result<String> {
    let mut value = serde_json::to_value(entry).context("serialize for hash")?;
    if let Some(obj) = value.as_object_mut() {
        obj.remove("entry_hash");
    }
    let canonical =
        serde_json::to_string(&sorted_keys(value)).context("serialize canonical json")?;
    Ok(format!("{:x}", Sha256::digest(canonical.as_bytes())))
}

fn sorted_keys(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut pairs: Vec<_> = map.into_iter().collect();
            pairs.sort_by(|a, b| a.0.cmp(&b.0));
            serde_json::Value::Object(
                pairs
                    .into_iter()
                    .map(|(k, v)| (k, sorted_keys(v)))
                    .collect(),
            )
        }
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.into_iter().map(sorted_keys).collect())
        }
        other => other,
    }
}

fn append_line(path: &Path, line: &str) -> Result<()> {
    let created = !path.exists();
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open audit log {}", path.display()))?;
    writeln!(file, "{}", line).context("write audit entry")?;
    if created {
        shopmon_fs::set_permissions(path, constants::AUDIT_LOG_MODE)?;
    }
    Ok(())
}

fn last_entry_hash(path: &Path) -> Result<Option<String>> {
    let entries = read_entries(path)?;
    Ok(entries.last().and_then(|e| e.entry_hash.clone()))
}

fn read_entries(path: &Path) -> Result<Vec<AuditEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let file = fs::File::open(path)
        .with_context(|| format!("open audit log {}", path.display()))?;
    let mut entries = Vec::new();
    let mut malformed = 0usize;
    for line in BufReader::new(file).lines() {
        let line = line.context("read audit log line")?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<AuditEntry>(&line) {
            Ok(entry) => entries.push(entry),
            Err(_) => malformed += 1,
        }
    }
    if malformed > 0 {
        eprintln!("warning: {} malformed audit entries skipped", malformed);
    }
    Ok(entries)
}

/// The newest `limit` entries (all when `None`), oldest first.
pub fn read_log(paths: &ShopmonPaths, limit: Option<usize>) -> Result<Vec<AuditEntry>> {
    let mut entries = read_entries(&paths.audit_log)?;
    if let Some(limit) = limit {
        if entries.len() > limit {
            entries = entries.split_off(entries.len() - limit);
        }
    }
    Ok(entries)
}

/// Check every entry's hash and its link to the previous one.
/// Returns the number of entries and a description of each problem.
pub fn verify_chain(paths: &ShopmonPaths) -> Result<(usize, Vec<String>)> {
    let entries = read_entries(&paths.audit_log)?;
    let mut problems = Vec::new();
    let mut previous: Option<&str> = None;

    for (i, entry) in entries.iter().enumerate() {
        let n = i + 1;
        if entry.prev_hash.as_deref() != previous {
            if i == 0 {
                problems.push(format!("entry {}: unexpected prev_hash", n));
            } else {
                problems.push(format!("entry {}: prev_hash does not match entry {}", n, i));
            }
        }
        match (&entry.entry_hash, entry_hash(entry)) {
            (Some(stored), Ok(computed)) if *stored == computed => {}
            (Some(_), Ok(_)) => problems.push(format!("entry {}: entry_hash mismatch", n)),
            (None, _) => problems.push(format!("entry {}: entry_hash missing", n)),
            (_, Err(e)) => problems.push(format!("entry {}: cannot compute hash: {}", n, e)),
        }
        previous = entry.entry_hash.as_deref();
    }

    Ok((entries.len(), problems))
}
