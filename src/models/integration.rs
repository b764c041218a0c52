use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Write payload for a new integration. Key material is generated by the store.
#[derive(Debug, Clone)]
pub struct NewIntegration {
    pub id: Uuid,
    pub label: String,
    pub admin: bool,
}

/// A persisted integration. The secret access key is never read back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Integration {
    pub id: Uuid,
    pub label: String,
    pub access_key: String,
    pub admin: bool,
    pub created_at: Option<DateTime<Utc>>,
}
