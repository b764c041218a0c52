//! Store implementation backed by the platform's SQLite database.

use crate::core::access_key;
use crate::core::retryable::{RetryPolicy, RetryableQuery};
use crate::core::store::{
    validate_integration, validate_role, CredentialStore, LinkStore, RoleStore, StoreError,
};
use crate::models::acl_role::AclRole;
use crate::models::integration::{Integration, NewIntegration};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

const INSERT_INTEGRATION_ROLE: &str =
    "INSERT INTO integration_role (integration_id, acl_role_id) VALUES (?1, ?2)";

/// Works over a plain connection or a transaction (which derefs to one).
pub struct SqliteStore<'c> {
    conn: &'c Connection,
    retry: RetryPolicy,
}

impl<'c> SqliteStore<'c> {
    pub fn new(conn: &'c Connection, retry: RetryPolicy) -> Self {
        Self { conn, retry }
    }

    fn row_exists(&self, sql: &str, id: Uuid) -> Result<bool, StoreError> {
        let found = self
            .conn
            .query_row(sql, params![id.as_bytes().as_slice()], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }
}

fn parse_timestamp(value: Option<String>) -> Option<DateTime<Utc>> {
    value
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_id(bytes: Vec<u8>) -> Result<Uuid, StoreError> {
    Uuid::from_slice(&bytes).map_err(|e| StoreError::Database(format!("malformed id: {e}")))
}

impl RoleStore for SqliteStore<'_> {
    fn role_exists(&self, id: Uuid) -> Result<bool, StoreError> {
        self.row_exists("SELECT 1 FROM acl_role WHERE id = ?1", id)
    }

    fn find_role(&self, id: Uuid) -> Result<Option<AclRole>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, name, description, privileges, created_at FROM acl_role WHERE id = ?1",
                params![id.as_bytes().as_slice()],
                |row| {
                    Ok((
                        row.get::<_, Vec<u8>>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Option<String>>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((raw_id, name, description, privileges, created_at)) = row else {
            return Ok(None);
        };
        Ok(Some(AclRole {
            id: parse_id(raw_id)?,
            name,
            description,
            privileges: serde_json::from_str(&privileges)?,
            created_at: parse_timestamp(created_at),
        }))
    }

    fn create_role(&self, role: &AclRole) -> Result<(), StoreError> {
        validate_role(role)?;
        let privileges = serde_json::to_string(&role.privileges)?;
        self.conn.execute(
            "INSERT INTO acl_role (id, name, description, privileges, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                role.id.as_bytes().as_slice(),
                role.name,
                role.description,
                privileges,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn delete_role(&self, id: Uuid) -> Result<bool, StoreError> {
        let removed = self.conn.execute(
            "DELETE FROM acl_role WHERE id = ?1",
            params![id.as_bytes().as_slice()],
        )?;
        Ok(removed > 0)
    }
}

impl CredentialStore for SqliteStore<'_> {
    fn integration_exists(&self, id: Uuid) -> Result<bool, StoreError> {
        self.row_exists("SELECT 1 FROM integration WHERE id = ?1", id)
    }

    fn find_integration(&self, id: Uuid) -> Result<Option<Integration>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, label, access_key, admin, created_at FROM integration WHERE id = ?1",
                params![id.as_bytes().as_slice()],
                |row| {
                    Ok((
                        row.get::<_, Vec<u8>>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, bool>(3)?,
                        row.get::<_, Option<String>>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((raw_id, label, access_key, admin, created_at)) = row else {
            return Ok(None);
        };
        Ok(Some(Integration {
            id: parse_id(raw_id)?,
            label,
            access_key,
            admin,
            created_at: parse_timestamp(created_at),
        }))
    }

    fn create_integration(&self, new: &NewIntegration) -> Result<Integration, StoreError> {
        validate_integration(new)?;
        let access_key = access_key::generate_access_key();
        let secret = access_key::generate_secret_access_key();
        let now = Utc::now();
        self.conn.execute(
            "INSERT INTO integration (id, label, access_key, secret_access_key, admin, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                new.id.as_bytes().as_slice(),
                new.label,
                access_key,
                access_key::digest_secret(&secret),
                new.admin,
                now.to_rfc3339(),
            ],
        )?;
        Ok(Integration {
            id: new.id,
            label: new.label.clone(),
            access_key,
            admin: new.admin,
            created_at: Some(now),
        })
    }

    fn delete_integration(&self, id: Uuid) -> Result<bool, StoreError> {
        let removed = self.conn.execute(
            "DELETE FROM integration WHERE id = ?1",
            params![id.as_bytes().as_slice()],
        )?;
        Ok(removed > 0)
    }
}

impl LinkStore for SqliteStore<'_> {
    fn link_role(&self, integration_id: Uuid, role_id: Uuid) -> Result<(), StoreError> {
        let query = RetryableQuery::new(self.conn, INSERT_INTEGRATION_ROLE, self.retry);
        query.execute(&[
            &integration_id.as_bytes().as_slice(),
            &role_id.as_bytes().as_slice(),
        ])?;
        Ok(())
    }

    fn link_exists(&self, integration_id: Uuid, role_id: Uuid) -> Result<bool, StoreError> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM integration_role WHERE integration_id = ?1 AND acl_role_id = ?2",
                params![
                    integration_id.as_bytes().as_slice(),
                    role_id.as_bytes().as_slice()
                ],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn unlink_role(&self, integration_id: Uuid, role_id: Uuid) -> Result<bool, StoreError> {
        let removed = self.conn.execute(
            "DELETE FROM integration_role WHERE integration_id = ?1 AND acl_role_id = ?2",
            params![
                integration_id.as_bytes().as_slice(),
                role_id.as_bytes().as_slice()
            ],
        )?;
        Ok(removed > 0)
    }
}

/// Hex rendering used in operator-facing messages.
pub fn hex_id(id: Uuid) -> String {
    id.simple().to_string()
}
