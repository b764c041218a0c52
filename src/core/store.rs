//! Store contracts for roles, integrations, and their links.
//!
//! The provisioning workflow only talks to these traits; `sqlite_store`
//! provides the implementation backed by the platform database.

use crate::models::acl_role::AclRole;
use crate::models::integration::{Integration, NewIntegration};
use rusqlite::ErrorCode;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("constraint violation: {0}")]
    Constraint(String),
    #[error("query still failing after {attempts} attempts: {message}")]
    RetryExhausted { attempts: u32, message: String },
    #[error("database error: {0}")]
    Database(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        let message = match &err {
            rusqlite::Error::SqliteFailure(_, Some(msg)) => msg.clone(),
            other => other.to_string(),
        };
        match err.sqlite_error_code() {
            Some(ErrorCode::ConstraintViolation) => StoreError::Constraint(message),
            _ => StoreError::Database(message),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

pub trait RoleStore {
    fn role_exists(&self, id: Uuid) -> Result<bool, StoreError>;
    fn find_role(&self, id: Uuid) -> Result<Option<AclRole>, StoreError>;
    fn create_role(&self, role: &AclRole) -> Result<(), StoreError>;
    /// Returns whether a row was removed.
    fn delete_role(&self, id: Uuid) -> Result<bool, StoreError>;
}

pub trait CredentialStore {
    fn integration_exists(&self, id: Uuid) -> Result<bool, StoreError>;
    fn find_integration(&self, id: Uuid) -> Result<Option<Integration>, StoreError>;
    /// Generates a fresh access key pair and persists the integration.
    fn create_integration(&self, new: &NewIntegration) -> Result<Integration, StoreError>;
    fn delete_integration(&self, id: Uuid) -> Result<bool, StoreError>;
}

pub trait LinkStore {
    fn link_role(&self, integration_id: Uuid, role_id: Uuid) -> Result<(), StoreError>;
    fn link_exists(&self, integration_id: Uuid, role_id: Uuid) -> Result<bool, StoreError>;
    fn unlink_role(&self, integration_id: Uuid, role_id: Uuid) -> Result<bool, StoreError>;
}

/// Write-side checks shared by every role store.
pub fn validate_role(role: &AclRole) -> Result<(), StoreError> {
    if role.name.trim().is_empty() {
        return Err(StoreError::Validation("acl_role.name must not be blank".into()));
    }
    if role.privileges.is_empty() {
        return Err(StoreError::Validation(
            "acl_role.privileges must not be empty".into(),
        ));
    }
    for privilege in &role.privileges {
        if !is_valid_privilege(privilege) {
            return Err(StoreError::Validation(format!(
                "acl_role.privileges: '{}' is not of the form resource:action",
                privilege
            )));
        }
    }
    Ok(())
}

/// Write-side checks shared by every credential store.
pub fn validate_integration(new: &NewIntegration) -> Result<(), StoreError> {
    if new.label.trim().is_empty() {
        return Err(StoreError::Validation(
            "integration.label must not be blank".into(),
        ));
    }
    Ok(())
}

fn is_valid_privilege(privilege: &str) -> bool {
    match privilege.split_once(':') {
        Some((resource, action)) => {
            !resource.is_empty()
                && !action.is_empty()
                && privilege
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':' || c == '-')
        }
        None => false,
    }
}
