use crate::constants;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclRole {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub privileges: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl AclRole {
    /// The role that grants Shopmon its permissions.
    pub fn shopmon() -> Self {
        Self {
            id: constants::ACL_ROLE_ID,
            name: constants::ACL_ROLE_NAME.to_string(),
            description: Some(constants::ACL_ROLE_DESCRIPTION.to_string()),
            privileges: constants::ACL_ROLE_PRIVILEGES
                .iter()
                .map(|p| p.to_string())
                .collect(),
            created_at: None,
        }
    }

    /// Whether the role grants exactly `expected`, ignoring order.
    pub fn has_exact_privileges(&self, expected: &[&str]) -> bool {
        let actual: BTreeSet<&str> = self.privileges.iter().map(String::as_str).collect();
        let expected: BTreeSet<&str> = expected.iter().copied().collect();
        self.privileges.len() == expected.len() && actual == expected
    }
}
