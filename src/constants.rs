//! Well-known identifiers, role metadata, and defaults.

use uuid::{uuid, Uuid};

/// Fixed id of the Shopmon ACL role. Its presence marks a provisioned platform.
pub const ACL_ROLE_ID: Uuid = uuid!("018dd6ae4c4072b1b5887fe8d3b9b95a");

/// Fixed id of the Shopmon integration.
pub const INTEGRATION_ID: Uuid = uuid!("c7c2b5c9af44443ea3f3482e7fd71d21");

/// Name of the Shopmon ACL role.
pub const ACL_ROLE_NAME: &str = "SHOPMON_ACL_ROLE";

/// Description of the Shopmon ACL role.
pub const ACL_ROLE_DESCRIPTION: &str = "This role has the necessary permissions to use Shopmon";

/// Privileges granted to the Shopmon role.
pub const ACL_ROLE_PRIVILEGES: &[&str] = &[
    "app:read",
    "product:read",
    "product:write",
    "system_config:read",
    "scheduled_task:read",
    "frosh_tools:read",
    "system:clear:cache",
    "system:cache:info",
];

/// Entity type names as reported to the operator.
pub const ENTITY_ACL_ROLE: &str = "acl_role";
pub const ENTITY_INTEGRATION: &str = "integration";

/// Access key prefix for integrations.
pub const INTEGRATION_ACCESS_KEY_PREFIX: &str = "SWIA";

/// Random alphanumerics fed into the access key encoding.
pub const ACCESS_KEY_RANDOM_LEN: usize = 16;

/// Random alphanumerics fed into the secret access key encoding.
pub const SECRET_ACCESS_KEY_RANDOM_LEN: usize = 38;

/// Default data root directory.
pub const DEFAULT_ROOT: &str = "/var/lib/shopmon-integration";

/// Configuration file name inside the data root.
pub const CONFIG_FILE_NAME: &str = "shopmon.toml";

/// Default database file name, relative to the data root.
pub const DEFAULT_DATABASE_FILE: &str = "shopware.db";

/// Default SQLite busy timeout in milliseconds.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Default attempts for retryable queries.
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 10;

/// Default linear backoff step between retry attempts.
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 25;

/// Permission mode for the data root.
pub const ROOT_DIR_MODE: u32 = 0o750;

/// Permission mode for the database file.
pub const DATABASE_FILE_MODE: u32 = 0o600;

/// Permission mode for shopmon.toml.
pub const CONFIG_FILE_MODE: u32 = 0o640;

/// Permission mode for the audit log.
pub const AUDIT_LOG_MODE: u32 = 0o640;

/// Tag used when forwarding audit lines to journald.
pub const JOURNALD_TAG: &str = "shopmon-integration";
