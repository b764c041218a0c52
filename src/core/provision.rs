//! Shopmon provisioning workflow: role, integration, and the link between them.
//!
//! The sequence is strictly linear and stops at the first failure. Writes are
//! not rolled back unless the caller runs the workflow inside a transaction
//! (see [`provision_atomic`]).

use crate::constants;
use crate::core::retryable::RetryPolicy;
use crate::core::sqlite_store::{hex_id, SqliteStore};
use crate::core::store::{CredentialStore, LinkStore, RoleStore, StoreError};
use crate::models::acl_role::AclRole;
use crate::models::integration::{Integration, NewIntegration};
use rusqlite::Connection;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Ok,
    Error,
    Note,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLine {
    pub level: Level,
    pub message: String,
}

impl fmt::Display for ReportLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.level {
            Level::Ok => "[OK]",
            Level::Error => "[ERROR]",
            Level::Note => "[NOTE]",
        };
        write!(f, "{} {}", tag, self.message)
    }
}

/// Operator-facing output, one line per step.
#[derive(Debug, Default)]
pub struct Report {
    pub lines: Vec<ReportLine>,
}

impl Report {
    pub fn ok(&mut self, message: impl Into<String>) {
        self.push(Level::Ok, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(Level::Error, message);
    }

    pub fn note(&mut self, message: impl Into<String>) {
        self.push(Level::Note, message);
    }

    fn push(&mut self, level: Level, message: impl Into<String>) {
        self.lines.push(ReportLine {
            level,
            message: message.into(),
        });
    }

    pub fn messages(&self, level: Level) -> Vec<&str> {
        self.lines
            .iter()
            .filter(|l| l.level == level)
            .map(|l| l.message.as_str())
            .collect()
    }

    /// Errors go to stderr, everything else to stdout.
    pub fn print(&self) {
        for line in &self.lines {
            match line.level {
                Level::Error => eprintln!("{}", line),
                _ => println!("{}", line),
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    Failure,
}

impl From<ExitStatus> for std::process::ExitCode {
    fn from(status: ExitStatus) -> Self {
        match status {
            ExitStatus::Success => std::process::ExitCode::SUCCESS,
            ExitStatus::Failure => std::process::ExitCode::FAILURE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExistingEntity {
    pub entity_type: &'static str,
    pub id: Uuid,
}

impl fmt::Display for ExistingEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} already exists (id: {})", self.entity_type, hex_id(self.id))
    }
}

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("Integration name is required")]
    Usage,
    #[error("{}", join_existing(.0))]
    AlreadyExists(Vec<ExistingEntity>),
    #[error("could not check for existing entities: {0}")]
    Lookup(StoreError),
    #[error("could not create ACL role: {0}")]
    CreateRole(StoreError),
    #[error("could not create integration: {0}")]
    CreateIntegration(StoreError),
    #[error("could not assign ACL role to integration: {0}")]
    AssignRole(StoreError),
    #[error("could not remove {entity}: {source}")]
    Remove {
        entity: &'static str,
        source: StoreError,
    },
}

fn join_existing(entities: &[ExistingEntity]) -> String {
    entities
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ProvisionError {
    /// One message per failure reason; conflicts get one line each.
    pub fn messages(&self) -> Vec<String> {
        match self {
            ProvisionError::AlreadyExists(entities) => {
                entities.iter().map(ToString::to_string).collect()
            }
            other => vec![other.to_string()],
        }
    }
}

/// Records created by a successful run.
#[derive(Debug, Clone)]
pub struct Provisioned {
    pub role: AclRole,
    pub integration: Integration,
}

/// Current state of the well-known records.
#[derive(Debug, Clone, Default)]
pub struct ProvisionState {
    pub role: Option<AclRole>,
    pub integration: Option<Integration>,
    pub linked: bool,
}

impl ProvisionState {
    /// Problems preventing Shopmon from using the integration.
    pub fn issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        match &self.role {
            None => issues.push(format!(
                "{} missing (id: {})",
                constants::ENTITY_ACL_ROLE,
                hex_id(constants::ACL_ROLE_ID)
            )),
            Some(role) => {
                if role.name != constants::ACL_ROLE_NAME {
                    issues.push(format!(
                        "{} has unexpected name `{}`",
                        constants::ENTITY_ACL_ROLE,
                        role.name
                    ));
                }
                if !role.has_exact_privileges(constants::ACL_ROLE_PRIVILEGES) {
                    issues.push(format!(
                        "{} privileges differ: {}",
                        constants::ENTITY_ACL_ROLE,
                        role.privileges.join(", ")
                    ));
                }
            }
        }
        match &self.integration {
            None => issues.push(format!(
                "{} missing (id: {})",
                constants::ENTITY_INTEGRATION,
                hex_id(constants::INTEGRATION_ID)
            )),
            Some(integration) if integration.admin => issues.push(format!(
                "{} `{}` has admin rights",
                constants::ENTITY_INTEGRATION,
                integration.label
            )),
            Some(_) => {}
        }
        if !self.linked {
            issues.push("ACL role is not assigned to the integration".to_string());
        }
        issues
    }

    pub fn is_empty(&self) -> bool {
        self.role.is_none() && self.integration.is_none() && !self.linked
    }
}

/// What `remove` deleted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Removed {
    pub link: bool,
    pub integration: bool,
    pub role: bool,
}

pub struct Provisioner<'s> {
    roles: &'s dyn RoleStore,
    integrations: &'s dyn CredentialStore,
    links: &'s dyn LinkStore,
}

impl<'s> Provisioner<'s> {
    pub fn new(
        roles: &'s dyn RoleStore,
        integrations: &'s dyn CredentialStore,
        links: &'s dyn LinkStore,
    ) -> Self {
        Self {
            roles,
            integrations,
            links,
        }
    }

    /// Well-known records already present, role first.
    pub fn existing_entities(&self) -> Result<Vec<ExistingEntity>, StoreError> {
        let mut existing = Vec::new();
        if self.roles.role_exists(constants::ACL_ROLE_ID)? {
            existing.push(ExistingEntity {
                entity_type: constants::ENTITY_ACL_ROLE,
                id: constants::ACL_ROLE_ID,
            });
        }
        if self.integrations.integration_exists(constants::INTEGRATION_ID)? {
            existing.push(ExistingEntity {
                entity_type: constants::ENTITY_INTEGRATION,
                id: constants::INTEGRATION_ID,
            });
        }
        Ok(existing)
    }

    /// Provision the role, the integration, and the link. Success lines are
    /// appended to `report` as each step completes.
    pub fn run(
        &self,
        name: Option<&str>,
        report: &mut Report,
    ) -> Result<Provisioned, ProvisionError> {
        let name = match name {
            Some(n) if !n.is_empty() => n,
            _ => return Err(ProvisionError::Usage),
        };

        let existing = self.existing_entities().map_err(ProvisionError::Lookup)?;
        if !existing.is_empty() {
            return Err(ProvisionError::AlreadyExists(existing));
        }

        let role = AclRole::shopmon();
        self.roles
            .create_role(&role)
            .map_err(ProvisionError::CreateRole)?;
        report.ok(format!(
            "ACL role with the name `{}` has been created",
            constants::ACL_ROLE_NAME
        ));

        let integration = self
            .integrations
            .create_integration(&NewIntegration {
                id: constants::INTEGRATION_ID,
                label: name.to_string(),
                admin: false,
            })
            .map_err(ProvisionError::CreateIntegration)?;
        report.ok(format!(
            "Integration with the name `{}` has been created",
            name
        ));

        self.links
            .link_role(constants::INTEGRATION_ID, constants::ACL_ROLE_ID)
            .map_err(ProvisionError::AssignRole)?;
        report.ok("ACL role has been assigned to the integration");
        report.note("Credentials needs to be regenerated");

        Ok(Provisioned { role, integration })
    }

    /// `run`, with every failure turned into report lines and an exit status.
    pub fn execute(&self, name: Option<&str>, report: &mut Report) -> ExitStatus {
        match self.run(name, report) {
            Ok(_) => ExitStatus::Success,
            Err(err) => {
                for message in err.messages() {
                    report.error(message);
                }
                ExitStatus::Failure
            }
        }
    }

    pub fn inspect(&self) -> Result<ProvisionState, StoreError> {
        Ok(ProvisionState {
            role: self.roles.find_role(constants::ACL_ROLE_ID)?,
            integration: self
                .integrations
                .find_integration(constants::INTEGRATION_ID)?,
            linked: self
                .links
                .link_exists(constants::INTEGRATION_ID, constants::ACL_ROLE_ID)?,
        })
    }

    /// Undo a full or partial run: link, then integration, then role.
    pub fn remove(&self, report: &mut Report) -> Result<Removed, ProvisionError> {
        let link = self
            .links
            .unlink_role(constants::INTEGRATION_ID, constants::ACL_ROLE_ID)
            .map_err(|source| ProvisionError::Remove {
                entity: "integration_role",
                source,
            })?;
        if link {
            report.ok("ACL role has been unassigned from the integration");
        }

        let integration = self
            .integrations
            .delete_integration(constants::INTEGRATION_ID)
            .map_err(|source| ProvisionError::Remove {
                entity: constants::ENTITY_INTEGRATION,
                source,
            })?;
        if integration {
            report.ok(format!(
                "Integration has been removed (id: {})",
                hex_id(constants::INTEGRATION_ID)
            ));
        }

        let role = self
            .roles
            .delete_role(constants::ACL_ROLE_ID)
            .map_err(|source| ProvisionError::Remove {
                entity: constants::ENTITY_ACL_ROLE,
                source,
            })?;
        if role {
            report.ok(format!(
                "ACL role with the name `{}` has been removed",
                constants::ACL_ROLE_NAME
            ));
        }

        let removed = Removed {
            link,
            integration,
            role,
        };
        if removed == Removed::default() {
            report.note("Nothing to remove");
        }
        Ok(removed)
    }
}

/// Run the workflow directly against `conn`; completed steps stay persisted.
pub fn provision(
    conn: &Connection,
    retry: RetryPolicy,
    name: Option<&str>,
    report: &mut Report,
) -> ExitStatus {
    let store = SqliteStore::new(conn, retry);
    Provisioner::new(&store, &store, &store).execute(name, report)
}

/// Run the workflow inside one transaction: all three writes or none.
pub fn provision_atomic(
    conn: &Connection,
    retry: RetryPolicy,
    name: Option<&str>,
    report: &mut Report,
) -> ExitStatus {
    let tx = match conn.unchecked_transaction() {
        Ok(tx) => tx,
        Err(err) => {
            report.error(format!("could not begin transaction: {}", StoreError::from(err)));
            return ExitStatus::Failure;
        }
    };

    let status = {
        let store = SqliteStore::new(&tx, retry);
        Provisioner::new(&store, &store, &store).execute(name, report)
    };

    match status {
        ExitStatus::Success => match tx.commit() {
            Ok(()) => ExitStatus::Success,
            Err(err) => {
                report.error(format!("could not commit transaction: {}", StoreError::from(err)));
                ExitStatus::Failure
            }
        },
        ExitStatus::Failure => {
            match tx.rollback() {
                Ok(()) => report.note("Transaction rolled back, no changes were persisted"),
                Err(err) => report.error(format!(
                    "could not roll back transaction: {}",
                    StoreError::from(err)
                )),
            }
            ExitStatus::Failure
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::database;
    use std::cell::Cell;

    fn run(conn: &Connection, name: Option<&str>) -> (ExitStatus, Report) {
        let mut report = Report::default();
        let status = provision(conn, RetryPolicy::default(), name, &mut report);
        (status, report)
    }

    fn count(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .unwrap()
    }

    /// Fails every call; counts how often it was touched.
    #[derive(Default)]
    struct UnreachableStore {
        calls: Cell<u32>,
    }

    impl UnreachableStore {
        fn fail<T>(&self) -> Result<T, StoreError> {
            self.calls.set(self.calls.get() + 1);
            Err(StoreError::Database("store must not be touched".into()))
        }
    }

    impl RoleStore for UnreachableStore {
        fn role_exists(&self, _: Uuid) -> Result<bool, StoreError> {
            self.fail()
        }
        fn find_role(&self, _: Uuid) -> Result<Option<AclRole>, StoreError> {
            self.fail()
        }
        fn create_role(&self, _: &AclRole) -> Result<(), StoreError> {
            self.fail()
        }
        fn delete_role(&self, _: Uuid) -> Result<bool, StoreError> {
            self.fail()
        }
    }

    impl CredentialStore for UnreachableStore {
        fn integration_exists(&self, _: Uuid) -> Result<bool, StoreError> {
            self.fail()
        }
        fn find_integration(&self, _: Uuid) -> Result<Option<Integration>, StoreError> {
            self.fail()
        }
        fn create_integration(&self, _: &NewIntegration) -> Result<Integration, StoreError> {
            self.fail()
        }
        fn delete_integration(&self, _: Uuid) -> Result<bool, StoreError> {
            self.fail()
        }
    }

    impl LinkStore for UnreachableStore {
        fn link_role(&self, _: Uuid, _: Uuid) -> Result<(), StoreError> {
            self.fail()
        }
        fn link_exists(&self, _: Uuid, _: Uuid) -> Result<bool, StoreError> {
            self.fail()
        }
        fn unlink_role(&self, _: Uuid, _: Uuid) -> Result<bool, StoreError> {
            self.fail()
        }
    }

    #[test]
    fn test_missing_name_touches_no_store() {
        let store = UnreachableStore::default();
        let provisioner = Provisioner::new(&store, &store, &store);
        for name in [None, Some("")] {
            let mut report = Report::default();
            assert_eq!(provisioner.execute(name, &mut report), ExitStatus::Failure);
            assert_eq!(
                report.messages(Level::Error),
                vec!["Integration name is required"]
            );
        }
        assert_eq!(store.calls.get(), 0);
    }

    #[test]
    fn test_clean_slate_creates_everything() {
        let conn = database::open_in_memory().unwrap();
        let (status, report) = run(&conn, Some("Monitoring"));
        assert_eq!(status, ExitStatus::Success);
        assert_eq!(report.messages(Level::Ok).len(), 3);
        assert_eq!(
            report.messages(Level::Note),
            vec!["Credentials needs to be regenerated"]
        );

        let store = SqliteStore::new(&conn, RetryPolicy::default());
        let state = Provisioner::new(&store, &store, &store).inspect().unwrap();
        let role = state.role.as_ref().unwrap();
        assert_eq!(role.name, constants::ACL_ROLE_NAME);
        assert_eq!(role.description.as_deref(), Some(constants::ACL_ROLE_DESCRIPTION));
        let integration = state.integration.as_ref().unwrap();
        assert_eq!(integration.label, "Monitoring");
        assert!(integration.access_key.starts_with("SWIA"));
        assert!(!integration.admin);
        assert!(state.linked);
        assert!(state.issues().is_empty());
    }

    #[test]
    fn test_created_role_has_exact_privileges() {
        let conn = database::open_in_memory().unwrap();
        run(&conn, Some("Monitoring"));
        let store = SqliteStore::new(&conn, RetryPolicy::default());
        let role = store.find_role(constants::ACL_ROLE_ID).unwrap().unwrap();
        assert_eq!(role.privileges.len(), 8);
        assert!(role.has_exact_privileges(&[
            "system:cache:info",
            "system:clear:cache",
            "frosh_tools:read",
            "scheduled_task:read",
            "system_config:read",
            "product:write",
            "product:read",
            "app:read",
        ]));
    }

    #[test]
    fn test_existing_role_blocks_run() {
        let conn = database::open_in_memory().unwrap();
        let store = SqliteStore::new(&conn, RetryPolicy::default());
        store.create_role(&AclRole::shopmon()).unwrap();

        let (status, report) = run(&conn, Some("Monitoring"));
        assert_eq!(status, ExitStatus::Failure);
        assert_eq!(
            report.messages(Level::Error),
            vec!["acl_role already exists (id: 018dd6ae4c4072b1b5887fe8d3b9b95a)"]
        );
        assert_eq!(count(&conn, "integration"), 0);
        assert_eq!(count(&conn, "integration_role"), 0);
    }

    #[test]
    fn test_both_existing_listed_role_first() {
        let conn = database::open_in_memory().unwrap();
        assert_eq!(run(&conn, Some("Monitoring")).0, ExitStatus::Success);

        let (status, report) = run(&conn, Some("Monitoring"));
        assert_eq!(status, ExitStatus::Failure);
        assert_eq!(
            report.messages(Level::Error),
            vec![
                "acl_role already exists (id: 018dd6ae4c4072b1b5887fe8d3b9b95a)",
                "integration already exists (id: c7c2b5c9af44443ea3f3482e7fd71d21)",
            ]
        );
        assert!(report.messages(Level::Ok).is_empty());
        assert_eq!(count(&conn, "acl_role"), 1);
        assert_eq!(count(&conn, "integration"), 1);
        assert_eq!(count(&conn, "integration_role"), 1);
    }

    #[test]
    fn test_integration_failure_keeps_role_and_skips_link() {
        let conn = database::open_in_memory().unwrap();
        let (status, report) = run(&conn, Some("   "));
        assert_eq!(status, ExitStatus::Failure);
        assert_eq!(report.messages(Level::Ok).len(), 1);
        let errors = report.messages(Level::Error);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("could not create integration: validation failed"));
        assert!(report.messages(Level::Note).is_empty());

        assert_eq!(count(&conn, "acl_role"), 1);
        assert_eq!(count(&conn, "integration"), 0);
        assert_eq!(count(&conn, "integration_role"), 0);

        // The leftover role now blocks a retry until it is removed.
        let (status, report) = run(&conn, Some("Monitoring"));
        assert_eq!(status, ExitStatus::Failure);
        assert_eq!(report.messages(Level::Error).len(), 1);
    }

    #[test]
    fn test_atomic_failure_leaves_nothing_behind() {
        let conn = database::open_in_memory().unwrap();
        let mut report = Report::default();
        let status = provision_atomic(&conn, RetryPolicy::default(), Some(" "), &mut report);
        assert_eq!(status, ExitStatus::Failure);
        assert_eq!(
            report.messages(Level::Note),
            vec!["Transaction rolled back, no changes were persisted"]
        );
        assert_eq!(count(&conn, "acl_role"), 0);
    }

    #[test]
    fn test_atomic_success_commits() {
        let conn = database::open_in_memory().unwrap();
        let mut report = Report::default();
        let status =
            provision_atomic(&conn, RetryPolicy::default(), Some("Monitoring"), &mut report);
        assert_eq!(status, ExitStatus::Success);
        assert_eq!(count(&conn, "acl_role"), 1);
        assert_eq!(count(&conn, "integration"), 1);
        assert_eq!(count(&conn, "integration_role"), 1);
    }

    fn refuse_links(conn: &Connection) {
        conn.execute_batch(
            "CREATE TRIGGER refuse_link BEFORE INSERT ON integration_role \
             BEGIN SELECT RAISE(ABORT, 'link refused'); END;",
        )
        .unwrap();
    }

    #[test]
    fn test_link_failure_keeps_role_and_integration() {
        let conn = database::open_in_memory().unwrap();
        refuse_links(&conn);
        let (status, report) = run(&conn, Some("Monitoring"));
        assert_eq!(status, ExitStatus::Failure);
        assert_eq!(report.messages(Level::Ok).len(), 2);
        let errors = report.messages(Level::Error);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("could not assign ACL role to integration"));
        assert!(errors[0].contains("link refused"));
        assert!(report.messages(Level::Note).is_empty());

        assert_eq!(count(&conn, "acl_role"), 1);
        assert_eq!(count(&conn, "integration"), 1);
        assert_eq!(count(&conn, "integration_role"), 0);
    }

    #[test]
    fn test_atomic_link_failure_rolls_back_everything() {
        let conn = database::open_in_memory().unwrap();
        refuse_links(&conn);
        let mut report = Report::default();
        let status =
            provision_atomic(&conn, RetryPolicy::default(), Some("Monitoring"), &mut report);
        assert_eq!(status, ExitStatus::Failure);
        assert!(report.messages(Level::Error)[0].starts_with("could not assign ACL role"));
        assert_eq!(count(&conn, "acl_role"), 0);
        assert_eq!(count(&conn, "integration"), 0);
        assert_eq!(count(&conn, "integration_role"), 0);
    }

    #[test]
    fn test_remove_cleans_partial_state() {
        let conn = database::open_in_memory().unwrap();
        run(&conn, Some("   "));
        let store = SqliteStore::new(&conn, RetryPolicy::default());
        let provisioner = Provisioner::new(&store, &store, &store);

        let mut report = Report::default();
        let removed = provisioner.remove(&mut report).unwrap();
        assert_eq!(
            removed,
            Removed {
                link: false,
                integration: false,
                role: true
            }
        );
        assert!(provisioner.inspect().unwrap().is_empty());

        let (status, _) = run(&conn, Some("Monitoring"));
        assert_eq!(status, ExitStatus::Success);
    }

    #[test]
    fn test_remove_on_clean_slate_is_noop() {
        let conn = database::open_in_memory().unwrap();
        let store = SqliteStore::new(&conn, RetryPolicy::default());
        let mut report = Report::default();
        let removed = Provisioner::new(&store, &store, &store)
            .remove(&mut report)
            .unwrap();
        assert_eq!(removed, Removed::default());
        assert_eq!(report.messages(Level::Note), vec!["Nothing to remove"]);
    }

    #[test]
    fn test_issues_report_missing_link() {
        let state = ProvisionState {
            role: Some(AclRole::shopmon()),
            integration: None,
            linked: false,
        };
        let issues = state.issues();
        assert_eq!(issues.len(), 2);
        assert!(issues[0].starts_with("integration missing"));
    }

    #[test]
    fn test_report_line_display() {
        let line = ReportLine {
            level: Level::Error,
            message: "boom".into(),
        };
        assert_eq!(line.to_string(), "[ERROR] boom");
    }
}
