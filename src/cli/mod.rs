//! CLI routing and command dispatch.

use crate::constants;
use crate::core::audit_log::{self, AuditEvent};
use crate::core::paths::ShopmonPaths;
use crate::core::retryable::RetryPolicy;
use crate::core::{config, database};
use crate::models::config::ConfigFile;
use crate::util::journald;
use anyhow::Result;
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use std::path::PathBuf;
use std::process::ExitCode;

pub mod audit;
pub mod create_integration;
pub mod init;
pub mod remove;
pub mod verify;

/// Shared context passed to all command handlers.
pub struct CliContext {
    pub paths: ShopmonPaths,
    pub non_interactive: bool,
    pub config: ConfigFile,
    pub database_override: Option<PathBuf>,
}

impl CliContext {
    pub fn database_path(&self) -> PathBuf {
        self.paths
            .database(&self.config.database.path, self.database_override.as_deref())
    }

    pub fn open_database(&self) -> Result<Connection> {
        database::open(&self.database_path(), self.config.database.busy_timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.config.retry.into()
    }

    /// Append to the audit log and optionally journald. Failures only warn.
    pub fn audit(&self, event: AuditEvent, success: bool, errors: Vec<String>) {
        let line = match audit_log::record(&self.paths, event, success, errors) {
            Ok(line) => line,
            Err(e) => {
                eprintln!("warning: audit log failed: {:#}", e);
                return;
            }
        };
        if self.config.policy.journald_audit && !journald::forward(constants::JOURNALD_TAG, &line)
        {
            eprintln!("warning: journald forwarding failed");
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "shopmon-integration",
    version,
    about = "Provision the Shopmon ACL role and integration"
)]
pub struct Cli {
    /// Data root holding shopmon.toml, the audit log, and locks
    #[arg(long, global = true, value_name = "PATH")]
    pub root: Option<PathBuf>,

    /// Database file (overrides database.path from shopmon.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub database: Option<PathBuf>,

    /// Run in non-interactive mode (no prompts, suitable for automation)
    #[arg(long, global = true, env = "SHOPMON_NON_INTERACTIVE")]
    pub non_interactive: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<ExitCode> {
        let paths = ShopmonPaths::resolve(self.root)?;

        // A broken config must not stop cleanup or diagnostics; fall back to defaults.
        let config = match config::load(&paths.config_toml) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("warning: {:#} (using defaults)", e);
                ConfigFile::default()
            }
        };

        let ctx = CliContext {
            paths,
            non_interactive: self.non_interactive,
            config,
            database_override: self.database,
        };

        match self.command {
            Commands::Init(args) => init::run(&ctx, args),
            Commands::CreateIntegration(args) => create_integration::run(&ctx, args),
            Commands::Verify(args) => verify::run(&ctx, args),
            Commands::Remove(args) => remove::run(&ctx, args),
            Commands::Audit { command } => audit::run(&ctx, command),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the data root, default config, and database schema
    Init(init::InitArgs),
    /// Create the Shopmon ACL role and integration and link them
    CreateIntegration(create_integration::CreateIntegrationArgs),
    /// Check that the role, integration, and link are in place (read-only)
    Verify(verify::VerifyArgs),
    /// Remove the Shopmon link, integration, and role (cleanup after partial runs)
    Remove(remove::RemoveArgs),
    /// View or verify the audit trail
    Audit {
        #[command(subcommand)]
        command: audit::AuditCommand,
    },
}
