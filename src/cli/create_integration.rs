use crate::cli::CliContext;
use crate::constants;
use crate::core::audit_log::AuditEvent;
use crate::core::file_lock::FileLock;
use crate::core::provision::{self, ExitStatus, Level, ProvisionError, Report};
use crate::util::fs as shopmon_fs;
use anyhow::Result;
use clap::Args;
use std::process::ExitCode;

#[derive(Args, Debug)]
pub struct CreateIntegrationArgs {
    /// Integration name
    #[arg(long)]
    pub name: Option<String>,

    /// Roll back every write if any step fails
    #[arg(long)]
    pub atomic: bool,
}

pub fn run(ctx: &CliContext, args: CreateIntegrationArgs) -> Result<ExitCode> {
    let mut report = Report::default();

    // Usage errors are reported before any lock, database, or audit access.
    let name = match args.name.as_deref() {
        Some(n) if !n.is_empty() => n,
        _ => {
            report.error(ProvisionError::Usage.to_string());
            report.print();
            return Ok(ExitStatus::Failure.into());
        }
    };

    shopmon_fs::ensure_dir(&ctx.paths.root, constants::ROOT_DIR_MODE)?;
    let Some(_lock) = FileLock::try_exclusive(&ctx.paths.provision_lock)? else {
        report.error(format!(
            "another provisioning run holds {}",
            ctx.paths.provision_lock.display()
        ));
        report.print();
        return Ok(ExitStatus::Failure.into());
    };

    let status = match ctx.open_database() {
        Ok(conn) if args.atomic => {
            provision::provision_atomic(&conn, ctx.retry_policy(), Some(name), &mut report)
        }
        Ok(conn) => provision::provision(&conn, ctx.retry_policy(), Some(name), &mut report),
        Err(err) => {
            report.error(format!("{:#}", err));
            ExitStatus::Failure
        }
    };
    report.print();

    ctx.audit(
        AuditEvent {
            action: "create-integration",
            integration_label: Some(name.to_string()),
            atomic: args.atomic,
        },
        status == ExitStatus::Success,
        report
            .messages(Level::Error)
            .into_iter()
            .map(str::to_string)
            .collect(),
    );

    Ok(status.into())
}
