use crate::cli::CliContext;
use crate::core::audit_log::AuditEvent;
use crate::core::file_lock::FileLock;
use crate::core::provision::{Provisioner, Report};
use crate::core::sqlite_store::SqliteStore;
use anyhow::{bail, Context, Result};
use clap::Args;
use dialoguer::Confirm;
use std::process::ExitCode;

#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Skip the confirmation prompt
    #[arg(long)]
    pub yes: bool,
}

pub fn run(ctx: &CliContext, args: RemoveArgs) -> Result<ExitCode> {
    if ctx.non_interactive && !args.yes {
        bail!("--non-interactive requires --yes for remove");
    }
    let db_path = ctx.database_path();
    if !db_path.is_file() {
        bail!("database not found: {}", db_path.display());
    }

    if !args.yes {
        let confirmed = Confirm::new()
            .with_prompt("Remove the Shopmon integration and ACL role?")
            .default(false)
            .interact()
            .context("read confirmation")?;
        if !confirmed {
            println!("Aborted");
            return Ok(ExitCode::FAILURE);
        }
    }

    let Some(_lock) = FileLock::try_exclusive(&ctx.paths.provision_lock)? else {
        bail!(
            "another provisioning run holds {}",
            ctx.paths.provision_lock.display()
        );
    };

    let mut report = Report::default();
    let errors = match ctx.open_database() {
        Ok(conn) => {
            let store = SqliteStore::new(&conn, ctx.retry_policy());
            match Provisioner::new(&store, &store, &store).remove(&mut report) {
                Ok(_) => Vec::new(),
                Err(err) => err.messages(),
            }
        }
        Err(err) => vec![format!("{:#}", err)],
    };
    for message in &errors {
        report.error(message.clone());
    }
    report.print();

    let success = errors.is_empty();
    ctx.audit(
        AuditEvent {
            action: "remove",
            integration_label: None,
            atomic: false,
        },
        success,
        errors,
    );

    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
