use crate::cli::CliContext;
use crate::core::audit_log;
use anyhow::Result;
use chrono::{DateTime, Local};
use clap::{Args, Subcommand};
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Table};
use std::process::ExitCode;

#[derive(Subcommand, Debug)]
pub enum AuditCommand {
    /// Display the audit trail
    Log(AuditLogArgs),
    /// Verify audit chain integrity
    Verify,
}

#[derive(Args, Debug)]
pub struct AuditLogArgs {
    /// Maximum number of entries to display
    #[arg(long, default_value_t = 50)]
    pub limit: usize,
}

pub fn run(ctx: &CliContext, cmd: AuditCommand) -> Result<ExitCode> {
    match cmd {
        AuditCommand::Log(args) => run_log(ctx, args),
        AuditCommand::Verify => run_verify(ctx),
    }
}

fn run_log(ctx: &CliContext, args: AuditLogArgs) -> Result<ExitCode> {
    let entries = audit_log::read_log(&ctx.paths, Some(args.limit))?;
    if entries.is_empty() {
        println!("No audit entries found.");
        return Ok(ExitCode::SUCCESS);
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        Cell::new("Timestamp").add_attribute(Attribute::Bold),
        Cell::new("Action").add_attribute(Attribute::Bold),
        Cell::new("Label").add_attribute(Attribute::Bold),
        Cell::new("Actor").add_attribute(Attribute::Bold),
        Cell::new("Result").add_attribute(Attribute::Bold),
    ]);

    for entry in &entries {
        let local: DateTime<Local> = entry.timestamp.into();
        let action = if entry.atomic {
            format!("{} (atomic)", entry.action)
        } else {
            entry.action.clone()
        };
        let result = if entry.result.success {
            "OK".to_string()
        } else {
            format!("FAIL: {}", entry.result.errors.join("; "))
        };
        table.add_row(vec![
            local.format("%Y-%m-%d %H:%M:%S").to_string(),
            action,
            entry.integration_label.clone().unwrap_or_else(|| "-".into()),
            entry.actor.clone(),
            result,
        ]);
    }

    println!("{}", table);
    println!("\n{} entries shown.", entries.len());
    Ok(ExitCode::SUCCESS)
}

fn run_verify(ctx: &CliContext) -> Result<ExitCode> {
    let (total, problems) = audit_log::verify_chain(&ctx.paths)?;
    if total == 0 {
        println!("No audit entries to verify.");
        return Ok(ExitCode::SUCCESS);
    }

    for problem in &problems {
        println!("  [FAIL] {}", problem);
    }
    println!();
    println!("Audit chain: {} entries, {} errors", total, problems.len());
    Ok(if problems.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
