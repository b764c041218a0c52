//! Read-only check of the provisioned Shopmon records.

use crate::cli::CliContext;
use crate::constants;
use crate::core::provision::Provisioner;
use crate::core::sqlite_store::{hex_id, SqliteStore};
use anyhow::{bail, Context, Result};
use clap::Args;
use std::process::ExitCode;

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Output format: text|json
    #[arg(long, default_value = "text")]
    pub format: String,
}

pub fn run(ctx: &CliContext, args: VerifyArgs) -> Result<ExitCode> {
    if args.format != "text" && args.format != "json" {
        bail!("invalid format: {} (use text|json)", args.format);
    }

    let db_path = ctx.database_path();
    if !db_path.is_file() {
        bail!("database not found: {} (run init first)", db_path.display());
    }
    let conn = ctx.open_database()?;
    let store = SqliteStore::new(&conn, ctx.retry_policy());
    let state = Provisioner::new(&store, &store, &store)
        .inspect()
        .context("read provisioning state")?;
    let issues = state.issues();

    if args.format == "json" {
        let out = serde_json::json!({
            "acl_role": state.role,
            "integration": state.integration,
            "linked": state.linked,
            "issues": issues,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("Verify: {}", db_path.display());
        match &state.role {
            Some(role) => println!(
                "  [PASS] {} `{}` ({} privileges)",
                constants::ENTITY_ACL_ROLE,
                role.name,
                role.privileges.len()
            ),
            None => println!(
                "  [FAIL] {} missing (id: {})",
                constants::ENTITY_ACL_ROLE,
                hex_id(constants::ACL_ROLE_ID)
            ),
        }
        match &state.integration {
            Some(integration) => println!(
                "  [PASS] {} `{}` (access key {})",
                constants::ENTITY_INTEGRATION,
                integration.label,
                integration.access_key
            ),
            None => println!(
                "  [FAIL] {} missing (id: {})",
                constants::ENTITY_INTEGRATION,
                hex_id(constants::INTEGRATION_ID)
            ),
        }
        if state.linked {
            println!("  [PASS] ACL role assigned to integration");
        }
        println!();
        if issues.is_empty() {
            println!("Verify summary: Shopmon integration is provisioned");
        } else {
            for issue in &issues {
                println!("  - {}", issue);
            }
            println!("Verify summary: {} issue(s)", issues.len());
        }
    }

    Ok(if issues.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
