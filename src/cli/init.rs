use crate::cli::CliContext;
use crate::constants;
use crate::core::config;
use crate::models::config::ConfigFile;
use crate::util::fs as shopmon_fs;
use anyhow::Result;
use clap::Args;
use std::process::ExitCode;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing shopmon.toml with the defaults
    #[arg(long)]
    pub force: bool,
}

pub fn run(ctx: &CliContext, args: InitArgs) -> Result<ExitCode> {
    let paths = &ctx.paths;
    shopmon_fs::ensure_dir(&paths.root, constants::ROOT_DIR_MODE)?;

    if args.force || !paths.config_toml.exists() {
        config::save(&paths.config_toml, &ConfigFile::default())?;
        println!("Wrote {}", paths.config_toml.display());
    } else {
        println!("Keeping {}", paths.config_toml.display());
    }

    let db_path = ctx.database_path();
    drop(ctx.open_database()?);
    println!("Database schema ready at {}", db_path.display());
    println!("initialized {}", paths);
    Ok(ExitCode::SUCCESS)
}
