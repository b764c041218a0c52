use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;

fn main() -> Result<ExitCode> {
    let cli = shopmon_integration::cli::Cli::parse();
    cli.run()
}
