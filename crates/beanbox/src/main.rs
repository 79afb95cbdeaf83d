//! beanbox - Entry Point
//!
//! Builds the demo container, runs its application runners and shuts it
//! down.

use std::path::PathBuf;

use beanbox::{run, RunOptions};
use clap::Parser;

/// Command line interface for beanbox
#[derive(Parser, Debug)]
#[command(name = "beanbox")]
#[command(about = "beanbox - dependency injection container demo")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print every bean definition after start
    #[arg(long)]
    pub list_beans: bool,

    /// Activate a profile (repeatable)
    #[arg(short, long = "profile")]
    pub profiles: Vec<String>,

    /// Arguments passed to application runners
    #[arg(trailing_var_arg = true)]
    pub args: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    run(RunOptions {
        config: cli.config,
        list_beans: cli.list_beans,
        profiles: cli.profiles,
        args: cli.args,
    })
    .await?;
    Ok(())
}
