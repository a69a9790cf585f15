//! Gatekeeper CLI - seed and inspect a local RBAC policy database.
//!
//! Provides seed, check, list, roles and demo commands.

mod commands;
mod context;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::{check, demo, list, roles, seed};
use context::{ContextOptions, PolicyContext};
use gatekeeper_core::telemetry::init_telemetry;
use output::OutputFormat;

/// Gatekeeper - embeddable RBAC policy engine CLI
#[derive(Parser)]
#[command(
    name = "gatekeeper",
    version,
    about = "Gatekeeper - RBAC policy engine with persistent storage",
    long_about = "CLI tool for seeding a policy database from CSV and checking access decisions.",
    propagate_version = true
)]
pub struct Cli {
    /// Output format
    #[arg(short, long, global = true, default_value = "table")]
    output: OutputFormat,

    /// Policy database URL
    #[arg(long, global = true, env = "GATEKEEPER_DATABASE_URL")]
    database: Option<String>,

    /// Configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print Prometheus metrics after the command
    #[arg(long, global = true)]
    print_metrics: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bulk-load a policy source and save it
    Seed(seed::SeedArgs),

    /// Check one access decision
    Check(check::CheckArgs),

    /// List policies or role assignments
    List(list::ListArgs),

    /// Show the roles a user holds
    Roles(roles::RolesArgs),

    /// Seed, then run the bootstrap check matrix
    Demo(demo::DemoArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let options = ContextOptions {
        config_file: cli.config.clone(),
        database_url: cli.database.clone(),
        verbose: cli.verbose,
        metrics: cli.print_metrics,
    };
    let format = cli.output;

    let result = run(cli.command, &options, format, cli.print_metrics).await;

    if let Err(e) = result {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}

async fn run(
    command: Commands,
    options: &ContextOptions,
    format: OutputFormat,
    print_metrics: bool,
) -> Result<()> {
    let config = context::load_config(options)?;
    let metrics = init_telemetry(&config.logging, &config.metrics)?;
    let ctx = PolicyContext::open(config).await?;

    let result = match command {
        Commands::Seed(args) => seed::execute(args, &ctx, format).await,
        Commands::Check(args) => check::execute(args, &ctx, format).await,
        Commands::List(args) => list::execute(args, &ctx, format).await,
        Commands::Roles(args) => roles::execute(args, &ctx, format).await,
        Commands::Demo(args) => demo::execute(args, &ctx, format).await,
    };

    if print_metrics {
        eprint!("{}", metrics.render());
    }
    ctx.close().await;
    result
}
