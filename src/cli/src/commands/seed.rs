//! Seed command.
//!
//! Bulk-loads a policy source into the database and prints the load report.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use gatekeeper_core::rbac::LoadReport;

use crate::context::PolicyContext;
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct SeedArgs {
    /// Policy source file (defaults to policy.source from the configuration)
    pub source: Option<PathBuf>,
}

pub async fn execute(args: SeedArgs, ctx: &PolicyContext, format: OutputFormat) -> Result<()> {
    let path = ctx.source_path(args.source.as_deref())?;
    let report = ctx
        .enforcer
        .load_from_file(path)
        .await
        .with_context(|| format!("Failed to seed from {}", path.display()))?;

    match format {
        OutputFormat::Table => {
            print_report(&report);
            output::print_success(&format!(
                "Seeded {} from {}",
                ctx.database_url(),
                path.display()
            ));
        }
        _ => output::print_item(&report, format)?,
    }

    Ok(())
}

/// Print a load report as key/value details, one warning per skipped line.
pub fn print_report(report: &LoadReport) {
    output::print_header("Policy Load");
    output::print_detail("Policies added", &report.policies_added.to_string());
    output::print_detail("Assignments added", &report.assignments_added.to_string());
    output::print_detail("Duplicates", &report.duplicates.to_string());
    output::print_detail("Skipped", &report.skipped.len().to_string());

    for skipped in &report.skipped {
        let line = skipped
            .line
            .map(|n| format!("line {}", n))
            .unwrap_or_else(|| "unknown line".to_string());
        output::print_warning(&format!("{}: {}", line, skipped.reason));
    }
    println!();
}
