//! Demo command.
//!
//! Seeds the database from a policy source and runs a fixed set of checks,
//! printing one `subject -> object action : true|false` line per case.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use gatekeeper_core::rbac::EnforcementRequest;

use crate::commands::seed;
use crate::context::PolicyContext;
use crate::output::{self, OutputFormat};

/// The bootstrap check matrix.
const CASES: &[(&str, &str, &str)] = &[
    ("alice", "/api/user", "GET"),
    ("bob", "/api/user", "GET"),
    ("bob", "/api/article", "POST"),
    ("eve", "/api/data", "GET"),
];

#[derive(Args)]
pub struct DemoArgs {
    /// Policy source file (defaults to policy.source from the configuration)
    pub source: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct DemoCase {
    #[serde(flatten)]
    request: EnforcementRequest,
    allowed: bool,
}

pub async fn execute(args: DemoArgs, ctx: &PolicyContext, format: OutputFormat) -> Result<()> {
    let path = ctx.source_path(args.source.as_deref())?;
    let report = ctx
        .enforcer
        .load_from_file(path)
        .await
        .with_context(|| format!("Failed to seed from {}", path.display()))?;

    let requests: Vec<EnforcementRequest> = CASES
        .iter()
        .map(|(subject, object, action)| EnforcementRequest::new(*subject, *object, *action))
        .collect();
    let decisions = ctx.enforcer.batch_enforce(&requests);

    match format {
        OutputFormat::Table => {
            seed::print_report(&report);
            for (request, allowed) in requests.iter().zip(&decisions) {
                println!("{}", case_line(request, *allowed));
            }
        }
        _ => {
            let cases: Vec<DemoCase> = requests
                .into_iter()
                .zip(decisions)
                .map(|(request, allowed)| DemoCase { request, allowed })
                .collect();
            output::print_item(&cases, format)?;
        }
    }

    Ok(())
}

fn case_line(request: &EnforcementRequest, allowed: bool) -> String {
    format!(
        "{:<5} -> {:<12} {:<4} : {}",
        request.subject, request.object, request.action, allowed
    )
}
