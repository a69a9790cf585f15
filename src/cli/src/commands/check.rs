//! Check command.
//!
//! A denial is a normal answer, so the command succeeds either way.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use gatekeeper_core::rbac::PolicyRule;

use crate::context::PolicyContext;
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct CheckArgs {
    /// Subject (user or role)
    pub subject: String,
    /// Object
    pub object: String,
    /// Action
    pub action: String,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    subject: String,
    object: String,
    action: String,
    allowed: bool,
    matched: Option<PolicyRule>,
}

pub async fn execute(args: CheckArgs, ctx: &PolicyContext, format: OutputFormat) -> Result<()> {
    let matched = ctx
        .enforcer
        .enforce_ex(&args.subject, &args.object, &args.action);

    let result = CheckResult {
        allowed: matched.is_some(),
        subject: args.subject,
        object: args.object,
        action: args.action,
        matched,
    };

    match format {
        OutputFormat::Table => {
            println!(
                "{} -> {} {} : {}",
                result.subject,
                result.object,
                result.action,
                output::decision(result.allowed)
            );
            if let Some(rule) = &result.matched {
                output::print_detail("Matched", &rule.to_string());
            }
        }
        _ => output::print_item(&result, format)?,
    }

    Ok(())
}
