//! Roles command: direct and inherited roles of one user.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crate::context::PolicyContext;
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct RolesArgs {
    /// User (or role) to resolve
    pub user: String,
}

#[derive(Debug, Serialize)]
struct UserRoles {
    user: String,
    direct: Vec<String>,
    effective: Vec<String>,
}

pub async fn execute(args: RolesArgs, ctx: &PolicyContext, format: OutputFormat) -> Result<()> {
    let roles = UserRoles {
        direct: ctx.enforcer.roles_for_user(&args.user),
        effective: ctx.enforcer.implicit_roles_for_user(&args.user),
        user: args.user,
    };

    match format {
        OutputFormat::Table => {
            output::print_header(&format!("Roles for {}", roles.user));
            output::print_detail("Direct", &join_or_none(&roles.direct));
            output::print_detail("Effective", &join_or_none(&roles.effective));
        }
        _ => output::print_item(&roles, format)?,
    }

    Ok(())
}

fn join_or_none(roles: &[String]) -> String {
    if roles.is_empty() {
        "(none)".to_string()
    } else {
        roles.join(", ")
    }
}
