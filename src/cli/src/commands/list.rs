//! List command.

use anyhow::Result;
use clap::{Args, ValueEnum};
use serde::Serialize;
use tabled::Tabled;

use gatekeeper_core::rbac::{PolicyRule, RoleAssignment};

use crate::context::PolicyContext;
use crate::output::{self, OutputFormat};

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum ListKind {
    /// Policy rules
    #[default]
    Policies,
    /// Role assignments
    Roles,
}

#[derive(Args)]
pub struct ListArgs {
    /// What to list
    #[arg(value_enum, default_value_t = ListKind::Policies)]
    pub kind: ListKind,
}

#[derive(Debug, Serialize, Tabled)]
struct PolicyView {
    #[tabled(rename = "Subject")]
    subject: String,
    #[tabled(rename = "Object")]
    object: String,
    #[tabled(rename = "Action")]
    action: String,
}

impl From<PolicyRule> for PolicyView {
    fn from(rule: PolicyRule) -> Self {
        Self {
            subject: rule.subject,
            object: rule.object,
            action: rule.action,
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
struct AssignmentView {
    #[tabled(rename = "User")]
    user: String,
    #[tabled(rename = "Role")]
    role: String,
}

impl From<RoleAssignment> for AssignmentView {
    fn from(assignment: RoleAssignment) -> Self {
        Self {
            user: assignment.user,
            role: assignment.role,
        }
    }
}

pub async fn execute(args: ListArgs, ctx: &PolicyContext, format: OutputFormat) -> Result<()> {
    match args.kind {
        ListKind::Policies => {
            let rows: Vec<PolicyView> = ctx
                .enforcer
                .policies()
                .into_iter()
                .map(PolicyView::from)
                .collect();
            output::print_list(&rows, format)
        }
        ListKind::Roles => {
            let rows: Vec<AssignmentView> = ctx
                .enforcer
                .role_assignments()
                .into_iter()
                .map(AssignmentView::from)
                .collect();
            output::print_list(&rows, format)
        }
    }
}
