//! Line-oriented policy source reader.
//!
//! One CSV record per line, fields trimmed:
//!
//! ```text
//! p, <subject>, <object>, <action>
//! g, <user>, <role>
//! ```
//!
//! Ingestion is best-effort: short records, unknown kinds and records the CSV
//! reader cannot decode are skipped and reported, never fatal. Extra trailing
//! fields are ignored.

use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Serialize;
use std::fmt;
use std::io::Read;
use tracing::warn;

use super::models::{PolicyRule, PolicyType, RoleAssignment};
use crate::telemetry::metrics::PolicyMetrics;

/// A successfully parsed source record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyLine {
    Policy(PolicyRule),
    Assignment(RoleAssignment),
}

/// Why a record was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    /// `p` record with fewer than three fields after the discriminator.
    ShortPolicy,
    /// `g` record with fewer than two fields after the discriminator.
    ShortAssignment,
    /// First field is not a known record kind.
    UnknownKind(String),
    /// The CSV reader could not decode the record.
    Unreadable(String),
}

impl SkipReason {
    /// Short label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ShortPolicy => "short_policy",
            Self::ShortAssignment => "short_assignment",
            Self::UnknownKind(_) => "unknown_kind",
            Self::Unreadable(_) => "unreadable",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShortPolicy => write!(f, "policy record needs subject, object and action"),
            Self::ShortAssignment => write!(f, "assignment record needs user and role"),
            Self::UnknownKind(kind) => write!(f, "unknown record kind {:?}", kind),
            Self::Unreadable(detail) => write!(f, "unreadable record: {}", detail),
        }
    }
}

/// A record that was not applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedLine {
    /// 1-based line number in the source, when known.
    pub line: Option<u64>,
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// Everything read from one source.
#[derive(Debug, Clone, Default)]
pub struct ParsedSource {
    pub lines: Vec<PolicyLine>,
    pub skipped: Vec<SkippedLine>,
}

/// Interpret one CSV record.
pub fn parse_record(record: &StringRecord) -> Result<PolicyLine, SkipReason> {
    let kind = record.get(0).unwrap_or_default();
    match PolicyType::parse(kind) {
        Some(PolicyType::Policy) => match (record.get(1), record.get(2), record.get(3)) {
            (Some(subject), Some(object), Some(action)) => {
                Ok(PolicyLine::Policy(PolicyRule::new(subject, object, action)))
            }
            _ => Err(SkipReason::ShortPolicy),
        },
        Some(PolicyType::Grouping) => match (record.get(1), record.get(2)) {
            (Some(user), Some(role)) => {
                Ok(PolicyLine::Assignment(RoleAssignment::new(user, role)))
            }
            _ => Err(SkipReason::ShortAssignment),
        },
        None => Err(SkipReason::UnknownKind(kind.to_string())),
    }
}

/// Read every record from `reader`. Never fails; problems become skipped lines.
pub fn read_source<R: Read>(reader: R) -> ParsedSource {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut parsed = ParsedSource::default();

    for result in csv_reader.records() {
        let outcome = match result {
            Ok(record) => {
                let line = record.position().map(|p| p.line());
                parse_record(&record).map_err(|reason| SkippedLine { line, reason })
            }
            Err(error) => {
                let line = error.position().map(|p| p.line());
                let io_failure = matches!(error.kind(), csv::ErrorKind::Io(_));
                let skipped = SkippedLine {
                    line,
                    reason: SkipReason::Unreadable(error.to_string()),
                };
                if io_failure {
                    // The underlying reader is broken; later reads will fail the same way.
                    record_skip(&skipped);
                    parsed.skipped.push(skipped);
                    break;
                }
                Err(skipped)
            }
        };

        match outcome {
            Ok(line) => parsed.lines.push(line),
            Err(skipped) => {
                record_skip(&skipped);
                parsed.skipped.push(skipped);
            }
        }
    }

    parsed
}

fn record_skip(skipped: &SkippedLine) {
    warn!(
        line = skipped.line,
        reason = %skipped.reason,
        "Skipping policy source record"
    );
    PolicyMetrics::record_skipped_line(skipped.reason.label());
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
