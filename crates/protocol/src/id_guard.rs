//! Identifier validation for inbound span/interaction references.
//!
//! Malformed ids are reported as structured issues, never as failures, so
//! callers can decide whether to block or just log.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static INTERACTION_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^cll_[A-Za-z0-9_]+$").expect("interaction id regex"));
static SPAN_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$",
    )
    .expect("span id regex")
});

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IdField {
    InteractionId,
    SpanId,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IdSeverity {
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IdIssue {
    pub field: IdField,
    pub severity: IdSeverity,
    pub code: String,
    pub message: String,
    pub as_received: String,
    #[serde(default)]
    pub suggested_canonical: Option<String>,
}

fn is_ascii_printable(value: &str) -> bool {
    value.chars().all(|c| (' '..='~').contains(&c))
}

fn issue(
    field: IdField,
    severity: IdSeverity,
    code: &str,
    message: &str,
    as_received: &str,
    suggested_canonical: Option<String>,
) -> IdIssue {
    IdIssue {
        field,
        severity,
        code: code.to_string(),
        message: message.to_string(),
        as_received: as_received.to_string(),
        suggested_canonical,
    }
}

/// Recover a `cll_`-prefixed form from an id with the wrong prefix.
fn suggest_interaction_canonical(raw: &str) -> Option<String> {
    let (_, suffix) = raw.split_once('_')?;
    if suffix.is_empty() {
        return None;
    }
    Some(format!("cll_{suffix}"))
}

fn validate_interaction_id(raw: Option<&str>, issues: &mut Vec<IdIssue>) {
    let Some(raw) = raw else { return };
    let value = raw.trim();
    if value.is_empty() {
        issues.push(issue(
            IdField::InteractionId,
            IdSeverity::Error,
            "interaction_id_empty",
            "interaction_id must not be empty.",
            value,
            None,
        ));
        return;
    }
    if !is_ascii_printable(value) {
        issues.push(issue(
            IdField::InteractionId,
            IdSeverity::Error,
            "interaction_id_non_ascii",
            "interaction_id contains non-ASCII characters (possible confusable input).",
            value,
            None,
        ));
        return;
    }
    if !INTERACTION_ID_RE.is_match(value) {
        issues.push(issue(
            IdField::InteractionId,
            IdSeverity::Warning,
            "interaction_id_malformed",
            "interaction_id does not match the cll_ token format.",
            value,
            suggest_interaction_canonical(value),
        ));
    }
}

fn validate_span_id(raw: Option<&str>, issues: &mut Vec<IdIssue>) {
    let Some(raw) = raw else { return };
    let value = raw.trim();
    if value.is_empty() {
        issues.push(issue(
            IdField::SpanId,
            IdSeverity::Error,
            "span_id_empty",
            "span_id must not be empty.",
            value,
            None,
        ));
        return;
    }
    if !is_ascii_printable(value) {
        issues.push(issue(
            IdField::SpanId,
            IdSeverity::Error,
            "span_id_non_ascii",
            "span_id contains non-ASCII characters (possible confusable input).",
            value,
            None,
        ));
        return;
    }
    if !SPAN_ID_RE.is_match(value) {
        issues.push(issue(
            IdField::SpanId,
            IdSeverity::Error,
            "span_id_malformed",
            "span_id must be a UUID.",
            value,
            None,
        ));
    }
}

/// Validate the ids attached to a routing request. Absent ids are not an
/// issue; the caller decides which fields are required.
#[must_use]
pub fn validate_ids(interaction_id: Option<&str>, span_id: Option<&str>) -> Vec<IdIssue> {
    let mut issues = Vec::new();
    validate_interaction_id(interaction_id, &mut issues);
    validate_span_id(span_id, &mut issues);
    issues
}
