//! Homeowner override gate.
//!
//! When context assembly has established that the caller is the homeowner
//! of exactly one project and nothing on the span contradicts that, the
//! attribution is deterministic and bypasses the model cascade entirely.

use attrib_protocol::MatchType;
use serde::{Deserialize, Serialize};

/// Homeowner override metadata assembled upstream. All fields optional;
/// a populated conflict field deactivates the override.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HomeownerOverride {
    #[serde(rename = "homeowner_override", default)]
    pub active: bool,
    #[serde(rename = "homeowner_override_project_id", default)]
    pub project_id: Option<String>,
    #[serde(rename = "homeowner_override_conflict_project_id", default)]
    pub conflict_project_id: Option<String>,
    #[serde(rename = "homeowner_override_conflict_term", default)]
    pub conflict_term: Option<String>,
}

impl HomeownerOverride {
    /// True when the override flag is set and no conflict field carries a
    /// non-blank value. Used both by the deterministic gate and by anchor
    /// matching, which treats the homeowner role as a strong anchor.
    #[must_use]
    pub fn acts_as_strong_anchor(&self) -> bool {
        let conflict_project = self
            .conflict_project_id
            .as_deref()
            .is_some_and(|v| !v.trim().is_empty());
        let conflict_term = self
            .conflict_term
            .as_deref()
            .is_some_and(|v| !v.trim().is_empty());
        self.active && !conflict_project && !conflict_term
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OverrideSkipReason {
    MissingProjectId,
    MultiProjectSpan,
}

impl OverrideSkipReason {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            OverrideSkipReason::MissingProjectId => "missing_project_id",
            OverrideSkipReason::MultiProjectSpan => "multi_project_span",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HomeownerGateOutcome {
    pub strong_anchor_active: bool,
    pub deterministic_project_id: Option<String>,
    pub skip_reason: Option<OverrideSkipReason>,
}

impl HomeownerGateOutcome {
    fn inactive() -> Self {
        Self {
            strong_anchor_active: false,
            deterministic_project_id: None,
            skip_reason: None,
        }
    }

    fn skipped(reason: OverrideSkipReason) -> Self {
        Self {
            strong_anchor_active: false,
            deterministic_project_id: None,
            skip_reason: Some(reason),
        }
    }
}

/// Evaluate the deterministic homeowner gate for one span.
///
/// The override pins the span only when it names a project and every
/// candidate surfaced for the span agrees with it; a second distinct
/// candidate makes the span ambiguous and the gate steps aside.
#[must_use]
pub fn evaluate_override(
    meta: Option<&HomeownerOverride>,
    candidate_project_ids: &[String],
) -> HomeownerGateOutcome {
    let Some(meta) = meta else {
        return HomeownerGateOutcome::inactive();
    };
    if !meta.acts_as_strong_anchor() {
        return HomeownerGateOutcome::inactive();
    }

    let Some(project_id) = meta
        .project_id
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
    else {
        return HomeownerGateOutcome::skipped(OverrideSkipReason::MissingProjectId);
    };

    let conflicting = candidate_project_ids
        .iter()
        .map(|id| id.trim())
        .filter(|id| !id.is_empty())
        .any(|id| id != project_id);
    if conflicting {
        return HomeownerGateOutcome::skipped(OverrideSkipReason::MultiProjectSpan);
    }

    HomeownerGateOutcome {
        strong_anchor_active: true,
        deterministic_project_id: Some(project_id.to_string()),
        skip_reason: None,
    }
}

/// An alias match attached to a competing candidate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AliasMatch {
    pub match_type: MatchType,
    #[serde(default)]
    pub term: Option<String>,
}

/// A candidate considered when scanning for override conflicts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OverrideCandidate {
    pub project_id: String,
    #[serde(default)]
    pub alias_matches: Vec<AliasMatch>,
}

/// A competing anchor explicit enough to cancel the homeowner override.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OverrideConflict {
    pub project_id: String,
    pub term: String,
}

fn normalize_role_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut last_was_space = true;
    for c in value.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            last_was_space = false;
        } else if !last_was_space {
            out.push(' ');
            last_was_space = true;
        }
    }
    out.trim_end().to_string()
}

/// Does a contact role label describe the homeowner?
#[must_use]
pub fn is_homeowner_role_label(value: &str) -> bool {
    let normalized = normalize_role_text(value);
    if normalized.is_empty() {
        return false;
    }
    normalized.contains("homeowner")
        || normalized.contains("home owner")
        || normalized.contains("property owner")
        || normalized == "owner"
}

/// Is an alias match explicit enough to contradict the homeowner override?
///
/// Bare name fragments and short alias hits are too noisy to count; a name
/// match needs four characters, an alias match needs to be multi-word,
/// carry a digit, or reach eight characters.
#[must_use]
pub fn is_explicit_contradictory_project_anchor(match_type: MatchType, term: &str) -> bool {
    let text = term.trim();
    if text.is_empty() {
        return false;
    }
    match match_type {
        MatchType::NameMatch => text.chars().count() >= 4,
        MatchType::AliasMatch => {
            let multi_word = text.contains(char::is_whitespace);
            let has_digit = text.chars().any(|c| c.is_ascii_digit());
            multi_word || has_digit || text.chars().count() >= 8
        }
        _ => false,
    }
}

/// Scan competing candidates for an anchor that contradicts the homeowner
/// project. Returns the first explicit conflict found.
#[must_use]
pub fn find_override_conflict(
    homeowner_project_id: &str,
    candidates: &[OverrideCandidate],
) -> Option<OverrideConflict> {
    for candidate in candidates {
        if candidate.project_id.is_empty() || candidate.project_id == homeowner_project_id {
            continue;
        }
        for alias in &candidate.alias_matches {
            let term = alias.term.as_deref().unwrap_or("");
            if is_explicit_contradictory_project_anchor(alias.match_type, term) {
                return Some(OverrideConflict {
                    project_id: candidate.project_id.clone(),
                    term: term.trim().to_string(),
                });
            }
        }
    }
    None
}
