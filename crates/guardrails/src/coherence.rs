//! Adjacent-span coherence guardrail.
//!
//! Early spans of a call rarely hop projects; when every earlier span
//! agrees on one project and the current span disagrees without an
//! explicit switch phrase, the hop is treated as model noise.

use std::collections::HashSet;

use attrib_protocol::SpanContext;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Only spans this early in a call are stabilized; later spans carry
/// enough independent context of their own.
const MAX_COHERENCE_SPAN_INDEX: u32 = 3;

static SWITCH_SIGNAL_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\banother\s+(?:project|job|house|site|one)\b",
        r"(?i)\bdifferent\s+(?:project|job|house|site|one)\b",
        r"(?i)\bother\s+(?:project|job|house|site)\b",
        r"(?i)\bswitch(?:ing)?\s+(?:to|over|back)\b",
        r"(?i)\bmove(?:d|ing)?\s+(?:to|over to)\b",
        r"(?i)\bseparate\s+(?:project|job|site)\b",
        r"(?i)\bnew\s+project\b",
        r"(?i)\bnext\s+project\b",
        r"(?i)\bon\s+the\s+other\s+job\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("switch signal pattern"))
    .collect()
});

/// Does the transcript explicitly announce a project switch?
#[must_use]
pub fn has_switch_signal(transcript: &str) -> bool {
    if transcript.is_empty() {
        return false;
    }
    SWITCH_SIGNAL_PATTERNS.iter().any(|re| re.is_match(transcript))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoherenceOutcome {
    pub enforced: bool,
    pub baseline_project_id: Option<String>,
    pub override_project_id: Option<String>,
    pub downgrade_to_review: bool,
    pub reason: Option<String>,
}

impl CoherenceOutcome {
    fn no_action(baseline: Option<String>) -> Self {
        Self {
            enforced: false,
            baseline_project_id: baseline,
            override_project_id: None,
            downgrade_to_review: false,
            reason: None,
        }
    }
}

/// Evaluate the coherence guardrail for one span.
///
/// Preconditions: the span has a current project, sits within the first
/// three spans of the call, and at least one earlier span was assigned.
/// Any unmet precondition returns the conservative no-action outcome.
#[must_use]
pub fn evaluate_adjacent_span_coherence(ctx: &SpanContext) -> CoherenceOutcome {
    let Some(current_project_id) = ctx
        .current_project_id
        .as_deref()
        .filter(|id| !id.is_empty())
    else {
        return CoherenceOutcome::no_action(None);
    };
    if ctx.span_index < 1 || ctx.span_index > MAX_COHERENCE_SPAN_INDEX {
        return CoherenceOutcome::no_action(None);
    }

    let prior: Vec<&str> = ctx
        .prior_assigned_project_ids
        .iter()
        .map(String::as_str)
        .filter(|id| !id.is_empty())
        .collect();
    if prior.is_empty() {
        return CoherenceOutcome::no_action(None);
    }

    let distinct: HashSet<&str> = prior.iter().copied().collect();
    if distinct.len() != 1 {
        // Mixed history gives no baseline to stabilize toward.
        return CoherenceOutcome::no_action(None);
    }

    let baseline = prior[0];
    if current_project_id == baseline {
        return CoherenceOutcome::no_action(Some(baseline.to_string()));
    }

    if has_switch_signal(&ctx.transcript_text) {
        log::debug!("coherence: explicit switch signal, allowing hop from {baseline}");
        return CoherenceOutcome::no_action(Some(baseline.to_string()));
    }

    let baseline_is_candidate = ctx
        .candidate_project_ids
        .iter()
        .any(|id| id == baseline);
    if baseline_is_candidate {
        return CoherenceOutcome {
            enforced: true,
            baseline_project_id: Some(baseline.to_string()),
            override_project_id: Some(baseline.to_string()),
            downgrade_to_review: false,
            reason: Some("adjacent_span_coherence_override".to_string()),
        };
    }

    // The baseline is not even a candidate here; forcing it would be a
    // guess, so ask for human review instead.
    CoherenceOutcome {
        enforced: true,
        baseline_project_id: Some(baseline.to_string()),
        override_project_id: None,
        downgrade_to_review: true,
        reason: Some("adjacent_span_coherence_needs_review".to_string()),
    }
}
