//! Auto-resegment invariant checker.
//!
//! Flags spans that should not be attributed as a single unit: either the
//! span is too large to trust one attribution, or it carries strong
//! anchors pointing at more than one project. The checker never mutates a
//! decision; it only signals the segmentation layer.

use std::collections::HashSet;

use attrib_protocol::Anchor;
use serde::{Deserialize, Serialize};

/// Spans longer than this are flagged for resegmentation.
pub const AUTO_RESEGMENT_MAX_SPAN_CHARS: usize = 3000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResegmentOutcome {
    pub triggered: bool,
    pub reasons: Vec<String>,
    pub span_chars: usize,
    pub strong_anchor_project_count: usize,
}

fn strong_anchor_projects<'a>(anchors: &'a [Anchor]) -> HashSet<&'a str> {
    anchors
        .iter()
        .filter(|a| a.match_type.is_strong())
        .filter_map(|a| a.candidate_project_id.as_deref())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .collect()
}

/// Count distinct projects referenced by strong anchors.
#[must_use]
pub fn count_strong_anchor_projects(anchors: &[Anchor]) -> usize {
    strong_anchor_projects(anchors).len()
}

/// Evaluate the resegment invariant for one span.
///
/// `additional_strong_project_ids` lets the caller union in strong project
/// references established outside the anchor list, e.g. homeowner context.
#[must_use]
pub fn evaluate_auto_resegment(
    span_chars: usize,
    anchors: &[Anchor],
    additional_strong_project_ids: &[String],
) -> ResegmentOutcome {
    let mut project_ids = strong_anchor_projects(anchors);
    for id in additional_strong_project_ids {
        let id = id.trim();
        if !id.is_empty() {
            project_ids.insert(id);
        }
    }
    let strong_anchor_project_count = project_ids.len();

    let mut reasons = Vec::new();
    if span_chars > AUTO_RESEGMENT_MAX_SPAN_CHARS {
        reasons.push("span_chars_over_3000".to_string());
    }
    if strong_anchor_project_count > 1 {
        reasons.push("multiple_strong_anchor_projects".to_string());
    }

    ResegmentOutcome {
        triggered: !reasons.is_empty(),
        reasons,
        span_chars,
        strong_anchor_project_count,
    }
}
