//! Deterministic guardrails applied around the model cascade.
//!
//! Every guardrail here is a pure function of (decision-so-far, context):
//! identical inputs always yield identical outcomes, and ambiguous inputs
//! resolve toward review/no-op rather than an unchecked assign.

mod coherence;
mod homeowner;
mod resegment;
mod tier_gate;

pub use coherence::{evaluate_adjacent_span_coherence, has_switch_signal, CoherenceOutcome};
pub use homeowner::{
    evaluate_override, find_override_conflict, is_explicit_contradictory_project_anchor,
    is_homeowner_role_label, AliasMatch, HomeownerGateOutcome, HomeownerOverride,
    OverrideCandidate, OverrideConflict, OverrideSkipReason,
};
pub use resegment::{
    count_strong_anchor_projects, evaluate_auto_resegment, ResegmentOutcome,
    AUTO_RESEGMENT_MAX_SPAN_CHARS,
};
pub use tier_gate::{apply_tier_gate, TierGateConfig, TierGateOutcome};
