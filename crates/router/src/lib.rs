//! Span router: the composed attribution surface.
//!
//! One call comes in, one verdict per span goes out. The prefilter screens
//! the whole call first; surviving spans run the cascade and then the
//! guardrail chain in a fixed order, with the deterministic homeowner
//! override holding the highest precedence at the end.

use attrib_cascade::{run_cascade, CascadeConfig, StageResults};
use attrib_guardrails::{
    apply_tier_gate, evaluate_adjacent_span_coherence, evaluate_auto_resegment,
    evaluate_override, HomeownerOverride, OverrideSkipReason, TierGateConfig,
};
use attrib_prefilter::{PrefilterConfig, PrefilterReport};
use attrib_protocol::{Anchor, Decision, EvidenceCandidate, SpanContext, SpanVerdict};
use attrib_rerank::{rerank_candidates, TierThresholds};
use serde::{Deserialize, Serialize};

/// Policy for the full routing pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouterConfig {
    #[serde(default)]
    pub prefilter: PrefilterConfig,
    #[serde(default)]
    pub cascade: CascadeConfig,
    #[serde(default)]
    pub tier_gate: TierGateConfig,
    #[serde(default)]
    pub tier_thresholds: TierThresholds,
}

/// Everything the collaborator layers collected for one span.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpanInput {
    pub context: SpanContext,
    /// Per-stage provider results, already materialized, in stage order.
    #[serde(default)]
    pub stages: Vec<StageResults>,
    /// Candidate projects with retrieval evidence (post-rerank order).
    #[serde(default)]
    pub candidates: Vec<EvidenceCandidate>,
    #[serde(default)]
    pub homeowner: Option<HomeownerOverride>,
}

/// One call: raw transcript plus its segmented spans.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallInput {
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub spans: Vec<SpanInput>,
}

/// Routing result for a whole call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallOutcome {
    pub prefilter: PrefilterReport,
    /// Empty when the call was screened out as junk.
    pub verdicts: Vec<SpanVerdict>,
}

/// Route a full call: prefilter first, then every span.
#[must_use]
pub fn route_call(call: &CallInput, config: &RouterConfig) -> CallOutcome {
    let prefilter = attrib_prefilter::evaluate(
        call.transcript.as_deref(),
        call.duration_seconds,
        &config.prefilter,
    );
    if prefilter.is_junk {
        log::info!(
            "router: call screened out ({})",
            prefilter.reason_codes.join(",")
        );
        return CallOutcome {
            prefilter,
            verdicts: Vec::new(),
        };
    }

    let verdicts = call
        .spans
        .iter()
        .map(|span| route_span(span, config))
        .collect();
    CallOutcome { prefilter, verdicts }
}

/// Route one span through the cascade and the guardrail chain.
#[must_use]
pub fn route_span(input: &SpanInput, config: &RouterConfig) -> SpanVerdict {
    // 1. Rerank candidates by tier-weighted fused score; this also fills
    //    tier labels for candidates that arrived with only a raw score.
    let reranked = rerank_candidates(input.candidates.clone(), &config.tier_thresholds);
    let candidates = reranked.candidates;

    // 2. Cascade: reduce the collected provider results.
    let cascade = run_cascade(&input.stages, &config.cascade);
    let winner_anchors: Vec<Anchor> = cascade
        .winner
        .as_ref()
        .map(|w| w.anchors.clone())
        .unwrap_or_default();

    let mut verdict = match &cascade.winner {
        Some(winner) => match (&winner.decision, winner.project_id.as_deref()) {
            (Decision::Assign, Some(project_id)) => {
                SpanVerdict::assign(project_id, winner.confidence)
            }
            (Decision::None, _) => {
                let mut v = SpanVerdict::none();
                v.confidence = winner.confidence;
                v
            }
            _ => SpanVerdict::review(winner.confidence),
        },
        None => SpanVerdict::review(0.0),
    };
    for code in &cascade.reason_codes {
        verdict.add_reason(code.clone());
    }

    // 3. Evidence-tier gate on the chosen project.
    let tier_gate = apply_tier_gate(
        verdict.decision,
        verdict.project_id.as_deref(),
        verdict.confidence,
        &candidates,
        &config.tier_gate,
    );
    verdict.confidence = tier_gate.confidence;
    if tier_gate.downgraded {
        verdict.downgrade_to_review();
    }
    if tier_gate.boosted {
        verdict.boosted = true;
    }
    if let Some(code) = &tier_gate.reason_code {
        verdict.add_reason(code.clone());
    }

    // 4. Adjacent-span coherence against the call's earlier assignments.
    let coherence_ctx = SpanContext {
        current_project_id: verdict.project_id.clone(),
        ..input.context.clone()
    };
    let coherence = evaluate_adjacent_span_coherence(&coherence_ctx);
    if coherence.enforced {
        verdict.enforced = true;
        if let Some(baseline) = &coherence.override_project_id {
            verdict.override_project(baseline.clone());
        } else if coherence.downgrade_to_review {
            verdict.downgrade_to_review();
        }
        if let Some(reason) = &coherence.reason {
            verdict.add_reason(reason.clone());
        }
    }

    // 5. Resegment invariant: signal only, never a decision change.
    let additional_strong_ids: Vec<String> = input
        .homeowner
        .as_ref()
        .filter(|m| m.acts_as_strong_anchor())
        .and_then(|m| m.project_id.clone())
        .into_iter()
        .collect();
    let resegment = evaluate_auto_resegment(
        input.context.transcript_text.chars().count(),
        &winner_anchors,
        &additional_strong_ids,
    );
    if resegment.triggered {
        verdict.triggered = true;
        verdict.resegment_needed = true;
        for reason in &resegment.reasons {
            verdict.add_reason(reason.clone());
        }
    }

    // 6. Homeowner override gate: highest precedence.
    let gate = evaluate_override(
        input.homeowner.as_ref(),
        &input.context.candidate_project_ids,
    );
    if gate.strong_anchor_active {
        if let Some(project_id) = &gate.deterministic_project_id {
            verdict.override_project(project_id.clone());
            verdict.enforced = true;
            verdict.add_reason("homeowner_override_applied");
        }
    } else {
        match gate.skip_reason {
            Some(OverrideSkipReason::MultiProjectSpan) => {
                // An active override on an ambiguous span cannot pin a
                // project, but it must not auto-commit either.
                if verdict.decision == Decision::Assign {
                    verdict.downgrade_to_review();
                }
                verdict.add_reason(OverrideSkipReason::MultiProjectSpan.as_str());
            }
            Some(OverrideSkipReason::MissingProjectId) => {
                log::debug!("router: homeowner override skipped, no project id");
            }
            None => {}
        }
    }

    log::debug!(
        "router: span {} -> {} ({:?})",
        input.context.span_index,
        verdict.decision.as_str(),
        verdict.project_id
    );
    verdict
}
