use attrib_cascade::StageResults;
use attrib_guardrails::HomeownerOverride;
use attrib_protocol::{Anchor, Decision, EvidenceCandidate, MatchType, ProviderResult, SpanContext};
use attrib_router::{route_call, route_span, CallInput, RouterConfig, SpanInput};
use pretty_assertions::assert_eq;

fn provider(
    name: &str,
    project_id: Option<&str>,
    confidence: f64,
    decision: Decision,
    strong: bool,
) -> ProviderResult {
    ProviderResult {
        ok: true,
        provider: name.to_string(),
        model: format!("{name}-model"),
        project_id: project_id.map(String::from),
        confidence,
        decision,
        reasoning: format!("{name} judgment"),
        anchors: project_id
            .map(|p| vec![Anchor::new(MatchType::ExactProjectName, p)])
            .unwrap_or_default(),
        strong_anchor: strong,
        error_code: None,
    }
}

fn span(text: &str, stages: Vec<StageResults>, candidates: Vec<EvidenceCandidate>) -> SpanInput {
    SpanInput {
        context: SpanContext {
            span_index: 1,
            transcript_text: text.to_string(),
            current_project_id: None,
            candidate_project_ids: candidates.iter().map(|c| c.project_id.clone()).collect(),
            prior_assigned_project_ids: Vec::new(),
        },
        stages,
        candidates,
        homeowner: None,
    }
}

fn evidence(project_id: &str, rrf_score: f64, label: &str) -> EvidenceCandidate {
    EvidenceCandidate {
        project_id: project_id.to_string(),
        rrf_score: Some(rrf_score),
        evidence_tier_label: Some(label.to_string()),
        source_strength: None,
    }
}

#[test]
fn junk_call_short_circuits_before_any_span_routing() {
    let call = CallInput {
        transcript: Some("Please leave a message after the tone.".to_string()),
        duration_seconds: Some(8.0),
        spans: vec![span(
            "never reached",
            vec![StageResults::pair(
                provider("openai", Some("p1"), 0.95, Decision::Assign, true),
                provider("anthropic", Some("p1"), 0.95, Decision::Assign, true),
            )],
            vec![evidence("p1", 0.06, "smoking_gun")],
        )],
    };
    let outcome = route_call(&call, &RouterConfig::default());
    assert!(outcome.prefilter.is_junk);
    assert_eq!(outcome.prefilter.reason_codes[0], "junk_call_filtered");
    assert_eq!(outcome.verdicts.len(), 0);
}

#[test]
fn substantive_call_routes_every_span() {
    let call = CallInput {
        transcript: Some(
            "Mike: The cabinet install is on schedule for Thursday.\n\
             Dana: Great, and the countertop template too."
                .to_string(),
        ),
        duration_seconds: Some(240.0),
        spans: vec![span(
            "cabinet install on schedule",
            vec![StageResults::pair(
                provider("openai", Some("p1"), 0.82, Decision::Assign, true),
                provider("anthropic", Some("p1"), 0.91, Decision::Assign, true),
            )],
            vec![evidence("p1", 0.04, "strong")],
        )],
    };
    let outcome = route_call(&call, &RouterConfig::default());
    assert!(!outcome.prefilter.is_junk);
    assert_eq!(outcome.verdicts.len(), 1);
    assert_eq!(outcome.verdicts[0].decision, Decision::Assign);
    assert_eq!(outcome.verdicts[0].project_id.as_deref(), Some("p1"));
}

#[test]
fn consensus_stage_wins_with_higher_confidence_provider() {
    let input = span(
        "span text",
        vec![StageResults::pair(
            provider("openai", Some("p1"), 0.82, Decision::Assign, true),
            provider("anthropic", Some("p1"), 0.91, Decision::Assign, true),
        )],
        vec![evidence("p1", 0.04, "strong")],
    );
    let verdict = route_span(&input, &RouterConfig::default());
    assert_eq!(verdict.decision, Decision::Assign);
    assert_eq!(verdict.project_id.as_deref(), Some("p1"));
    assert_eq!(verdict.confidence, 0.91);
}

#[test]
fn provider_disagreement_resolves_to_review() {
    let input = span(
        "span text",
        vec![StageResults::pair(
            provider("openai", Some("p1"), 0.88, Decision::Assign, true),
            provider("anthropic", Some("p2"), 0.86, Decision::Assign, true),
        )],
        vec![evidence("p1", 0.04, "strong"), evidence("p2", 0.03, "strong")],
    );
    let verdict = route_span(&input, &RouterConfig::default());
    assert_eq!(verdict.decision, Decision::Review);
    assert_eq!(verdict.project_id, None);
    assert!(verdict
        .reason_codes
        .iter()
        .any(|c| c == "model_disagreement"));
}

#[test]
fn smoking_gun_tier_floors_confidence_through_the_chain() {
    let input = span(
        "span text",
        vec![StageResults::pair(
            provider("openai", Some("p1"), 0.76, Decision::Assign, true),
            provider("anthropic", Some("p1"), 0.75, Decision::Assign, true),
        )],
        vec![evidence("p1", 0.07, "smoking_gun")],
    );
    let verdict = route_span(&input, &RouterConfig::default());
    assert_eq!(verdict.decision, Decision::Assign);
    assert_eq!(verdict.confidence, 0.85);
    assert!(verdict.boosted);
    assert!(verdict
        .reason_codes
        .iter()
        .any(|c| c == "rrf_tier_smoking_gun_boost"));
}

#[test]
fn unlabeled_candidate_gets_tier_from_fused_score() {
    let input = span(
        "span text",
        vec![StageResults::pair(
            provider("openai", Some("p1"), 0.78, Decision::Assign, true),
            provider("anthropic", Some("p1"), 0.77, Decision::Assign, true),
        )],
        vec![EvidenceCandidate {
            project_id: "p1".to_string(),
            rrf_score: Some(0.06),
            evidence_tier_label: None,
            source_strength: None,
        }],
    );
    let verdict = route_span(&input, &RouterConfig::default());
    // 0.06 classifies as smoking_gun under default thresholds.
    assert_eq!(verdict.decision, Decision::Assign);
    assert_eq!(verdict.confidence, 0.85);
    assert!(verdict.boosted);
}

#[test]
fn early_span_hop_is_pulled_back_to_baseline() {
    let mut input = span(
        "and the framing inspection passed",
        vec![StageResults::pair(
            provider("openai", Some("p_new"), 0.85, Decision::Assign, true),
            provider("anthropic", Some("p_new"), 0.84, Decision::Assign, true),
        )],
        vec![evidence("p_new", 0.04, "strong"), evidence("p_base", 0.03, "strong")],
    );
    input.context.span_index = 2;
    input.context.prior_assigned_project_ids = vec!["p_base".to_string()];
    let verdict = route_span(&input, &RouterConfig::default());
    assert_eq!(verdict.decision, Decision::Assign);
    assert_eq!(verdict.project_id.as_deref(), Some("p_base"));
    assert_eq!(verdict.overridden_project_id.as_deref(), Some("p_new"));
    assert!(verdict.enforced);
    assert!(verdict
        .reason_codes
        .iter()
        .any(|c| c == "adjacent_span_coherence_override"));
}

#[test]
fn announced_switch_keeps_the_new_project() {
    let mut input = span(
        "okay switching to the Maple Street job now",
        vec![StageResults::pair(
            provider("openai", Some("p_new"), 0.85, Decision::Assign, true),
            provider("anthropic", Some("p_new"), 0.84, Decision::Assign, true),
        )],
        vec![evidence("p_new", 0.04, "strong"), evidence("p_base", 0.03, "strong")],
    );
    input.context.span_index = 2;
    input.context.prior_assigned_project_ids = vec!["p_base".to_string()];
    let verdict = route_span(&input, &RouterConfig::default());
    assert_eq!(verdict.project_id.as_deref(), Some("p_new"));
    assert!(!verdict.enforced);
}

#[test]
fn all_provider_failure_yields_review_with_model_error() {
    let failed = ProviderResult {
        ok: false,
        provider: "openai".to_string(),
        model: "openai-model".to_string(),
        project_id: None,
        confidence: 0.0,
        decision: Decision::Review,
        reasoning: "timeout".to_string(),
        anchors: Vec::new(),
        strong_anchor: false,
        error_code: Some("provider_timeout".to_string()),
    };
    let input = span(
        "span text",
        vec![StageResults {
            first: Some(failed.clone()),
            second: Some(ProviderResult {
                provider: "anthropic".to_string(),
                model: "anthropic-model".to_string(),
                ..failed
            }),
        }],
        Vec::new(),
    );
    let verdict = route_span(&input, &RouterConfig::default());
    assert_eq!(verdict.decision, Decision::Review);
    assert_eq!(verdict.project_id, None);
    assert!(verdict.reason_codes.iter().any(|c| c == "model_error"));
}

#[test]
fn call_input_round_trips_from_wire_json() {
    let raw = r#"{
        "transcript": "Dana: The tile order for the Hartwell bath came in.",
        "duration_seconds": 180,
        "spans": [{
            "context": {
                "span_index": 1,
                "transcript_text": "tile order for the Hartwell bath",
                "candidate_project_ids": ["p_hartwell"],
                "prior_assigned_project_ids": []
            },
            "stages": [{
                "first": {
                    "ok": true,
                    "provider": "openai",
                    "model": "gpt-4o",
                    "project_id": "p_hartwell",
                    "confidence": 0.88,
                    "decision": "assign",
                    "reasoning": "tile order quote",
                    "anchors": [{"match_type": "exact_project_name", "candidate_project_id": "p_hartwell"}],
                    "strong_anchor": true
                },
                "second": {
                    "ok": true,
                    "provider": "anthropic",
                    "model": "claude",
                    "project_id": "p_hartwell",
                    "confidence": 0.9,
                    "decision": "assign",
                    "reasoning": "bath remodel quote",
                    "anchors": [{"match_type": "exact_project_name", "candidate_project_id": "p_hartwell"}],
                    "strong_anchor": true
                }
            }],
            "candidates": [{
                "project_id": "p_hartwell",
                "rrf_score": 0.052,
                "evidence_tier_label": "smoking_gun"
            }],
            "homeowner": {"homeowner_override": false}
        }]
    }"#;
    let call: CallInput = serde_json::from_str(raw).expect("parse call input");
    let outcome = route_call(&call, &RouterConfig::default());
    assert!(!outcome.prefilter.is_junk);
    assert_eq!(outcome.verdicts.len(), 1);
    assert_eq!(outcome.verdicts[0].decision, Decision::Assign);
    assert_eq!(outcome.verdicts[0].project_id.as_deref(), Some("p_hartwell"));
}

#[test]
fn homeowner_metadata_absent_changes_nothing() {
    let mut with_none = span(
        "span text",
        vec![StageResults::pair(
            provider("openai", Some("p1"), 0.82, Decision::Assign, true),
            provider("anthropic", Some("p1"), 0.91, Decision::Assign, true),
        )],
        vec![evidence("p1", 0.04, "strong")],
    );
    with_none.homeowner = Some(HomeownerOverride::default());
    let base = route_span(&with_none, &RouterConfig::default());

    with_none.homeowner = None;
    let verdict = route_span(&with_none, &RouterConfig::default());
    assert_eq!(base, verdict);
}
