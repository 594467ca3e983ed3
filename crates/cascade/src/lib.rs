//! Model cascade orchestrator.
//!
//! A pure reducer over already-collected provider results. The provider
//! layer runs the actual model calls (concurrently, with timeouts) and
//! must hand every stage in fully materialized: each provider slot either
//! a terminal result or `None`. Stages reduce strictly in the order given.

use attrib_protocol::{Decision, ProviderResult};
use serde::{Deserialize, Serialize};

/// Cascade policy knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CascadeConfig {
    /// Minimum confidence for a result to count as a strong assign.
    pub strong_assign_min_confidence: f64,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            strong_assign_min_confidence: 0.75,
        }
    }
}

/// Results for one cascade stage. Slot order is the tie-break order: when
/// both providers agree at equal confidence, `first` wins.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StageResults {
    pub first: Option<ProviderResult>,
    pub second: Option<ProviderResult>,
}

impl StageResults {
    #[must_use]
    pub fn pair(first: ProviderResult, second: ProviderResult) -> Self {
        Self {
            first: Some(first),
            second: Some(second),
        }
    }

    fn present(&self) -> Vec<&ProviderResult> {
        [self.first.as_ref(), self.second.as_ref()]
            .into_iter()
            .flatten()
            .collect()
    }
}

/// Final cascade output: the winning result (if any), where it came from,
/// and the full audit trail.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CascadeOutcome {
    pub winner: Option<ProviderResult>,
    /// 1-based stage the winner came from.
    pub winner_stage: Option<usize>,
    pub consensus_assign: bool,
    pub warnings: Vec<String>,
    pub reason_codes: Vec<String>,
    pub saw_provider_error: bool,
}

/// A result trusted enough to auto-assign on its own: successful, decided
/// `assign` with a concrete project, confident, and anchored by at least
/// one strong anchor.
#[must_use]
pub fn is_strong_assign(result: &ProviderResult, config: &CascadeConfig) -> bool {
    result.ok
        && result.decision == Decision::Assign
        && result.project_id.is_some()
        && result.confidence >= config.strong_assign_min_confidence
        && !result.anchors.is_empty()
        && result.strong_anchor
}

fn higher_confidence<'a>(a: &'a ProviderResult, b: &'a ProviderResult) -> &'a ProviderResult {
    if a.confidence >= b.confidence {
        a
    } else {
        b
    }
}

fn add_reason(reasons: &mut Vec<String>, code: &str) {
    if !reasons.iter().any(|c| c == code) {
        reasons.push(code.to_string());
    }
}

/// Reduce the cascade stages to one outcome.
///
/// Stage-level consensus (both providers strong-assign on the same
/// project) terminates immediately. Anything short of consensus records a
/// disagreement and falls through; after the final stage a surviving
/// `assign` fallback is downgraded to review because no stage corroborated
/// it.
#[must_use]
pub fn run_cascade(stages: &[StageResults], config: &CascadeConfig) -> CascadeOutcome {
    let mut warnings: Vec<String> = Vec::new();
    let mut reason_codes: Vec<String> = Vec::new();
    let mut fallback: Option<(ProviderResult, usize)> = None;
    let mut saw_provider_error = false;

    for (idx, stage) in stages.iter().enumerate() {
        let stage_no = idx + 1;
        let present = stage.present();

        for result in &present {
            if !result.ok || result.error_code.is_some() {
                saw_provider_error = true;
            }
        }

        let first_assign = stage
            .first
            .as_ref()
            .is_some_and(|r| is_strong_assign(r, config));
        let second_assign = stage
            .second
            .as_ref()
            .is_some_and(|r| is_strong_assign(r, config));

        match (stage.first.as_ref(), stage.second.as_ref()) {
            (Some(first), Some(second)) if first_assign && second_assign => {
                if first.project_id == second.project_id {
                    let winner = higher_confidence(first, second).clone();
                    warnings.push(format!("stage_{stage_no}_consensus_assign"));
                    log::debug!(
                        "cascade: stage {stage_no} consensus on {:?}",
                        winner.project_id
                    );
                    return CascadeOutcome {
                        winner: Some(winner),
                        winner_stage: Some(stage_no),
                        consensus_assign: true,
                        warnings,
                        reason_codes,
                        saw_provider_error,
                    };
                }
                add_reason(&mut reason_codes, "model_disagreement");
                warnings.push(format!("stage_{stage_no}_model_disagreement"));
            }
            _ if first_assign || second_assign => {
                // A single strong assign is not yet trusted.
                add_reason(&mut reason_codes, "model_disagreement");
                warnings.push(format!("stage_{stage_no}_single_provider_assign"));
            }
            _ if !present.is_empty() && present.iter().all(|r| !r.ok) => {
                warnings.push(format!("stage_{stage_no}_all_provider_failed"));
            }
            _ => {}
        }

        // Track the best successful result across stages as the fallback;
        // an earlier stage keeps a confidence tie.
        for result in present.into_iter().filter(|r| r.ok) {
            let better = match &fallback {
                Some((current, _)) => result.confidence > current.confidence,
                None => true,
            };
            if better {
                fallback = Some((result.clone(), stage_no));
            }
        }
    }

    if let Some((result, _)) = &mut fallback {
        if result.decision == Decision::Assign {
            // No stage corroborated this assign; it cannot stand on its own.
            result.project_id = None;
            result.decision = Decision::Review;
            result.reasoning = format!(
                "{} [downgraded: model_disagreement_after_final_stage]",
                result.reasoning
            );
            add_reason(&mut reason_codes, "model_disagreement");
        }
    }

    if saw_provider_error {
        add_reason(&mut reason_codes, "model_error");
    }
    if warnings.is_empty() {
        warnings.push("model_disagreement".to_string());
    }

    let (winner, winner_stage) = match fallback {
        Some((result, stage)) => (Some(result), Some(stage)),
        None => (None, None),
    };

    CascadeOutcome {
        winner,
        winner_stage,
        consensus_assign: false,
        warnings,
        reason_codes,
        saw_provider_error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use attrib_protocol::{Anchor, MatchType};
    use pretty_assertions::assert_eq;

    fn provider_result(
        provider: &str,
        project_id: Option<&str>,
        confidence: f64,
        decision: Decision,
    ) -> ProviderResult {
        ProviderResult {
            ok: true,
            provider: provider.to_string(),
            model: format!("{provider}-model"),
            project_id: project_id.map(String::from),
            confidence,
            decision,
            reasoning: format!("{provider} reasoning"),
            anchors: vec![Anchor::new(MatchType::ExactProjectName, project_id.unwrap_or("p"))],
            strong_anchor: true,
            error_code: None,
        }
    }

    fn failed_result(provider: &str, error_code: &str) -> ProviderResult {
        ProviderResult {
            ok: false,
            provider: provider.to_string(),
            model: format!("{provider}-model"),
            project_id: None,
            confidence: 0.0,
            decision: Decision::Review,
            reasoning: "timeout".to_string(),
            anchors: Vec::new(),
            strong_anchor: false,
            error_code: Some(error_code.to_string()),
        }
    }

    #[test]
    fn strong_assign_requires_every_condition() {
        let config = CascadeConfig::default();
        let good = provider_result("openai", Some("p1"), 0.82, Decision::Assign);
        assert!(is_strong_assign(&good, &config));

        let low_confidence = ProviderResult {
            confidence: 0.74,
            ..good.clone()
        };
        assert!(!is_strong_assign(&low_confidence, &config));

        let no_anchor = ProviderResult {
            anchors: Vec::new(),
            ..good.clone()
        };
        assert!(!is_strong_assign(&no_anchor, &config));

        let weak_anchor = ProviderResult {
            strong_anchor: false,
            ..good.clone()
        };
        assert!(!is_strong_assign(&weak_anchor, &config));

        let review = ProviderResult {
            decision: Decision::Review,
            ..good.clone()
        };
        assert!(!is_strong_assign(&review, &config));

        let failed = ProviderResult {
            ok: false,
            ..good
        };
        assert!(!is_strong_assign(&failed, &config));
    }

    #[test]
    fn consensus_terminates_at_first_agreeing_stage() {
        let stages = vec![
            StageResults::pair(
                provider_result("openai", Some("p1"), 0.82, Decision::Assign),
                provider_result("anthropic", Some("p1"), 0.91, Decision::Assign),
            ),
            // A later stage that would disagree; must never be reached.
            StageResults::pair(
                provider_result("openai", Some("p9"), 0.99, Decision::Assign),
                provider_result("anthropic", Some("p8"), 0.99, Decision::Assign),
            ),
        ];
        let outcome = run_cascade(&stages, &CascadeConfig::default());
        assert!(outcome.consensus_assign);
        assert_eq!(outcome.winner_stage, Some(1));
        let winner = outcome.winner.expect("winner");
        assert_eq!(winner.project_id.as_deref(), Some("p1"));
        assert_eq!(winner.decision, Decision::Assign);
        // Higher-confidence provider wins the stage.
        assert_eq!(winner.provider, "anthropic");
        assert_eq!(outcome.warnings, vec!["stage_1_consensus_assign"]);
    }

    #[test]
    fn consensus_confidence_tie_keeps_first_provider() {
        let stages = vec![StageResults::pair(
            provider_result("openai", Some("p1"), 0.88, Decision::Assign),
            provider_result("anthropic", Some("p1"), 0.88, Decision::Assign),
        )];
        let outcome = run_cascade(&stages, &CascadeConfig::default());
        assert_eq!(outcome.winner.expect("winner").provider, "openai");
    }

    #[test]
    fn disagreement_downgrades_fallback_assign_to_review() {
        let stages = vec![StageResults::pair(
            provider_result("openai", Some("p1"), 0.88, Decision::Assign),
            provider_result("anthropic", Some("p2"), 0.86, Decision::Assign),
        )];
        let outcome = run_cascade(&stages, &CascadeConfig::default());
        assert!(!outcome.consensus_assign);
        let winner = outcome.winner.expect("winner");
        assert_eq!(winner.decision, Decision::Review);
        assert_eq!(winner.project_id, None);
        assert!(winner
            .reasoning
            .contains("[downgraded: model_disagreement_after_final_stage]"));
        assert!(outcome.reason_codes.iter().any(|c| c == "model_disagreement"));
        assert_eq!(outcome.warnings, vec!["stage_1_model_disagreement"]);
    }

    #[test]
    fn single_provider_assign_is_not_trusted() {
        let stages = vec![StageResults {
            first: Some(provider_result("openai", Some("p1"), 0.90, Decision::Assign)),
            second: Some(provider_result("anthropic", None, 0.55, Decision::Review)),
        }];
        let outcome = run_cascade(&stages, &CascadeConfig::default());
        assert!(!outcome.consensus_assign);
        assert_eq!(outcome.warnings, vec!["stage_1_single_provider_assign"]);
        let winner = outcome.winner.expect("winner");
        assert_eq!(winner.decision, Decision::Review);
        assert_eq!(winner.project_id, None);
    }

    #[test]
    fn provider_errors_propagate_model_error_reason() {
        let stages = vec![StageResults {
            first: Some(failed_result("openai", "provider_timeout")),
            second: Some(provider_result("anthropic", None, 0.62, Decision::Review)),
        }];
        let outcome = run_cascade(&stages, &CascadeConfig::default());
        assert!(!outcome.consensus_assign);
        assert!(outcome.saw_provider_error);
        assert!(outcome.reason_codes.iter().any(|c| c == "model_error"));
        let winner = outcome.winner.expect("winner");
        assert_eq!(winner.provider, "anthropic");
        assert_eq!(winner.decision, Decision::Review);
    }

    #[test]
    fn all_providers_failed_records_stage_warning() {
        let stages = vec![StageResults::pair(
            failed_result("openai", "provider_timeout"),
            failed_result("anthropic", "bad_response"),
        )];
        let outcome = run_cascade(&stages, &CascadeConfig::default());
        assert_eq!(outcome.warnings, vec!["stage_1_all_provider_failed"]);
        assert_eq!(outcome.winner, None);
        assert_eq!(outcome.winner_stage, None);
        assert!(outcome.reason_codes.iter().any(|c| c == "model_error"));
    }

    #[test]
    fn fallback_keeps_highest_confidence_across_stages() {
        let stages = vec![
            StageResults {
                first: Some(provider_result("openai", None, 0.70, Decision::Review)),
                second: None,
            },
            StageResults {
                first: Some(provider_result("openai", None, 0.40, Decision::Review)),
                second: None,
            },
        ];
        let outcome = run_cascade(&stages, &CascadeConfig::default());
        assert_eq!(outcome.winner_stage, Some(1));
        let winner = outcome.winner.expect("winner");
        assert_eq!(winner.confidence, 0.70);
    }

    #[test]
    fn later_stage_can_resolve_earlier_disagreement() {
        let stages = vec![
            StageResults::pair(
                provider_result("openai", Some("p1"), 0.80, Decision::Assign),
                provider_result("anthropic", Some("p2"), 0.78, Decision::Assign),
            ),
            StageResults::pair(
                provider_result("openai", Some("p1"), 0.92, Decision::Assign),
                provider_result("anthropic", Some("p1"), 0.90, Decision::Assign),
            ),
        ];
        let outcome = run_cascade(&stages, &CascadeConfig::default());
        assert!(outcome.consensus_assign);
        assert_eq!(outcome.winner_stage, Some(2));
        assert_eq!(outcome.winner.expect("winner").project_id.as_deref(), Some("p1"));
        assert_eq!(
            outcome.warnings,
            vec!["stage_1_model_disagreement", "stage_2_consensus_assign"]
        );
    }

    #[test]
    fn empty_cascade_emits_default_disagreement_warning() {
        let outcome = run_cascade(&[], &CascadeConfig::default());
        assert_eq!(outcome.winner, None);
        assert_eq!(outcome.warnings, vec!["model_disagreement"]);
        assert!(!outcome.saw_provider_error);
    }

    #[test]
    fn empty_stage_is_tolerated() {
        let outcome = run_cascade(&[StageResults::default()], &CascadeConfig::default());
        assert_eq!(outcome.winner, None);
        assert_eq!(outcome.warnings, vec!["model_disagreement"]);
    }
}
