//! RRF-tier post-inference guardrail.
//!
//! Adjusts the cascade's decision using the evidence tier of the chosen
//! project: weak/anti retrieval corroboration blocks auto-assign, a
//! smoking-gun tier floors the confidence.

use attrib_protocol::{Decision, EvidenceCandidate, EvidenceTier};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierGateConfig {
    pub smoking_gun_confidence_floor: f64,
}

impl Default for TierGateConfig {
    fn default() -> Self {
        Self {
            smoking_gun_confidence_floor: 0.85,
        }
    }
}

/// Outcome of one tier-gate evaluation. Tier and raw score are reported
/// even on pass-through paths where no rule fired.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TierGateOutcome {
    pub decision: Decision,
    pub confidence: f64,
    pub downgraded: bool,
    pub boosted: bool,
    pub reason_code: Option<String>,
    pub chosen_tier: Option<EvidenceTier>,
    pub chosen_rrf_score: Option<f64>,
}

impl TierGateOutcome {
    fn passthrough(decision: Decision, confidence: f64) -> Self {
        Self {
            decision,
            confidence,
            downgraded: false,
            boosted: false,
            reason_code: None,
            chosen_tier: None,
            chosen_rrf_score: None,
        }
    }
}

/// Apply the tier guardrail to a pre-guardrail verdict.
///
/// Rule 1 (downgrade) strictly precedes rule 2 (boost): a downgraded
/// decision is never also boosted in the same evaluation. No chosen
/// project, an unknown candidate, or an unrecognized tier all pass
/// through unchanged.
#[must_use]
pub fn apply_tier_gate(
    decision: Decision,
    project_id: Option<&str>,
    confidence: f64,
    candidates: &[EvidenceCandidate],
    config: &TierGateConfig,
) -> TierGateOutcome {
    let Some(project_id) = project_id else {
        return TierGateOutcome::passthrough(decision, confidence);
    };
    let Some(chosen) = candidates.iter().find(|c| c.project_id == project_id) else {
        return TierGateOutcome::passthrough(decision, confidence);
    };

    let rrf_score = chosen.rrf_score;
    let Some(tier) = chosen.tier() else {
        return TierGateOutcome {
            chosen_rrf_score: rrf_score,
            ..TierGateOutcome::passthrough(decision, confidence)
        };
    };

    let mut outcome = TierGateOutcome {
        decision,
        confidence,
        downgraded: false,
        boosted: false,
        reason_code: None,
        chosen_tier: Some(tier),
        chosen_rrf_score: rrf_score,
    };

    // Rule 1: weak/anti retrieval evidence cannot support auto-assign.
    if decision == Decision::Assign && matches!(tier, EvidenceTier::Weak | EvidenceTier::Anti) {
        outcome.decision = Decision::Review;
        outcome.downgraded = true;
        outcome.reason_code = Some(format!("rrf_tier_{}_downgrade", tier.as_str()));
        return outcome;
    }

    // Rule 2: smoking-gun evidence floors the confidence.
    if tier == EvidenceTier::SmokingGun && confidence < config.smoking_gun_confidence_floor {
        outcome.confidence = config.smoking_gun_confidence_floor;
        outcome.boosted = true;
        outcome.reason_code = Some("rrf_tier_smoking_gun_boost".to_string());
    }

    outcome
}
