//! Evidence-tier weighted reranking of candidate projects.
//!
//! Candidates that carry a fused RRF score are reordered by
//! `rrf_score * tier_weight`; candidates without one are left untouched so
//! a partially-integrated retrieval channel never invents evidence.

use attrib_protocol::{EvidenceCandidate, EvidenceTier};
use serde::{Deserialize, Serialize};

use crate::tier::{classify_tier, tier_weight, TierThresholds};

/// Audit record for one reranked candidate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RerankScore {
    pub project_id: String,
    pub rrf_score: f64,
    pub tier: EvidenceTier,
    pub tier_weight: f64,
    pub final_score: f64,
}

/// Reranker output: the reordered candidate list plus audit scores.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RerankOutcome {
    pub candidates: Vec<EvidenceCandidate>,
    pub reranked: bool,
    pub scores: Vec<RerankScore>,
}

/// Rerank candidates by tier-weighted fused score.
///
/// A candidate's tier comes from its existing label when recognized,
/// otherwise from threshold classification of its fused score. Candidates
/// with no fused score keep their original relative order after the scored
/// block; if no candidate has one, the input is returned unchanged with
/// `reranked = false`.
#[must_use]
pub fn rerank_candidates(
    candidates: Vec<EvidenceCandidate>,
    thresholds: &TierThresholds,
) -> RerankOutcome {
    if candidates.is_empty() {
        return RerankOutcome {
            candidates,
            reranked: false,
            scores: Vec::new(),
        };
    }

    if candidates.iter().all(|c| c.rrf_score.is_none()) {
        log::debug!("rerank: no fused scores present, keeping original order");
        return RerankOutcome {
            candidates,
            reranked: false,
            scores: Vec::new(),
        };
    }

    let mut scored: Vec<(usize, f64, RerankScore, EvidenceCandidate)> = Vec::new();
    let mut unscored: Vec<EvidenceCandidate> = Vec::new();

    for (idx, mut candidate) in candidates.into_iter().enumerate() {
        let Some(rrf_score) = candidate.rrf_score else {
            unscored.push(candidate);
            continue;
        };
        let tier = candidate
            .tier()
            .unwrap_or_else(|| classify_tier(rrf_score, thresholds));
        candidate.evidence_tier_label = Some(tier.as_str().to_string());
        let weight = tier_weight(tier);
        let final_score = rrf_score * weight;
        scored.push((
            idx,
            final_score,
            RerankScore {
                project_id: candidate.project_id.clone(),
                rrf_score,
                tier,
                tier_weight: weight,
                final_score,
            },
            candidate,
        ));
    }

    scored.sort_by(|(ia, fa, _, _), (ib, fb, _, _)| {
        fb.partial_cmp(fa)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| ia.cmp(ib))
    });

    let scores: Vec<RerankScore> = scored.iter().map(|(_, _, s, _)| s.clone()).collect();
    let mut out: Vec<EvidenceCandidate> = scored.into_iter().map(|(_, _, _, c)| c).collect();
    out.extend(unscored);

    RerankOutcome {
        candidates: out,
        reranked: true,
        scores,
    }
}
