//! Evidence-tier classification and weights.

use attrib_protocol::EvidenceTier;
use serde::{Deserialize, Serialize};

/// Fused-score thresholds mapping an RRF score onto an evidence tier.
///
/// These are policy values, not structural contract: defaults are
/// calibrated for four-channel fusion at `k = 60`, where a rank-1 hit in a
/// single channel contributes roughly 0.0164.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierThresholds {
    pub smoking_gun: f64,
    pub strong: f64,
    pub moderate: f64,
    pub weak: f64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            smoking_gun: 0.05,
            strong: 0.03,
            moderate: 0.016,
            weak: 0.005,
        }
    }
}

/// Classify a fused RRF score into an evidence tier.
#[must_use]
pub fn classify_tier(rrf_score: f64, thresholds: &TierThresholds) -> EvidenceTier {
    if rrf_score >= thresholds.smoking_gun {
        EvidenceTier::SmokingGun
    } else if rrf_score >= thresholds.strong {
        EvidenceTier::Strong
    } else if rrf_score >= thresholds.moderate {
        EvidenceTier::Moderate
    } else if rrf_score >= thresholds.weak {
        EvidenceTier::Weak
    } else {
        EvidenceTier::Anti
    }
}

/// Weight applied to a fused score when reranking by tier.
#[must_use]
pub fn tier_weight(tier: EvidenceTier) -> f64 {
    match tier {
        EvidenceTier::SmokingGun => 5.0,
        EvidenceTier::Strong => 3.0,
        EvidenceTier::Moderate => 1.0,
        EvidenceTier::Weak => 0.5,
        EvidenceTier::Anti => -1.0,
    }
}
