mod fusion;
mod rerank;
mod tier;

pub use fusion::{
    merge_channel_results, rrf_fuse, rrf_pipeline, Channel, ChannelRanks, ChannelResult,
    RankedCandidate, RrfConfig,
};
pub use rerank::{rerank_candidates, RerankOutcome, RerankScore};
pub use tier::{classify_tier, tier_weight, TierThresholds};
