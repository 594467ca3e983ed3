//! Reciprocal Rank Fusion over multi-channel project retrieval.
//!
//! Each retrieval channel contributes `1 / (k + rank)` for every candidate
//! it surfaced; candidates absent from a channel contribute nothing there.
//! Output order is fully deterministic: fused score descending, then
//! source strength, then insertion order.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Retrieval channels fused by the reranker.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Structured,
    Fts,
    Trgm,
    Vector,
}

/// Per-channel 1-based rank positions for one candidate.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChannelRanks {
    #[serde(default)]
    pub structured: Option<usize>,
    #[serde(default)]
    pub fts: Option<usize>,
    #[serde(default)]
    pub trgm: Option<usize>,
    #[serde(default)]
    pub vector: Option<usize>,
}

impl ChannelRanks {
    fn set(&mut self, channel: Channel, rank: usize) {
        let slot = match channel {
            Channel::Structured => &mut self.structured,
            Channel::Fts => &mut self.fts,
            Channel::Trgm => &mut self.trgm,
            Channel::Vector => &mut self.vector,
        };
        // First placement wins if a channel lists a candidate twice.
        if slot.is_none() {
            *slot = Some(rank);
        }
    }

    fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        [self.structured, self.fts, self.trgm, self.vector]
            .into_iter()
            .flatten()
    }
}

/// A candidate project with its per-channel ranks and fused score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedCandidate {
    pub project_id: String,
    pub ranks: ChannelRanks,
    #[serde(default)]
    pub source_strength: Option<f64>,
    #[serde(default)]
    pub rrf_score: Option<f64>,
}

/// One channel's ranked result list (best first).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelResult {
    pub channel: Channel,
    pub project_ids: Vec<String>,
    /// Optional per-project source-strength scores, used only as a
    /// deterministic tie-break key after fusion.
    #[serde(default)]
    pub source_strengths: Vec<Option<f64>>,
}

/// RRF fusion policy. `k` smooths the rank contribution curve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RrfConfig {
    pub k: f64,
    pub top_n: usize,
}

impl Default for RrfConfig {
    fn default() -> Self {
        Self { k: 60.0, top_n: 20 }
    }
}

/// Merge per-channel ranked lists into unified candidates, deduplicating by
/// project id and recording each channel's 1-based rank.
#[must_use]
pub fn merge_channel_results(channel_results: &[ChannelResult]) -> Vec<RankedCandidate> {
    let mut by_project: HashMap<String, usize> = HashMap::new();
    let mut merged: Vec<RankedCandidate> = Vec::new();

    for result in channel_results {
        for (idx, project_id) in result.project_ids.iter().enumerate() {
            let slot = *by_project.entry(project_id.clone()).or_insert_with(|| {
                merged.push(RankedCandidate {
                    project_id: project_id.clone(),
                    ranks: ChannelRanks::default(),
                    source_strength: None,
                    rrf_score: None,
                });
                merged.len() - 1
            });
            let candidate = &mut merged[slot];
            candidate.ranks.set(result.channel, idx + 1);
            if candidate.source_strength.is_none() {
                candidate.source_strength =
                    result.source_strengths.get(idx).copied().flatten();
            }
        }
    }

    merged
}

/// Fuse merged candidates with the standard RRF formula and sort them.
///
/// Ties on fused score break by source strength (descending), then by the
/// candidate's position in the input, so repeated runs with identical
/// inputs always produce identical output.
#[must_use]
pub fn rrf_fuse(mut candidates: Vec<RankedCandidate>, config: &RrfConfig) -> Vec<RankedCandidate> {
    for candidate in &mut candidates {
        let score: f64 = candidate
            .ranks
            .iter()
            .map(|rank| 1.0 / (config.k + rank as f64))
            .sum();
        candidate.rrf_score = Some(score);
    }

    let mut indexed: Vec<(usize, RankedCandidate)> = candidates.into_iter().enumerate().collect();
    indexed.sort_by(|(ia, a), (ib, b)| {
        let score_a = a.rrf_score.unwrap_or(0.0);
        let score_b = b.rrf_score.unwrap_or(0.0);
        score_b
            .partial_cmp(&score_a)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                let strength_a = a.source_strength.unwrap_or(0.0);
                let strength_b = b.source_strength.unwrap_or(0.0);
                strength_b
                    .partial_cmp(&strength_a)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| ia.cmp(ib))
    });

    indexed.into_iter().map(|(_, c)| c).collect()
}

/// Full fusion pipeline: merge channel results, fuse, return top-N.
#[must_use]
pub fn rrf_pipeline(channel_results: &[ChannelResult], config: &RrfConfig) -> Vec<RankedCandidate> {
    let merged = merge_channel_results(channel_results);
    log::debug!(
        "rrf: merged {} candidates from {} channels",
        merged.len(),
        channel_results.len()
    );
    let mut fused = rrf_fuse(merged, config);
    fused.truncate(config.top_n);
    fused
}
