use serde::{Deserialize, Serialize};

pub mod id_guard;

pub use id_guard::{validate_ids, IdField, IdIssue, IdSeverity};

/// Terminal decision for a span attribution.
///
/// `Assign` must always carry a concrete project id; `Review` and `None`
/// never do. `SpanVerdict` constructors enforce this pairing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Assign,
    Review,
    None,
}

impl Decision {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Assign => "assign",
            Decision::Review => "review",
            Decision::None => "none",
        }
    }
}

/// Anchor match types surfaced by upstream evidence extraction.
///
/// Unknown wire values collapse into `Other` so a new upstream match type
/// degrades to "no signal" instead of a deserialization failure.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    ExactProjectName,
    Alias,
    AddressFragment,
    ClientName,
    NameMatch,
    AliasMatch,
    LocationMatch,
    CityOrLocation,
    MentionedContact,
    PhoneticOrPronunciation,
    ContinuityCallback,
    DbScan,
    #[serde(other)]
    Other,
}

impl MatchType {
    /// Strong anchor types can support auto-assign; everything else forces
    /// review on its own.
    #[must_use]
    pub fn is_strong(&self) -> bool {
        matches!(
            self,
            MatchType::ExactProjectName
                | MatchType::Alias
                | MatchType::AddressFragment
                | MatchType::ClientName
        )
    }
}

/// Evidence that a transcript region refers to a specific project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Anchor {
    pub match_type: MatchType,
    #[serde(default)]
    pub candidate_project_id: Option<String>,
    #[serde(default)]
    pub quote: Option<String>,
}

impl Anchor {
    #[must_use]
    pub fn new(match_type: MatchType, candidate_project_id: impl Into<String>) -> Self {
        Self {
            match_type,
            candidate_project_id: Some(candidate_project_id.into()),
            quote: None,
        }
    }
}

/// One model provider's judgment for a span. Collected by the provider
/// layer; this core only ever reduces fully-materialized results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderResult {
    pub ok: bool,
    pub provider: String,
    pub model: String,
    pub project_id: Option<String>,
    pub confidence: f64,
    pub decision: Decision,
    pub reasoning: String,
    #[serde(default)]
    pub anchors: Vec<Anchor>,
    #[serde(default)]
    pub strong_anchor: bool,
    #[serde(default)]
    pub error_code: Option<String>,
}

/// Qualitative evidence bucket derived from fused multi-channel retrieval.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceTier {
    SmokingGun,
    Strong,
    Moderate,
    Weak,
    Anti,
}

impl EvidenceTier {
    /// Parse a wire label. Unrecognized labels yield `None`, which
    /// downstream consumers treat as "no guardrail signal".
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "smoking_gun" => Some(EvidenceTier::SmokingGun),
            "strong" => Some(EvidenceTier::Strong),
            "moderate" => Some(EvidenceTier::Moderate),
            "weak" => Some(EvidenceTier::Weak),
            "anti" => Some(EvidenceTier::Anti),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EvidenceTier::SmokingGun => "smoking_gun",
            EvidenceTier::Strong => "strong",
            EvidenceTier::Moderate => "moderate",
            EvidenceTier::Weak => "weak",
            EvidenceTier::Anti => "anti",
        }
    }
}

/// A candidate project with its retrieval evidence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvidenceCandidate {
    pub project_id: String,
    #[serde(default)]
    pub rrf_score: Option<f64>,
    #[serde(default)]
    pub evidence_tier_label: Option<String>,
    #[serde(default)]
    pub source_strength: Option<f64>,
}

impl EvidenceCandidate {
    #[must_use]
    pub fn tier(&self) -> Option<EvidenceTier> {
        self.evidence_tier_label
            .as_deref()
            .and_then(EvidenceTier::parse)
    }
}

/// Span-level context supplied by the segmentation layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpanContext {
    /// 1-based index of this span within its call.
    pub span_index: u32,
    pub transcript_text: String,
    #[serde(default)]
    pub current_project_id: Option<String>,
    #[serde(default)]
    pub candidate_project_ids: Vec<String>,
    /// Project ids already assigned to strictly earlier spans in the call.
    #[serde(default)]
    pub prior_assigned_project_ids: Vec<String>,
}

/// The composed verdict persisted as the attribution of record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpanVerdict {
    pub decision: Decision,
    pub project_id: Option<String>,
    pub confidence: f64,
    pub reason_codes: Vec<String>,
    pub downgraded: bool,
    pub boosted: bool,
    pub enforced: bool,
    pub triggered: bool,
    pub overridden_project_id: Option<String>,
    pub resegment_needed: bool,
}

impl SpanVerdict {
    #[must_use]
    pub fn assign(project_id: impl Into<String>, confidence: f64) -> Self {
        Self::base(Decision::Assign, Some(project_id.into()), confidence)
    }

    #[must_use]
    pub fn review(confidence: f64) -> Self {
        Self::base(Decision::Review, None, confidence)
    }

    #[must_use]
    pub fn none() -> Self {
        Self::base(Decision::None, None, 0.0)
    }

    fn base(decision: Decision, project_id: Option<String>, confidence: f64) -> Self {
        Self {
            decision,
            project_id,
            confidence,
            reason_codes: Vec::new(),
            downgraded: false,
            boosted: false,
            enforced: false,
            triggered: false,
            overridden_project_id: None,
            resegment_needed: false,
        }
    }

    /// Append a reason code unless already recorded. Reason codes are
    /// append-only within one evaluation; first-seen order is preserved.
    pub fn add_reason(&mut self, code: impl Into<String>) {
        let code = code.into();
        if !self.reason_codes.iter().any(|c| *c == code) {
            self.reason_codes.push(code);
        }
    }

    /// Replace the assigned project, remembering the displaced one.
    pub fn override_project(&mut self, project_id: impl Into<String>) {
        let next = project_id.into();
        if self.project_id.as_deref() != Some(next.as_str()) {
            self.overridden_project_id = self.project_id.take();
        }
        self.decision = Decision::Assign;
        self.project_id = Some(next);
    }

    /// Downgrade to review, clearing the project id.
    pub fn downgrade_to_review(&mut self) {
        self.decision = Decision::Review;
        self.project_id = None;
        self.downgraded = true;
    }
}
