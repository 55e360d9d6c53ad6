use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

pub type UserId = Uuid;
pub type PostId = Uuid;

/// 關注邊的狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeStatus {
    Accepted,
    Pending,
    Rejected,
}

impl EdgeStatus {
    /// Outbound edges in these states already count as "following" for exclusion.
    pub const FOLLOWING: [EdgeStatus; 2] = [EdgeStatus::Accepted, EdgeStatus::Pending];

    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeStatus::Accepted => "accepted",
            EdgeStatus::Pending => "pending",
            EdgeStatus::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "accepted" => Some(EdgeStatus::Accepted),
            "pending" => Some(EdgeStatus::Pending),
            "rejected" => Some(EdgeStatus::Rejected),
            _ => None,
        }
    }
}

/// 關係邊（有向邊）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialEdge {
    pub follower: UserId,
    pub followee: UserId,
    pub status: EdgeStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionType {
    View,
    Like,
    Comment,
    Save,
    Share,
}

impl InteractionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionType::View => "view",
            InteractionType::Like => "like",
            InteractionType::Comment => "comment",
            InteractionType::Save => "save",
            InteractionType::Share => "share",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "view" => Some(InteractionType::View),
            "like" => Some(InteractionType::Like),
            "comment" => Some(InteractionType::Comment),
            "save" => Some(InteractionType::Save),
            "share" => Some(InteractionType::Share),
            _ => None,
        }
    }
}

/// A user's engagement with a post, joined with the post's author and tags.
///
/// `post_author` is `None` when the post has been deleted since the interaction
/// was recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionEvent {
    pub actor: UserId,
    pub post_id: PostId,
    pub post_author: Option<UserId>,
    pub interaction_type: InteractionType,
    pub tags: Vec<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterestSource {
    Explicit,
    #[default]
    Implicit,
    Derived,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestEntry {
    pub category: String,
    /// 0-5 scale, higher means stronger interest
    pub weight: f64,
    #[serde(default)]
    pub source: InterestSource,
}

impl InterestEntry {
    pub const MAX_WEIGHT: f64 = 5.0;

    /// Weight clamped into the valid `[0, 5]` range; NaN counts as zero.
    pub fn clamped_weight(&self) -> f64 {
        if self.weight.is_nan() {
            0.0
        } else {
            self.weight.clamp(0.0, Self::MAX_WEIGHT)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestProfile {
    pub user_id: UserId,
    pub interests: Vec<InterestEntry>,
}

impl InterestProfile {
    pub fn is_empty(&self) -> bool {
        self.interests
            .iter()
            .all(|entry| entry.category.trim().is_empty())
    }
}

/// Row returned by a category query against the interest profile store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestMatch {
    pub user_id: UserId,
    pub interest_score: f64,
    pub matched_categories: BTreeSet<String>,
}

/// Lightweight display record resolved during hydration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub user_id: UserId,
    pub handle: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub follower_count: i64,
    pub post_count: i64,
}

/// 推薦理由；宣告順序即輸出順序
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonTag {
    MutualConnections,
    SimilarInterests,
    ContentCreator,
}

impl ReasonTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonTag::MutualConnections => "mutual_connections",
            ReasonTag::SimilarInterests => "similar_interests",
            ReasonTag::ContentCreator => "content_creator",
        }
    }
}

/// Independent evidence sources feeding the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    MutualConnections,
    SimilarInterests,
    ContentAffinity,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::MutualConnections => "mutual_connections",
            SignalKind::SimilarInterests => "similar_interests",
            SignalKind::ContentAffinity => "content_affinity",
        }
    }
}

/// Second-degree candidate found through the requester's accepted follows.
#[derive(Debug, Clone, PartialEq)]
pub struct MutualConnection {
    pub candidate_id: UserId,
    pub mutual_count: usize,
    /// Display-only subset of connectors, most recent first.
    pub connector_ids: Vec<UserId>,
}

/// Typed output of one signal collector.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalOutput {
    Mutual(Vec<MutualConnection>),
    Interest(Vec<InterestMatch>),
    Content(BTreeSet<UserId>),
}

impl SignalOutput {
    pub fn kind(&self) -> SignalKind {
        match self {
            SignalOutput::Mutual(_) => SignalKind::MutualConnections,
            SignalOutput::Interest(_) => SignalKind::SimilarInterests,
            SignalOutput::Content(_) => SignalKind::ContentAffinity,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SignalOutput::Mutual(items) => items.len(),
            SignalOutput::Interest(items) => items.len(),
            SignalOutput::Content(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Per-request accumulator owned by the aggregator.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateScore {
    pub candidate_id: UserId,
    pub score: f64,
    pub reasons: BTreeSet<ReasonTag>,
    pub mutual_count: usize,
    pub connector_ids: Vec<UserId>,
    pub common_interests: BTreeSet<String>,
}

impl CandidateScore {
    pub fn new(candidate_id: UserId) -> Self {
        Self {
            candidate_id,
            score: 0.0,
            reasons: BTreeSet::new(),
            mutual_count: 0,
            connector_ids: Vec::new(),
            common_interests: BTreeSet::new(),
        }
    }
}

/// Hydrated, display-ready recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub user: ProfileSummary,
    /// Rounded to 2 decimal places
    pub score: f64,
    pub reasons: Vec<ReasonTag>,
    pub mutual_count: usize,
    pub connector_ids: Vec<UserId>,
    pub common_interests: Vec<String>,
    /// e.g. "3 mutual connections"
    pub summary: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalStats {
    pub mutual_candidates: usize,
    pub interest_candidates: usize,
    pub content_candidates: usize,
    pub failed_signals: Vec<SignalKind>,
    pub total_candidates: usize,
    pub final_count: usize,
    pub cache_hit: bool,
}

impl SignalStats {
    pub fn record(&mut self, output: &SignalOutput) {
        match output.kind() {
            SignalKind::MutualConnections => self.mutual_candidates = output.len(),
            SignalKind::SimilarInterests => self.interest_candidates = output.len(),
            SignalKind::ContentAffinity => self.content_candidates = output.len(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        !self.failed_signals.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendationReport {
    pub recommendations: Vec<Recommendation>,
    pub stats: SignalStats,
}
