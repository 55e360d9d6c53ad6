use crate::config::EngineConfig;
use crate::models::{CandidateScore, ReasonTag, SignalOutput, UserId};
use crate::services::context::RequestContext;
use crate::utils::saturate;
use std::collections::HashMap;

/// Score Aggregator - 多信號加權合併
///
/// Contributions are additive across signals and reasons are unioned. Within
/// one signal a candidate is counted at most once. Performs no I/O and never
/// fails.
#[derive(Debug, Clone)]
pub struct ScoreAggregator {
    mutual_weight: f64,
    interest_weight: f64,
    content_weight: f64,
    mutual_saturation: f64,
    interest_saturation: f64,
}

/// Ranked, truncated candidates plus the pre-truncation candidate count.
#[derive(Debug, Clone, Default)]
pub struct RankedCandidates {
    pub candidates: Vec<CandidateScore>,
    pub total_candidates: usize,
}

impl ScoreAggregator {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            mutual_weight: config.mutual_weight,
            interest_weight: config.interest_weight,
            content_weight: config.content_weight,
            mutual_saturation: config.mutual_saturation,
            interest_saturation: config.interest_saturation,
        }
    }

    pub fn mutual_contribution(&self, mutual_count: usize) -> f64 {
        self.mutual_weight * saturate(mutual_count as f64, self.mutual_saturation)
    }

    pub fn interest_contribution(&self, interest_score: f64) -> f64 {
        self.interest_weight * saturate(interest_score, self.interest_saturation)
    }

    pub fn content_contribution(&self) -> f64 {
        self.content_weight
    }

    /// Merge signal outputs, in the order given, into one score per candidate.
    pub fn merge(
        &self,
        outputs: &[SignalOutput],
        ctx: &RequestContext,
    ) -> HashMap<UserId, CandidateScore> {
        let mut scores: HashMap<UserId, CandidateScore> = HashMap::new();

        for output in outputs {
            match output {
                SignalOutput::Mutual(connections) => {
                    for conn in connections {
                        let Some(entry) =
                            claim(&mut scores, ctx, conn.candidate_id, ReasonTag::MutualConnections)
                        else {
                            continue;
                        };
                        entry.score += self.mutual_contribution(conn.mutual_count);
                        entry.mutual_count = conn.mutual_count;
                        entry.connector_ids = conn.connector_ids.clone();
                    }
                }
                SignalOutput::Interest(matches) => {
                    for m in matches {
                        let Some(entry) =
                            claim(&mut scores, ctx, m.user_id, ReasonTag::SimilarInterests)
                        else {
                            continue;
                        };
                        entry.score += self.interest_contribution(m.interest_score);
                        entry
                            .common_interests
                            .extend(m.matched_categories.iter().cloned());
                    }
                }
                SignalOutput::Content(authors) => {
                    for author in authors {
                        let Some(entry) =
                            claim(&mut scores, ctx, *author, ReasonTag::ContentCreator)
                        else {
                            continue;
                        };
                        entry.score += self.content_contribution();
                    }
                }
            }
        }

        scores
    }

    /// Merge, order by score descending then candidate id ascending, and keep
    /// the first `limit`.
    pub fn rank(
        &self,
        outputs: &[SignalOutput],
        ctx: &RequestContext,
        limit: usize,
    ) -> RankedCandidates {
        let mut candidates: Vec<CandidateScore> = self.merge(outputs, ctx).into_values().collect();
        let total_candidates = candidates.len();

        candidates.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.candidate_id.cmp(&b.candidate_id))
        });
        candidates.truncate(limit);

        RankedCandidates {
            candidates,
            total_candidates,
        }
    }
}

/// Entry for `candidate` if it may still receive `reason`: excluded users and
/// repeats of a reason already credited are refused.
fn claim<'a>(
    scores: &'a mut HashMap<UserId, CandidateScore>,
    ctx: &RequestContext,
    candidate: UserId,
    reason: ReasonTag,
) -> Option<&'a mut CandidateScore> {
    if ctx.is_excluded(&candidate) {
        return None;
    }
    let entry = scores
        .entry(candidate)
        .or_insert_with(|| CandidateScore::new(candidate));
    entry.reasons.insert(reason).then_some(entry)
}
