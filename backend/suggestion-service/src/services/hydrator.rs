use crate::error::StoreResult;
use crate::models::{CandidateScore, ReasonTag, Recommendation, UserId};
use crate::repository::UserProfileStore;
use crate::utils::{pluralize, round2};
use std::sync::Arc;
use tracing::debug;

/// Resolves ranked candidate ids into display records with one batched lookup.
/// Candidates whose profile disappeared since scoring are dropped.
pub struct ResultHydrator {
    profiles: Arc<dyn UserProfileStore>,
}

impl ResultHydrator {
    pub fn new(profiles: Arc<dyn UserProfileStore>) -> Self {
        Self { profiles }
    }

    pub async fn hydrate(&self, ranked: Vec<CandidateScore>) -> StoreResult<Vec<Recommendation>> {
        if ranked.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<UserId> = ranked.iter().map(|c| c.candidate_id).collect();
        let mut profiles = self.profiles.batch_get(&ids).await?;

        let requested = ranked.len();
        let recommendations: Vec<Recommendation> = ranked
            .into_iter()
            .filter_map(|candidate| {
                let user = profiles.remove(&candidate.candidate_id)?;
                let summary = summarize(&candidate);
                Some(Recommendation {
                    user,
                    score: round2(candidate.score),
                    reasons: candidate.reasons.into_iter().collect(),
                    mutual_count: candidate.mutual_count,
                    connector_ids: candidate.connector_ids,
                    common_interests: candidate.common_interests.into_iter().collect(),
                    summary,
                })
            })
            .collect();

        if recommendations.len() < requested {
            debug!(
                dropped = requested - recommendations.len(),
                "Dropped candidates without a profile record"
            );
        }

        Ok(recommendations)
    }
}

/// Short human-readable explanation, strongest reason first.
pub fn summarize(candidate: &CandidateScore) -> String {
    let parts: Vec<String> = candidate
        .reasons
        .iter()
        .map(|reason| match reason {
            ReasonTag::MutualConnections => pluralize(
                candidate.mutual_count,
                "mutual connection",
                "mutual connections",
            ),
            ReasonTag::SimilarInterests => {
                let shown: Vec<&str> = candidate
                    .common_interests
                    .iter()
                    .take(2)
                    .map(String::as_str)
                    .collect();
                if shown.is_empty() {
                    "Similar interests".to_string()
                } else {
                    format!("Also into {}", shown.join(", "))
                }
            }
            ReasonTag::ContentCreator => "You engage with their posts".to_string(),
        })
        .collect();

    parts.join(" · ")
}
