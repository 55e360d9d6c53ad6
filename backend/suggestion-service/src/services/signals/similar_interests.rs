use super::SignalCollector;
use crate::error::StoreResult;
use crate::models::{InterestMatch, SignalKind, SignalOutput};
use crate::repository::InterestProfileStore;
use crate::services::context::RequestContext;
use crate::services::interest::InterestExtractor;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Similar-interest finder. Runs interest extraction first, then queries
/// users holding any of those categories.
pub struct SimilarInterestCollector {
    extractor: InterestExtractor,
    interests: Arc<dyn InterestProfileStore>,
    candidate_limit: usize,
}

impl SimilarInterestCollector {
    pub fn new(
        interests: Arc<dyn InterestProfileStore>,
        max_categories: usize,
        candidate_limit: usize,
    ) -> Self {
        Self {
            extractor: InterestExtractor::new(interests.clone(), max_categories),
            interests,
            candidate_limit,
        }
    }
}

#[async_trait]
impl SignalCollector for SimilarInterestCollector {
    async fn collect(&self, ctx: &RequestContext) -> StoreResult<SignalOutput> {
        let categories = self.extractor.extract(ctx).await?;
        if categories.is_empty() {
            debug!(user_id = %ctx.requester, "No interests resolved, interest signal is empty");
            return Ok(SignalOutput::Interest(Vec::new()));
        }

        let matches = self
            .interests
            .query_by_categories(&categories, &ctx.exclusion_set(), self.candidate_limit)
            .await?;

        Ok(SignalOutput::Interest(rank_interest_matches(
            ctx,
            matches,
            self.candidate_limit,
        )))
    }

    fn kind(&self) -> SignalKind {
        SignalKind::SimilarInterests
    }
}

/// Drop excluded users and duplicate rows, order by score then id.
pub fn rank_interest_matches(
    ctx: &RequestContext,
    mut matches: Vec<InterestMatch>,
    candidate_limit: usize,
) -> Vec<InterestMatch> {
    matches.retain(|m| !ctx.is_excluded(&m.user_id) && !m.matched_categories.is_empty());
    matches.sort_by(|a, b| {
        b.interest_score
            .total_cmp(&a.interest_score)
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    let mut seen = HashSet::new();
    matches.retain(|m| seen.insert(m.user_id));
    matches.truncate(candidate_limit);
    matches
}
