//! Interest extraction
//!
//! An explicit interest profile wins. Without one, interests are inferred from
//! the tags on posts the requester recently engaged with: count each tag,
//! order by count descending with first-seen order breaking ties, keep the
//! top N.

use crate::error::StoreResult;
use crate::models::{InteractionEvent, InterestProfile};
use crate::repository::InterestProfileStore;
use crate::services::context::RequestContext;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

pub struct InterestExtractor {
    interests: Arc<dyn InterestProfileStore>,
    max_categories: usize,
}

impl InterestExtractor {
    pub fn new(interests: Arc<dyn InterestProfileStore>, max_categories: usize) -> Self {
        Self {
            interests,
            max_categories,
        }
    }

    /// Interest categories for the requester, strongest first.
    pub async fn extract(&self, ctx: &RequestContext) -> StoreResult<Vec<String>> {
        let profile = self.interests.get_profile(ctx.requester).await?;
        let categories = resolve_interests(
            profile.as_ref(),
            &ctx.recent_interactions,
            self.max_categories,
        );

        debug!(
            user_id = %ctx.requester,
            explicit = profile.as_ref().map(|p| !p.is_empty()).unwrap_or(false),
            categories = categories.len(),
            "Resolved requester interests"
        );
        Ok(categories)
    }
}

pub fn resolve_interests(
    profile: Option<&InterestProfile>,
    interactions: &[InteractionEvent],
    max_categories: usize,
) -> Vec<String> {
    match profile {
        Some(profile) if !profile.is_empty() => interests_from_profile(profile, max_categories),
        _ => interests_from_interactions(interactions, max_categories),
    }
}

/// Declared categories ordered by weight, declared order breaking ties.
pub fn interests_from_profile(profile: &InterestProfile, max_categories: usize) -> Vec<String> {
    let mut entries: Vec<(usize, &str, f64)> = profile
        .interests
        .iter()
        .enumerate()
        .filter_map(|(idx, entry)| {
            let category = entry.category.trim();
            (!category.is_empty()).then_some((idx, category, entry.clamped_weight()))
        })
        .collect();

    entries.sort_by(|a, b| b.2.total_cmp(&a.2).then_with(|| a.0.cmp(&b.0)));

    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|(_, category, _)| seen.insert(*category))
        .take(max_categories)
        .map(|(_, category, _)| category.to_string())
        .collect()
}

/// Most frequent tags across the interacted posts.
pub fn interests_from_interactions(
    interactions: &[InteractionEvent],
    max_categories: usize,
) -> Vec<String> {
    // tag -> (count, first-seen position)
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    let mut position = 0;

    for tag in interactions.iter().flat_map(|event| event.tags.iter()) {
        let tag = tag.trim();
        if tag.is_empty() {
            continue;
        }
        counts
            .entry(tag)
            .and_modify(|(count, _)| *count += 1)
            .or_insert_with(|| {
                position += 1;
                (1, position)
            });
    }

    let mut ranked: Vec<(&str, usize, usize)> = counts
        .into_iter()
        .map(|(tag, (count, first_seen))| (tag, count, first_seen))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.2.cmp(&b.2)));

    ranked
        .into_iter()
        .take(max_categories)
        .map(|(tag, _, _)| tag.to_string())
        .collect()
}
