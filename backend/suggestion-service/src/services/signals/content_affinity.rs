use super::SignalCollector;
use crate::error::StoreResult;
use crate::models::{InteractionEvent, InteractionType, SignalKind, SignalOutput, UserId};
use crate::services::context::RequestContext;
use async_trait::async_trait;
use std::collections::BTreeSet;

/// Authors whose posts the requester already engages with. Presence only;
/// three views of the same author count the same as one.
#[derive(Debug, Default)]
pub struct ContentAffinityCollector;

impl ContentAffinityCollector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SignalCollector for ContentAffinityCollector {
    async fn collect(&self, ctx: &RequestContext) -> StoreResult<SignalOutput> {
        Ok(SignalOutput::Content(engaged_authors(
            ctx,
            &ctx.recent_interactions,
        )))
    }

    fn kind(&self) -> SignalKind {
        SignalKind::ContentAffinity
    }
}

pub fn engaged_authors(ctx: &RequestContext, interactions: &[InteractionEvent]) -> BTreeSet<UserId> {
    interactions
        .iter()
        .filter(|event| {
            matches!(
                event.interaction_type,
                InteractionType::View | InteractionType::Like | InteractionType::Comment
            )
        })
        .filter_map(|event| event.post_author)
        .filter(|author| !ctx.is_excluded(author))
        .collect()
}
