use crate::config::EngineConfig;
use crate::error::StoreResult;
use crate::models::{EdgeStatus, InteractionEvent, SocialEdge, UserId};
use crate::repository::{InteractionStore, RelationshipStore};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Per-request data every signal depends on.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub requester: UserId,
    /// Accepted + pending outbound follows
    pub following_ids: HashSet<UserId>,
    /// Accepted outbound follows only, sorted; first hop of the mutual traversal
    pub accepted_following: Vec<UserId>,
    pub blocked_ids: HashSet<UserId>,
    /// Ordered by `(occurred_at, post_id)` ascending
    pub recent_interactions: Vec<InteractionEvent>,
}

impl RequestContext {
    pub fn new(requester: UserId) -> Self {
        Self {
            requester,
            following_ids: HashSet::new(),
            accepted_following: Vec::new(),
            blocked_ids: HashSet::new(),
            recent_interactions: Vec::new(),
        }
    }

    fn from_relationships(requester: UserId, edges: &[SocialEdge], blocked: Vec<UserId>) -> Self {
        let mut accepted_following: Vec<UserId> = edges
            .iter()
            .filter(|edge| edge.status == EdgeStatus::Accepted)
            .map(|edge| edge.followee)
            .collect();
        accepted_following.sort();
        accepted_following.dedup();

        Self {
            requester,
            following_ids: edges.iter().map(|edge| edge.followee).collect(),
            accepted_following,
            blocked_ids: blocked.into_iter().collect(),
            recent_interactions: Vec::new(),
        }
    }

    /// True for the requester, anyone already followed (accepted or pending),
    /// and blocked users.
    pub fn is_excluded(&self, user_id: &UserId) -> bool {
        *user_id == self.requester
            || self.following_ids.contains(user_id)
            || self.blocked_ids.contains(user_id)
    }

    pub fn exclusion_set(&self) -> HashSet<UserId> {
        let mut excluded: HashSet<UserId> = self
            .following_ids
            .union(&self.blocked_ids)
            .copied()
            .collect();
        excluded.insert(self.requester);
        excluded
    }
}

/// Loads the following set, blocks and recent interactions for a requester.
/// Any store failure here fails the whole request.
pub struct ContextLoader {
    relationships: Arc<dyn RelationshipStore>,
    interactions: Arc<dyn InteractionStore>,
    config: Arc<EngineConfig>,
}

impl ContextLoader {
    pub fn new(
        relationships: Arc<dyn RelationshipStore>,
        interactions: Arc<dyn InteractionStore>,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            relationships,
            interactions,
            config,
        }
    }

    pub async fn load(&self, requester: UserId, now: DateTime<Utc>) -> StoreResult<RequestContext> {
        let since = now - self.config.lookback();

        let ((edges, blocked), mut interactions) = tokio::try_join!(
            self.load_relationships(requester),
            self.interactions
                .list_interactions(requester, &self.config.interaction_types, since),
        )?;

        interactions.retain(|event| event.actor == requester && event.occurred_at >= since);
        interactions.sort_by(|a, b| {
            a.occurred_at
                .cmp(&b.occurred_at)
                .then_with(|| a.post_id.cmp(&b.post_id))
        });

        let mut ctx = RequestContext::from_relationships(requester, &edges, blocked);
        ctx.recent_interactions = interactions;

        debug!(
            user_id = %requester,
            following = ctx.following_ids.len(),
            blocked = ctx.blocked_ids.len(),
            interactions = ctx.recent_interactions.len(),
            "Loaded suggestion context"
        );

        Ok(ctx)
    }

    /// Following set and blocks only, without interactions. Used to re-check
    /// cached results against the requester's current relationships.
    pub async fn load_exclusions(&self, requester: UserId) -> StoreResult<RequestContext> {
        let (edges, blocked) = self.load_relationships(requester).await?;
        Ok(RequestContext::from_relationships(requester, &edges, blocked))
    }

    async fn load_relationships(
        &self,
        requester: UserId,
    ) -> StoreResult<(Vec<SocialEdge>, Vec<UserId>)> {
        tokio::try_join!(
            self.relationships
                .list_outbound_edges(requester, &EdgeStatus::FOLLOWING),
            self.load_blocked(requester),
        )
    }

    async fn load_blocked(&self, requester: UserId) -> StoreResult<Vec<UserId>> {
        if self.config.exclude_blocked {
            self.relationships.list_blocked_users(requester).await
        } else {
            Ok(Vec::new())
        }
    }
}
