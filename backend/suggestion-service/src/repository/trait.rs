use crate::error::StoreResult;
use crate::models::{
    EdgeStatus, InteractionEvent, InteractionType, InterestMatch, InterestProfile, ProfileSummary,
    SocialEdge, UserId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Read-only access to directed follow edges and blocks.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RelationshipStore: Send + Sync {
    /// Edges where `user_id` is the follower, restricted to `statuses`
    async fn list_outbound_edges(
        &self,
        user_id: UserId,
        statuses: &[EdgeStatus],
    ) -> StoreResult<Vec<SocialEdge>>;

    /// Second hop of the mutual-connection traversal: every edge whose
    /// follower is one of `connector_ids`, i.e. the inbound edges of the
    /// users those connectors follow.
    async fn list_inbound_edges(
        &self,
        connector_ids: &[UserId],
        statuses: &[EdgeStatus],
    ) -> StoreResult<Vec<SocialEdge>>;

    /// Users `user_id` has blocked or is blocked by
    async fn list_blocked_users(&self, user_id: UserId) -> StoreResult<Vec<UserId>>;
}

/// Read-only access to timestamped user/post engagement events.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InteractionStore: Send + Sync {
    /// Interactions by `user_id` of the given types since `since`, each joined
    /// with its post's author and tags.
    async fn list_interactions(
        &self,
        user_id: UserId,
        types: &[InteractionType],
        since: DateTime<Utc>,
    ) -> StoreResult<Vec<InteractionEvent>>;
}

/// Read-only access to explicit per-user interest weights.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InterestProfileStore: Send + Sync {
    async fn get_profile(&self, user_id: UserId) -> StoreResult<Option<InterestProfile>>;

    /// Users (outside `exclude`) holding at least one of `categories`, with the
    /// sum of their weights on the overlapping categories.
    async fn query_by_categories(
        &self,
        categories: &[String],
        exclude: &HashSet<UserId>,
        limit: usize,
    ) -> StoreResult<Vec<InterestMatch>>;
}

/// Display records for hydration.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserProfileStore: Send + Sync {
    /// Missing users are simply absent from the returned map
    async fn batch_get(&self, user_ids: &[UserId]) -> StoreResult<HashMap<UserId, ProfileSummary>>;
}

/// Collaborators injected into the engine at construction time.
#[derive(Clone)]
pub struct Stores {
    pub relationships: Arc<dyn RelationshipStore>,
    pub interactions: Arc<dyn InteractionStore>,
    pub interests: Arc<dyn InterestProfileStore>,
    pub profiles: Arc<dyn UserProfileStore>,
}

impl Stores {
    pub fn new(
        relationships: Arc<dyn RelationshipStore>,
        interactions: Arc<dyn InteractionStore>,
        interests: Arc<dyn InterestProfileStore>,
        profiles: Arc<dyn UserProfileStore>,
    ) -> Self {
        Self {
            relationships,
            interactions,
            interests,
            profiles,
        }
    }

    /// Wire a single backend that serves every collaborator interface.
    pub fn from_shared<S>(store: Arc<S>) -> Self
    where
        S: RelationshipStore + InteractionStore + InterestProfileStore + UserProfileStore + 'static,
    {
        Self {
            relationships: store.clone(),
            interactions: store.clone(),
            interests: store.clone(),
            profiles: store,
        }
    }
}
