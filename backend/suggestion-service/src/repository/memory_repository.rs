//! In-memory implementation of every store interface
//!
//! Used for local wiring and tests. Writes go through `&self` so a test can
//! mutate the data set between two ranking requests.

use super::{InteractionStore, InterestProfileStore, RelationshipStore, UserProfileStore};
use crate::error::{StoreError, StoreResult};
use crate::models::{
    EdgeStatus, InteractionEvent, InteractionType, InterestMatch, InterestProfile, PostId,
    ProfileSummary, SocialEdge, UserId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone)]
struct StoredPost {
    author: UserId,
    tags: Vec<String>,
}

#[derive(Debug, Clone)]
struct StoredInteraction {
    actor: UserId,
    post_id: PostId,
    interaction_type: InteractionType,
    occurred_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct MemoryState {
    // keyed by (follower, followee): at most one edge per ordered pair
    edges: BTreeMap<(UserId, UserId), SocialEdge>,
    blocks: BTreeSet<(UserId, UserId)>,
    posts: HashMap<PostId, StoredPost>,
    interactions: Vec<StoredInteraction>,
    interest_profiles: HashMap<UserId, InterestProfile>,
    profiles: HashMap<UserId, ProfileSummary>,
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<MemoryState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, MemoryState>> {
        self.state
            .read()
            .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".to_string()))
    }

    fn write(&self) -> RwLockWriteGuard<'_, MemoryState> {
        // A poisoned lock only means a writer panicked mid-update; keep serving.
        self.state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Create or replace the edge `follower -> followee`
    pub fn upsert_edge(&self, follower: UserId, followee: UserId, status: EdgeStatus) {
        self.upsert_edge_at(follower, followee, status, Utc::now());
    }

    pub fn upsert_edge_at(
        &self,
        follower: UserId,
        followee: UserId,
        status: EdgeStatus,
        created_at: DateTime<Utc>,
    ) {
        self.write().edges.insert(
            (follower, followee),
            SocialEdge {
                follower,
                followee,
                status,
                created_at,
            },
        );
    }

    /// Shorthand for an accepted follow
    pub fn follow(&self, follower: UserId, followee: UserId) {
        self.upsert_edge(follower, followee, EdgeStatus::Accepted);
    }

    pub fn unfollow(&self, follower: UserId, followee: UserId) {
        self.write().edges.remove(&(follower, followee));
    }

    pub fn block(&self, blocker: UserId, blocked: UserId) {
        self.write().blocks.insert((blocker, blocked));
    }

    pub fn add_post(&self, post_id: PostId, author: UserId, tags: &[&str]) {
        self.write().posts.insert(
            post_id,
            StoredPost {
                author,
                tags: tags.iter().map(|t| t.to_string()).collect(),
            },
        );
    }

    pub fn delete_post(&self, post_id: PostId) {
        self.write().posts.remove(&post_id);
    }

    pub fn record_interaction(
        &self,
        actor: UserId,
        post_id: PostId,
        interaction_type: InteractionType,
        occurred_at: DateTime<Utc>,
    ) {
        self.write().interactions.push(StoredInteraction {
            actor,
            post_id,
            interaction_type,
            occurred_at,
        });
    }

    pub fn set_interest_profile(&self, profile: InterestProfile) {
        self.write()
            .interest_profiles
            .insert(profile.user_id, profile);
    }

    pub fn upsert_profile(&self, profile: ProfileSummary) {
        self.write().profiles.insert(profile.user_id, profile);
    }

    pub fn delete_profile(&self, user_id: UserId) {
        self.write().profiles.remove(&user_id);
    }
}

#[async_trait]
impl RelationshipStore for InMemoryStore {
    async fn list_outbound_edges(
        &self,
        user_id: UserId,
        statuses: &[EdgeStatus],
    ) -> StoreResult<Vec<SocialEdge>> {
        let state = self.read()?;
        Ok(state
            .edges
            .values()
            .filter(|edge| edge.follower == user_id && statuses.contains(&edge.status))
            .cloned()
            .collect())
    }

    async fn list_inbound_edges(
        &self,
        connector_ids: &[UserId],
        statuses: &[EdgeStatus],
    ) -> StoreResult<Vec<SocialEdge>> {
        let connectors: HashSet<&UserId> = connector_ids.iter().collect();
        let state = self.read()?;
        Ok(state
            .edges
            .values()
            .filter(|edge| connectors.contains(&edge.follower) && statuses.contains(&edge.status))
            .cloned()
            .collect())
    }

    async fn list_blocked_users(&self, user_id: UserId) -> StoreResult<Vec<UserId>> {
        let state = self.read()?;
        let blocked: BTreeSet<UserId> = state
            .blocks
            .iter()
            .filter_map(|&(blocker, blocked)| {
                if blocker == user_id {
                    Some(blocked)
                } else if blocked == user_id {
                    Some(blocker)
                } else {
                    None
                }
            })
            .collect();
        Ok(blocked.into_iter().collect())
    }
}

#[async_trait]
impl InteractionStore for InMemoryStore {
    async fn list_interactions(
        &self,
        user_id: UserId,
        types: &[InteractionType],
        since: DateTime<Utc>,
    ) -> StoreResult<Vec<InteractionEvent>> {
        let state = self.read()?;
        Ok(state
            .interactions
            .iter()
            .filter(|i| {
                i.actor == user_id && types.contains(&i.interaction_type) && i.occurred_at >= since
            })
            .map(|i| {
                let post = state.posts.get(&i.post_id);
                InteractionEvent {
                    actor: i.actor,
                    post_id: i.post_id,
                    post_author: post.map(|p| p.author),
                    interaction_type: i.interaction_type,
                    tags: post.map(|p| p.tags.clone()).unwrap_or_default(),
                    occurred_at: i.occurred_at,
                }
            })
            .collect())
    }
}

#[async_trait]
impl InterestProfileStore for InMemoryStore {
    async fn get_profile(&self, user_id: UserId) -> StoreResult<Option<InterestProfile>> {
        Ok(self.read()?.interest_profiles.get(&user_id).cloned())
    }

    async fn query_by_categories(
        &self,
        categories: &[String],
        exclude: &HashSet<UserId>,
        limit: usize,
    ) -> StoreResult<Vec<InterestMatch>> {
        let wanted: HashSet<&str> = categories.iter().map(|c| c.trim()).collect();
        let state = self.read()?;

        let mut matches: Vec<InterestMatch> = state
            .interest_profiles
            .values()
            .filter(|profile| !exclude.contains(&profile.user_id))
            .filter_map(|profile| {
                let mut score = 0.0;
                let mut matched = BTreeSet::new();
                for entry in &profile.interests {
                    let category = entry.category.trim();
                    if !category.is_empty() && wanted.contains(category) {
                        score += entry.clamped_weight();
                        matched.insert(category.to_string());
                    }
                }
                (!matched.is_empty()).then(|| InterestMatch {
                    user_id: profile.user_id,
                    interest_score: score,
                    matched_categories: matched,
                })
            })
            .collect();

        matches.sort_by(|a, b| {
            b.interest_score
                .total_cmp(&a.interest_score)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        matches.truncate(limit);
        Ok(matches)
    }
}

#[async_trait]
impl UserProfileStore for InMemoryStore {
    async fn batch_get(&self, user_ids: &[UserId]) -> StoreResult<HashMap<UserId, ProfileSummary>> {
        let state = self.read()?;
        Ok(user_ids
            .iter()
            .filter_map(|id| state.profiles.get(id).map(|p| (*id, p.clone())))
            .collect())
    }
}
