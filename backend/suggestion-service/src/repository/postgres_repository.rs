//! PostgreSQL read model for the suggestion engine
//!
//! Expected tables (owned and migrated by the surrounding services):
//! - `relationships (follower_id uuid, following_id uuid, status text, created_at timestamptz)`
//! - `blocks (blocker_id uuid, blocked_id uuid)`
//! - `interactions (user_id uuid, post_id uuid, interaction_type text, created_at timestamptz)`
//! - `posts (id uuid, user_id uuid, tags text[], deleted_at timestamptz)`
//! - `user_interests (user_id uuid, category text, weight double precision, source text)`
//! - `users (id uuid, username text, display_name text, avatar_url text, bio text,
//!   follower_count bigint, post_count bigint, deleted_at timestamptz)`

use super::{InteractionStore, InterestProfileStore, RelationshipStore, UserProfileStore};
use crate::error::StoreResult;
use crate::models::{
    EdgeStatus, InteractionEvent, InteractionType, InterestEntry, InterestMatch, InterestProfile,
    InterestSource, ProfileSummary, SocialEdge, UserId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};
use uuid::Uuid;

/// PostgreSQL-backed implementation of every collaborator interface
#[derive(Clone)]
pub struct PostgresSuggestionStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct EdgeRow {
    follower_id: Uuid,
    following_id: Uuid,
    status: String,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct InteractionRow {
    user_id: Uuid,
    post_id: Uuid,
    post_author: Option<Uuid>,
    interaction_type: String,
    tags: Vec<String>,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct InterestRow {
    category: String,
    weight: f64,
    source: Option<String>,
}

#[derive(sqlx::FromRow)]
struct InterestMatchRow {
    user_id: Uuid,
    interest_score: f64,
    matched: Vec<String>,
}

#[derive(sqlx::FromRow)]
struct ProfileRow {
    id: Uuid,
    username: String,
    display_name: Option<String>,
    avatar_url: Option<String>,
    bio: Option<String>,
    follower_count: i64,
    post_count: i64,
}

impl PostgresSuggestionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn status_params(statuses: &[EdgeStatus]) -> Vec<String> {
        statuses.iter().map(|s| s.as_str().to_string()).collect()
    }

    fn into_edges(rows: Vec<EdgeRow>) -> Vec<SocialEdge> {
        rows.into_iter()
            .filter_map(|row| match EdgeStatus::parse(&row.status) {
                Some(status) => Some(SocialEdge {
                    follower: row.follower_id,
                    followee: row.following_id,
                    status,
                    created_at: row.created_at,
                }),
                None => {
                    warn!(
                        follower = %row.follower_id,
                        following = %row.following_id,
                        status = %row.status,
                        "Skipping relationship with unknown status"
                    );
                    None
                }
            })
            .collect()
    }
}

/// Categories are compared trimmed on both sides; blanks never match.
fn normalize_categories(categories: &[String]) -> Vec<String> {
    categories
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_source(source: Option<&str>) -> InterestSource {
    match source {
        Some("explicit") => InterestSource::Explicit,
        Some("derived") => InterestSource::Derived,
        _ => InterestSource::Implicit,
    }
}

#[async_trait]
impl RelationshipStore for PostgresSuggestionStore {
    async fn list_outbound_edges(
        &self,
        user_id: UserId,
        statuses: &[EdgeStatus],
    ) -> StoreResult<Vec<SocialEdge>> {
        let rows = sqlx::query_as::<_, EdgeRow>(
            r#"
            SELECT follower_id, following_id, status, created_at
            FROM relationships
            WHERE follower_id = $1
              AND status = ANY($2)
            "#,
        )
        .bind(user_id)
        .bind(Self::status_params(statuses))
        .fetch_all(&self.pool)
        .await?;

        Ok(Self::into_edges(rows))
    }

    async fn list_inbound_edges(
        &self,
        connector_ids: &[UserId],
        statuses: &[EdgeStatus],
    ) -> StoreResult<Vec<SocialEdge>> {
        if connector_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, EdgeRow>(
            r#"
            SELECT follower_id, following_id, status, created_at
            FROM relationships
            WHERE follower_id = ANY($1)
              AND status = ANY($2)
            "#,
        )
        .bind(connector_ids.to_vec())
        .bind(Self::status_params(statuses))
        .fetch_all(&self.pool)
        .await?;

        debug!(
            connectors = connector_ids.len(),
            edges = rows.len(),
            "Loaded second-hop relationships"
        );
        Ok(Self::into_edges(rows))
    }

    async fn list_blocked_users(&self, user_id: UserId) -> StoreResult<Vec<UserId>> {
        let ids: Vec<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT blocked_id FROM blocks WHERE blocker_id = $1
            UNION
            SELECT blocker_id FROM blocks WHERE blocked_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().map(|(id,)| id).collect())
    }
}

#[async_trait]
impl InteractionStore for PostgresSuggestionStore {
    async fn list_interactions(
        &self,
        user_id: UserId,
        types: &[InteractionType],
        since: DateTime<Utc>,
    ) -> StoreResult<Vec<InteractionEvent>> {
        let type_params: Vec<String> = types.iter().map(|t| t.as_str().to_string()).collect();

        let rows = sqlx::query_as::<_, InteractionRow>(
            r#"
            SELECT i.user_id,
                   i.post_id,
                   p.user_id AS post_author,
                   i.interaction_type,
                   COALESCE(p.tags, ARRAY[]::text[]) AS tags,
                   i.created_at
            FROM interactions i
            LEFT JOIN posts p ON p.id = i.post_id AND p.deleted_at IS NULL
            WHERE i.user_id = $1
              AND i.interaction_type = ANY($2)
              AND i.created_at >= $3
            ORDER BY i.created_at ASC, i.post_id ASC
            "#,
        )
        .bind(user_id)
        .bind(type_params)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let interaction_type = InteractionType::parse(&row.interaction_type)?;
                Some(InteractionEvent {
                    actor: row.user_id,
                    post_id: row.post_id,
                    post_author: row.post_author,
                    interaction_type,
                    tags: row.tags,
                    occurred_at: row.created_at,
                })
            })
            .collect())
    }
}

#[async_trait]
impl InterestProfileStore for PostgresSuggestionStore {
    async fn get_profile(&self, user_id: UserId) -> StoreResult<Option<InterestProfile>> {
        let rows = sqlx::query_as::<_, InterestRow>(
            r#"
            SELECT category, weight, source
            FROM user_interests
            WHERE user_id = $1
            ORDER BY weight DESC, category ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Ok(None);
        }

        Ok(Some(InterestProfile {
            user_id,
            interests: rows
                .into_iter()
                .map(|row| InterestEntry {
                    source: parse_source(row.source.as_deref()),
                    category: row.category,
                    weight: row.weight,
                })
                .collect(),
        }))
    }

    async fn query_by_categories(
        &self,
        categories: &[String],
        exclude: &HashSet<UserId>,
        limit: usize,
    ) -> StoreResult<Vec<InterestMatch>> {
        if categories.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let excluded: Vec<Uuid> = exclude.iter().copied().collect();
        let rows = sqlx::query_as::<_, InterestMatchRow>(
            r#"
            SELECT user_id,
                   SUM(LEAST(GREATEST(weight, 0), 5))::float8 AS interest_score,
                   ARRAY_AGG(DISTINCT BTRIM(category)) AS matched
            FROM user_interests
            WHERE BTRIM(category) = ANY($1)
              AND NOT (user_id = ANY($2))
            GROUP BY user_id
            ORDER BY interest_score DESC, user_id ASC
            LIMIT $3
            "#,
        )
        .bind(normalize_categories(categories))
        .bind(excluded)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| InterestMatch {
                user_id: row.user_id,
                interest_score: row.interest_score,
                matched_categories: row.matched.into_iter().collect(),
            })
            .collect())
    }
}

#[async_trait]
impl UserProfileStore for PostgresSuggestionStore {
    async fn batch_get(&self, user_ids: &[UserId]) -> StoreResult<HashMap<UserId, ProfileSummary>> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, ProfileRow>(
            r#"
            SELECT id, username, display_name, avatar_url, bio,
                   COALESCE(follower_count, 0) AS follower_count,
                   COALESCE(post_count, 0) AS post_count
            FROM users
            WHERE id = ANY($1)
              AND deleted_at IS NULL
            "#,
        )
        .bind(user_ids.to_vec())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                (
                    row.id,
                    ProfileSummary {
                        user_id: row.id,
                        handle: row.username,
                        display_name: row.display_name,
                        avatar_url: row.avatar_url,
                        bio: row.bio,
                        follower_count: row.follower_count,
                        post_count: row.post_count,
                    },
                )
            })
            .collect())
    }
}
