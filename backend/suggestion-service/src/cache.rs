//! Result cache for ranked suggestions
//!
//! Entries are short-lived snapshots keyed by requester and limit. A cache
//! failure never fails a request; the engine logs it and falls through to the
//! full pipeline.

use crate::error::StoreResult;
use crate::models::{Recommendation, UserId};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;
use tracing::debug;

#[async_trait]
pub trait SuggestionCache: Send + Sync {
    async fn get(&self, user_id: UserId, limit: usize) -> StoreResult<Option<Vec<Recommendation>>>;

    async fn put(
        &self,
        user_id: UserId,
        limit: usize,
        recommendations: &[Recommendation],
        ttl: Duration,
    ) -> StoreResult<()>;
}

/// Redis-backed cache storing JSON under `{prefix}:{user_id}:{limit}`
#[derive(Clone)]
pub struct RedisSuggestionCache {
    conn: ConnectionManager,
    key_prefix: String,
}

impl RedisSuggestionCache {
    pub fn new(conn: ConnectionManager, key_prefix: impl Into<String>) -> Self {
        Self {
            conn,
            key_prefix: key_prefix.into(),
        }
    }

    pub async fn connect(url: &str, key_prefix: impl Into<String>) -> StoreResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self::new(conn, key_prefix))
    }

    fn key(&self, user_id: UserId, limit: usize) -> String {
        cache_key(&self.key_prefix, user_id, limit)
    }
}

pub(crate) fn cache_key(prefix: &str, user_id: UserId, limit: usize) -> String {
    format!("{}:{}:{}", prefix, user_id, limit)
}

#[async_trait]
impl SuggestionCache for RedisSuggestionCache {
    async fn get(&self, user_id: UserId, limit: usize) -> StoreResult<Option<Vec<Recommendation>>> {
        let key = self.key(user_id, limit);
        let mut conn = self.conn.clone();
        let payload: Option<String> = conn.get(&key).await?;

        match payload {
            Some(json) => {
                debug!(key = %key, "Suggestion cache hit");
                Ok(Some(serde_json::from_str::<Vec<Recommendation>>(&json)?))
            }
            None => Ok(None),
        }
    }

    async fn put(
        &self,
        user_id: UserId,
        limit: usize,
        recommendations: &[Recommendation],
        ttl: Duration,
    ) -> StoreResult<()> {
        let key = self.key(user_id, limit);
        let payload = serde_json::to_string(recommendations)?;
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(&key, payload, ttl.as_secs().max(1))
            .await?;
        Ok(())
    }
}
