use super::SignalCollector;
use crate::error::StoreResult;
use crate::models::{EdgeStatus, MutualConnection, SignalKind, SignalOutput, SocialEdge, UserId};
use crate::repository::RelationshipStore;
use crate::services::context::RequestContext;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Mutual-connection finder: requester -> X -> candidate over accepted edges,
/// ranked by the number of distinct connectors X.
pub struct MutualConnectionCollector {
    relationships: Arc<dyn RelationshipStore>,
    candidate_limit: usize,
    connector_display_limit: usize,
}

impl MutualConnectionCollector {
    pub fn new(
        relationships: Arc<dyn RelationshipStore>,
        candidate_limit: usize,
        connector_display_limit: usize,
    ) -> Self {
        Self {
            relationships,
            candidate_limit,
            connector_display_limit,
        }
    }
}

#[async_trait]
impl SignalCollector for MutualConnectionCollector {
    async fn collect(&self, ctx: &RequestContext) -> StoreResult<SignalOutput> {
        if ctx.accepted_following.is_empty() {
            debug!(user_id = %ctx.requester, "No accepted follows, mutual signal is empty");
            return Ok(SignalOutput::Mutual(Vec::new()));
        }

        let second_hop = self
            .relationships
            .list_inbound_edges(&ctx.accepted_following, &[EdgeStatus::Accepted])
            .await?;

        Ok(SignalOutput::Mutual(rank_mutual_connections(
            ctx,
            &second_hop,
            self.candidate_limit,
            self.connector_display_limit,
        )))
    }

    fn kind(&self) -> SignalKind {
        SignalKind::MutualConnections
    }
}

/// Group second-hop edges by candidate and count distinct connectors.
pub fn rank_mutual_connections(
    ctx: &RequestContext,
    second_hop: &[SocialEdge],
    candidate_limit: usize,
    connector_display_limit: usize,
) -> Vec<MutualConnection> {
    let connectors: HashSet<&UserId> = ctx.accepted_following.iter().collect();

    // candidate -> connector -> most recent connector edge
    let mut by_candidate: BTreeMap<UserId, BTreeMap<UserId, DateTime<Utc>>> = BTreeMap::new();
    for edge in second_hop {
        if edge.status != EdgeStatus::Accepted
            || !connectors.contains(&edge.follower)
            || ctx.is_excluded(&edge.followee)
        {
            continue;
        }
        let seen = by_candidate
            .entry(edge.followee)
            .or_default()
            .entry(edge.follower)
            .or_insert(edge.created_at);
        if edge.created_at > *seen {
            *seen = edge.created_at;
        }
    }

    let mut ranked: Vec<MutualConnection> = by_candidate
        .into_iter()
        .map(|(candidate_id, connectors)| {
            let mutual_count = connectors.len();
            let mut recent: Vec<(UserId, DateTime<Utc>)> = connectors.into_iter().collect();
            recent.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

            MutualConnection {
                candidate_id,
                mutual_count,
                connector_ids: recent
                    .into_iter()
                    .take(connector_display_limit)
                    .map(|(id, _)| id)
                    .collect(),
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.mutual_count
            .cmp(&a.mutual_count)
            .then_with(|| a.candidate_id.cmp(&b.candidate_id))
    });
    ranked.truncate(candidate_limit);
    ranked
}
