mod content_affinity;
mod mutual_connections;
mod similar_interests;

use crate::error::StoreResult;
use crate::models::{SignalKind, SignalOutput};
use crate::services::context::RequestContext;
use async_trait::async_trait;

pub use content_affinity::ContentAffinityCollector;
pub use mutual_connections::MutualConnectionCollector;
pub use similar_interests::SimilarInterestCollector;

/// One independent source of evidence for a suggestion.
///
/// Collectors only read the shared request context and their own store, so
/// the engine polls them concurrently.
#[async_trait]
pub trait SignalCollector: Send + Sync {
    async fn collect(&self, ctx: &RequestContext) -> StoreResult<SignalOutput>;
    fn kind(&self) -> SignalKind;
}
