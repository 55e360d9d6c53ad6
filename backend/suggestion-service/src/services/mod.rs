pub mod aggregator;
pub mod context;
pub mod engine;
pub mod hydrator;
pub mod interest;
pub mod signals;

pub use aggregator::{RankedCandidates, ScoreAggregator};
pub use context::{ContextLoader, RequestContext};
pub use engine::SuggestionEngine;
pub use hydrator::ResultHydrator;
pub use interest::InterestExtractor;
pub use signals::{
    ContentAffinityCollector, MutualConnectionCollector, SignalCollector,
    SimilarInterestCollector,
};
