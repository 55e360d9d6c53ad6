//! People-you-may-know engine
//!
//! # Workflow
//! 1. Load the request context (following set, blocks, recent interactions).
//!    Failure here fails the request.
//! 2. Poll the signal collectors concurrently. A failing or slow collector is
//!    logged and contributes nothing.
//! 3. Aggregate into one ranked list, truncate to the limit.
//! 4. Hydrate display records.
//!
//! Nothing is spawned: every store query is polled inside the request future,
//! so dropping that future (client disconnect, caller timeout) cancels all
//! in-flight work.

use crate::cache::SuggestionCache;
use crate::config::EngineConfig;
use crate::error::{Result, SignalError, Stage, SuggestionError};
use crate::metrics::{Outcome, SuggestionMetrics};
use crate::models::{
    CandidateScore, Recommendation, RecommendationReport, SignalOutput, SignalStats, UserId,
};
use crate::repository::Stores;
use crate::services::aggregator::ScoreAggregator;
use crate::services::context::{ContextLoader, RequestContext};
use crate::services::hydrator::ResultHydrator;
use crate::services::signals::{
    ContentAffinityCollector, MutualConnectionCollector, SignalCollector,
    SimilarInterestCollector,
};
use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout, Instant};
use tracing::{debug, error, info, warn};

pub struct SuggestionEngine {
    config: Arc<EngineConfig>,
    context_loader: ContextLoader,
    /// Fixed order: mutual, interest, content. The aggregator sums in this
    /// order regardless of which collector finishes first.
    collectors: Vec<Arc<dyn SignalCollector>>,
    aggregator: ScoreAggregator,
    hydrator: ResultHydrator,
    cache: Option<(Arc<dyn SuggestionCache>, Duration)>,
}

impl SuggestionEngine {
    pub fn new(stores: Stores, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);

        let collectors: Vec<Arc<dyn SignalCollector>> = vec![
            Arc::new(MutualConnectionCollector::new(
                stores.relationships.clone(),
                config.mutual_candidate_limit,
                config.connector_display_limit,
            )),
            Arc::new(SimilarInterestCollector::new(
                stores.interests.clone(),
                config.max_interest_categories,
                config.interest_candidate_limit,
            )),
            Arc::new(ContentAffinityCollector::new()),
        ];

        Ok(Self {
            context_loader: ContextLoader::new(
                stores.relationships.clone(),
                stores.interactions.clone(),
                config.clone(),
            ),
            collectors,
            aggregator: ScoreAggregator::new(&config),
            hydrator: ResultHydrator::new(stores.profiles),
            cache: None,
            config,
        })
    }

    /// Serve repeated requests from `cache` for `ttl`
    pub fn with_cache(mut self, cache: Arc<dyn SuggestionCache>, ttl: Duration) -> Self {
        self.cache = Some((cache, ttl));
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Ranked suggestions for `requester`. `None` uses the configured default
    /// limit; any limit is capped at `max_limit`.
    pub async fn generate_recommendations(
        &self,
        requester: UserId,
        limit: Option<usize>,
    ) -> Result<Vec<Recommendation>> {
        self.generate_with_report(requester, limit)
            .await
            .map(|report| report.recommendations)
    }

    /// Same as [`generate_recommendations`](Self::generate_recommendations),
    /// with per-signal statistics.
    pub async fn generate_with_report(
        &self,
        requester: UserId,
        limit: Option<usize>,
    ) -> Result<RecommendationReport> {
        let started = Instant::now();
        let limit = self.config.effective_limit(limit);

        if limit == 0 {
            SuggestionMetrics::record_request(Outcome::Empty, started.elapsed().as_secs_f64(), 0);
            return Ok(RecommendationReport::default());
        }

        if let Some(cached) = self.cached(requester, limit).await {
            // Relationships may have changed since the entry was written
            let cached = match self.without_excluded(requester, cached).await {
                Ok(cached) => cached,
                Err(e) => {
                    SuggestionMetrics::record_request(
                        Outcome::Error,
                        started.elapsed().as_secs_f64(),
                        0,
                    );
                    error!(user_id = %requester, error = %e, "Suggestion request failed");
                    return Err(e);
                }
            };
            SuggestionMetrics::record_request(
                Outcome::CacheHit,
                started.elapsed().as_secs_f64(),
                cached.len(),
            );
            return Ok(RecommendationReport {
                stats: SignalStats {
                    final_count: cached.len(),
                    cache_hit: true,
                    ..Default::default()
                },
                recommendations: cached,
            });
        }

        let result = self.run_pipeline(requester, limit).await;
        let elapsed = started.elapsed();

        match &result {
            Ok(report) => {
                let outcome = if report.recommendations.is_empty() {
                    Outcome::Empty
                } else {
                    Outcome::Ok
                };
                SuggestionMetrics::record_request(
                    outcome,
                    elapsed.as_secs_f64(),
                    report.recommendations.len(),
                );
                info!(
                    user_id = %requester,
                    limit,
                    mutual = report.stats.mutual_candidates,
                    interest = report.stats.interest_candidates,
                    content = report.stats.content_candidates,
                    failed_signals = report.stats.failed_signals.len(),
                    total = report.stats.total_candidates,
                    returned = report.stats.final_count,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Suggestions generated"
                );

                if !report.stats.is_degraded() {
                    self.store_cached(requester, limit, &report.recommendations)
                        .await;
                }
            }
            Err(e) => {
                SuggestionMetrics::record_request(Outcome::Error, elapsed.as_secs_f64(), 0);
                error!(user_id = %requester, error = %e, "Suggestion request failed");
            }
        }

        result
    }

    async fn run_pipeline(&self, requester: UserId, limit: usize) -> Result<RecommendationReport> {
        let ctx = self.load_context(requester).await?;

        let mut stats = SignalStats::default();
        let mut outputs: Vec<SignalOutput> = Vec::with_capacity(self.collectors.len());

        let results = join_all(
            self.collectors
                .iter()
                .map(|collector| self.run_collector(collector.as_ref(), &ctx)),
        )
        .await;

        for result in results {
            match result {
                Ok(output) => {
                    debug!(
                        user_id = %requester,
                        signal = output.kind().as_str(),
                        candidates = output.len(),
                        "Signal collected"
                    );
                    stats.record(&output);
                    outputs.push(output);
                }
                Err(e) => {
                    warn!(user_id = %requester, error = %e, "Signal failed, continuing without it");
                    SuggestionMetrics::record_signal_failure(e.signal().as_str());
                    stats.failed_signals.push(e.signal());
                }
            }
        }

        let ranked = self.aggregator.rank(&outputs, &ctx, limit);
        stats.total_candidates = ranked.total_candidates;

        let recommendations = self.hydrate(ranked.candidates).await?;
        stats.final_count = recommendations.len();

        Ok(RecommendationReport {
            recommendations,
            stats,
        })
    }

    async fn load_context(&self, requester: UserId) -> Result<RequestContext> {
        let after = self.config.context_timeout();
        match timeout(after, self.context_loader.load(requester, Utc::now())).await {
            Ok(Ok(ctx)) => Ok(ctx),
            Ok(Err(source)) => Err(SuggestionError::data_store(Stage::Context, source)),
            Err(_) => Err(SuggestionError::Timeout {
                stage: Stage::Context,
                after,
            }),
        }
    }

    async fn without_excluded(
        &self,
        requester: UserId,
        mut cached: Vec<Recommendation>,
    ) -> Result<Vec<Recommendation>> {
        let after = self.config.context_timeout();
        let ctx = match timeout(after, self.context_loader.load_exclusions(requester)).await {
            Ok(Ok(ctx)) => ctx,
            Ok(Err(source)) => return Err(SuggestionError::data_store(Stage::Context, source)),
            Err(_) => {
                return Err(SuggestionError::Timeout {
                    stage: Stage::Context,
                    after,
                })
            }
        };

        let before = cached.len();
        cached.retain(|rec| !ctx.is_excluded(&rec.user.user_id));
        if cached.len() < before {
            debug!(
                user_id = %requester,
                dropped = before - cached.len(),
                "Dropped cached suggestions for users now followed or blocked"
            );
        }
        Ok(cached)
    }

    async fn run_collector(
        &self,
        collector: &dyn SignalCollector,
        ctx: &RequestContext,
    ) -> std::result::Result<SignalOutput, SignalError> {
        let signal = collector.kind();
        let after = self.config.signal_timeout();
        match timeout(after, collector.collect(ctx)).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(source)) => Err(SignalError::Store { signal, source }),
            Err(_) => Err(SignalError::Timeout { signal, after }),
        }
    }

    async fn hydrate(&self, ranked: Vec<CandidateScore>) -> Result<Vec<Recommendation>> {
        let after = self.config.hydration_timeout();
        match timeout(after, self.hydrator.hydrate(ranked)).await {
            Ok(Ok(recommendations)) => Ok(recommendations),
            Ok(Err(source)) => Err(SuggestionError::data_store(Stage::Hydration, source)),
            Err(_) => Err(SuggestionError::Timeout {
                stage: Stage::Hydration,
                after,
            }),
        }
    }

    async fn cached(&self, requester: UserId, limit: usize) -> Option<Vec<Recommendation>> {
        let (cache, _) = self.cache.as_ref()?;
        match cache.get(requester, limit).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!(user_id = %requester, error = %e, "Suggestion cache read failed");
                None
            }
        }
    }

    async fn store_cached(&self, requester: UserId, limit: usize, items: &[Recommendation]) {
        let Some((cache, ttl)) = self.cache.as_ref() else {
            return;
        };
        if let Err(e) = cache.put(requester, limit, items, *ttl).await {
            warn!(user_id = %requester, error = %e, "Suggestion cache write failed");
        }
    }
}
