use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use suggestion_service::models::{
    EdgeStatus, InteractionType, InterestEntry, InterestMatch, InterestProfile, InterestSource,
    ProfileSummary, ReasonTag, Recommendation, SignalKind, SocialEdge, UserId,
};
use suggestion_service::repository::{InterestProfileStore, RelationshipStore, UserProfileStore};
use suggestion_service::{
    EngineConfig, InMemoryStore, Stage, StoreError, Stores, SuggestionCache, SuggestionEngine,
    SuggestionError,
};
use uuid::Uuid;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("suggestion_service=debug")
        .with_test_writer()
        .try_init();
}

fn user(store: &InMemoryStore, handle: &str) -> UserId {
    let user_id = Uuid::new_v4();
    store.upsert_profile(ProfileSummary {
        user_id,
        handle: handle.to_string(),
        display_name: None,
        avatar_url: None,
        bio: None,
        follower_count: 0,
        post_count: 0,
    });
    user_id
}

fn explicit(user_id: UserId, interests: &[(&str, f64)]) -> InterestProfile {
    InterestProfile {
        user_id,
        interests: interests
            .iter()
            .map(|(category, weight)| InterestEntry {
                category: category.to_string(),
                weight: *weight,
                source: InterestSource::Explicit,
            })
            .collect(),
    }
}

fn engage(store: &InMemoryStore, actor: UserId, author: UserId, tags: &[&str], kind: InteractionType) {
    let post_id = Uuid::new_v4();
    store.add_post(post_id, author, tags);
    store.record_interaction(actor, post_id, kind, Utc::now() - ChronoDuration::hours(1));
}

fn engine(store: Arc<InMemoryStore>) -> SuggestionEngine {
    SuggestionEngine::new(Stores::from_shared(store), EngineConfig::default()).unwrap()
}

fn ids(recommendations: &[Recommendation]) -> Vec<UserId> {
    recommendations.iter().map(|r| r.user.user_id).collect()
}

#[tokio::test]
async fn test_mutual_connections_only() {
    init_tracing();
    let store = Arc::new(InMemoryStore::new());
    let me = user(&store, "me");
    let (b, c, d) = (user(&store, "b"), user(&store, "c"), user(&store, "d"));
    store.follow(me, b);
    store.follow(me, c);
    store.follow(b, d);
    store.follow(c, d);

    let result = engine(store)
        .generate_recommendations(me, Some(10))
        .await
        .unwrap();

    assert_eq!(ids(&result), vec![d]);
    assert_eq!(result[0].score, 0.08);
    assert_eq!(result[0].mutual_count, 2);
    assert_eq!(result[0].reasons, vec![ReasonTag::MutualConnections]);
    assert_eq!(result[0].summary, "2 mutual connections");
}

#[tokio::test]
async fn test_implicit_interests_find_similar_users() {
    let store = Arc::new(InMemoryStore::new());
    let me = user(&store, "me");
    let e = user(&store, "e");
    let followed_author = user(&store, "author");
    store.upsert_edge(me, followed_author, EdgeStatus::Pending);
    engage(&store, me, followed_author, &["sport", "denim"], InteractionType::Like);
    store.set_interest_profile(explicit(e, &[("denim", 3.0)]));

    let result = engine(store).generate_recommendations(me, None).await.unwrap();

    assert_eq!(ids(&result), vec![e]);
    assert_eq!(result[0].score, 0.18);
    assert_eq!(result[0].common_interests, vec!["denim".to_string()]);
    assert_eq!(result[0].reasons, vec![ReasonTag::SimilarInterests]);
}

#[tokio::test]
async fn test_repeated_engagement_counted_once() {
    let store = Arc::new(InMemoryStore::new());
    let me = user(&store, "me");
    let f = user(&store, "f");
    for _ in 0..3 {
        engage(&store, me, f, &[], InteractionType::View);
    }

    let result = engine(store).generate_recommendations(me, None).await.unwrap();

    assert_eq!(ids(&result), vec![f]);
    assert_eq!(result[0].score, 0.3);
    assert_eq!(result[0].reasons, vec![ReasonTag::ContentCreator]);
}

#[tokio::test]
async fn test_zero_limit_returns_empty() {
    let store = Arc::new(InMemoryStore::new());
    let me = user(&store, "me");
    let f = user(&store, "f");
    engage(&store, me, f, &[], InteractionType::Like);

    let result = engine(store).generate_recommendations(me, Some(0)).await.unwrap();
    assert!(result.is_empty());
}

#[tokio::test]
async fn test_signals_combine_additively() {
    let store = Arc::new(InMemoryStore::new());
    let me = user(&store, "me");
    let (b, c, d) = (user(&store, "b"), user(&store, "c"), user(&store, "d"));
    store.follow(me, b);
    store.follow(me, c);
    store.follow(b, d);
    store.follow(c, d);
    store.set_interest_profile(explicit(me, &[("denim", 5.0)]));
    store.set_interest_profile(explicit(d, &[("denim", 3.0)]));
    engage(&store, me, d, &[], InteractionType::Comment);

    let result = engine(store).generate_recommendations(me, None).await.unwrap();

    assert_eq!(ids(&result), vec![d]);
    assert_eq!(result[0].score, 0.56);
    assert_eq!(
        result[0].reasons,
        vec![
            ReasonTag::MutualConnections,
            ReasonTag::SimilarInterests,
            ReasonTag::ContentCreator
        ]
    );
}

#[tokio::test]
async fn test_followed_pending_and_blocked_users_never_suggested() {
    let store = Arc::new(InMemoryStore::new());
    let me = user(&store, "me");
    let b = user(&store, "b");
    let pending = user(&store, "pending");
    let blocked = user(&store, "blocked");
    let fresh = user(&store, "fresh");

    store.follow(me, b);
    store.upsert_edge(me, pending, EdgeStatus::Pending);
    store.block(blocked, me);
    store.follow(b, pending);
    store.follow(b, blocked);
    store.follow(b, fresh);
    store.follow(b, me);
    engage(&store, me, pending, &[], InteractionType::Like);
    engage(&store, me, blocked, &[], InteractionType::Like);
    engage(&store, me, me, &[], InteractionType::Like);

    let result = engine(store).generate_recommendations(me, None).await.unwrap();
    assert_eq!(ids(&result), vec![fresh]);
}

#[tokio::test]
async fn test_rejected_edges_are_ignored() {
    let store = Arc::new(InMemoryStore::new());
    let me = user(&store, "me");
    let (b, d) = (user(&store, "b"), user(&store, "d"));
    store.upsert_edge(me, b, EdgeStatus::Rejected);
    store.follow(b, d);

    let result = engine(store).generate_recommendations(me, None).await.unwrap();
    assert!(result.is_empty());
}

#[tokio::test]
async fn test_results_bounded_ordered_and_deterministic() {
    let store = Arc::new(InMemoryStore::new());
    let me = user(&store, "me");
    for i in 0..8 {
        let author = user(&store, &format!("author{i}"));
        engage(&store, me, author, &[], InteractionType::View);
    }
    let (b, star) = (user(&store, "b"), user(&store, "star"));
    store.follow(me, b);
    store.follow(b, star);
    engage(&store, me, star, &[], InteractionType::View);

    let engine = engine(store);
    let first = engine.generate_recommendations(me, Some(5)).await.unwrap();
    let second = engine.generate_recommendations(me, Some(5)).await.unwrap();

    assert_eq!(first.len(), 5);
    assert_eq!(first, second);
    assert_eq!(first[0].user.user_id, star);
    assert!(first.windows(2).all(|w| {
        w[0].score > w[1].score || (w[0].score == w[1].score && w[0].user.user_id < w[1].user.user_id)
    }));
}

#[tokio::test]
async fn test_limit_clamped_to_max() {
    let store = Arc::new(InMemoryStore::new());
    let me = user(&store, "me");
    for i in 0..5 {
        let author = user(&store, &format!("author{i}"));
        engage(&store, me, author, &[], InteractionType::View);
    }

    let config = EngineConfig {
        default_limit: 3,
        max_limit: 3,
        ..Default::default()
    };
    let engine = SuggestionEngine::new(Stores::from_shared(store), config).unwrap();
    let result = engine.generate_recommendations(me, Some(50)).await.unwrap();
    assert_eq!(result.len(), 3);
}

#[tokio::test]
async fn test_extra_mutual_connection_lifts_rank_over_identical_peer() {
    let store = Arc::new(InMemoryStore::new());
    let me = user(&store, "me");
    let (b, c) = (user(&store, "b"), user(&store, "c"));
    let (d, e) = (user(&store, "d"), user(&store, "e"));
    let (first_by_id, second_by_id) = (d.min(e), d.max(e));

    store.follow(me, b);
    store.follow(me, c);
    for candidate in [d, e] {
        store.follow(b, candidate);
        engage(&store, me, candidate, &[], InteractionType::View);
    }

    let engine = engine(store.clone());
    let before = engine.generate_recommendations(me, None).await.unwrap();
    assert_eq!(ids(&before), vec![first_by_id, second_by_id]);
    assert_eq!(before[0].score, before[1].score);

    // Same signals except one more connector for the peer that lost the tie
    store.follow(c, second_by_id);
    let after = engine.generate_recommendations(me, None).await.unwrap();

    assert_eq!(ids(&after), vec![second_by_id, first_by_id]);
    assert!(after[0].score > after[1].score);
    assert_eq!(after[0].mutual_count, 2);
    assert_eq!(after[1].mutual_count, 1);
}

#[tokio::test]
async fn test_deleted_profile_dropped_from_results() {
    let store = Arc::new(InMemoryStore::new());
    let me = user(&store, "me");
    let (gone, kept) = (user(&store, "gone"), user(&store, "kept"));
    engage(&store, me, gone, &[], InteractionType::Like);
    engage(&store, me, kept, &[], InteractionType::Like);
    store.delete_profile(gone);

    let result = engine(store).generate_recommendations(me, None).await.unwrap();
    assert_eq!(ids(&result), vec![kept]);
}

#[tokio::test]
async fn test_interactions_outside_lookback_ignored() {
    let store = Arc::new(InMemoryStore::new());
    let me = user(&store, "me");
    let old = user(&store, "old");
    let post_id = Uuid::new_v4();
    store.add_post(post_id, old, &[]);
    store.record_interaction(
        me,
        post_id,
        InteractionType::Like,
        Utc::now() - ChronoDuration::days(45),
    );

    let result = engine(store).generate_recommendations(me, None).await.unwrap();
    assert!(result.is_empty());
}

struct FailingInterests;

#[async_trait]
impl InterestProfileStore for FailingInterests {
    async fn get_profile(&self, _user_id: UserId) -> Result<Option<InterestProfile>, StoreError> {
        Err(StoreError::Unavailable("interest store offline".to_string()))
    }

    async fn query_by_categories(
        &self,
        _categories: &[String],
        _exclude: &HashSet<UserId>,
        _limit: usize,
    ) -> Result<Vec<InterestMatch>, StoreError> {
        Err(StoreError::Unavailable("interest store offline".to_string()))
    }
}

#[tokio::test]
async fn test_failed_signal_degrades_gracefully() {
    init_tracing();
    let store = Arc::new(InMemoryStore::new());
    let me = user(&store, "me");
    let (b, c, d, f) = (
        user(&store, "b"),
        user(&store, "c"),
        user(&store, "d"),
        user(&store, "f"),
    );
    store.follow(me, b);
    store.follow(me, c);
    store.follow(b, d);
    store.follow(c, d);
    engage(&store, me, f, &[], InteractionType::View);

    let stores = Stores::new(
        store.clone(),
        store.clone(),
        Arc::new(FailingInterests),
        store,
    );
    let engine = SuggestionEngine::new(stores, EngineConfig::default()).unwrap();
    let report = engine.generate_with_report(me, None).await.unwrap();

    assert_eq!(ids(&report.recommendations), vec![f, d]);
    assert_eq!(report.stats.failed_signals, vec![SignalKind::SimilarInterests]);
    assert!(report.stats.is_degraded());
}

struct FailingProfiles;

#[async_trait]
impl UserProfileStore for FailingProfiles {
    async fn batch_get(
        &self,
        _user_ids: &[UserId],
    ) -> Result<HashMap<UserId, ProfileSummary>, StoreError> {
        Err(StoreError::Unavailable("profile store offline".to_string()))
    }
}

#[tokio::test]
async fn test_hydration_failure_fails_request() {
    let store = Arc::new(InMemoryStore::new());
    let me = user(&store, "me");
    let f = user(&store, "f");
    engage(&store, me, f, &[], InteractionType::View);

    let stores = Stores::new(
        store.clone(),
        store.clone(),
        store,
        Arc::new(FailingProfiles),
    );
    let engine = SuggestionEngine::new(stores, EngineConfig::default()).unwrap();
    let err = engine.generate_recommendations(me, None).await.unwrap_err();

    assert!(matches!(
        err,
        SuggestionError::DataStore {
            stage: Stage::Hydration,
            ..
        }
    ));
}

#[derive(Default)]
struct MapCache {
    entries: Mutex<HashMap<(UserId, usize), Vec<Recommendation>>>,
}

#[async_trait]
impl SuggestionCache for MapCache {
    async fn get(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> Result<Option<Vec<Recommendation>>, StoreError> {
        Ok(self.entries.lock().unwrap().get(&(user_id, limit)).cloned())
    }

    async fn put(
        &self,
        user_id: UserId,
        limit: usize,
        items: &[Recommendation],
        _ttl: Duration,
    ) -> Result<(), StoreError> {
        self.entries
            .lock()
            .unwrap()
            .insert((user_id, limit), items.to_vec());
        Ok(())
    }
}

#[tokio::test]
async fn test_cache_serves_repeat_requests() {
    let store = Arc::new(InMemoryStore::new());
    let me = user(&store, "me");
    let (f, g) = (user(&store, "f"), user(&store, "g"));
    engage(&store, me, f, &[], InteractionType::Like);

    let cache = Arc::new(MapCache::default());
    let engine = engine(store.clone()).with_cache(cache.clone(), Duration::from_secs(60));

    let first = engine.generate_with_report(me, Some(10)).await.unwrap();
    assert!(!first.stats.cache_hit);
    assert_eq!(ids(&first.recommendations), vec![f]);

    // New engagement is not visible until the entry expires
    engage(&store, me, g, &[], InteractionType::Like);
    let second = engine.generate_with_report(me, Some(10)).await.unwrap();
    assert!(second.stats.cache_hit);
    assert_eq!(second.recommendations, first.recommendations);

    // Different limit is a different key
    let third = engine.generate_with_report(me, Some(5)).await.unwrap();
    assert!(!third.stats.cache_hit);
    assert_eq!(third.recommendations.len(), 2);
}

#[tokio::test]
async fn test_cached_results_recheck_follows_and_blocks() {
    let store = Arc::new(InMemoryStore::new());
    let me = user(&store, "me");
    let (f, g, h) = (user(&store, "f"), user(&store, "g"), user(&store, "h"));
    for author in [f, g, h] {
        engage(&store, me, author, &[], InteractionType::Like);
    }

    let cache = Arc::new(MapCache::default());
    let engine = engine(store.clone()).with_cache(cache.clone(), Duration::from_secs(60));

    let first = engine.generate_with_report(me, None).await.unwrap();
    assert_eq!(first.recommendations.len(), 3);

    store.follow(me, f);
    store.upsert_edge(me, g, EdgeStatus::Pending);
    store.block(me, h);

    let second = engine.generate_with_report(me, None).await.unwrap();
    assert!(second.stats.cache_hit);
    assert!(second.recommendations.is_empty());
    assert_eq!(second.stats.final_count, 0);
}

#[tokio::test]
async fn test_degraded_results_not_cached() {
    let store = Arc::new(InMemoryStore::new());
    let me = user(&store, "me");
    let f = user(&store, "f");
    engage(&store, me, f, &[], InteractionType::Like);

    let stores = Stores::new(
        store.clone(),
        store.clone(),
        Arc::new(FailingInterests),
        store,
    );
    let cache = Arc::new(MapCache::default());
    let engine = SuggestionEngine::new(stores, EngineConfig::default())
        .unwrap()
        .with_cache(cache.clone(), Duration::from_secs(60));

    engine.generate_recommendations(me, None).await.unwrap();
    assert!(cache.entries.lock().unwrap().is_empty());
}

const STALL: Duration = Duration::from_secs(5);

struct SlowInterests;

#[async_trait]
impl InterestProfileStore for SlowInterests {
    async fn get_profile(&self, _user_id: UserId) -> Result<Option<InterestProfile>, StoreError> {
        tokio::time::sleep(STALL).await;
        Ok(None)
    }

    async fn query_by_categories(
        &self,
        _categories: &[String],
        _exclude: &HashSet<UserId>,
        _limit: usize,
    ) -> Result<Vec<InterestMatch>, StoreError> {
        Ok(vec![])
    }
}

struct SlowRelationships;

#[async_trait]
impl RelationshipStore for SlowRelationships {
    async fn list_outbound_edges(
        &self,
        _user_id: UserId,
        _statuses: &[EdgeStatus],
    ) -> Result<Vec<SocialEdge>, StoreError> {
        tokio::time::sleep(STALL).await;
        Ok(vec![])
    }

    async fn list_inbound_edges(
        &self,
        _connector_ids: &[UserId],
        _statuses: &[EdgeStatus],
    ) -> Result<Vec<SocialEdge>, StoreError> {
        Ok(vec![])
    }

    async fn list_blocked_users(&self, _user_id: UserId) -> Result<Vec<UserId>, StoreError> {
        Ok(vec![])
    }
}

struct SlowProfiles;

#[async_trait]
impl UserProfileStore for SlowProfiles {
    async fn batch_get(
        &self,
        _user_ids: &[UserId],
    ) -> Result<HashMap<UserId, ProfileSummary>, StoreError> {
        tokio::time::sleep(STALL).await;
        Ok(HashMap::new())
    }
}

#[tokio::test(start_paused = true)]
async fn test_slow_signal_times_out_and_is_skipped() {
    let store = Arc::new(InMemoryStore::new());
    let me = user(&store, "me");
    let f = user(&store, "f");
    engage(&store, me, f, &[], InteractionType::View);

    let stores = Stores::new(store.clone(), store.clone(), Arc::new(SlowInterests), store);
    let engine = SuggestionEngine::new(stores, EngineConfig::default()).unwrap();

    let started = tokio::time::Instant::now();
    let report = engine.generate_with_report(me, None).await.unwrap();

    assert!(started.elapsed() < STALL);
    assert_eq!(ids(&report.recommendations), vec![f]);
    assert_eq!(report.stats.failed_signals, vec![SignalKind::SimilarInterests]);
}

#[tokio::test(start_paused = true)]
async fn test_slow_context_load_times_out() {
    let store = Arc::new(InMemoryStore::new());
    let me = user(&store, "me");

    let stores = Stores::new(Arc::new(SlowRelationships), store.clone(), store.clone(), store);
    let engine = SuggestionEngine::new(stores, EngineConfig::default()).unwrap();

    let err = engine.generate_recommendations(me, None).await.unwrap_err();
    assert!(matches!(
        err,
        SuggestionError::Timeout {
            stage: Stage::Context,
            after,
        } if after == Duration::from_millis(800)
    ));
}

#[tokio::test(start_paused = true)]
async fn test_slow_hydration_times_out() {
    let store = Arc::new(InMemoryStore::new());
    let me = user(&store, "me");
    let f = user(&store, "f");
    engage(&store, me, f, &[], InteractionType::View);

    let stores = Stores::new(store.clone(), store.clone(), store, Arc::new(SlowProfiles));
    let engine = SuggestionEngine::new(stores, EngineConfig::default()).unwrap();

    let err = engine.generate_recommendations(me, None).await.unwrap_err();
    assert!(matches!(
        err,
        SuggestionError::Timeout {
            stage: Stage::Hydration,
            ..
        }
    ));
}
