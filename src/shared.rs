use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard, RwLock};

use crate::config::AppConfig;
use crate::draft::{DraftRepository, DraftWindowService, PreSeasonDraftService};
use crate::event::EventBus;
use crate::league::LeagueRepository;
use crate::providers::{
    Clock, InMemoryScorecardProvider, RandomSource, ScorecardProvider, SystemClock,
    ThreadRandomSource,
};
use crate::scoring::{RankingConfig, ScoringPipeline, ScoringRepository};
use crate::season::CatalogRepository;
use crate::stats::{StatsCache, StatsService};
use crate::storage::InMemoryStore;
use crate::trade::{TradeRepository, TradeService};

pub type SeasonId = i64;
pub type TeamId = i64;
pub type PlayerId = i64;
pub type MatchId = i64;
pub type PhaseId = i64;
pub type LeagueId = i64;
pub type SquadId = i64;
pub type BoostRoleId = i64;
pub type WindowId = i64;
pub type TradeId = i64;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppError {
    #[error("Input missing: {0}")]
    InputMissing(String),

    #[error("Season mismatch: {0}")]
    SeasonMismatch(String),

    #[error("Draft window closed: {0}")]
    WindowClosed(String),

    #[error("Draft window not open: {0}")]
    WindowNotOpen(String),

    #[error("Already run: {0}")]
    AlreadyRun(String),

    #[error("Draft pool empty: {0}")]
    PoolEmpty(String),

    #[error("Blocked by live match: {0}")]
    LiveMatchBlocked(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Scorecard provider error: {0}")]
    Provider(String),

    #[error("Internal server error")]
    Internal,
}

impl AppError {
    /// Stable identifier surfaced to callers alongside the message
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InputMissing(_) => "input_missing",
            AppError::SeasonMismatch(_) => "season_mismatch",
            AppError::WindowClosed(_) => "window_closed",
            AppError::WindowNotOpen(_) => "window_not_open",
            AppError::AlreadyRun(_) => "already_run",
            AppError::PoolEmpty(_) => "pool_empty",
            AppError::LiveMatchBlocked(_) => "live_match_blocked",
            AppError::Conflict(_) => "conflict",
            AppError::InvariantViolation(_) => "invariant_violation",
            AppError::BadRequest(_) => "bad_request",
            AppError::NotFound(_) => "not_found",
            AppError::DatabaseError(_) => "database_error",
            AppError::Provider(_) => "provider_error",
            AppError::Internal => "internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::InputMissing(_) | AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::SeasonMismatch(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::WindowClosed(_)
            | AppError::WindowNotOpen(_)
            | AppError::AlreadyRun(_)
            | AppError::Conflict(_)
            | AppError::LiveMatchBlocked(_) => StatusCode::CONFLICT,
            AppError::PoolEmpty(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Provider(_) => StatusCode::BAD_GATEWAY,
            AppError::InvariantViolation(_) | AppError::DatabaseError(_) | AppError::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "error": self.to_string(),
            "code": self.code(),
        }));

        (status, body).into_response()
    }
}

/// Lazily created async mutex per key.
///
/// Used as the league-level advisory lock shared by the draft scheduler and
/// the trade arbiter, and as the per (window, league) draft execution lock.
pub struct KeyedLocks<K> {
    locks: Arc<RwLock<HashMap<K, Arc<AsyncMutex<()>>>>>,
}

impl<K> Clone for KeyedLocks<K> {
    fn clone(&self) -> Self {
        Self {
            locks: Arc::clone(&self.locks),
        }
    }
}

impl<K: Eq + Hash + Clone> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    pub fn new() -> Self {
        Self {
            locks: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn acquire(&self, key: K) -> OwnedMutexGuard<()> {
        let lock = {
            let guard = self.locks.read().await;
            guard.get(&key).cloned()
        };

        let lock = match lock {
            Some(lock) => lock,
            None => {
                let mut guard = self.locks.write().await;
                guard
                    .entry(key)
                    .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                    .clone()
            }
        };

        lock.lock_owned().await
    }
}

pub type LeagueLocks = KeyedLocks<LeagueId>;

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn CatalogRepository>,
    pub leagues: Arc<dyn LeagueRepository>,
    pub scoring_repository: Arc<dyn ScoringRepository>,
    pub drafts: Arc<dyn DraftRepository>,
    pub trades: Arc<dyn TradeRepository>,
    pub pipeline: Arc<ScoringPipeline>,
    pub preseason: Arc<PreSeasonDraftService>,
    pub windows: Arc<DraftWindowService>,
    pub trade_service: Arc<TradeService>,
    pub stats: Arc<StatsService>,
    pub event_bus: EventBus,
}

/// Builder wiring every service against one store.
///
/// Defaults to the in-memory store, the system clock, a thread-local random
/// source and an empty in-memory scorecard provider.
pub struct AppStateBuilder {
    clock: Arc<dyn Clock>,
    random: Arc<dyn RandomSource>,
    provider: Arc<dyn ScorecardProvider>,
    config: AppConfig,
}

impl Default for AppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AppStateBuilder {
    pub fn new() -> Self {
        Self {
            clock: Arc::new(SystemClock),
            random: Arc::new(ThreadRandomSource),
            provider: Arc::new(InMemoryScorecardProvider::new()),
            config: AppConfig::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    pub fn with_provider(mut self, provider: Arc<dyn ScorecardProvider>) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build_in_memory(self) -> AppState {
        self.build(Arc::new(InMemoryStore::new()))
    }

    pub fn build<S>(self, store: Arc<S>) -> AppState
    where
        S: CatalogRepository
            + LeagueRepository
            + ScoringRepository
            + DraftRepository
            + TradeRepository
            + 'static,
    {
        let catalog: Arc<dyn CatalogRepository> = store.clone();
        let leagues: Arc<dyn LeagueRepository> = store.clone();
        let scoring_repository: Arc<dyn ScoringRepository> = store.clone();
        let drafts: Arc<dyn DraftRepository> = store.clone();
        let trades: Arc<dyn TradeRepository> = store;

        let event_bus = EventBus::new(self.config.event_channel_capacity);
        let league_locks = LeagueLocks::new();
        let stats_cache = Arc::new(StatsCache::new());

        let stats = Arc::new(StatsService::new(
            catalog.clone(),
            leagues.clone(),
            scoring_repository.clone(),
            stats_cache.clone(),
        ));

        let pipeline = Arc::new(ScoringPipeline::new(
            catalog.clone(),
            leagues.clone(),
            scoring_repository.clone(),
            self.provider,
            stats_cache,
            event_bus.clone(),
            RankingConfig {
                completed_only: self.config.running_rank_completed_only,
            },
        ));

        let preseason = Arc::new(PreSeasonDraftService::new(
            catalog.clone(),
            leagues.clone(),
            scoring_repository.clone(),
            drafts.clone(),
            self.random,
            league_locks.clone(),
            event_bus.clone(),
        ));

        let windows = Arc::new(DraftWindowService::new(
            catalog.clone(),
            leagues.clone(),
            scoring_repository.clone(),
            drafts.clone(),
            self.clock.clone(),
            league_locks.clone(),
            event_bus.clone(),
        ));

        let trade_service = Arc::new(TradeService::new(
            catalog.clone(),
            leagues.clone(),
            trades.clone(),
            self.clock,
            league_locks,
            event_bus.clone(),
        ));

        AppState {
            catalog,
            leagues,
            scoring_repository,
            drafts,
            trades,
            pipeline,
            preseason,
            windows,
            trade_service,
            stats,
            event_bus,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(AppError::AlreadyRun("x".into()).code(), "already_run");
        assert_eq!(AppError::PoolEmpty("x".into()).code(), "pool_empty");
        assert_eq!(
            AppError::InvariantViolation("x".into()).code(),
            "invariant_violation"
        );
    }

    #[tokio::test]
    async fn keyed_locks_serialize_same_key() {
        let locks: KeyedLocks<i64> = KeyedLocks::new();
        let guard = locks.acquire(1).await;

        let contender = locks.clone();
        let handle = tokio::spawn(async move {
            let _guard = contender.acquire(1).await;
        });

        // A different key is never blocked by the held one
        let _other = locks.acquire(2).await;

        tokio::task::yield_now().await;
        assert!(!handle.is_finished());

        drop(guard);
        handle.await.unwrap();
    }
}
