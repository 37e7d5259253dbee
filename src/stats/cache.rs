use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use super::views::LeagueStats;
use crate::shared::LeagueId;

/// Computed league views keyed by (league, phase).
///
/// Entries are dropped whenever a pipeline, draft or trade write touches the
/// league; the next read recomputes them from stored rows. Every invalidation
/// bumps the league's generation, and a view computed under an older
/// generation is returned to its caller but never stored.
#[derive(Debug, Default)]
pub struct StatsCache {
    state: RwLock<CacheState>,
}

#[derive(Debug, Default)]
struct CacheState {
    views: HashMap<(LeagueId, Option<i32>), Arc<LeagueStats>>,
    generations: HashMap<LeagueId, u64>,
}

impl StatsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, league_id: LeagueId, phase: Option<i32>) -> Option<Arc<LeagueStats>> {
        self.state.read().await.views.get(&(league_id, phase)).cloned()
    }

    /// Read before computing a view; pass to `insert`
    pub async fn generation(&self, league_id: LeagueId) -> u64 {
        self.state
            .read()
            .await
            .generations
            .get(&league_id)
            .copied()
            .unwrap_or_default()
    }

    pub async fn insert(&self, stats: LeagueStats, generation: u64) -> Arc<LeagueStats> {
        let stats = Arc::new(stats);
        let mut state = self.state.write().await;
        let current = state.generations.get(&stats.league_id).copied().unwrap_or_default();
        if current == generation {
            state
                .views
                .insert((stats.league_id, stats.phase), stats.clone());
        } else {
            debug!(league_id = stats.league_id, generation, current, "Stale stats view not cached");
        }
        stats
    }

    pub async fn invalidate_league(&self, league_id: LeagueId) {
        let mut state = self.state.write().await;
        *state.generations.entry(league_id).or_default() += 1;
        let before = state.views.len();
        state.views.retain(|(id, _), _| *id != league_id);
        debug!(league_id, dropped = before - state.views.len(), "Stats cache invalidated");
    }
}
