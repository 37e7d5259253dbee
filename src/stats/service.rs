use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::cache::StatsCache;
use super::views::{build_league_stats, counted_matches, LeagueStats, SquadStanding};
use crate::league::{FantasyLeague, LeagueRepository};
use crate::scoring::{rank_squads, ScoringRepository};
use crate::season::{sort_chronologically, CatalogRepository};
use crate::shared::{AppError, LeagueId, SquadId};

/// Read-only aggregation over the scoring pipeline's derived rows
pub struct StatsService {
    catalog: Arc<dyn CatalogRepository>,
    leagues: Arc<dyn LeagueRepository>,
    scoring: Arc<dyn ScoringRepository>,
    cache: Arc<StatsCache>,
}

impl StatsService {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        leagues: Arc<dyn LeagueRepository>,
        scoring: Arc<dyn ScoringRepository>,
        cache: Arc<StatsCache>,
    ) -> Self {
        Self {
            catalog,
            leagues,
            scoring,
            cache,
        }
    }

    /// Cached view for the phase, or the whole season when `phase` is None
    #[instrument(skip(self))]
    pub async fn league_stats(
        &self,
        league_id: LeagueId,
        phase: Option<i32>,
    ) -> Result<Arc<LeagueStats>, AppError> {
        if let Some(stats) = self.cache.get(league_id, phase).await {
            debug!(league_id, "Stats cache hit");
            return Ok(stats);
        }

        let generation = self.cache.generation(league_id).await;
        let stats = self.compute(league_id, phase).await?;
        Ok(self.cache.insert(stats, generation).await)
    }

    /// Drops every cached view of the league and recomputes the season view
    #[instrument(skip(self))]
    pub async fn refresh_league(&self, league_id: LeagueId) -> Result<Arc<LeagueStats>, AppError> {
        self.cache.invalidate_league(league_id).await;
        let stats = self.league_stats(league_id, None).await?;

        info!(league_id, matches_counted = stats.matches_counted, "League stats refreshed");
        Ok(stats)
    }

    pub async fn invalidate_league(&self, league_id: LeagueId) {
        self.cache.invalidate_league(league_id).await;
    }

    /// Squads ordered by cached `total_points`, ties to the lower squad id
    pub async fn standings(&self, league_id: LeagueId) -> Result<Vec<SquadStanding>, AppError> {
        self.require_league(league_id).await?;
        let squads = self.leagues.list_squads(league_id).await?;

        let points: BTreeMap<SquadId, f64> =
            squads.iter().map(|s| (s.id, s.total_points)).collect();
        let ranks = rank_squads(&points);

        let mut standings: Vec<SquadStanding> = squads
            .into_iter()
            .map(|s| SquadStanding {
                rank: ranks.get(&s.id).copied().unwrap_or_default(),
                squad_id: s.id,
                name: s.name,
                total_points: s.total_points,
            })
            .collect();
        standings.sort_by_key(|s| s.rank);
        Ok(standings)
    }

    async fn compute(&self, league_id: LeagueId, phase: Option<i32>) -> Result<LeagueStats, AppError> {
        let league = self.require_league(league_id).await?;

        let mut schedule = self.catalog.list_matches(league.season_id).await?;
        sort_chronologically(&mut schedule);
        let match_ids = counted_matches(&schedule, phase);

        let squad_ids: Vec<SquadId> = self
            .leagues
            .list_squads(league_id)
            .await?
            .iter()
            .map(|s| s.id)
            .collect();
        let match_events = self.scoring.list_fantasy_match_events(&squad_ids).await?;
        let player_events = self
            .scoring
            .list_fantasy_player_events(&squad_ids, None)
            .await?;

        Ok(build_league_stats(
            league_id,
            phase,
            &squad_ids,
            &match_ids,
            &match_events,
            &player_events,
        ))
    }

    async fn require_league(&self, league_id: LeagueId) -> Result<FantasyLeague, AppError> {
        self.leagues
            .get_league(league_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("League {} not found", league_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::AppStateBuilder;

    #[tokio::test]
    async fn unknown_league_is_not_found() {
        let state = AppStateBuilder::new().build_in_memory();

        let err = state.stats.league_stats(99, None).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(matches!(state.stats.standings(99).await, Err(AppError::NotFound(_))));
    }
}
