use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use tracing::instrument;

use super::views::{LeagueStats, SquadStanding};
use crate::shared::{AppError, AppState, LeagueId};

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub phase: Option<i32>,
}

/// GET /leagues/:league_id/stats
#[instrument(name = "league_stats", skip(state))]
pub async fn league_stats(
    State(state): State<AppState>,
    Path(league_id): Path<LeagueId>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<LeagueStats>, AppError> {
    let stats = state.stats.league_stats(league_id, query.phase).await?;
    Ok(Json(stats.as_ref().clone()))
}

/// GET /leagues/:league_id/standings
#[instrument(name = "standings", skip(state))]
pub async fn standings(
    State(state): State<AppState>,
    Path(league_id): Path<LeagueId>,
) -> Result<Json<Vec<SquadStanding>>, AppError> {
    Ok(Json(state.stats.standings(league_id).await?))
}
