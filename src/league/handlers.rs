use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use tracing::{info, instrument};

use super::models::{
    CoreAssignment, DraftType, FantasyBoostRole, FantasyDraft, FantasyLeague, FantasySquad,
    SquadPhaseBoost,
};
use crate::season::PlayerRole;
use crate::shared::{AppError, AppState, LeagueId, PhaseId, PlayerId, SquadId};

#[derive(Debug, Deserialize)]
pub struct PreSeasonPreferenceRequest {
    pub squad_id: SquadId,
    #[serde(default)]
    pub role: Option<PlayerRole>,
    pub order: Vec<PlayerId>,
}

#[derive(Debug, Deserialize)]
pub struct PhaseBoostRequest {
    pub assignments: Vec<CoreAssignment>,
}

/// POST /leagues
#[instrument(name = "create_league", skip(state, league))]
pub async fn create_league(
    State(state): State<AppState>,
    Json(league): Json<FantasyLeague>,
) -> Result<Json<FantasyLeague>, AppError> {
    if league.max_squads < 1 {
        return Err(AppError::BadRequest(
            "A league needs room for at least one squad".to_string(),
        ));
    }
    if state.catalog.get_season(league.season_id).await?.is_none() {
        return Err(AppError::NotFound(format!(
            "Season {} not found",
            league.season_id
        )));
    }

    let league = state.leagues.create_league(league).await?;
    info!(league_id = league.id, season_id = league.season_id, "League created");
    Ok(Json(league))
}

/// GET /leagues/:league_id
pub async fn get_league(
    State(state): State<AppState>,
    Path(league_id): Path<LeagueId>,
) -> Result<Json<FantasyLeague>, AppError> {
    state
        .leagues
        .get_league(league_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("League {} not found", league_id)))
}

/// POST /leagues/:league_id/squads
#[instrument(name = "create_squad", skip(state, squad))]
pub async fn create_squad(
    State(state): State<AppState>,
    Path(league_id): Path<LeagueId>,
    Json(mut squad): Json<FantasySquad>,
) -> Result<Json<FantasySquad>, AppError> {
    squad.league_id = league_id;
    let squad = state.leagues.create_squad(squad).await?;

    info!(league_id, squad_id = squad.id, "Squad joined league");
    Ok(Json(squad))
}

/// GET /leagues/:league_id/squads
pub async fn list_squads(
    State(state): State<AppState>,
    Path(league_id): Path<LeagueId>,
) -> Result<Json<Vec<FantasySquad>>, AppError> {
    Ok(Json(state.leagues.list_squads(league_id).await?))
}

/// PUT /leagues/:league_id/preferences
#[instrument(name = "submit_preseason_preferences", skip(state, request))]
pub async fn submit_preseason_preferences(
    State(state): State<AppState>,
    Path(league_id): Path<LeagueId>,
    Json(request): Json<PreSeasonPreferenceRequest>,
) -> Result<Json<FantasyDraft>, AppError> {
    let squad = state
        .leagues
        .get_squad(request.squad_id)
        .await?
        .filter(|s| s.league_id == league_id)
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "Squad {} not found in league {}",
                request.squad_id, league_id
            ))
        })?;

    let draft = state
        .leagues
        .upsert_draft_preference(FantasyDraft {
            id: 0,
            league_id,
            squad_id: squad.id,
            draft_type: DraftType::PreSeason,
            role: request.role,
            order: request.order,
        })
        .await?;
    Ok(Json(draft))
}

/// POST /boost-roles
#[instrument(name = "create_boost_role", skip(state, role))]
pub async fn create_boost_role(
    State(state): State<AppState>,
    Json(role): Json<FantasyBoostRole>,
) -> Result<Json<FantasyBoostRole>, AppError> {
    role.multipliers.validate()?;
    Ok(Json(state.leagues.create_boost_role(role).await?))
}

/// PUT /squads/:squad_id/phases/:phase_id/boosts
#[instrument(name = "set_phase_boost", skip(state, request))]
pub async fn set_phase_boost(
    State(state): State<AppState>,
    Path((squad_id, phase_id)): Path<(SquadId, PhaseId)>,
    Json(request): Json<PhaseBoostRequest>,
) -> Result<Json<SquadPhaseBoost>, AppError> {
    let boost = SquadPhaseBoost {
        squad_id,
        phase_id,
        assignments: request.assignments,
    };
    state.leagues.upsert_phase_boost(boost.clone()).await?;

    info!(squad_id, phase_id, "Phase boosts set");
    Ok(Json(boost))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::AppStateBuilder;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        routing::post,
        Router,
    };
    use tower::ServiceExt;

    #[tokio::test]
    async fn league_for_unknown_season_is_not_found() {
        let app = Router::new()
            .route("/leagues", post(create_league))
            .with_state(AppStateBuilder::new().build_in_memory());

        let request = Request::builder()
            .method("POST")
            .uri("/leagues")
            .header("content-type", "application/json")
            .body(Body::from(
                r#"{"id":0,"season_id":12,"name":"Office","max_squads":4,
                    "snake_draft_seed_order":null,"draft_seed_orders":{},
                    "draft_completed":false,"mid_season_draft_pool":null}"#,
            ))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
