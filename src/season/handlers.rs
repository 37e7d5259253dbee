use axum::{
    extract::{Path, State},
    Json,
};
use tracing::{info, instrument};

use super::models::{Match, Player, PlayerSeasonTeam, Season, SeasonPhase, Team};
use crate::shared::{AppError, AppState, SeasonId};

/// POST /seasons
#[instrument(name = "create_season", skip(state, season))]
pub async fn create_season(
    State(state): State<AppState>,
    Json(season): Json<Season>,
) -> Result<Json<Season>, AppError> {
    let season = state.catalog.create_season(season).await?;
    info!(season_id = season.id, name = %season.name, "Season created");
    Ok(Json(season))
}

/// GET /seasons
pub async fn list_seasons(State(state): State<AppState>) -> Result<Json<Vec<Season>>, AppError> {
    Ok(Json(state.catalog.list_seasons().await?))
}

/// POST /teams
#[instrument(name = "create_team", skip(state, team))]
pub async fn create_team(
    State(state): State<AppState>,
    Json(team): Json<Team>,
) -> Result<Json<Team>, AppError> {
    Ok(Json(state.catalog.create_team(team).await?))
}

/// POST /players
#[instrument(name = "create_player", skip(state, player))]
pub async fn create_player(
    State(state): State<AppState>,
    Json(player): Json<Player>,
) -> Result<Json<Player>, AppError> {
    Ok(Json(state.catalog.create_player(player).await?))
}

/// POST /seasons/:season_id/players
#[instrument(name = "register_player", skip(state, assignment))]
pub async fn register_player(
    State(state): State<AppState>,
    Path(season_id): Path<SeasonId>,
    Json(mut assignment): Json<PlayerSeasonTeam>,
) -> Result<Json<PlayerSeasonTeam>, AppError> {
    assignment.season_id = season_id;
    let assignment = state.catalog.create_player_season_team(assignment).await?;

    info!(
        season_id,
        player_id = assignment.player_id,
        team_id = assignment.team_id,
        "Player registered for season"
    );
    Ok(Json(assignment))
}

/// POST /seasons/:season_id/matches
#[instrument(name = "create_match", skip(state, fixture))]
pub async fn create_match(
    State(state): State<AppState>,
    Path(season_id): Path<SeasonId>,
    Json(mut fixture): Json<Match>,
) -> Result<Json<Match>, AppError> {
    if fixture.team1_id == fixture.team2_id {
        return Err(AppError::BadRequest(
            "A match needs two different teams".to_string(),
        ));
    }
    fixture.season_id = season_id;
    Ok(Json(state.catalog.create_match(fixture).await?))
}

/// GET /seasons/:season_id/matches
pub async fn list_matches(
    State(state): State<AppState>,
    Path(season_id): Path<SeasonId>,
) -> Result<Json<Vec<Match>>, AppError> {
    Ok(Json(state.catalog.list_matches(season_id).await?))
}

/// POST /seasons/:season_id/phases
#[instrument(name = "create_phase", skip(state, phase))]
pub async fn create_phase(
    State(state): State<AppState>,
    Path(season_id): Path<SeasonId>,
    Json(mut phase): Json<SeasonPhase>,
) -> Result<Json<SeasonPhase>, AppError> {
    if phase.end <= phase.start {
        return Err(AppError::BadRequest(
            "Phase must end after it starts".to_string(),
        ));
    }
    phase.season_id = season_id;
    Ok(Json(state.catalog.create_phase(phase).await?))
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
    async fn created_season_gets_an_id() {
        let app = Router::new()
            .route("/seasons", post(create_season).get(list_seasons))
            .with_state(AppStateBuilder::new().build_in_memory());

        let request = Request::builder()
            .method("POST")
            .uri("/seasons")
            .header("content-type", "application/json")
            .body(Body::from(
                r#"{"id":0,"name":"IPL 2024","year":2024,"status":"Ongoing","default_draft_order":null}"#,
            ))
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let season: Season = serde_json::from_slice(&body).unwrap();
        assert!(season.id > 0);

        let response = app
            .oneshot(Request::builder().uri("/seasons").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let seasons: Vec<Season> = serde_json::from_slice(&body).unwrap();
        assert_eq!(seasons.len(), 1);
    }
}
