use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::models::{DraftWindow, DraftWindowLeagueRun};
use super::preseason::{PreSeasonDraftOptions, PreSeasonDraftResult};
use super::window::ExecuteOptions;
use crate::league::FantasyDraft;
use crate::season::PlayerRole;
use crate::shared::{AppError, AppState, LeagueId, PlayerId, SquadId, TeamId, WindowId};

#[derive(Debug, Serialize, Deserialize)]
pub struct CompilePoolResponse {
    pub window_id: WindowId,
    pub player_count: usize,
}

#[derive(Debug, Deserialize)]
pub struct PreferenceRequest {
    pub squad_id: SquadId,
    #[serde(default)]
    pub role: Option<PlayerRole>,
    pub order: Vec<PlayerId>,
}

#[derive(Debug, Deserialize)]
pub struct TeamEligibilityRequest {
    pub is_remaining: bool,
}

/// POST /leagues/:league_id/draft
#[instrument(name = "run_preseason_draft", skip(state))]
pub async fn run_preseason_draft(
    State(state): State<AppState>,
    Path(league_id): Path<LeagueId>,
    Json(options): Json<PreSeasonDraftOptions>,
) -> Result<Json<PreSeasonDraftResult>, AppError> {
    info!(league_id, dry_run = options.dry_run, "Running pre-season draft");

    let result = state.preseason.run(league_id, options).await?;

    info!(league_id, total_drafted = result.total_drafted, "Pre-season draft finished");
    Ok(Json(result))
}

/// POST /windows
#[instrument(name = "create_window", skip(state, window))]
pub async fn create_window(
    State(state): State<AppState>,
    Json(window): Json<DraftWindow>,
) -> Result<Json<DraftWindow>, AppError> {
    if window.lock_at <= window.open_at {
        return Err(AppError::BadRequest(
            "Draft window must lock after it opens".to_string(),
        ));
    }
    let window = state.drafts.create_window(window).await?;

    info!(window_id = window.id, season_id = window.season_id, "Draft window created");
    Ok(Json(window))
}

/// POST /windows/:window_id/pool
#[instrument(name = "compile_pool", skip(state))]
pub async fn compile_pool(
    State(state): State<AppState>,
    Path(window_id): Path<WindowId>,
) -> Result<Json<CompilePoolResponse>, AppError> {
    let player_count = state.windows.compile_pool(window_id).await?;
    Ok(Json(CompilePoolResponse {
        window_id,
        player_count,
    }))
}

/// PUT /windows/:window_id/teams/:team_id
#[instrument(name = "set_team_remaining", skip(state))]
pub async fn set_team_remaining(
    State(state): State<AppState>,
    Path((window_id, team_id)): Path<(WindowId, TeamId)>,
    Json(request): Json<TeamEligibilityRequest>,
) -> Result<Json<()>, AppError> {
    state
        .windows
        .set_team_remaining(window_id, team_id, request.is_remaining)
        .await?;

    info!(window_id, team_id, is_remaining = request.is_remaining, "Team eligibility set");
    Ok(Json(()))
}

/// PUT /windows/:window_id/preferences
#[instrument(name = "submit_preferences", skip(state, request))]
pub async fn submit_preferences(
    State(state): State<AppState>,
    Path(window_id): Path<WindowId>,
    Json(request): Json<PreferenceRequest>,
) -> Result<Json<FantasyDraft>, AppError> {
    let draft = state
        .windows
        .submit_preferences(window_id, request.squad_id, request.role, request.order)
        .await?;
    Ok(Json(draft))
}

/// POST /windows/:window_id/leagues/:league_id/execute
#[instrument(name = "execute_window", skip(state))]
pub async fn execute_window(
    State(state): State<AppState>,
    Path((window_id, league_id)): Path<(WindowId, LeagueId)>,
    Json(options): Json<ExecuteOptions>,
) -> Result<Json<DraftWindowLeagueRun>, AppError> {
    info!(
        window_id,
        league_id,
        dry_run = options.dry_run,
        force_rerun = options.force_rerun,
        "Executing draft window"
    );

    let run = state.windows.execute(league_id, window_id, options).await?;
    Ok(Json(run))
}
