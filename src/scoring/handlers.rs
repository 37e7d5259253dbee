use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};

use super::audit::{ScoringAuditor, Violation};
use super::pipeline::IngestSummary;
use super::scorecard::Scorecard;
use crate::season::{Match, MatchStatus};
use crate::shared::{AppError, AppState, LeagueId, MatchId};

#[derive(Debug, Deserialize)]
pub struct MatchStatusRequest {
    pub status: MatchStatus,
}

/// POST /matches/external/:external_id/ingest
///
/// Pulls the scorecard from the configured provider and ingests it
#[instrument(name = "ingest_match", skip(state))]
pub async fn ingest_match(
    State(state): State<AppState>,
    Path(external_id): Path<String>,
) -> Result<Json<IngestSummary>, AppError> {
    info!(external_id = %external_id, "Ingesting match from provider");

    let summary = state.pipeline.ingest_match(&external_id).await?;

    info!(
        match_id = summary.match_id,
        skipped = summary.skipped.len(),
        "Match ingested from provider"
    );
    Ok(Json(summary))
}

/// POST /matches/:match_id/scorecard
#[instrument(name = "ingest_scorecard", skip(state, scorecard))]
pub async fn ingest_scorecard(
    State(state): State<AppState>,
    Path(match_id): Path<MatchId>,
    Json(scorecard): Json<Scorecard>,
) -> Result<Json<IngestSummary>, AppError> {
    info!(match_id, innings = scorecard.innings.len(), "Ingesting posted scorecard");

    let summary = state.pipeline.ingest_scorecard(match_id, &scorecard).await?;
    Ok(Json(summary))
}

/// PUT /matches/:match_id/status
#[instrument(name = "set_match_status", skip(state))]
pub async fn set_match_status(
    State(state): State<AppState>,
    Path(match_id): Path<MatchId>,
    Json(request): Json<MatchStatusRequest>,
) -> Result<Json<Match>, AppError> {
    let fixture = state
        .pipeline
        .set_match_status(match_id, request.status)
        .await?;

    info!(match_id, status = %fixture.status, "Match status set");
    Ok(Json(fixture))
}

/// GET /leagues/:league_id/audit
///
/// Recomputes the league's stored scoring invariants; an empty list is clean
#[instrument(name = "audit_league", skip(state))]
pub async fn audit_league(
    State(state): State<AppState>,
    Path(league_id): Path<LeagueId>,
) -> Result<Json<Vec<Violation>>, AppError> {
    let auditor = ScoringAuditor::new(
        Arc::clone(&state.catalog),
        Arc::clone(&state.leagues),
        Arc::clone(&state.scoring_repository),
    );
    let violations = auditor.audit_league(league_id).await?;

    info!(league_id, violation_count = violations.len(), "League audited");
    Ok(Json(violations))
}
