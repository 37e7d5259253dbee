use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use tracing::{info, instrument};

use super::models::{
    DecisionOutcome, FantasyTrade, NewTrade, ProcessReport, TradeDecision, TradeStatus,
};
use crate::shared::{AppError, AppState, LeagueId, SeasonId, TradeId};

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub decision: TradeDecision,
}

#[derive(Debug, Deserialize)]
pub struct TradeListQuery {
    pub status: Option<TradeStatus>,
}

/// POST /trades
#[instrument(name = "propose_trade", skip(state, request))]
pub async fn propose_trade(
    State(state): State<AppState>,
    Json(request): Json<NewTrade>,
) -> Result<Json<FantasyTrade>, AppError> {
    let trade = state.trade_service.propose_trade(request).await?;
    Ok(Json(trade))
}

/// GET /leagues/:league_id/trades
#[instrument(name = "list_trades", skip(state))]
pub async fn list_trades(
    State(state): State<AppState>,
    Path(league_id): Path<LeagueId>,
    Query(query): Query<TradeListQuery>,
) -> Result<Json<Vec<FantasyTrade>>, AppError> {
    let trades = state.trades.list_trades(league_id, query.status).await?;
    Ok(Json(trades))
}

/// POST /trades/:trade_id/decision
#[instrument(name = "decide_trade", skip(state))]
pub async fn decide_trade(
    State(state): State<AppState>,
    Path(trade_id): Path<TradeId>,
    Json(request): Json<DecisionRequest>,
) -> Result<Json<DecisionOutcome>, AppError> {
    let outcome = state.trade_service.decide(trade_id, request.decision).await?;

    info!(
        trade_id,
        status = %outcome.trade.status,
        deferred = outcome.deferred,
        "Trade decision applied"
    );
    Ok(Json(outcome))
}

/// POST /trades/:trade_id/process
#[instrument(name = "process_trade", skip(state))]
pub async fn process_trade(
    State(state): State<AppState>,
    Path(trade_id): Path<TradeId>,
) -> Result<Json<FantasyTrade>, AppError> {
    let trade = state.trade_service.process_trade(trade_id).await?;
    Ok(Json(trade))
}

/// POST /seasons/:season_id/trades/process
#[instrument(name = "process_ready_trades", skip(state))]
pub async fn process_ready_trades(
    State(state): State<AppState>,
    Path(season_id): Path<SeasonId>,
) -> Result<Json<ProcessReport>, AppError> {
    let report = state.trade_service.process_ready_trades(season_id).await?;
    Ok(Json(report))
}
