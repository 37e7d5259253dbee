use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::shared::AppState;
use crate::{draft, league, scoring, season, stats, trade};

/// Every HTTP route of the service
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        // Season catalog
        .route(
            "/seasons",
            post(season::handlers::create_season).get(season::handlers::list_seasons),
        )
        .route("/teams", post(season::handlers::create_team))
        .route("/players", post(season::handlers::create_player))
        .route(
            "/seasons/:season_id/players",
            post(season::handlers::register_player),
        )
        .route(
            "/seasons/:season_id/matches",
            post(season::handlers::create_match).get(season::handlers::list_matches),
        )
        .route(
            "/seasons/:season_id/phases",
            post(season::handlers::create_phase),
        )
        // Leagues and squads
        .route("/leagues", post(league::handlers::create_league))
        .route("/leagues/:league_id", get(league::handlers::get_league))
        .route(
            "/leagues/:league_id/squads",
            post(league::handlers::create_squad).get(league::handlers::list_squads),
        )
        .route(
            "/leagues/:league_id/preferences",
            put(league::handlers::submit_preseason_preferences),
        )
        .route("/boost-roles", post(league::handlers::create_boost_role))
        .route(
            "/squads/:squad_id/phases/:phase_id/boosts",
            put(league::handlers::set_phase_boost),
        )
        // Scoring
        .route(
            "/matches/external/:external_id/ingest",
            post(scoring::ingest_match),
        )
        .route("/matches/:match_id/scorecard", post(scoring::ingest_scorecard))
        .route("/matches/:match_id/status", put(scoring::set_match_status))
        .route("/leagues/:league_id/audit", get(scoring::audit_league))
        // Drafts
        .route("/leagues/:league_id/draft", post(draft::run_preseason_draft))
        .route("/windows", post(draft::create_window))
        .route("/windows/:window_id/pool", post(draft::compile_pool))
        .route(
            "/windows/:window_id/teams/:team_id",
            put(draft::set_team_remaining),
        )
        .route(
            "/windows/:window_id/preferences",
            put(draft::submit_preferences),
        )
        .route(
            "/windows/:window_id/leagues/:league_id/execute",
            post(draft::execute_window),
        )
        // Trades
        .route("/trades", post(trade::propose_trade))
        .route("/leagues/:league_id/trades", get(trade::list_trades))
        .route("/trades/:trade_id/decision", post(trade::decide_trade))
        .route("/trades/:trade_id/process", post(trade::process_trade))
        .route(
            "/seasons/:season_id/trades/process",
            post(trade::process_ready_trades),
        )
        // Read views
        .route("/leagues/:league_id/stats", get(stats::league_stats))
        .route("/leagues/:league_id/standings", get(stats::standings))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
