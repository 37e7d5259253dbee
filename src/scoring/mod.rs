// Player points, boosts and the derived fantasy rows built from them

pub use audit::{ScoringAuditor, Violation};
pub use boost::{boost_points, BoostMultipliers};
pub use handlers::{audit_league, ingest_match, ingest_scorecard, set_match_status};
pub use models::{
    FantasyMatchEvent, FantasyPlayerEvent, MatchScoringBatch, PlayerMatchEvent,
    PlayerMatchEventWrite,
};
pub use pipeline::{IngestSummary, ScoringPipeline};
pub use ranking::{rank_squads, stable_sum, RankingConfig};
pub use repository::ScoringRepository;
pub use rules::{components, score, PointsBreakdown, RawPerformance, ScoreComponents};
pub use scorecard::{
    balls_from_overs, BattingEntry, BowlingEntry, FieldingEntry, Innings, Scorecard, SkipReason,
    SkippedRow, TeamSheet,
};

pub mod audit;
mod boost;
mod handlers;
pub mod models;
mod pipeline;
pub mod ranking;
pub mod repository;
pub mod rules;
pub mod scorecard;
