pub mod handlers;
pub mod models;
pub mod repository;

pub use models::{
    sort_chronologically, DefaultDraftOrder, InningsSummary, Match, MatchStage, MatchStatus,
    Player, PlayerRole, PlayerSeasonTeam, Season, SeasonPhase, SeasonPlayer, SeasonStatus, Team,
    TossDecision,
};
pub use repository::CatalogRepository;
