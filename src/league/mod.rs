pub mod handlers;
pub mod models;
pub mod repository;

pub use models::{
    boost_role_for, CoreAssignment, DraftType, FantasyBoostRole, FantasyDraft, FantasyLeague,
    FantasySquad, SquadPhaseBoost,
};
pub use repository::LeagueRepository;
