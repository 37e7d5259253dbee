// Read views over the scoring pipeline's derived rows

pub use cache::StatsCache;
pub use handlers::{league_stats, standings};
pub use service::StatsService;
pub use subscriber::StatsLeagueSubscriber;
pub use views::{
    Domination, LeagueStats, MvpEntry, RankStats, RunningPoint, RunningSeries, SquadStanding,
};

mod cache;
mod handlers;
mod service;
mod subscriber;
pub mod views;
