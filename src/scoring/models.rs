use serde::{Deserialize, Serialize};

use super::rules::{PointsBreakdown, RawPerformance};
use crate::shared::{BoostRoleId, LeagueId, MatchId, PlayerId, SquadId, TeamId};

/// Per-player per-match performance row with its derived points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerMatchEvent {
    pub id: i64,
    pub player_id: PlayerId,
    pub match_id: MatchId,
    pub team_id: Option<TeamId>,
    pub raw: RawPerformance,
    pub points: PointsBreakdown,
}

/// Raw columns and freshly computed points for one (player, match)
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerMatchEventWrite {
    pub player_id: PlayerId,
    pub match_id: MatchId,
    pub team_id: Option<TeamId>,
    pub raw: RawPerformance,
    pub points: PointsBreakdown,
}

/// Per-squad view of a player's match, keyed by (squad, player event)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FantasyPlayerEvent {
    pub squad_id: SquadId,
    pub player_match_event_id: i64,
    pub player_id: PlayerId,
    pub match_id: MatchId,
    pub boost_role_id: Option<BoostRoleId>,
    pub base_points: i32,
    pub boost_points: f64,
}

impl FantasyPlayerEvent {
    pub fn total_points(&self) -> f64 {
        self.base_points as f64 + self.boost_points
    }
}

/// Per-squad per-match rollup, ranked within the league
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FantasyMatchEvent {
    pub squad_id: SquadId,
    pub match_id: MatchId,
    pub league_id: LeagueId,
    pub total_base_points: f64,
    pub total_boost_points: f64,
    pub total_points: f64,
    pub players_count: i32,
    pub match_rank: i32,
    pub running_rank: i32,
    pub running_total_points: f64,
}

/// Every derived row written for one ingested match, committed atomically
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchScoringBatch {
    pub match_id: MatchId,
    pub player_events: Vec<FantasyPlayerEvent>,
    pub match_events: Vec<FantasyMatchEvent>,
    pub squad_totals: Vec<(SquadId, f64)>,
}
