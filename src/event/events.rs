use serde::{Deserialize, Serialize};

use crate::shared::{LeagueId, MatchId, TradeId, WindowId};

/// Facts published by the core after a unit of work commits.
///
/// Every event is scoped to one fantasy league so read views can be
/// invalidated or refreshed league by league.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LeagueEvent {
    /// Derived scoring rows for a match were rewritten
    MatchScored { match_id: MatchId },

    /// A match in the league's season moved from Live to Completed
    MatchCompleted { match_id: MatchId },

    /// A draft replaced squad rosters (pre-season when `window_id` is None)
    DraftCompleted { window_id: Option<WindowId> },

    /// A trade was processed and both rosters changed
    TradeClosed { trade_id: TradeId },

    /// Cached standings for the league were recomputed
    StandingsRefreshed,
}

impl LeagueEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            LeagueEvent::MatchScored { .. } => "match_scored",
            LeagueEvent::MatchCompleted { .. } => "match_completed",
            LeagueEvent::DraftCompleted { .. } => "draft_completed",
            LeagueEvent::TradeClosed { .. } => "trade_closed",
            LeagueEvent::StandingsRefreshed => "standings_refreshed",
        }
    }
}

/// An event together with the league it belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct LeagueEnvelope {
    pub league_id: LeagueId,
    pub event: LeagueEvent,
}
