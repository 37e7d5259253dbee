use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::draft::{DraftWindow, DraftWindowLeagueRun, DraftWindowTeamEligibility};
use crate::league::{FantasyBoostRole, FantasyDraft, FantasyLeague, FantasySquad, SquadPhaseBoost};
use crate::scoring::{FantasyMatchEvent, FantasyPlayerEvent, PlayerMatchEvent};
use crate::season::{Match, Player, PlayerSeasonTeam, Season, SeasonPhase, Team};
use crate::shared::{
    BoostRoleId, LeagueId, MatchId, PhaseId, PlayerId, SeasonId, SquadId, TeamId, TradeId,
    WindowId,
};
use crate::trade::FantasyTrade;

/// Every table of the in-memory store. Ordered maps keep iteration
/// deterministic so derived state is reproducible.
#[derive(Debug, Default)]
pub struct StoreState {
    next_id: i64,
    pub seasons: BTreeMap<SeasonId, Season>,
    pub teams: BTreeMap<TeamId, Team>,
    pub players: BTreeMap<PlayerId, Player>,
    pub player_season_teams: BTreeMap<i64, PlayerSeasonTeam>,
    pub matches: BTreeMap<MatchId, Match>,
    pub phases: BTreeMap<PhaseId, SeasonPhase>,
    pub leagues: BTreeMap<LeagueId, FantasyLeague>,
    pub squads: BTreeMap<SquadId, FantasySquad>,
    pub draft_preferences: BTreeMap<i64, FantasyDraft>,
    pub boost_roles: BTreeMap<BoostRoleId, FantasyBoostRole>,
    pub phase_boosts: BTreeMap<(SquadId, PhaseId), SquadPhaseBoost>,
    pub player_match_events: BTreeMap<i64, PlayerMatchEvent>,
    pub fantasy_player_events: BTreeMap<(SquadId, i64), FantasyPlayerEvent>,
    pub fantasy_match_events: BTreeMap<(SquadId, MatchId), FantasyMatchEvent>,
    pub windows: BTreeMap<WindowId, DraftWindow>,
    pub team_eligibility: BTreeMap<(WindowId, TeamId), DraftWindowTeamEligibility>,
    pub draft_runs: BTreeMap<Uuid, DraftWindowLeagueRun>,
    pub trades: BTreeMap<TradeId, FantasyTrade>,
}

impl StoreState {
    /// Ids are shared across tables, like a single database sequence
    pub fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    /// Teams that have at least one player registered for the season
    pub fn season_team_ids(&self, season_id: SeasonId) -> BTreeSet<TeamId> {
        self.player_season_teams
            .values()
            .filter(|pst| pst.season_id == season_id)
            .map(|pst| pst.team_id)
            .chain(
                self.matches
                    .values()
                    .filter(|m| m.season_id == season_id)
                    .flat_map(|m| [m.team1_id, m.team2_id]),
            )
            .collect()
    }
}

/// In-memory implementation of every repository trait for development and
/// testing. A composite write holds the single write guard for its whole
/// duration, which makes it atomic with respect to every other operation.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().await
    }

    pub(crate) async fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().await
    }
}
