use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use uuid::Uuid;

use crate::league::{FantasyLeague, FantasySquad};
use crate::season::PlayerRole;
use crate::shared::{LeagueId, PhaseId, PlayerId, SeasonId, SquadId, TeamId, WindowId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum RetentionMode {
    Auto,
    ManualPhase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum WindowKind {
    MidSeason,
    Other,
}

/// A scheduled slot in which a mid-season draft may run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftWindow {
    pub id: WindowId,
    pub season_id: SeasonId,
    pub kind: WindowKind,
    pub sequence: i32,
    pub open_at: DateTime<Utc>,
    pub lock_at: DateTime<Utc>,
    pub retention_mode: RetentionMode,
    pub retention_phase_id: Option<PhaseId>,
    pub draft_pool: Option<Vec<PlayerId>>,
    pub pool_compiled_at: Option<DateTime<Utc>>,
    pub executed_at: Option<DateTime<Utc>>,
}

impl DraftWindow {
    pub fn is_executed(&self) -> bool {
        self.executed_at.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftWindowTeamEligibility {
    pub window_id: WindowId,
    pub team_id: TeamId,
    pub is_remaining: bool,
}

/// Position of a squad in the standings when a mid-season draft began
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandingSnapshot {
    pub position: usize,
    pub squad_id: SquadId,
    pub total_points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftPick {
    pub round: usize,
    pub pick: usize,
    pub squad_id: SquadId,
    pub player_id: PlayerId,
    /// `None` for picks made in the flex pass
    pub role: Option<PlayerRole>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SquadDraftOutcome {
    pub squad_id: SquadId,
    pub target_roster_size: usize,
    pub retained: Vec<PlayerId>,
    pub drafted: Vec<PlayerId>,
    pub new_roster: Vec<PlayerId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftResultPayload {
    pub window_id: WindowId,
    pub league_id: LeagueId,
    pub dry_run: bool,
    pub seed_order: Vec<SquadId>,
    pub squads: Vec<SquadDraftOutcome>,
    pub picks: Vec<DraftPick>,
    pub pool_size: usize,
}

/// Ledger row for a window execution; at most one live run per (window, league)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftWindowLeagueRun {
    pub id: Uuid,
    pub window_id: WindowId,
    pub league_id: LeagueId,
    pub dry_run: bool,
    pub executed_at: DateTime<Utc>,
    pub snapshot: Vec<StandingSnapshot>,
    pub result: DraftResultPayload,
}

/// Everything a draft writes, committed in one unit
#[derive(Debug, Clone)]
pub struct DraftCommit {
    pub league: FantasyLeague,
    pub squads: Vec<FantasySquad>,
    pub run: Option<DraftWindowLeagueRun>,
    /// Replace an existing live run instead of failing with `AlreadyRun`
    pub force_rerun: bool,
}
