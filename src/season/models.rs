use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use crate::shared::{MatchId, PhaseId, PlayerId, SeasonId, TeamId};

/// Primary playing role of a cricketer
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum PlayerRole {
    Bat,
    Bowl,
    All,
    Wk,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum SeasonStatus {
    Upcoming,
    Ongoing,
    Completed,
}

/// League-wide fallback draft order stored on a season
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefaultDraftOrder {
    Flat(Vec<PlayerId>),
    ByRole(BTreeMap<PlayerRole, Vec<PlayerId>>),
}

impl DefaultDraftOrder {
    /// Seeded order for one role. Only a role-sharded order seeds a role;
    /// a flat list leaves the role to the average-points ranking.
    pub fn for_role(&self, role: PlayerRole) -> Option<&[PlayerId]> {
        match self {
            DefaultDraftOrder::Flat(_) => None,
            DefaultDraftOrder::ByRole(orders) => orders.get(&role).map(Vec::as_slice),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Season {
    pub id: SeasonId,
    pub name: String,
    pub year: i32,
    pub status: SeasonStatus,
    pub default_draft_order: Option<DefaultDraftOrder>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub short_name: String,
}

impl Team {
    /// Scorecards refer to teams by full or short name
    pub fn matches_name(&self, name: &str) -> bool {
        let name = name.trim();
        self.name.eq_ignore_ascii_case(name) || self.short_name.eq_ignore_ascii_case(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub role: PlayerRole,
}

/// Assignment of a player to a team for one season
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSeasonTeam {
    pub id: i64,
    pub player_id: PlayerId,
    pub team_id: TeamId,
    pub season_id: SeasonId,
    pub ruled_out: bool,
    pub replacement_id: Option<PlayerId>,
}

/// A player together with their assignment for one season
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonPlayer {
    pub assignment: PlayerSeasonTeam,
    pub player: Player,
}

impl SeasonPlayer {
    pub fn is_available(&self) -> bool {
        !self.assignment.ruled_out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum MatchStatus {
    Scheduled,
    Live,
    Completed,
    NoResult,
    Abandoned,
}

impl MatchStatus {
    /// `Scheduled → Live → (Completed | NoResult | Abandoned)`
    pub fn can_transition_to(self, next: MatchStatus) -> bool {
        use MatchStatus::*;
        matches!(
            (self, next),
            (Scheduled, Live) | (Live, Completed) | (Live, NoResult) | (Live, Abandoned)
        )
    }

    pub fn is_final(self) -> bool {
        matches!(
            self,
            MatchStatus::Completed | MatchStatus::NoResult | MatchStatus::Abandoned
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum MatchStage {
    League,
    Qualifier,
    Eliminator,
    Final,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TossDecision {
    Bat,
    Bowl,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InningsSummary {
    pub batting_team_id: TeamId,
    pub runs: i32,
    pub wickets: i32,
    pub overs: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub season_id: SeasonId,
    pub external_id: String,
    pub match_number: i32,
    pub phase: i32,
    pub stage: MatchStage,
    pub date: DateTime<Utc>,
    pub team1_id: TeamId,
    pub team2_id: TeamId,
    pub status: MatchStatus,
    pub toss_winner_id: Option<TeamId>,
    pub toss_decision: Option<TossDecision>,
    pub winner_id: Option<TeamId>,
    pub innings: Vec<InningsSummary>,
}

impl Match {
    /// Chronological key; equal dates are disambiguated by match number
    pub fn order_key(&self) -> (DateTime<Utc>, i32) {
        (self.date, self.match_number)
    }
}

/// Sorts matches by (date ascending, match number ascending)
pub fn sort_chronologically(matches: &mut [Match]) {
    matches.sort_by_key(|m| (m.order_key(), m.id));
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonPhase {
    pub id: PhaseId,
    pub season_id: SeasonId,
    pub phase: i32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}
