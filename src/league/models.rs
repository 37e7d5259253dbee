use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum_macros::{Display, EnumString};

use crate::scoring::BoostMultipliers;
use crate::season::PlayerRole;
use crate::shared::{BoostRoleId, LeagueId, PhaseId, PlayerId, SeasonId, SquadId};

/// A private fantasy league inside one season
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FantasyLeague {
    pub id: LeagueId,
    pub season_id: SeasonId,
    pub name: String,
    pub max_squads: i32,
    /// Persisted pre-season snake seed; generated on first draft when absent
    pub snake_draft_seed_order: Option<Vec<SquadId>>,
    /// First-round order actually used for each role by the latest draft
    pub draft_seed_orders: BTreeMap<PlayerRole, Vec<SquadId>>,
    pub draft_completed: bool,
    /// League-specific replacement for a window's compiled pool
    pub mid_season_draft_pool: Option<Vec<PlayerId>>,
}

/// Boost role declared for one player of a squad
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreAssignment {
    pub boost_role_id: BoostRoleId,
    pub player_id: PlayerId,
}

/// Finds the boost role a core squad assigns to a player
pub fn boost_role_for(assignments: &[CoreAssignment], player_id: PlayerId) -> Option<BoostRoleId> {
    assignments
        .iter()
        .find(|a| a.player_id == player_id)
        .map(|a| a.boost_role_id)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FantasySquad {
    pub id: SquadId,
    pub league_id: LeagueId,
    pub user_id: i64,
    pub name: String,
    pub current_squad: Vec<PlayerId>,
    pub current_core_squad: Vec<CoreAssignment>,
    pub future_core_squad: Vec<CoreAssignment>,
    /// Cache of the sum of the squad's match totals
    pub total_points: f64,
    /// Incremented on every roster write; stale writes are rejected
    pub version: i64,
}

impl FantasySquad {
    pub fn owns(&self, player_id: PlayerId) -> bool {
        self.current_squad.contains(&player_id)
    }
}

/// Named multiplier bundle assignable to players of the listed roles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FantasyBoostRole {
    pub id: BoostRoleId,
    pub label: String,
    pub multipliers: BoostMultipliers,
    pub allowed_player_roles: Vec<PlayerRole>,
}

impl FantasyBoostRole {
    pub const CAPTAIN: &'static str = "Captain";
    pub const VICE_CAPTAIN: &'static str = "Vice Captain";

    pub fn accepts(&self, role: PlayerRole) -> bool {
        self.allowed_player_roles.contains(&role)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum DraftType {
    #[strum(serialize = "Pre-Season")]
    #[serde(rename = "Pre-Season")]
    PreSeason,
    #[strum(serialize = "Mid-Season")]
    #[serde(rename = "Mid-Season")]
    MidSeason,
}

/// A squad's ordered draft preferences, optionally scoped to one role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FantasyDraft {
    pub id: i64,
    pub league_id: LeagueId,
    pub squad_id: SquadId,
    pub draft_type: DraftType,
    pub role: Option<PlayerRole>,
    pub order: Vec<PlayerId>,
}

/// Boost assignments a squad declared for one phase of the season
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SquadPhaseBoost {
    pub squad_id: SquadId,
    pub phase_id: PhaseId,
    pub assignments: Vec<CoreAssignment>,
}

impl SquadPhaseBoost {
    /// Assigned players in insertion order, without repeats
    pub fn retained_players(&self) -> Vec<PlayerId> {
        let mut seen = std::collections::HashSet::new();
        self.assignments
            .iter()
            .map(|a| a.player_id)
            .filter(|p| seen.insert(*p))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retained_players_keep_insertion_order_without_duplicates() {
        let boost = SquadPhaseBoost {
            squad_id: 1,
            phase_id: 2,
            assignments: vec![
                CoreAssignment { boost_role_id: 1, player_id: 30 },
                CoreAssignment { boost_role_id: 2, player_id: 10 },
                CoreAssignment { boost_role_id: 3, player_id: 30 },
                CoreAssignment { boost_role_id: 4, player_id: 20 },
            ],
        };
        assert_eq!(boost.retained_players(), vec![30, 10, 20]);
    }

    #[test]
    fn draft_type_uses_hyphenated_names() {
        assert_eq!(DraftType::PreSeason.to_string(), "Pre-Season");
        assert_eq!("Mid-Season".parse::<DraftType>().unwrap(), DraftType::MidSeason);
    }
}
