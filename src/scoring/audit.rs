use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::boost::boost_points;
use super::models::{FantasyMatchEvent, FantasyPlayerEvent, PlayerMatchEvent};
use super::ranking::stable_sum;
use super::repository::ScoringRepository;
use super::rules::{components, score};
use crate::league::{FantasyBoostRole, FantasySquad, LeagueRepository};
use crate::season::{CatalogRepository, Match};
use crate::shared::{AppError, BoostRoleId, LeagueId, MatchId, SquadId};

const TOLERANCE: f64 = 1e-6;

/// A stored row that disagrees with the scoring rules
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    PlayerPoints { player_match_event_id: i64 },
    BoostPoints { squad_id: SquadId, player_match_event_id: i64 },
    MatchRollup { squad_id: SquadId, match_id: MatchId },
    SquadTotal { squad_id: SquadId },
    MatchRank { match_id: MatchId },
    RunningTotalDecrease { squad_id: SquadId, match_id: MatchId },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::PlayerPoints { player_match_event_id } => {
                write!(f, "player event {} points differ from its raw stats", player_match_event_id)
            }
            Violation::BoostPoints { squad_id, player_match_event_id } => write!(
                f,
                "squad {} boost on player event {} is stale",
                squad_id, player_match_event_id
            ),
            Violation::MatchRollup { squad_id, match_id } => {
                write!(f, "squad {} rollup for match {} is inconsistent", squad_id, match_id)
            }
            Violation::SquadTotal { squad_id } => {
                write!(f, "squad {} total differs from its match totals", squad_id)
            }
            Violation::MatchRank { match_id } => {
                write!(f, "match ranks for match {} are not a strict ordering", match_id)
            }
            Violation::RunningTotalDecrease { squad_id, match_id } => write!(
                f,
                "squad {} running total drops at match {}",
                squad_id, match_id
            ),
        }
    }
}

/// Folds violations into the error the pipeline aborts with
pub fn into_result(violations: Vec<Violation>) -> Result<(), AppError> {
    if violations.is_empty() {
        return Ok(());
    }
    let detail: Vec<String> = violations.iter().map(ToString::to_string).collect();
    Err(AppError::InvariantViolation(detail.join("; ")))
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= TOLERANCE
}

pub fn check_player_events(events: &[PlayerMatchEvent]) -> Vec<Violation> {
    events
        .iter()
        .filter(|e| e.points != score(&e.raw))
        .map(|e| Violation::PlayerPoints {
            player_match_event_id: e.id,
        })
        .collect()
}

pub fn check_boosts(
    fantasy_events: &[FantasyPlayerEvent],
    player_events: &HashMap<i64, PlayerMatchEvent>,
    roles: &HashMap<BoostRoleId, FantasyBoostRole>,
) -> Vec<Violation> {
    fantasy_events
        .iter()
        .filter(|fpe| {
            let Some(pme) = player_events.get(&fpe.player_match_event_id) else {
                return true;
            };
            let expected = match fpe.boost_role_id.and_then(|id| roles.get(&id)) {
                Some(role) => boost_points(&components(&pme.raw), &role.multipliers),
                None => 0.0,
            };
            fpe.base_points != pme.points.total || !close(fpe.boost_points, expected)
        })
        .map(|fpe| Violation::BoostPoints {
            squad_id: fpe.squad_id,
            player_match_event_id: fpe.player_match_event_id,
        })
        .collect()
}

pub fn check_rollups(
    match_events: &[FantasyMatchEvent],
    fantasy_events: &[FantasyPlayerEvent],
) -> Vec<Violation> {
    let mut grouped: BTreeMap<(SquadId, MatchId), Vec<&FantasyPlayerEvent>> = BTreeMap::new();
    for fpe in fantasy_events {
        grouped
            .entry((fpe.squad_id, fpe.match_id))
            .or_default()
            .push(fpe);
    }

    match_events
        .iter()
        .filter(|fme| {
            let rows = grouped
                .get(&(fme.squad_id, fme.match_id))
                .map(Vec::as_slice)
                .unwrap_or_default();
            let base: f64 = rows.iter().map(|r| r.base_points as f64).sum();
            let boost: f64 = rows.iter().map(|r| r.boost_points).sum();
            !close(fme.total_points, fme.total_base_points + fme.total_boost_points)
                || !close(fme.total_base_points, base)
                || !close(fme.total_boost_points, boost)
                || fme.players_count as usize != rows.len()
        })
        .map(|fme| Violation::MatchRollup {
            squad_id: fme.squad_id,
            match_id: fme.match_id,
        })
        .collect()
}

pub fn check_squad_totals(
    squads: &[FantasySquad],
    match_events: &[FantasyMatchEvent],
) -> Vec<Violation> {
    squads
        .iter()
        .filter(|squad| {
            let totals: Vec<f64> = match_events
                .iter()
                .filter(|e| e.squad_id == squad.id)
                .map(|e| e.total_points)
                .collect();
            !close(squad.total_points, stable_sum(&totals))
        })
        .map(|squad| Violation::SquadTotal { squad_id: squad.id })
        .collect()
}

/// Match ranks of one league must be 1..n, descending in points, ties by id
pub fn check_match_ranks(match_events: &[FantasyMatchEvent]) -> Vec<Violation> {
    let mut by_match: BTreeMap<MatchId, Vec<&FantasyMatchEvent>> = BTreeMap::new();
    for fme in match_events {
        by_match.entry(fme.match_id).or_default().push(fme);
    }

    by_match
        .into_iter()
        .filter(|(_, rows)| {
            let mut rows = rows.clone();
            rows.sort_by_key(|r| r.match_rank);
            let permutation = rows
                .iter()
                .enumerate()
                .all(|(i, r)| r.match_rank == i as i32 + 1);
            let ordered = rows.windows(2).all(|pair| {
                pair[0].total_points > pair[1].total_points
                    || (pair[0].total_points == pair[1].total_points
                        && pair[0].squad_id < pair[1].squad_id)
            });
            !(permutation && ordered)
        })
        .map(|(match_id, _)| Violation::MatchRank { match_id })
        .collect()
}

/// Running totals per squad must not decrease along the schedule
pub fn check_running_totals(
    match_events: &[FantasyMatchEvent],
    schedule: &[Match],
) -> Vec<Violation> {
    let position: HashMap<MatchId, usize> = schedule
        .iter()
        .enumerate()
        .map(|(i, m)| (m.id, i))
        .collect();

    let mut by_squad: BTreeMap<SquadId, Vec<&FantasyMatchEvent>> = BTreeMap::new();
    for fme in match_events {
        by_squad.entry(fme.squad_id).or_default().push(fme);
    }

    let mut violations = Vec::new();
    for (squad_id, mut rows) in by_squad {
        rows.sort_by_key(|r| position.get(&r.match_id).copied().unwrap_or(usize::MAX));
        for pair in rows.windows(2) {
            if pair[1].running_total_points + TOLERANCE < pair[0].running_total_points {
                violations.push(Violation::RunningTotalDecrease {
                    squad_id,
                    match_id: pair[1].match_id,
                });
            }
        }
    }
    violations
}

/// Recomputes the stored invariants of one league from its rows
pub struct ScoringAuditor {
    catalog: Arc<dyn CatalogRepository>,
    leagues: Arc<dyn LeagueRepository>,
    scoring: Arc<dyn ScoringRepository>,
}

impl ScoringAuditor {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        leagues: Arc<dyn LeagueRepository>,
        scoring: Arc<dyn ScoringRepository>,
    ) -> Self {
        Self {
            catalog,
            leagues,
            scoring,
        }
    }

    #[instrument(skip(self))]
    pub async fn audit_league(&self, league_id: LeagueId) -> Result<Vec<Violation>, AppError> {
        let league = self
            .leagues
            .get_league(league_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("League {} not found", league_id)))?;

        let squads = self.leagues.list_squads(league_id).await?;
        let squad_ids: Vec<SquadId> = squads.iter().map(|s| s.id).collect();
        let schedule = self.catalog.list_matches(league.season_id).await?;
        let match_ids: Vec<MatchId> = schedule.iter().map(|m| m.id).collect();

        let player_events = self
            .scoring
            .list_player_match_events_for_matches(&match_ids)
            .await?;
        let fantasy_events = self
            .scoring
            .list_fantasy_player_events(&squad_ids, None)
            .await?;
        let match_events = self.scoring.list_fantasy_match_events(&squad_ids).await?;
        let roles: HashMap<BoostRoleId, FantasyBoostRole> = self
            .leagues
            .list_boost_roles()
            .await?
            .into_iter()
            .map(|r| (r.id, r))
            .collect();

        let mut violations = check_player_events(&player_events);
        let player_events: HashMap<i64, PlayerMatchEvent> =
            player_events.into_iter().map(|e| (e.id, e)).collect();
        violations.extend(check_boosts(&fantasy_events, &player_events, &roles));
        violations.extend(check_rollups(&match_events, &fantasy_events));
        violations.extend(check_squad_totals(&squads, &match_events));
        violations.extend(check_match_ranks(&match_events));
        violations.extend(check_running_totals(&match_events, &schedule));

        if violations.is_empty() {
            info!(league_id, "League audit passed");
        } else {
            warn!(league_id, violation_count = violations.len(), "League audit found violations");
        }
        Ok(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fme(squad_id: SquadId, match_id: MatchId, total: f64, rank: i32) -> FantasyMatchEvent {
        FantasyMatchEvent {
            squad_id,
            match_id,
            league_id: 1,
            total_base_points: total,
            total_boost_points: 0.0,
            total_points: total,
            players_count: 0,
            match_rank: rank,
            running_rank: rank,
            running_total_points: total,
        }
    }

    #[test]
    fn accepts_ranks_with_id_tiebreak() {
        let rows = vec![fme(2, 10, 50.0, 2), fme(1, 10, 50.0, 1), fme(3, 10, 80.0, 3)];
        // Squad 3 has the most points but sits at rank 3
        assert_eq!(check_match_ranks(&rows), vec![Violation::MatchRank { match_id: 10 }]);

        let fixed = vec![fme(2, 10, 50.0, 3), fme(1, 10, 50.0, 2), fme(3, 10, 80.0, 1)];
        assert!(check_match_ranks(&fixed).is_empty());
    }

    #[test]
    fn rollup_must_match_player_rows() {
        let rows = vec![FantasyPlayerEvent {
            squad_id: 1,
            player_match_event_id: 7,
            player_id: 4,
            match_id: 10,
            boost_role_id: None,
            base_points: 30,
            boost_points: 0.0,
        }];
        let mut rollup = fme(1, 10, 30.0, 1);
        rollup.players_count = 1;
        assert!(check_rollups(&[rollup.clone()], &rows).is_empty());

        rollup.total_base_points = 31.0;
        rollup.total_points = 31.0;
        assert_eq!(check_rollups(&[rollup], &rows).len(), 1);
    }

    #[test]
    fn violations_surface_as_invariant_error() {
        let result = into_result(vec![Violation::SquadTotal { squad_id: 4 }]);
        assert!(matches!(result, Err(AppError::InvariantViolation(msg)) if msg.contains("squad 4")));
        assert!(into_result(vec![]).is_ok());
    }
}
