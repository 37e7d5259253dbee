use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use crate::scoring::{FantasyMatchEvent, FantasyPlayerEvent};
use crate::season::{Match, MatchStatus};
use crate::shared::{LeagueId, MatchId, PlayerId, SquadId};

/// Share of a match's league points above which a squad dominated it
pub const MATCH_DOMINATION_THRESHOLD: f64 = 0.20;
/// Lower bar used by the season-wide ranking view
pub const OVERALL_DOMINATION_THRESHOLD: f64 = 0.10;
pub const MVP_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunningPoint {
    pub match_id: MatchId,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunningSeries {
    pub squad_id: SquadId,
    pub points: Vec<RunningPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Domination {
    pub squad_id: SquadId,
    pub match_id: MatchId,
    pub points: f64,
    pub share: f64,
}

/// Summary of a squad's `running_rank` values; rank 1 is the best
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankStats {
    pub squad_id: SquadId,
    pub highest: i32,
    pub lowest: i32,
    pub median: f64,
    pub mode: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MvpEntry {
    pub squad_id: SquadId,
    pub player_id: PlayerId,
    /// Set for match-level entries only
    pub match_id: Option<MatchId>,
    pub points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SquadStanding {
    pub squad_id: SquadId,
    pub name: String,
    pub total_points: f64,
    pub rank: i32,
}

/// Every derived view for one league, scoped to a phase or the whole season
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeagueStats {
    pub league_id: LeagueId,
    pub phase: Option<i32>,
    pub matches_counted: usize,
    pub running_totals: Vec<RunningSeries>,
    pub domination: Vec<Domination>,
    pub rank_stats: Vec<RankStats>,
    pub season_mvps: Vec<MvpEntry>,
    pub match_mvps: Vec<MvpEntry>,
}

/// Completed and no-result matches of the scope in chronological order
pub fn counted_matches(schedule: &[Match], phase: Option<i32>) -> Vec<MatchId> {
    schedule
        .iter()
        .filter(|m| matches!(m.status, MatchStatus::Completed | MatchStatus::NoResult))
        .filter(|m| phase.map_or(true, |p| m.phase == p))
        .map(|m| m.id)
        .collect()
}

pub fn build_league_stats(
    league_id: LeagueId,
    phase: Option<i32>,
    squad_ids: &[SquadId],
    match_ids: &[MatchId],
    match_events: &[FantasyMatchEvent],
    player_events: &[FantasyPlayerEvent],
) -> LeagueStats {
    let counted: HashSet<MatchId> = match_ids.iter().copied().collect();
    let match_events: Vec<&FantasyMatchEvent> = match_events
        .iter()
        .filter(|e| counted.contains(&e.match_id))
        .collect();
    let player_events: Vec<&FantasyPlayerEvent> = player_events
        .iter()
        .filter(|e| counted.contains(&e.match_id))
        .collect();

    let threshold = if phase.is_some() {
        MATCH_DOMINATION_THRESHOLD
    } else {
        OVERALL_DOMINATION_THRESHOLD
    };

    LeagueStats {
        league_id,
        phase,
        matches_counted: match_ids.len(),
        running_totals: running_totals(squad_ids, match_ids, &match_events),
        domination: domination(match_ids, &match_events, threshold),
        rank_stats: squad_ids
            .iter()
            .filter_map(|id| rank_stats(*id, &match_events))
            .collect(),
        season_mvps: season_mvps(&player_events),
        match_mvps: match_mvps(&player_events),
    }
}

/// One point per counted match; a squad without a row for a match carries
/// its previous total forward
pub fn running_totals(
    squad_ids: &[SquadId],
    match_ids: &[MatchId],
    match_events: &[&FantasyMatchEvent],
) -> Vec<RunningSeries> {
    let by_key: BTreeMap<(SquadId, MatchId), f64> = match_events
        .iter()
        .map(|e| ((e.squad_id, e.match_id), e.total_points))
        .collect();

    squad_ids
        .iter()
        .map(|squad_id| {
            let mut total = 0.0;
            let points = match_ids
                .iter()
                .map(|match_id| {
                    total += by_key.get(&(*squad_id, *match_id)).copied().unwrap_or(0.0);
                    RunningPoint {
                        match_id: *match_id,
                        total,
                    }
                })
                .collect();
            RunningSeries {
                squad_id: *squad_id,
                points,
            }
        })
        .collect()
}

/// Squads whose share of a match's league points exceeds `threshold`.
/// Matches where the league scored nothing positive are skipped.
pub fn domination(
    match_ids: &[MatchId],
    match_events: &[&FantasyMatchEvent],
    threshold: f64,
) -> Vec<Domination> {
    let mut result = Vec::new();
    for match_id in match_ids {
        let mut rows: Vec<&&FantasyMatchEvent> =
            match_events.iter().filter(|e| e.match_id == *match_id).collect();
        rows.sort_by_key(|e| e.squad_id);

        let league_total: f64 = rows.iter().map(|e| e.total_points).sum();
        if league_total <= 0.0 {
            continue;
        }
        result.extend(rows.iter().filter_map(|e| {
            let share = e.total_points / league_total;
            (share > threshold).then(|| Domination {
                squad_id: e.squad_id,
                match_id: *match_id,
                points: e.total_points,
                share,
            })
        }));
    }
    result
}

pub fn rank_stats(squad_id: SquadId, match_events: &[&FantasyMatchEvent]) -> Option<RankStats> {
    let mut ranks: Vec<i32> = match_events
        .iter()
        .filter(|e| e.squad_id == squad_id)
        .map(|e| e.running_rank)
        .collect();
    if ranks.is_empty() {
        return None;
    }
    ranks.sort_unstable();

    let mid = ranks.len() / 2;
    let median = if ranks.len() % 2 == 0 {
        f64::from(ranks[mid - 1] + ranks[mid]) / 2.0
    } else {
        f64::from(ranks[mid])
    };

    let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
    for rank in &ranks {
        *counts.entry(*rank).or_default() += 1;
    }
    // Ties go to the better (smaller) rank
    let mode = counts
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(rank, _)| *rank)
        .unwrap_or(ranks[0]);

    Some(RankStats {
        squad_id,
        highest: ranks[0],
        lowest: ranks[ranks.len() - 1],
        median,
        mode,
    })
}

fn mvp_order(a: &MvpEntry, b: &MvpEntry) -> Ordering {
    b.points
        .total_cmp(&a.points)
        .then_with(|| a.squad_id.cmp(&b.squad_id))
        .then_with(|| a.player_id.cmp(&b.player_id))
        .then_with(|| a.match_id.cmp(&b.match_id))
}

/// Players ranked by what they earned for the squad across the scope
pub fn season_mvps(player_events: &[&FantasyPlayerEvent]) -> Vec<MvpEntry> {
    let mut totals: BTreeMap<(SquadId, PlayerId), f64> = BTreeMap::new();
    for event in player_events {
        *totals.entry((event.squad_id, event.player_id)).or_default() += event.total_points();
    }

    let mut entries: Vec<MvpEntry> = totals
        .into_iter()
        .map(|((squad_id, player_id), points)| MvpEntry {
            squad_id,
            player_id,
            match_id: None,
            points,
        })
        .collect();
    entries.sort_by(mvp_order);
    entries.truncate(MVP_LIMIT);
    entries
}

/// Best single-match performances
pub fn match_mvps(player_events: &[&FantasyPlayerEvent]) -> Vec<MvpEntry> {
    let mut entries: Vec<MvpEntry> = player_events
        .iter()
        .map(|e| MvpEntry {
            squad_id: e.squad_id,
            player_id: e.player_id,
            match_id: Some(e.match_id),
            points: e.total_points(),
        })
        .collect();
    entries.sort_by(mvp_order);
    entries.truncate(MVP_LIMIT);
    entries
}
