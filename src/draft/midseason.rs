use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::debug;

use super::models::{DraftResultPayload, SquadDraftOutcome, StandingSnapshot};
use super::preferences::SquadPreferences;
use super::snake::{round_order, SnakeDraft, SnakePass, ROLE_PASSES};
use crate::league::FantasySquad;
use crate::season::PlayerRole;
use crate::shared::{AppError, LeagueId, PlayerId, SquadId, WindowId};

/// Everything a mid-season draft needs, already loaded
pub struct MidSeasonInput<'a> {
    pub window_id: WindowId,
    pub league_id: LeagueId,
    pub dry_run: bool,
    pub squads: &'a [FantasySquad],
    pub retained: &'a BTreeMap<SquadId, Vec<PlayerId>>,
    /// Window pool (or league override) before retention is removed
    pub pool: &'a [PlayerId],
    pub roles: &'a HashMap<PlayerId, PlayerRole>,
    pub preferences: &'a HashMap<SquadId, SquadPreferences>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MidSeasonPlan {
    pub snapshot: Vec<StandingSnapshot>,
    pub payload: DraftResultPayload,
    /// First-round order used by each role pass
    pub seed_orders: BTreeMap<PlayerRole, Vec<SquadId>>,
}

/// Standings seed: fewest points first, squad id on ties
pub fn standings_seed(squads: &[FantasySquad]) -> Vec<&FantasySquad> {
    let mut ordered: Vec<&FantasySquad> = squads.iter().collect();
    ordered.sort_by(|a, b| {
        a.total_points
            .total_cmp(&b.total_points)
            .then_with(|| a.id.cmp(&b.id))
    });
    ordered
}

fn role_counts<'a>(
    players: impl IntoIterator<Item = &'a PlayerId>,
    roles: &HashMap<PlayerId, PlayerRole>,
) -> HashMap<PlayerRole, usize> {
    let mut counts = HashMap::new();
    for player in players {
        if let Some(role) = roles.get(player) {
            *counts.entry(*role).or_insert(0) += 1;
        }
    }
    counts
}

/// Computes a retention-aware redraft without touching storage
pub fn plan(input: &MidSeasonInput<'_>) -> Result<MidSeasonPlan, AppError> {
    let seeded = standings_seed(input.squads);
    let seed: Vec<SquadId> = seeded.iter().map(|s| s.id).collect();
    let snapshot: Vec<StandingSnapshot> = seeded
        .iter()
        .enumerate()
        .map(|(index, squad)| StandingSnapshot {
            position: index + 1,
            squad_id: squad.id,
            total_points: squad.total_points,
        })
        .collect();

    let retained_all: HashSet<PlayerId> = input.retained.values().flatten().copied().collect();
    let mut seen = HashSet::new();
    let remaining: Vec<PlayerId> = input
        .pool
        .iter()
        .copied()
        .filter(|p| !retained_all.contains(p) && input.roles.contains_key(p) && seen.insert(*p))
        .collect();

    if remaining.is_empty() {
        return Err(AppError::PoolEmpty(format!(
            "No players left in window {} pool for league {} after retention",
            input.window_id, input.league_id
        )));
    }

    let no_retention = Vec::new();
    let retained_for = |squad_id: SquadId| input.retained.get(&squad_id).unwrap_or(&no_retention);
    let targets: HashMap<SquadId, usize> = input
        .squads
        .iter()
        .map(|s| (s.id, s.current_squad.len()))
        .collect();

    let mut draft = SnakeDraft::new(&seed);
    draft.exclude(retained_all.iter().copied());
    let mut seed_orders = BTreeMap::new();

    for (role, reverse_first_round) in ROLE_PASSES {
        let eligible: BTreeSet<PlayerId> = remaining
            .iter()
            .copied()
            .filter(|p| input.roles.get(p) == Some(&role))
            .collect();

        let quotas: HashMap<SquadId, usize> = input
            .squads
            .iter()
            .map(|squad| {
                let target = role_counts(&squad.current_squad, input.roles)
                    .get(&role)
                    .copied()
                    .unwrap_or(0);
                let kept = role_counts(retained_for(squad.id), input.roles)
                    .get(&role)
                    .copied()
                    .unwrap_or(0);
                (squad.id, target.saturating_sub(kept))
            })
            .collect();

        let preferences: HashMap<SquadId, Vec<PlayerId>> = input
            .preferences
            .iter()
            .map(|(squad_id, prefs)| {
                (*squad_id, prefs.by_role.get(&role).cloned().unwrap_or_default())
            })
            .collect();

        draft.run_pass(&SnakePass {
            seed: &seed,
            reverse_first_round,
            role: Some(role),
            eligible: &eligible,
            preferences: &preferences,
            quotas: Some(&quotas),
        });
        seed_orders.insert(role, round_order(&seed, 0, reverse_first_round));
    }

    // Flex pass fills whatever the role quotas left open
    let flex_quotas: HashMap<SquadId, usize> = input
        .squads
        .iter()
        .map(|squad| {
            let filled = retained_for(squad.id).len() + draft.drafted(squad.id).len();
            (squad.id, targets[&squad.id].saturating_sub(filled))
        })
        .collect();
    let flex_preferences: HashMap<SquadId, Vec<PlayerId>> = input
        .preferences
        .iter()
        .map(|(squad_id, prefs)| (*squad_id, prefs.combined.clone()))
        .collect();
    let everyone: BTreeSet<PlayerId> = remaining.iter().copied().collect();
    draft.run_pass(&SnakePass {
        seed: &seed,
        reverse_first_round: false,
        role: None,
        eligible: &everyone,
        preferences: &flex_preferences,
        quotas: Some(&flex_quotas),
    });

    let pool_size = remaining.len();
    let (drafted, picks) = draft.into_parts();
    let squads: Vec<SquadDraftOutcome> = seed
        .iter()
        .map(|squad_id| {
            let retained = retained_for(*squad_id).clone();
            let drafted = drafted.get(squad_id).cloned().unwrap_or_default();
            let new_roster = retained.iter().chain(drafted.iter()).copied().collect();
            SquadDraftOutcome {
                squad_id: *squad_id,
                target_roster_size: targets[squad_id],
                retained,
                drafted,
                new_roster,
            }
        })
        .collect();

    debug!(
        league_id = input.league_id,
        window_id = input.window_id,
        pool_size,
        picks = picks.len(),
        "Mid-season draft planned"
    );

    Ok(MidSeasonPlan {
        snapshot,
        payload: DraftResultPayload {
            window_id: input.window_id,
            league_id: input.league_id,
            dry_run: input.dry_run,
            seed_order: seed,
            squads,
            picks,
            pool_size,
        },
        seed_orders,
    })
}
