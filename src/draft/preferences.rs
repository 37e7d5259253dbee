use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::league::FantasyDraft;
use crate::scoring::PlayerMatchEvent;
use crate::season::{DefaultDraftOrder, Player, PlayerRole};
use crate::shared::{PlayerId, SquadId};

/// Deduplicates a submitted list, drops players outside `eligible`, then
/// appends the league default order so every eligible player is reachable.
pub fn normalize(
    submitted: &[PlayerId],
    eligible: &BTreeSet<PlayerId>,
    default_order: &[PlayerId],
) -> Vec<PlayerId> {
    let mut seen = HashSet::new();
    submitted
        .iter()
        .chain(default_order.iter())
        .filter(|p| eligible.contains(*p) && seen.insert(**p))
        .copied()
        .collect()
}

/// Mean base points per player over the given events
pub fn average_points(events: &[PlayerMatchEvent]) -> HashMap<PlayerId, f64> {
    let mut sums: HashMap<PlayerId, (i64, i64)> = HashMap::new();
    for event in events {
        let entry = sums.entry(event.player_id).or_default();
        entry.0 += event.points.total as i64;
        entry.1 += 1;
    }
    sums.into_iter()
        .map(|(player_id, (total, count))| (player_id, total as f64 / count as f64))
        .collect()
}

/// Players ranked by average points descending, then name, then id
pub fn rank_by_average(players: &[&Player], averages: &HashMap<PlayerId, f64>) -> Vec<PlayerId> {
    let mut ranked: Vec<&Player> = players.to_vec();
    ranked.sort_by(|a, b| {
        let a_avg = averages.get(&a.id).copied().unwrap_or_default();
        let b_avg = averages.get(&b.id).copied().unwrap_or_default();
        b_avg
            .total_cmp(&a_avg)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.id.cmp(&b.id))
    });
    ranked.into_iter().map(|p| p.id).collect()
}

/// League-wide fallback order for one role: the season's role-sharded order
/// first, then every other player of the role by average points. A flat
/// season order is ignored here.
pub fn default_order_for_role(
    role: PlayerRole,
    players: &[&Player],
    season_default: Option<&DefaultDraftOrder>,
    averages: &HashMap<PlayerId, f64>,
) -> Vec<PlayerId> {
    let of_role: Vec<&Player> = players.iter().copied().filter(|p| p.role == role).collect();
    let role_ids: BTreeSet<PlayerId> = of_role.iter().map(|p| p.id).collect();

    let seeded = season_default
        .and_then(|order| order.for_role(role))
        .unwrap_or_default();
    normalize(seeded, &role_ids, &rank_by_average(&of_role, averages))
}

/// Preference lists of one squad for a draft
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SquadPreferences {
    pub by_role: BTreeMap<PlayerRole, Vec<PlayerId>>,
    /// Every role's list in draft order, used once role quotas are spent
    pub combined: Vec<PlayerId>,
}

/// Resolves each squad's per-role lists from its stored drafts:
/// the row for the role, else the legacy flat row filtered to the role,
/// else nothing. The role default order is appended in every case.
pub fn squad_preferences(
    squad_ids: &[SquadId],
    drafts: &[FantasyDraft],
    roles: &HashMap<PlayerId, PlayerRole>,
    eligible_by_role: &BTreeMap<PlayerRole, BTreeSet<PlayerId>>,
    defaults: &BTreeMap<PlayerRole, Vec<PlayerId>>,
    role_order: &[PlayerRole],
) -> HashMap<SquadId, SquadPreferences> {
    let empty = BTreeSet::new();

    squad_ids
        .iter()
        .map(|squad_id| {
            let rows: Vec<&FantasyDraft> =
                drafts.iter().filter(|d| d.squad_id == *squad_id).collect();
            let flat = rows.iter().find(|d| d.role.is_none()).map(|d| d.order.as_slice());

            let mut preferences = SquadPreferences::default();
            for role in role_order {
                let submitted: Vec<PlayerId> =
                    match rows.iter().find(|d| d.role == Some(*role)) {
                        Some(row) => row.order.clone(),
                        None => flat
                            .unwrap_or_default()
                            .iter()
                            .copied()
                            .filter(|p| roles.get(p) == Some(role))
                            .collect(),
                    };
                let eligible = eligible_by_role.get(role).unwrap_or(&empty);
                let default_order = defaults.get(role).map(Vec::as_slice).unwrap_or_default();
                let list = normalize(&submitted, eligible, default_order);

                preferences.combined.extend(list.iter().copied());
                preferences.by_role.insert(*role, list);
            }

            // A flat list keeps its cross-role order for the flex pass
            if let Some(flat) = flat {
                let all: BTreeSet<PlayerId> = eligible_by_role.values().flatten().copied().collect();
                let tail = std::mem::take(&mut preferences.combined);
                preferences.combined = normalize(flat, &all, &tail);
            }

            (*squad_id, preferences)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::PointsBreakdown;

    fn player(id: PlayerId, name: &str, role: PlayerRole) -> Player {
        Player { id, name: name.into(), role }
    }

    fn event(player_id: PlayerId, total: i32) -> PlayerMatchEvent {
        PlayerMatchEvent {
            id: 0,
            player_id,
            match_id: 1,
            team_id: None,
            raw: Default::default(),
            points: PointsBreakdown { batting: total, bowling: 0, fielding: 0, other: 0, total },
        }
    }

    #[test]
    fn normalize_dedupes_filters_and_appends_defaults() {
        let eligible: BTreeSet<PlayerId> = [1, 2, 3, 4].into();
        let list = normalize(&[3, 9, 3, 1], &eligible, &[4, 1, 2]);
        assert_eq!(list, vec![3, 1, 4, 2]);
    }

    #[test]
    fn default_order_prefers_average_then_name() {
        let players = [
            player(1, "Gill", PlayerRole::Bat),
            player(2, "Abhishek", PlayerRole::Bat),
            player(3, "Kohli", PlayerRole::Bat),
            player(4, "Bumrah", PlayerRole::Bowl),
        ];
        let refs: Vec<&Player> = players.iter().collect();
        let averages = average_points(&[event(3, 80), event(3, 40), event(1, 10)]);

        let order = default_order_for_role(PlayerRole::Bat, &refs, None, &averages);
        // Kohli averages 60, Gill 10; Abhishek has no events
        assert_eq!(order, vec![3, 1, 2]);
    }

    #[test]
    fn seeded_season_order_leads() {
        let players = [player(1, "A", PlayerRole::Wk), player(2, "B", PlayerRole::Wk)];
        let refs: Vec<&Player> = players.iter().collect();
        let seeded = DefaultDraftOrder::ByRole(BTreeMap::from([(PlayerRole::Wk, vec![2])]));

        let order = default_order_for_role(PlayerRole::Wk, &refs, Some(&seeded), &HashMap::new());
        assert_eq!(order, vec![2, 1]);
    }

    #[test]
    fn flat_season_order_defers_to_averages() {
        let players = [player(1, "Rahul", PlayerRole::Bat), player(2, "Pant", PlayerRole::Bat)];
        let refs: Vec<&Player> = players.iter().collect();
        let averages = average_points(&[event(1, 90), event(2, 10)]);
        let flat = DefaultDraftOrder::Flat(vec![2, 1]);

        let order = default_order_for_role(PlayerRole::Bat, &refs, Some(&flat), &averages);
        assert_eq!(order, vec![1, 2]);
    }

    #[test]
    fn legacy_flat_list_is_split_by_role() {
        let roles = HashMap::from([(1, PlayerRole::Bat), (2, PlayerRole::Bowl), (3, PlayerRole::Bat)]);
        let eligible = BTreeMap::from([
            (PlayerRole::Bat, BTreeSet::from([1, 3])),
            (PlayerRole::Bowl, BTreeSet::from([2])),
        ]);
        let defaults = BTreeMap::from([(PlayerRole::Bat, vec![1, 3]), (PlayerRole::Bowl, vec![2])]);
        let drafts = vec![FantasyDraft {
            id: 1,
            league_id: 1,
            squad_id: 7,
            draft_type: crate::league::DraftType::MidSeason,
            role: None,
            order: vec![2, 3],
        }];

        let prefs = squad_preferences(
            &[7],
            &drafts,
            &roles,
            &eligible,
            &defaults,
            &[PlayerRole::Bat, PlayerRole::Bowl],
        );
        let squad = &prefs[&7];
        assert_eq!(squad.by_role[&PlayerRole::Bat], vec![3, 1]);
        assert_eq!(squad.by_role[&PlayerRole::Bowl], vec![2]);
        assert_eq!(squad.combined, vec![2, 3, 1]);
    }
}
