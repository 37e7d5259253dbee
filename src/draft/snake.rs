use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::debug;

use super::models::DraftPick;
use crate::season::PlayerRole;
use crate::shared::{PlayerId, SquadId};

/// Role passes in draft order with their reversed-first-round flag
pub const ROLE_PASSES: [(PlayerRole, bool); 4] = [
    (PlayerRole::Bat, false),
    (PlayerRole::Wk, true),
    (PlayerRole::All, false),
    (PlayerRole::Bowl, true),
];

/// Squad order for one round: every round reverses the one before it
pub fn round_order(seed: &[SquadId], round: usize, reverse_first_round: bool) -> Vec<SquadId> {
    let reversed = (round % 2 == 1) != reverse_first_round;
    if reversed {
        seed.iter().rev().copied().collect()
    } else {
        seed.to_vec()
    }
}

/// One traversal of the snake over an eligible set
pub struct SnakePass<'a> {
    pub seed: &'a [SquadId],
    pub reverse_first_round: bool,
    /// Recorded on each pick; `None` marks the flex pass
    pub role: Option<PlayerRole>,
    pub eligible: &'a BTreeSet<PlayerId>,
    pub preferences: &'a HashMap<SquadId, Vec<PlayerId>>,
    /// Picks each squad may still make in this pass; unlimited when absent
    pub quotas: Option<&'a HashMap<SquadId, usize>>,
}

/// Snake draft state shared by consecutive passes
#[derive(Debug, Default)]
pub struct SnakeDraft {
    taken: HashSet<PlayerId>,
    picks: Vec<DraftPick>,
    drafted: BTreeMap<SquadId, Vec<PlayerId>>,
}

impl SnakeDraft {
    pub fn new(squads: &[SquadId]) -> Self {
        Self {
            drafted: squads.iter().map(|id| (*id, Vec::new())).collect(),
            ..Self::default()
        }
    }

    /// Marks players as unavailable without assigning them
    pub fn exclude(&mut self, players: impl IntoIterator<Item = PlayerId>) {
        self.taken.extend(players);
    }

    /// Runs rounds until the eligible set is exhausted or a full round makes
    /// no pick. Returns the number of picks made.
    pub fn run_pass(&mut self, pass: &SnakePass<'_>) -> usize {
        let mut remaining: HashMap<SquadId, usize> =
            pass.quotas.cloned().unwrap_or_default();
        let mut made = 0;
        let mut round = 0;

        loop {
            if pass.eligible.iter().all(|p| self.taken.contains(p)) {
                break;
            }

            let mut round_picks = 0;
            for squad_id in round_order(pass.seed, round, pass.reverse_first_round) {
                if pass.quotas.is_some() && remaining.get(&squad_id).copied().unwrap_or(0) == 0 {
                    continue;
                }

                let choice = pass.preferences.get(&squad_id).and_then(|prefs| {
                    prefs
                        .iter()
                        .find(|p| pass.eligible.contains(*p) && !self.taken.contains(*p))
                        .copied()
                });
                let Some(player_id) = choice else {
                    continue;
                };

                self.taken.insert(player_id);
                self.drafted.entry(squad_id).or_default().push(player_id);
                self.picks.push(DraftPick {
                    round: round + 1,
                    pick: self.picks.len() + 1,
                    squad_id,
                    player_id,
                    role: pass.role,
                });
                if let Some(quota) = remaining.get_mut(&squad_id) {
                    *quota -= 1;
                }
                round_picks += 1;
            }

            if round_picks == 0 {
                break;
            }
            made += round_picks;
            round += 1;
        }

        debug!(role = ?pass.role, picks = made, rounds = round, "Snake pass finished");
        made
    }

    pub fn drafted(&self, squad_id: SquadId) -> &[PlayerId] {
        self.drafted.get(&squad_id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn picks(&self) -> &[DraftPick] {
        &self.picks
    }

    pub fn into_parts(self) -> (BTreeMap<SquadId, Vec<PlayerId>>, Vec<DraftPick>) {
        (self.drafted, self.picks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_alternate_direction() {
        let seed = [3, 1, 4, 2];
        assert_eq!(round_order(&seed, 0, false), vec![3, 1, 4, 2]);
        assert_eq!(round_order(&seed, 1, false), vec![2, 4, 1, 3]);
        assert_eq!(round_order(&seed, 0, true), vec![2, 4, 1, 3]);
        assert_eq!(round_order(&seed, 1, true), vec![3, 1, 4, 2]);
    }

    #[test]
    fn squads_pick_first_available_preference() {
        let seed = [1, 2];
        let eligible: BTreeSet<PlayerId> = [10, 11, 12].into();
        let preferences = HashMap::from([(1, vec![10, 11, 12]), (2, vec![10, 12, 11])]);

        let mut draft = SnakeDraft::new(&seed);
        let made = draft.run_pass(&SnakePass {
            seed: &seed,
            reverse_first_round: false,
            role: Some(PlayerRole::Bat),
            eligible: &eligible,
            preferences: &preferences,
            quotas: None,
        });

        assert_eq!(made, 3);
        // Round 1: 1 takes 10, 2 falls to 12. Round 2 reverses: 2 takes 11.
        assert_eq!(draft.drafted(1), &[10]);
        assert_eq!(draft.drafted(2), &[12, 11]);
    }

    #[test]
    fn quotas_cap_picks_and_stop_the_pass() {
        let seed = [1, 2];
        let eligible: BTreeSet<PlayerId> = (1..=10).collect();
        let order: Vec<PlayerId> = (1..=10).collect();
        let preferences = HashMap::from([(1, order.clone()), (2, order)]);
        let quotas = HashMap::from([(1, 2), (2, 1)]);

        let mut draft = SnakeDraft::new(&seed);
        let made = draft.run_pass(&SnakePass {
            seed: &seed,
            reverse_first_round: false,
            role: None,
            eligible: &eligible,
            preferences: &preferences,
            quotas: Some(&quotas),
        });

        assert_eq!(made, 3);
        assert_eq!(draft.drafted(1).len(), 2);
        assert_eq!(draft.drafted(2).len(), 1);
        assert!(draft.picks().iter().all(|p| p.role.is_none()));
    }

    #[test]
    fn excluded_players_are_never_picked() {
        let seed = [1];
        let eligible: BTreeSet<PlayerId> = [5, 6].into();
        let preferences = HashMap::from([(1, vec![5, 6])]);

        let mut draft = SnakeDraft::new(&seed);
        draft.exclude([5]);
        draft.run_pass(&SnakePass {
            seed: &seed,
            reverse_first_round: false,
            role: None,
            eligible: &eligible,
            preferences: &preferences,
            quotas: None,
        });

        assert_eq!(draft.drafted(1), &[6]);
    }
}
