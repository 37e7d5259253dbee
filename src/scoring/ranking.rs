use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::shared::SquadId;

/// Which matches feed the running totals
#[derive(Debug, Clone, Default)]
pub struct RankingConfig {
    /// Only completed and no-result matches accumulate when set
    pub completed_only: bool,
}

/// Dense 1..n ranks: points descending, squad id ascending on ties
pub fn rank_squads(points: &BTreeMap<SquadId, f64>) -> BTreeMap<SquadId, i32> {
    let mut ordered: Vec<(SquadId, f64)> = points.iter().map(|(id, p)| (*id, *p)).collect();
    ordered.sort_by(|a, b| match b.1.total_cmp(&a.1) {
        Ordering::Equal => a.0.cmp(&b.0),
        other => other,
    });

    ordered
        .into_iter()
        .enumerate()
        .map(|(index, (squad_id, _))| (squad_id, index as i32 + 1))
        .collect()
}

/// Sum in a fixed order so repeated runs produce bit-identical floats
pub fn stable_sum<'a>(values: impl IntoIterator<Item = &'a f64>) -> f64 {
    values.into_iter().fold(0.0, |acc, v| acc + v)
}
