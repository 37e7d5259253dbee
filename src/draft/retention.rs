use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, instrument};

use super::models::{DraftWindow, RetentionMode};
use crate::league::{FantasySquad, LeagueRepository};
use crate::season::{CatalogRepository, SeasonPhase};
use crate::shared::{AppError, PhaseId, PlayerId, SquadId};

/// Phase whose boost assignments decide retention for a window.
///
/// Manual windows name it directly; otherwise it is the earliest phase
/// starting at or after the window locks, falling back to the named one.
pub fn resolve_retention_phase(window: &DraftWindow, phases: &[SeasonPhase]) -> Option<PhaseId> {
    if window.retention_mode == RetentionMode::ManualPhase {
        return window.retention_phase_id;
    }

    phases
        .iter()
        .filter(|p| p.season_id == window.season_id && p.start >= window.lock_at)
        .min_by_key(|p| (p.start, p.phase))
        .map(|p| p.id)
        .or(window.retention_phase_id)
}

/// Retained players per squad for a (league, window) pair
pub struct RetentionResolver {
    catalog: Arc<dyn CatalogRepository>,
    leagues: Arc<dyn LeagueRepository>,
}

impl RetentionResolver {
    pub fn new(catalog: Arc<dyn CatalogRepository>, leagues: Arc<dyn LeagueRepository>) -> Self {
        Self { catalog, leagues }
    }

    /// Insertion-ordered, deduplicated retention per squad. Players the squad
    /// no longer holds are not retained.
    #[instrument(skip(self, window, squads), fields(window_id = window.id))]
    pub async fn resolve(
        &self,
        window: &DraftWindow,
        squads: &[FantasySquad],
    ) -> Result<BTreeMap<SquadId, Vec<PlayerId>>, AppError> {
        let phases = self.catalog.list_phases(window.season_id).await?;
        let phase_id = resolve_retention_phase(window, &phases);

        let mut retained = BTreeMap::new();
        for squad in squads {
            let players = match phase_id {
                Some(phase_id) => self
                    .leagues
                    .get_phase_boost(squad.id, phase_id)
                    .await?
                    .map(|boost| boost.retained_players())
                    .unwrap_or_default(),
                None => Vec::new(),
            };
            let players: Vec<PlayerId> = players.into_iter().filter(|p| squad.owns(*p)).collect();
            retained.insert(squad.id, players);
        }

        debug!(phase_id = ?phase_id, squad_count = squads.len(), "Retention resolved");
        Ok(retained)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::models::WindowKind;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, day, 0, 0, 0).unwrap()
    }

    fn phase(id: PhaseId, number: i32, start: u32) -> SeasonPhase {
        SeasonPhase {
            id,
            season_id: 1,
            phase: number,
            start: at(start),
            end: at(start + 6),
        }
    }

    fn window(mode: RetentionMode, named: Option<PhaseId>) -> DraftWindow {
        DraftWindow {
            id: 1,
            season_id: 1,
            kind: WindowKind::MidSeason,
            sequence: 1,
            open_at: at(10),
            lock_at: at(12),
            retention_mode: mode,
            retention_phase_id: named,
            draft_pool: None,
            pool_compiled_at: None,
            executed_at: None,
        }
    }

    #[test]
    fn auto_mode_takes_first_phase_after_lock() {
        let phases = [phase(21, 1, 1), phase(22, 2, 8), phase(23, 3, 15), phase(24, 4, 22)];
        assert_eq!(
            resolve_retention_phase(&window(RetentionMode::Auto, Some(21)), &phases),
            Some(23)
        );
    }

    #[test]
    fn auto_mode_falls_back_to_named_phase() {
        let phases = [phase(21, 1, 1)];
        assert_eq!(
            resolve_retention_phase(&window(RetentionMode::Auto, Some(21)), &phases),
            Some(21)
        );
        assert_eq!(resolve_retention_phase(&window(RetentionMode::Auto, None), &phases), None);
    }

    #[test]
    fn manual_mode_uses_named_phase() {
        let phases = [phase(21, 1, 1), phase(23, 3, 15)];
        assert_eq!(
            resolve_retention_phase(&window(RetentionMode::ManualPhase, Some(21)), &phases),
            Some(21)
        );
    }
}
