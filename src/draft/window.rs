use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::midseason::{plan, MidSeasonInput};
use super::models::{DraftCommit, DraftWindow, DraftWindowLeagueRun, DraftWindowTeamEligibility};
use super::preferences::{
    average_points, default_order_for_role, squad_preferences, SquadPreferences,
};
use super::repository::DraftRepository;
use super::retention::RetentionResolver;
use super::snake::ROLE_PASSES;
use crate::event::{EventBus, LeagueEvent};
use crate::league::{DraftType, FantasyDraft, FantasyLeague, FantasySquad, LeagueRepository};
use crate::providers::Clock;
use crate::scoring::ScoringRepository;
use crate::season::{CatalogRepository, Player, PlayerRole};
use crate::shared::{
    AppError, KeyedLocks, LeagueId, LeagueLocks, MatchId, PlayerId, SquadId, TeamId, WindowId,
};

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ExecuteOptions {
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub force_rerun: bool,
}

/// Compiles window pools and executes mid-season drafts per league.
///
/// A window moves through `pool compiled? × executed?`; the clock and the
/// run ledger decide which operation is legal at any moment.
pub struct DraftWindowService {
    catalog: Arc<dyn CatalogRepository>,
    leagues: Arc<dyn LeagueRepository>,
    scoring: Arc<dyn ScoringRepository>,
    drafts: Arc<dyn DraftRepository>,
    clock: Arc<dyn Clock>,
    league_locks: LeagueLocks,
    run_locks: KeyedLocks<(WindowId, LeagueId)>,
    event_bus: EventBus,
}

impl DraftWindowService {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        leagues: Arc<dyn LeagueRepository>,
        scoring: Arc<dyn ScoringRepository>,
        drafts: Arc<dyn DraftRepository>,
        clock: Arc<dyn Clock>,
        league_locks: LeagueLocks,
        event_bus: EventBus,
    ) -> Self {
        Self {
            catalog,
            leagues,
            scoring,
            drafts,
            clock,
            league_locks,
            run_locks: KeyedLocks::new(),
            event_bus,
        }
    }

    async fn load_window(&self, window_id: WindowId) -> Result<DraftWindow, AppError> {
        self.drafts
            .get_window(window_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Draft window {} not found", window_id)))
    }

    async fn load_league(&self, league_id: LeagueId) -> Result<FantasyLeague, AppError> {
        self.leagues
            .get_league(league_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("League {} not found", league_id)))
    }

    /// Materializes the window pool from teams still marked remaining.
    /// Returns the number of players in the pool.
    #[instrument(skip(self))]
    pub async fn compile_pool(&self, window_id: WindowId) -> Result<usize, AppError> {
        let mut window = self.load_window(window_id).await?;
        if window.is_executed() {
            return Err(AppError::AlreadyRun(format!(
                "Draft window {} has already executed",
                window_id
            )));
        }

        let team_ids: Vec<TeamId> = self
            .catalog
            .list_season_teams(window.season_id)
            .await?
            .iter()
            .map(|t| t.id)
            .collect();
        let remaining: BTreeSet<TeamId> = self
            .drafts
            .ensure_team_eligibility(window_id, &team_ids)
            .await?
            .into_iter()
            .filter(|row| row.is_remaining)
            .map(|row| row.team_id)
            .collect();

        let mut pool: Vec<PlayerId> = self
            .catalog
            .list_season_players(window.season_id)
            .await?
            .into_iter()
            .filter(|sp| sp.is_available() && remaining.contains(&sp.assignment.team_id))
            .map(|sp| sp.player.id)
            .collect();
        pool.sort_unstable();

        let count = pool.len();
        window.draft_pool = Some(pool);
        window.pool_compiled_at = Some(self.clock.now());
        self.drafts.update_window(&window).await?;

        info!(window_id, player_count = count, remaining_teams = remaining.len(), "Draft pool compiled");
        Ok(count)
    }

    /// Marks a team as still in (or knocked out of) the season for a window
    #[instrument(skip(self))]
    pub async fn set_team_remaining(
        &self,
        window_id: WindowId,
        team_id: TeamId,
        is_remaining: bool,
    ) -> Result<(), AppError> {
        self.load_window(window_id).await?;
        self.drafts
            .set_team_eligibility(DraftWindowTeamEligibility {
                window_id,
                team_id,
                is_remaining,
            })
            .await
    }

    /// Stores a squad's mid-season preference list while the window is open
    #[instrument(skip(self, order))]
    pub async fn submit_preferences(
        &self,
        window_id: WindowId,
        squad_id: SquadId,
        role: Option<PlayerRole>,
        order: Vec<PlayerId>,
    ) -> Result<FantasyDraft, AppError> {
        let window = self.load_window(window_id).await?;
        let squad = self
            .leagues
            .get_squad(squad_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Squad {} not found", squad_id)))?;
        let league = self.load_league(squad.league_id).await?;
        if league.season_id != window.season_id {
            return Err(AppError::SeasonMismatch(format!(
                "League {} is not in the season of window {}",
                league.id, window_id
            )));
        }

        let now = self.clock.now();
        if now < window.open_at {
            return Err(AppError::WindowNotOpen(format!(
                "Draft window {} opens at {}",
                window_id, window.open_at
            )));
        }
        if now >= window.lock_at {
            return Err(AppError::WindowClosed(format!(
                "Draft window {} locked at {}",
                window_id, window.lock_at
            )));
        }

        let draft = self
            .leagues
            .upsert_draft_preference(FantasyDraft {
                id: 0,
                league_id: league.id,
                squad_id,
                draft_type: DraftType::MidSeason,
                role,
                order,
            })
            .await?;

        info!(window_id, squad_id, role = ?role, length = draft.order.len(), "Draft preferences submitted");
        Ok(draft)
    }

    /// Runs the mid-season draft of one league inside a window.
    ///
    /// A dry run returns the computed run without writing rosters or the
    /// run ledger. A live run needs the window to have locked.
    #[instrument(skip(self))]
    pub async fn execute(
        &self,
        league_id: LeagueId,
        window_id: WindowId,
        options: ExecuteOptions,
    ) -> Result<DraftWindowLeagueRun, AppError> {
        let window = self.load_window(window_id).await?;
        let league = self.load_league(league_id).await?;
        if league.season_id != window.season_id {
            warn!(league_id, window_id, "League and window belong to different seasons");
            return Err(AppError::SeasonMismatch(format!(
                "League {} (season {}) cannot run window {} (season {})",
                league_id, league.season_id, window_id, window.season_id
            )));
        }

        let now = self.clock.now();
        if !options.dry_run && now < window.lock_at {
            return Err(AppError::WindowNotOpen(format!(
                "Draft window {} cannot execute before {}",
                window_id, window.lock_at
            )));
        }

        let _league_guard = self.league_locks.acquire(league_id).await;
        let _run_guard = self.run_locks.acquire((window_id, league_id)).await;

        if !options.dry_run
            && !options.force_rerun
            && self.drafts.find_live_run(window_id, league_id).await?.is_some()
        {
            warn!(league_id, window_id, "Draft window already executed for league");
            return Err(AppError::AlreadyRun(format!(
                "Window {} already ran for league {}",
                window_id, league_id
            )));
        }

        let pool = league
            .mid_season_draft_pool
            .clone()
            .or_else(|| window.draft_pool.clone())
            .ok_or_else(|| {
                AppError::PoolEmpty(format!("Draft window {} pool is not compiled", window_id))
            })?;

        let squads = self.leagues.list_squads(league_id).await?;
        let retained = RetentionResolver::new(self.catalog.clone(), self.leagues.clone())
            .resolve(&window, &squads)
            .await?;

        let players: Vec<Player> = self
            .catalog
            .list_season_players(league.season_id)
            .await?
            .into_iter()
            .filter(|sp| sp.is_available())
            .map(|sp| sp.player)
            .collect();
        let roles: HashMap<PlayerId, PlayerRole> = players.iter().map(|p| (p.id, p.role)).collect();
        let preferences = self.preferences(&league, &squads, &players, &pool).await?;

        let plan = plan(&MidSeasonInput {
            window_id,
            league_id,
            dry_run: options.dry_run,
            squads: &squads,
            retained: &retained,
            pool: &pool,
            roles: &roles,
            preferences: &preferences,
        })?;

        let run = DraftWindowLeagueRun {
            id: Uuid::new_v4(),
            window_id,
            league_id,
            dry_run: options.dry_run,
            executed_at: now,
            snapshot: plan.snapshot,
            result: plan.payload,
        };

        if options.dry_run {
            info!(league_id, window_id, picks = run.result.picks.len(), "Draft window dry run computed");
            return Ok(run);
        }

        let rosters: BTreeMap<SquadId, Vec<PlayerId>> = run
            .result
            .squads
            .iter()
            .map(|outcome| (outcome.squad_id, outcome.new_roster.clone()))
            .collect();
        let updated: Vec<FantasySquad> = squads
            .into_iter()
            .map(|mut squad| {
                if let Some(roster) = rosters.get(&squad.id) {
                    squad.current_squad = roster.clone();
                    squad.current_core_squad.retain(|a| roster.contains(&a.player_id));
                    squad.future_core_squad.retain(|a| roster.contains(&a.player_id));
                }
                squad
            })
            .collect();

        let mut league = league;
        league.draft_seed_orders = plan.seed_orders;
        self.drafts
            .commit_draft(&DraftCommit {
                league,
                squads: updated,
                run: Some(run.clone()),
                force_rerun: options.force_rerun,
            })
            .await?;

        self.event_bus.emit(
            league_id,
            LeagueEvent::DraftCompleted {
                window_id: Some(window_id),
            },
        );
        info!(
            league_id,
            window_id,
            picks = run.result.picks.len(),
            forced = options.force_rerun,
            "Draft window executed"
        );
        Ok(run)
    }

    async fn preferences(
        &self,
        league: &FantasyLeague,
        squads: &[FantasySquad],
        players: &[Player],
        pool: &[PlayerId],
    ) -> Result<HashMap<SquadId, SquadPreferences>, AppError> {
        let season = self
            .catalog
            .get_season(league.season_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Season {} not found", league.season_id)))?;

        let match_ids: Vec<MatchId> = self
            .catalog
            .list_matches(league.season_id)
            .await?
            .iter()
            .map(|m| m.id)
            .collect();
        let averages = average_points(
            &self
                .scoring
                .list_player_match_events_for_matches(&match_ids)
                .await?,
        );

        let in_pool: BTreeSet<PlayerId> = pool.iter().copied().collect();
        let pool_players: Vec<&Player> = players.iter().filter(|p| in_pool.contains(&p.id)).collect();
        let roles: HashMap<PlayerId, PlayerRole> = players.iter().map(|p| (p.id, p.role)).collect();

        let role_order: Vec<PlayerRole> = ROLE_PASSES.iter().map(|(role, _)| *role).collect();
        let mut eligible_by_role = BTreeMap::new();
        let mut defaults = BTreeMap::new();
        for role in &role_order {
            eligible_by_role.insert(
                *role,
                pool_players
                    .iter()
                    .filter(|p| p.role == *role)
                    .map(|p| p.id)
                    .collect::<BTreeSet<PlayerId>>(),
            );
            defaults.insert(
                *role,
                default_order_for_role(
                    *role,
                    &pool_players,
                    season.default_draft_order.as_ref(),
                    &averages,
                ),
            );
        }

        let stored = self
            .leagues
            .list_draft_preferences(league.id, DraftType::MidSeason)
            .await?;
        let squad_ids: Vec<SquadId> = squads.iter().map(|s| s.id).collect();
        Ok(squad_preferences(
            &squad_ids,
            &stored,
            &roles,
            &eligible_by_role,
            &defaults,
            &role_order,
        ))
    }
}
