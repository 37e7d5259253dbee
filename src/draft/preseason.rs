use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::models::{DraftCommit, DraftPick};
use super::preferences::{average_points, default_order_for_role, squad_preferences};
use super::repository::DraftRepository;
use super::snake::{round_order, SnakeDraft, SnakePass, ROLE_PASSES};
use crate::event::{EventBus, LeagueEvent};
use crate::league::{DraftType, FantasyLeague, FantasySquad, LeagueRepository};
use crate::providers::RandomSource;
use crate::scoring::ScoringRepository;
use crate::season::{CatalogRepository, Player, PlayerRole};
use crate::shared::{AppError, LeagueId, LeagueLocks, MatchId, PlayerId, SquadId};

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PreSeasonDraftOptions {
    #[serde(default)]
    pub dry_run: bool,
    /// Discard the persisted snake seed and shuffle a new one
    #[serde(default)]
    pub force_new_seed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreSeasonDraftResult {
    pub league_id: LeagueId,
    pub seed_order: Vec<SquadId>,
    pub squad_roster_counts: BTreeMap<SquadId, usize>,
    pub total_drafted: usize,
    pub picks: Vec<DraftPick>,
    pub dry_run: bool,
}

/// Role-partitioned snake draft that hands every eligible season player to
/// exactly one squad of the league
pub struct PreSeasonDraftService {
    catalog: Arc<dyn CatalogRepository>,
    leagues: Arc<dyn LeagueRepository>,
    scoring: Arc<dyn ScoringRepository>,
    drafts: Arc<dyn DraftRepository>,
    random: Arc<dyn RandomSource>,
    league_locks: LeagueLocks,
    event_bus: EventBus,
}

impl PreSeasonDraftService {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        leagues: Arc<dyn LeagueRepository>,
        scoring: Arc<dyn ScoringRepository>,
        drafts: Arc<dyn DraftRepository>,
        random: Arc<dyn RandomSource>,
        league_locks: LeagueLocks,
        event_bus: EventBus,
    ) -> Self {
        Self {
            catalog,
            leagues,
            scoring,
            drafts,
            random,
            league_locks,
            event_bus,
        }
    }

    #[instrument(skip(self))]
    pub async fn run(
        &self,
        league_id: LeagueId,
        options: PreSeasonDraftOptions,
    ) -> Result<PreSeasonDraftResult, AppError> {
        let _guard = self.league_locks.acquire(league_id).await;

        let mut league = self
            .leagues
            .get_league(league_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("League {} not found", league_id)))?;
        if league.draft_completed && !options.dry_run {
            warn!(league_id, "Pre-season draft already completed");
            return Err(AppError::AlreadyRun(format!(
                "Pre-season draft already ran for league {}",
                league_id
            )));
        }

        let squads = self.leagues.list_squads(league_id).await?;
        if squads.is_empty() {
            return Err(AppError::BadRequest(format!(
                "League {} has no squads to draft for",
                league_id
            )));
        }

        let seed = self.seed_order(&mut league, &squads, options.force_new_seed).await?;
        let (draft, seed_orders) = self.draft(&league, &seed).await?;

        let squad_roster_counts: BTreeMap<SquadId, usize> =
            seed.iter().map(|id| (*id, draft.drafted(*id).len())).collect();
        let total_drafted = draft.picks().len();
        let (drafted, picks) = draft.into_parts();

        let result = PreSeasonDraftResult {
            league_id,
            seed_order: seed,
            squad_roster_counts,
            total_drafted,
            picks,
            dry_run: options.dry_run,
        };

        if options.dry_run {
            info!(league_id, total_drafted, "Pre-season draft dry run computed");
            return Ok(result);
        }

        let updated: Vec<FantasySquad> = squads
            .into_iter()
            .map(|mut squad| {
                squad.current_squad = drafted.get(&squad.id).cloned().unwrap_or_default();
                let roster = squad.current_squad.clone();
                squad.current_core_squad.retain(|a| roster.contains(&a.player_id));
                squad.future_core_squad.retain(|a| roster.contains(&a.player_id));
                squad
            })
            .collect();

        league.draft_completed = true;
        league.draft_seed_orders = seed_orders;
        self.drafts
            .commit_draft(&DraftCommit {
                league,
                squads: updated,
                run: None,
                force_rerun: false,
            })
            .await?;

        self.event_bus
            .emit(league_id, LeagueEvent::DraftCompleted { window_id: None });
        info!(league_id, total_drafted, "Pre-season draft completed");
        Ok(result)
    }

    /// Persisted seed when it still covers exactly the league's squads,
    /// otherwise a fresh shuffle that is persisted before drafting
    async fn seed_order(
        &self,
        league: &mut FantasyLeague,
        squads: &[FantasySquad],
        force_new_seed: bool,
    ) -> Result<Vec<SquadId>, AppError> {
        let squad_ids: BTreeSet<SquadId> = squads.iter().map(|s| s.id).collect();
        if let Some(seed) = &league.snake_draft_seed_order {
            let persisted: BTreeSet<SquadId> = seed.iter().copied().collect();
            if !force_new_seed && persisted == squad_ids && seed.len() == squad_ids.len() {
                return Ok(seed.clone());
            }
        }

        let mut seed: Vec<SquadId> = squad_ids.into_iter().collect();
        self.random.shuffle_squads(&mut seed);
        league.snake_draft_seed_order = Some(seed.clone());
        self.leagues.update_league(league).await?;

        info!(league_id = league.id, seed = ?seed, "Snake seed order generated");
        Ok(seed)
    }

    async fn draft(
        &self,
        league: &FantasyLeague,
        seed: &[SquadId],
    ) -> Result<(SnakeDraft, BTreeMap<PlayerRole, Vec<SquadId>>), AppError> {
        let season = self
            .catalog
            .get_season(league.season_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Season {} not found", league.season_id)))?;

        let players: Vec<Player> = self
            .catalog
            .list_season_players(league.season_id)
            .await?
            .into_iter()
            .filter(|sp| sp.is_available())
            .map(|sp| sp.player)
            .collect();
        let player_refs: Vec<&Player> = players.iter().collect();
        let roles: HashMap<PlayerId, PlayerRole> = players.iter().map(|p| (p.id, p.role)).collect();

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

        let role_order: Vec<PlayerRole> = ROLE_PASSES.iter().map(|(role, _)| *role).collect();
        let mut eligible_by_role: BTreeMap<PlayerRole, BTreeSet<PlayerId>> = BTreeMap::new();
        let mut defaults = BTreeMap::new();
        for role in &role_order {
            eligible_by_role.insert(
                *role,
                players.iter().filter(|p| p.role == *role).map(|p| p.id).collect(),
            );
            defaults.insert(
                *role,
                default_order_for_role(
                    *role,
                    &player_refs,
                    season.default_draft_order.as_ref(),
                    &averages,
                ),
            );
        }

        let stored = self
            .leagues
            .list_draft_preferences(league.id, DraftType::PreSeason)
            .await?;
        let preferences =
            squad_preferences(seed, &stored, &roles, &eligible_by_role, &defaults, &role_order);

        let mut draft = SnakeDraft::new(seed);
        let mut seed_orders = BTreeMap::new();
        for (role, reverse_first_round) in ROLE_PASSES {
            let role_preferences: HashMap<SquadId, Vec<PlayerId>> = preferences
                .iter()
                .map(|(squad_id, prefs)| {
                    (*squad_id, prefs.by_role.get(&role).cloned().unwrap_or_default())
                })
                .collect();
            let eligible = eligible_by_role.get(&role).cloned().unwrap_or_default();

            draft.run_pass(&SnakePass {
                seed,
                reverse_first_round,
                role: Some(role),
                eligible: &eligible,
                preferences: &role_preferences,
                quotas: None,
            });
            seed_orders.insert(role, round_order(seed, 0, reverse_first_round));
        }

        Ok((draft, seed_orders))
    }
}
