use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::audit::{check_boosts, check_match_ranks, check_rollups, check_squad_totals, into_result};
use super::boost::boost_points;
use super::models::{
    FantasyMatchEvent, FantasyPlayerEvent, MatchScoringBatch, PlayerMatchEvent,
    PlayerMatchEventWrite,
};
use super::ranking::{rank_squads, stable_sum, RankingConfig};
use super::repository::ScoringRepository;
use super::rules::{components, score};
use super::scorecard::{Scorecard, SkipReason, SkippedRow};
use crate::event::{EventBus, LeagueEvent};
use crate::league::{boost_role_for, FantasyBoostRole, FantasyLeague, LeagueRepository};
use crate::providers::ScorecardProvider;
use crate::season::{CatalogRepository, InningsSummary, Match, MatchStatus, SeasonPlayer, Team};
use crate::shared::{AppError, BoostRoleId, KeyedLocks, MatchId, SeasonId, SquadId};
use crate::stats::StatsCache;

/// Outcome of one ingest run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestSummary {
    pub match_id: MatchId,
    pub player_events_touched: usize,
    pub fantasy_events_touched: usize,
    pub squads_updated: usize,
    pub skipped: Vec<SkippedRow>,
}

#[derive(Debug, Default)]
struct RescoreCounts {
    fantasy_events_touched: usize,
    squads_updated: usize,
}

/// Owns every derived-state write: player points, fantasy rows, ranks and
/// squad totals. Ingests of one season are serialized.
pub struct ScoringPipeline {
    catalog: Arc<dyn CatalogRepository>,
    leagues: Arc<dyn LeagueRepository>,
    scoring: Arc<dyn ScoringRepository>,
    provider: Arc<dyn ScorecardProvider>,
    stats_cache: Arc<StatsCache>,
    event_bus: EventBus,
    config: RankingConfig,
    season_locks: KeyedLocks<SeasonId>,
}

impl ScoringPipeline {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        leagues: Arc<dyn LeagueRepository>,
        scoring: Arc<dyn ScoringRepository>,
        provider: Arc<dyn ScorecardProvider>,
        stats_cache: Arc<StatsCache>,
        event_bus: EventBus,
        config: RankingConfig,
    ) -> Self {
        Self {
            catalog,
            leagues,
            scoring,
            provider,
            stats_cache,
            event_bus,
            config,
            season_locks: KeyedLocks::new(),
        }
    }

    /// Fetches the scorecard for a match from the provider and ingests it
    #[instrument(skip(self))]
    pub async fn ingest_match(&self, external_match_id: &str) -> Result<IngestSummary, AppError> {
        let fixture = self
            .catalog
            .find_match_by_external_id(external_match_id)
            .await?
            .ok_or_else(|| {
                AppError::InputMissing(format!("Match {} not found", external_match_id))
            })?;

        let scorecard = self.provider.fetch(external_match_id).await?;
        self.ingest_scorecard(fixture.id, &scorecard).await
    }

    /// Writes raw rows from a scorecard and brings all derived rows in line.
    /// Re-ingesting the same scorecard leaves derived state unchanged.
    #[instrument(skip(self, scorecard))]
    pub async fn ingest_scorecard(
        &self,
        match_id: MatchId,
        scorecard: &Scorecard,
    ) -> Result<IngestSummary, AppError> {
        let fixture = self.load_match(match_id).await?;
        let _guard = self.season_locks.acquire(fixture.season_id).await;

        let mut skipped = Vec::new();
        let previous_status = fixture.status;
        let fixture = self.apply_match_fields(fixture, scorecard, &mut skipped).await?;

        let touched = self
            .write_player_events(&fixture, scorecard, &mut skipped)
            .await?;
        let counts = self.rescore_match(&fixture, &touched).await?;

        if previous_status == MatchStatus::Live && fixture.status == MatchStatus::Completed {
            self.announce_completion(&fixture).await?;
        }

        for row in &skipped {
            warn!(match_id, reason = ?row.reason, detail = %row.detail, "Scorecard row skipped");
        }
        info!(
            match_id,
            player_events_touched = touched.len(),
            fantasy_events_touched = counts.fantasy_events_touched,
            squads_updated = counts.squads_updated,
            skipped = skipped.len(),
            "Match ingested"
        );

        Ok(IngestSummary {
            match_id,
            player_events_touched: touched.len(),
            fantasy_events_touched: counts.fantasy_events_touched,
            squads_updated: counts.squads_updated,
            skipped,
        })
    }

    /// Moves a match along `Scheduled → Live → Completed | NoResult | Abandoned`
    #[instrument(skip(self))]
    pub async fn set_match_status(
        &self,
        match_id: MatchId,
        status: MatchStatus,
    ) -> Result<Match, AppError> {
        let fixture = self.load_match(match_id).await?;
        let _guard = self.season_locks.acquire(fixture.season_id).await;

        if fixture.status == status {
            return Ok(fixture);
        }
        if !fixture.status.can_transition_to(status) {
            warn!(match_id, from = %fixture.status, to = %status, "Illegal match status transition");
            return Err(AppError::BadRequest(format!(
                "Match {} cannot move from {} to {}",
                match_id, fixture.status, status
            )));
        }

        let previous = fixture.status;
        let updated = Match { status, ..fixture };
        self.catalog.update_match(&updated).await?;
        info!(match_id, from = %previous, to = %status, "Match status updated");

        if self.config.completed_only && status.is_final() {
            // Completion changes which matches feed the running totals
            self.rescore_match(&updated, &[]).await?;
        }
        if previous == MatchStatus::Live && status == MatchStatus::Completed {
            self.announce_completion(&updated).await?;
        }

        Ok(updated)
    }

    async fn load_match(&self, match_id: MatchId) -> Result<Match, AppError> {
        self.catalog
            .get_match(match_id)
            .await?
            .ok_or_else(|| AppError::InputMissing(format!("Match {} not found", match_id)))
    }

    async fn announce_completion(&self, fixture: &Match) -> Result<(), AppError> {
        for league in self.leagues.list_leagues(fixture.season_id).await? {
            self.stats_cache.invalidate_league(league.id).await;
            self.event_bus.emit(
                league.id,
                LeagueEvent::MatchCompleted {
                    match_id: fixture.id,
                },
            );
        }
        Ok(())
    }

    /// Toss, result, innings totals and status from the scorecard
    async fn apply_match_fields(
        &self,
        fixture: Match,
        scorecard: &Scorecard,
        skipped: &mut Vec<SkippedRow>,
    ) -> Result<Match, AppError> {
        let teams: Vec<Team> = self
            .catalog
            .list_season_teams(fixture.season_id)
            .await?
            .into_iter()
            .filter(|t| t.id == fixture.team1_id || t.id == fixture.team2_id)
            .collect();
        let mut resolve = |name: &str| {
            let found = teams.iter().find(|t| t.matches_name(name)).map(|t| t.id);
            if found.is_none() {
                skipped.push(SkippedRow::new(
                    SkipReason::UnknownTeam,
                    format!("team {:?} is not playing this match", name),
                ));
            }
            found
        };

        let mut updated = fixture.clone();

        if let Some(name) = &scorecard.toss_winner {
            if let Some(id) = resolve(name) {
                updated.toss_winner_id = Some(id);
            }
        }
        if scorecard.toss_decision.is_some() {
            updated.toss_decision = scorecard.toss_decision;
        }
        if let Some(name) = &scorecard.winner {
            if let Some(id) = resolve(name) {
                updated.winner_id = Some(id);
            }
        }
        if !scorecard.innings.is_empty() {
            updated.innings = scorecard
                .innings
                .iter()
                .filter_map(|innings| {
                    resolve(&innings.batting_team).map(|batting_team_id| InningsSummary {
                        batting_team_id,
                        runs: innings.total_runs,
                        wickets: innings.total_wickets,
                        overs: innings.overs.clone(),
                    })
                })
                .collect();
        }

        if let Some(status) = scorecard.status.filter(|s| *s != fixture.status) {
            if fixture.status.can_transition_to(status) {
                updated.status = status;
            } else {
                skipped.push(SkippedRow::new(
                    SkipReason::IllegalTransition,
                    format!("status {} cannot follow {}", status, fixture.status),
                ));
            }
        }

        if updated != fixture {
            self.catalog.update_match(&updated).await?;
            debug!(match_id = updated.id, status = %updated.status, "Match fields updated");
        }
        Ok(updated)
    }

    /// Get-or-create a player event per scorecard player known to the season
    async fn write_player_events(
        &self,
        fixture: &Match,
        scorecard: &Scorecard,
        skipped: &mut Vec<SkippedRow>,
    ) -> Result<Vec<PlayerMatchEvent>, AppError> {
        let roster = self.catalog.list_season_players(fixture.season_id).await?;
        let mut by_name: HashMap<String, Vec<&SeasonPlayer>> = HashMap::new();
        for season_player in &roster {
            by_name
                .entry(season_player.player.name.trim().to_lowercase())
                .or_default()
                .push(season_player);
        }

        let (performances, malformed) = scorecard.performances();
        skipped.extend(malformed);

        let mut writes = Vec::with_capacity(performances.len());
        for performance in performances {
            let season_player = match by_name
                .get(&performance.player.trim().to_lowercase())
                .map(Vec::as_slice)
            {
                Some([season_player]) => *season_player,
                Some(candidates) if candidates.len() > 1 => {
                    warn!(player = %performance.player, candidates = candidates.len(), "Ambiguous scorecard name");
                    skipped.push(SkippedRow::new(
                        SkipReason::UnknownPlayer,
                        format!(
                            "{:?} matches {} players in season",
                            performance.player,
                            candidates.len()
                        ),
                    ));
                    continue;
                }
                _ => {
                    skipped.push(SkippedRow::new(
                        SkipReason::UnknownPlayer,
                        format!("no player named {:?} in season", performance.player),
                    ));
                    continue;
                }
            };

            let mut raw = performance.raw;
            raw.player_role = Some(season_player.player.role);
            let points = score(&raw);
            writes.push(PlayerMatchEventWrite {
                player_id: season_player.player.id,
                match_id: fixture.id,
                team_id: Some(season_player.assignment.team_id),
                raw,
                points,
            });
        }

        if writes.is_empty() {
            return Ok(Vec::new());
        }
        self.scoring.upsert_player_match_events(&writes).await
    }

    /// Steps from fantasy player rows through squad totals, one league at a time
    async fn rescore_match(
        &self,
        fixture: &Match,
        touched: &[PlayerMatchEvent],
    ) -> Result<RescoreCounts, AppError> {
        let player_events: HashMap<i64, PlayerMatchEvent> = self
            .scoring
            .list_player_match_events(fixture.id)
            .await?
            .into_iter()
            .map(|e| (e.id, e))
            .collect();
        let roles: HashMap<BoostRoleId, FantasyBoostRole> = self
            .leagues
            .list_boost_roles()
            .await?
            .into_iter()
            .map(|r| (r.id, r))
            .collect();
        let phase_id = self
            .catalog
            .list_phases(fixture.season_id)
            .await?
            .into_iter()
            .find(|p| p.phase == fixture.phase)
            .map(|p| p.id);
        let schedule = self.catalog.list_matches(fixture.season_id).await?;

        let mut counts = RescoreCounts::default();
        for league in self.leagues.list_leagues(fixture.season_id).await? {
            let context = LeagueContext {
                fixture,
                touched,
                player_events: &player_events,
                roles: &roles,
                phase_id,
                schedule: &schedule,
            };
            if let Some(batch) = self.build_league_batch(&league, &context).await? {
                self.scoring.commit_match_scoring(&batch).await?;
                self.stats_cache.invalidate_league(league.id).await;
                self.event_bus.emit(
                    league.id,
                    LeagueEvent::MatchScored {
                        match_id: fixture.id,
                    },
                );

                counts.fantasy_events_touched += batch.player_events.len();
                counts.squads_updated += batch.squad_totals.len();
                debug!(league_id = league.id, match_id = fixture.id, "League rescored");
            }
        }
        Ok(counts)
    }

    async fn build_league_batch(
        &self,
        league: &FantasyLeague,
        ctx: &LeagueContext<'_>,
    ) -> Result<Option<MatchScoringBatch>, AppError> {
        let squads = self.leagues.list_squads(league.id).await?;
        if squads.is_empty() {
            return Ok(None);
        }
        let squad_ids: Vec<SquadId> = squads.iter().map(|s| s.id).collect();

        let existing: BTreeMap<(SquadId, i64), FantasyPlayerEvent> = self
            .scoring
            .list_fantasy_player_events(&squad_ids, Some(ctx.fixture.id))
            .await?
            .into_iter()
            .map(|e| ((e.squad_id, e.player_match_event_id), e))
            .collect();

        let mut fantasy_events = Vec::new();
        for squad in &squads {
            let phase_boost = match ctx.phase_id {
                Some(phase_id) => self.leagues.get_phase_boost(squad.id, phase_id).await?,
                None => None,
            };
            let assignments = phase_boost
                .map(|b| b.assignments)
                .unwrap_or_else(|| squad.current_core_squad.clone());

            let mut candidates: BTreeSet<i64> = ctx
                .touched
                .iter()
                .filter(|pme| squad.owns(pme.player_id))
                .map(|pme| pme.id)
                .collect();
            candidates.extend(
                existing
                    .keys()
                    .filter(|(squad_id, _)| *squad_id == squad.id)
                    .map(|(_, pme_id)| *pme_id),
            );

            for pme_id in candidates {
                let Some(pme) = ctx.player_events.get(&pme_id) else {
                    continue;
                };
                // Players traded away keep the role they scored under
                let boost_role_id = if squad.owns(pme.player_id) {
                    boost_role_for(&assignments, pme.player_id)
                } else {
                    existing
                        .get(&(squad.id, pme_id))
                        .and_then(|e| e.boost_role_id)
                };
                let boost = boost_role_id
                    .and_then(|id| ctx.roles.get(&id))
                    .map(|role| boost_points(&components(&pme.raw), &role.multipliers))
                    .unwrap_or(0.0);

                fantasy_events.push(FantasyPlayerEvent {
                    squad_id: squad.id,
                    player_match_event_id: pme.id,
                    player_id: pme.player_id,
                    match_id: ctx.fixture.id,
                    boost_role_id,
                    base_points: pme.points.total,
                    boost_points: boost,
                });
            }
        }

        if fantasy_events.is_empty() {
            return Ok(None);
        }

        // Every squad of a touched league gets a row so ranks cover the league
        let mut current: Vec<FantasyMatchEvent> = squads
            .iter()
            .map(|squad| {
                let rows: Vec<&FantasyPlayerEvent> = fantasy_events
                    .iter()
                    .filter(|e| e.squad_id == squad.id)
                    .collect();
                let base = stable_sum(&rows.iter().map(|r| r.base_points as f64).collect::<Vec<_>>());
                let boost = stable_sum(&rows.iter().map(|r| r.boost_points).collect::<Vec<_>>());
                FantasyMatchEvent {
                    squad_id: squad.id,
                    match_id: ctx.fixture.id,
                    league_id: league.id,
                    total_base_points: base,
                    total_boost_points: boost,
                    total_points: base + boost,
                    players_count: rows.len() as i32,
                    match_rank: 0,
                    running_rank: 0,
                    running_total_points: 0.0,
                }
            })
            .collect();

        let match_totals: BTreeMap<SquadId, f64> =
            current.iter().map(|e| (e.squad_id, e.total_points)).collect();
        let match_ranks = rank_squads(&match_totals);
        for event in &mut current {
            event.match_rank = match_ranks.get(&event.squad_id).copied().unwrap_or_default();
        }

        let mut rows: BTreeMap<(SquadId, MatchId), FantasyMatchEvent> = self
            .scoring
            .list_fantasy_match_events(&squad_ids)
            .await?
            .into_iter()
            .map(|e| ((e.squad_id, e.match_id), e))
            .collect();
        for event in &current {
            rows.insert((event.squad_id, event.match_id), event.clone());
        }

        let match_events = self.recompute_running(&squad_ids, &mut rows, ctx)?;

        let mut squads = squads;
        let mut squad_totals = Vec::with_capacity(squads.len());
        for squad in &mut squads {
            let totals: Vec<f64> = rows
                .values()
                .filter(|e| e.squad_id == squad.id)
                .map(|e| e.total_points)
                .collect();
            squad.total_points = stable_sum(&totals);
            squad_totals.push((squad.id, squad.total_points));
        }

        let all_rows: Vec<FantasyMatchEvent> = rows.into_values().collect();
        let mut violations = check_boosts(&fantasy_events, ctx.player_events, ctx.roles);
        violations.extend(check_rollups(&current, &fantasy_events));
        violations.extend(check_match_ranks(&current));
        violations.extend(check_squad_totals(&squads, &all_rows));
        into_result(violations)?;

        Ok(Some(MatchScoringBatch {
            match_id: ctx.fixture.id,
            player_events: fantasy_events,
            match_events,
            squad_totals,
        }))
    }

    /// Running totals and ranks for the ingested match and every later match
    /// that already has rows. Returns the rows that were (re)written.
    fn recompute_running(
        &self,
        squad_ids: &[SquadId],
        rows: &mut BTreeMap<(SquadId, MatchId), FantasyMatchEvent>,
        ctx: &LeagueContext<'_>,
    ) -> Result<Vec<FantasyMatchEvent>, AppError> {
        let start = ctx
            .schedule
            .iter()
            .position(|m| m.id == ctx.fixture.id)
            .ok_or_else(|| {
                AppError::InputMissing(format!("Match {} is not on the schedule", ctx.fixture.id))
            })?;

        let mut cumulative: BTreeMap<SquadId, f64> =
            squad_ids.iter().map(|id| (*id, 0.0)).collect();
        let mut written = Vec::new();

        for (index, fixture) in ctx.schedule.iter().enumerate() {
            let status = if fixture.id == ctx.fixture.id {
                ctx.fixture.status
            } else {
                fixture.status
            };
            let contributes = !self.config.completed_only
                || matches!(status, MatchStatus::Completed | MatchStatus::NoResult);

            if contributes {
                for squad_id in squad_ids {
                    if let Some(row) = rows.get(&(*squad_id, fixture.id)) {
                        if let Some(total) = cumulative.get_mut(squad_id) {
                            *total += row.total_points;
                        }
                    }
                }
            }

            if index < start || !squad_ids.iter().any(|id| rows.contains_key(&(*id, fixture.id)))
            {
                continue;
            }

            let running_ranks = rank_squads(&cumulative);
            for squad_id in squad_ids {
                if let Some(row) = rows.get_mut(&(*squad_id, fixture.id)) {
                    row.running_total_points = cumulative.get(squad_id).copied().unwrap_or_default();
                    row.running_rank = running_ranks.get(squad_id).copied().unwrap_or_default();
                    written.push(row.clone());
                }
            }
        }

        Ok(written)
    }
}

/// Season-wide inputs shared by every league rescored for one match
struct LeagueContext<'a> {
    fixture: &'a Match,
    touched: &'a [PlayerMatchEvent],
    player_events: &'a HashMap<i64, PlayerMatchEvent>,
    roles: &'a HashMap<BoostRoleId, FantasyBoostRole>,
    phase_id: Option<i64>,
    schedule: &'a [Match],
}
