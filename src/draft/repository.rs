use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::Row;
use tracing::{debug, info, instrument, warn};

use super::models::{DraftCommit, DraftWindow, DraftWindowLeagueRun, DraftWindowTeamEligibility};
use crate::league::repository::{apply_squad_updates, write_league, write_squads};
use crate::league::FantasySquad;
use crate::shared::{AppError, LeagueId, SeasonId, TeamId, WindowId};
use crate::storage::postgres::{db_error, lock_league, parse_column};
use crate::storage::{InMemoryStore, PostgresStore};

/// Draft windows, their team eligibility and the per-league run ledger
#[async_trait]
pub trait DraftRepository: Send + Sync {
    async fn create_window(&self, window: DraftWindow) -> Result<DraftWindow, AppError>;
    async fn get_window(&self, window_id: WindowId) -> Result<Option<DraftWindow>, AppError>;
    async fn list_windows(&self, season_id: SeasonId) -> Result<Vec<DraftWindow>, AppError>;
    async fn update_window(&self, window: &DraftWindow) -> Result<(), AppError>;

    /// Adds a remaining row for every listed team that has none yet and
    /// returns all rows of the window
    async fn ensure_team_eligibility(
        &self,
        window_id: WindowId,
        team_ids: &[TeamId],
    ) -> Result<Vec<DraftWindowTeamEligibility>, AppError>;
    async fn set_team_eligibility(&self, row: DraftWindowTeamEligibility) -> Result<(), AppError>;

    /// The non-dry run recorded for (window, league), if any
    async fn find_live_run(
        &self,
        window_id: WindowId,
        league_id: LeagueId,
    ) -> Result<Option<DraftWindowLeagueRun>, AppError>;

    /// Writes league, rosters and the run record in one unit. A live run
    /// already on record fails with `AlreadyRun` unless `force_rerun` is set.
    async fn commit_draft(&self, commit: &DraftCommit) -> Result<Vec<FantasySquad>, AppError>;
}

#[async_trait]
impl DraftRepository for InMemoryStore {
    #[instrument(skip(self, window))]
    async fn create_window(&self, mut window: DraftWindow) -> Result<DraftWindow, AppError> {
        let mut state = self.write().await;
        window.id = state.next_id();
        state.windows.insert(window.id, window.clone());
        debug!(window_id = window.id, season_id = window.season_id, "Draft window created");
        Ok(window)
    }

    async fn get_window(&self, window_id: WindowId) -> Result<Option<DraftWindow>, AppError> {
        Ok(self.read().await.windows.get(&window_id).cloned())
    }

    async fn list_windows(&self, season_id: SeasonId) -> Result<Vec<DraftWindow>, AppError> {
        let mut windows: Vec<DraftWindow> = self
            .read()
            .await
            .windows
            .values()
            .filter(|w| w.season_id == season_id)
            .cloned()
            .collect();
        windows.sort_by_key(|w| (w.sequence, w.id));
        Ok(windows)
    }

    async fn update_window(&self, window: &DraftWindow) -> Result<(), AppError> {
        let mut state = self.write().await;
        match state.windows.get_mut(&window.id) {
            Some(stored) => {
                *stored = window.clone();
                Ok(())
            }
            None => Err(AppError::NotFound(format!("Draft window {} not found", window.id))),
        }
    }

    async fn ensure_team_eligibility(
        &self,
        window_id: WindowId,
        team_ids: &[TeamId],
    ) -> Result<Vec<DraftWindowTeamEligibility>, AppError> {
        let mut state = self.write().await;
        for team_id in team_ids {
            state
                .team_eligibility
                .entry((window_id, *team_id))
                .or_insert_with(|| DraftWindowTeamEligibility {
                    window_id,
                    team_id: *team_id,
                    is_remaining: true,
                });
        }
        Ok(state
            .team_eligibility
            .range((window_id, TeamId::MIN)..=(window_id, TeamId::MAX))
            .map(|(_, row)| row.clone())
            .collect())
    }

    async fn set_team_eligibility(&self, row: DraftWindowTeamEligibility) -> Result<(), AppError> {
        let mut state = self.write().await;
        state
            .team_eligibility
            .insert((row.window_id, row.team_id), row);
        Ok(())
    }

    async fn find_live_run(
        &self,
        window_id: WindowId,
        league_id: LeagueId,
    ) -> Result<Option<DraftWindowLeagueRun>, AppError> {
        Ok(self
            .read()
            .await
            .draft_runs
            .values()
            .find(|r| r.window_id == window_id && r.league_id == league_id && !r.dry_run)
            .cloned())
    }

    #[instrument(skip(self, commit), fields(league_id = commit.league.id))]
    async fn commit_draft(&self, commit: &DraftCommit) -> Result<Vec<FantasySquad>, AppError> {
        let mut state = self.write().await;

        if !state.leagues.contains_key(&commit.league.id) {
            return Err(AppError::NotFound(format!(
                "League {} not found",
                commit.league.id
            )));
        }

        let previous_run = match &commit.run {
            Some(run) => {
                let existing = state
                    .draft_runs
                    .values()
                    .find(|r| r.window_id == run.window_id && r.league_id == run.league_id && !r.dry_run)
                    .map(|r| r.id);
                if existing.is_some() && !commit.force_rerun {
                    warn!(window_id = run.window_id, league_id = run.league_id, "Draft run already recorded");
                    return Err(AppError::AlreadyRun(format!(
                        "Window {} already ran for league {}",
                        run.window_id, run.league_id
                    )));
                }
                existing
            }
            None => None,
        };

        let written = apply_squad_updates(&mut state, &commit.squads)?;
        state.leagues.insert(commit.league.id, commit.league.clone());

        if let Some(run) = &commit.run {
            if let Some(previous) = previous_run {
                state.draft_runs.remove(&previous);
            }
            state.draft_runs.insert(run.id, run.clone());
            if let Some(window) = state.windows.get_mut(&run.window_id) {
                window.executed_at = Some(run.executed_at);
            }
        }

        info!(squad_count = written.len(), "Draft committed");
        Ok(written)
    }
}

const WINDOW_COLUMNS: &str = "id, season_id, kind, sequence, open_at, lock_at, retention_mode, \
     retention_phase_id, draft_pool, pool_compiled_at, executed_at";

const RUN_COLUMNS: &str = "id, window_id, league_id, dry_run, executed_at, snapshot, result";

fn window_from_row(row: &PgRow) -> Result<DraftWindow, AppError> {
    let kind: String = row.try_get("kind")?;
    let retention_mode: String = row.try_get("retention_mode")?;
    Ok(DraftWindow {
        id: row.try_get("id")?,
        season_id: row.try_get("season_id")?,
        kind: parse_column(&kind, "kind")?,
        sequence: row.try_get("sequence")?,
        open_at: row.try_get("open_at")?,
        lock_at: row.try_get("lock_at")?,
        retention_mode: parse_column(&retention_mode, "retention_mode")?,
        retention_phase_id: row.try_get("retention_phase_id")?,
        draft_pool: row
            .try_get::<Option<Json<_>>, _>("draft_pool")?
            .map(|pool| pool.0),
        pool_compiled_at: row.try_get("pool_compiled_at")?,
        executed_at: row.try_get("executed_at")?,
    })
}

fn run_from_row(row: &PgRow) -> Result<DraftWindowLeagueRun, AppError> {
    Ok(DraftWindowLeagueRun {
        id: row.try_get("id")?,
        window_id: row.try_get("window_id")?,
        league_id: row.try_get("league_id")?,
        dry_run: row.try_get("dry_run")?,
        executed_at: row.try_get("executed_at")?,
        snapshot: row.try_get::<Json<_>, _>("snapshot")?.0,
        result: row.try_get::<Json<_>, _>("result")?.0,
    })
}

#[async_trait]
impl DraftRepository for PostgresStore {
    #[instrument(skip(self, window))]
    async fn create_window(&self, mut window: DraftWindow) -> Result<DraftWindow, AppError> {
        window.id = sqlx::query_scalar(
            "INSERT INTO draft_windows (season_id, kind, sequence, open_at, lock_at,
                retention_mode, retention_phase_id, draft_pool, pool_compiled_at, executed_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING id",
        )
        .bind(window.season_id)
        .bind(window.kind.to_string())
        .bind(window.sequence)
        .bind(window.open_at)
        .bind(window.lock_at)
        .bind(window.retention_mode.to_string())
        .bind(window.retention_phase_id)
        .bind(window.draft_pool.as_ref().map(Json))
        .bind(window.pool_compiled_at)
        .bind(window.executed_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("create draft window"))?;

        Ok(window)
    }

    async fn get_window(&self, window_id: WindowId) -> Result<Option<DraftWindow>, AppError> {
        sqlx::query(&format!(
            "SELECT {} FROM draft_windows WHERE id = $1",
            WINDOW_COLUMNS
        ))
        .bind(window_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("get draft window"))?
        .as_ref()
        .map(window_from_row)
        .transpose()
    }

    async fn list_windows(&self, season_id: SeasonId) -> Result<Vec<DraftWindow>, AppError> {
        sqlx::query(&format!(
            "SELECT {} FROM draft_windows WHERE season_id = $1 ORDER BY sequence, id",
            WINDOW_COLUMNS
        ))
        .bind(season_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list draft windows"))?
        .iter()
        .map(window_from_row)
        .collect()
    }

    async fn update_window(&self, window: &DraftWindow) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE draft_windows SET kind = $2, sequence = $3, open_at = $4, lock_at = $5,
                retention_mode = $6, retention_phase_id = $7, draft_pool = $8,
                pool_compiled_at = $9, executed_at = $10
             WHERE id = $1",
        )
        .bind(window.id)
        .bind(window.kind.to_string())
        .bind(window.sequence)
        .bind(window.open_at)
        .bind(window.lock_at)
        .bind(window.retention_mode.to_string())
        .bind(window.retention_phase_id)
        .bind(window.draft_pool.as_ref().map(Json))
        .bind(window.pool_compiled_at)
        .bind(window.executed_at)
        .execute(&self.pool)
        .await
        .map_err(db_error("update draft window"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Draft window {} not found", window.id)));
        }
        Ok(())
    }

    async fn ensure_team_eligibility(
        &self,
        window_id: WindowId,
        team_ids: &[TeamId],
    ) -> Result<Vec<DraftWindowTeamEligibility>, AppError> {
        let mut tx = self.begin().await?;
        for team_id in team_ids {
            sqlx::query(
                "INSERT INTO draft_window_team_eligibility (window_id, team_id, is_remaining)
                 VALUES ($1, $2, TRUE) ON CONFLICT (window_id, team_id) DO NOTHING",
            )
            .bind(window_id)
            .bind(team_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("ensure team eligibility"))?;
        }

        let rows = sqlx::query(
            "SELECT window_id, team_id, is_remaining FROM draft_window_team_eligibility
             WHERE window_id = $1 ORDER BY team_id",
        )
        .bind(window_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(db_error("list team eligibility"))?;
        tx.commit().await.map_err(db_error("commit team eligibility"))?;

        rows.iter()
            .map(|row| {
                Ok(DraftWindowTeamEligibility {
                    window_id: row.try_get("window_id")?,
                    team_id: row.try_get("team_id")?,
                    is_remaining: row.try_get("is_remaining")?,
                })
            })
            .collect()
    }

    async fn set_team_eligibility(&self, row: DraftWindowTeamEligibility) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO draft_window_team_eligibility (window_id, team_id, is_remaining)
             VALUES ($1, $2, $3)
             ON CONFLICT (window_id, team_id) DO UPDATE SET is_remaining = EXCLUDED.is_remaining",
        )
        .bind(row.window_id)
        .bind(row.team_id)
        .bind(row.is_remaining)
        .execute(&self.pool)
        .await
        .map_err(db_error("set team eligibility"))?;
        Ok(())
    }

    async fn find_live_run(
        &self,
        window_id: WindowId,
        league_id: LeagueId,
    ) -> Result<Option<DraftWindowLeagueRun>, AppError> {
        sqlx::query(&format!(
            "SELECT {} FROM draft_window_league_runs
             WHERE window_id = $1 AND league_id = $2 AND NOT dry_run",
            RUN_COLUMNS
        ))
        .bind(window_id)
        .bind(league_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("find draft run"))?
        .as_ref()
        .map(run_from_row)
        .transpose()
    }

    #[instrument(skip(self, commit), fields(league_id = commit.league.id))]
    async fn commit_draft(&self, commit: &DraftCommit) -> Result<Vec<FantasySquad>, AppError> {
        let mut tx = self.begin().await?;
        lock_league(&mut tx, commit.league.id).await?;

        if let Some(run) = &commit.run {
            let existing: Option<uuid::Uuid> = sqlx::query_scalar(
                "SELECT id FROM draft_window_league_runs
                 WHERE window_id = $1 AND league_id = $2 AND NOT dry_run
                 FOR UPDATE",
            )
            .bind(run.window_id)
            .bind(run.league_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error("lock draft run"))?;

            if let Some(previous) = existing {
                if !commit.force_rerun {
                    warn!(window_id = run.window_id, league_id = run.league_id, "Draft run already recorded");
                    return Err(AppError::AlreadyRun(format!(
                        "Window {} already ran for league {}",
                        run.window_id, run.league_id
                    )));
                }
                sqlx::query("DELETE FROM draft_window_league_runs WHERE id = $1")
                    .bind(previous)
                    .execute(&mut *tx)
                    .await
                    .map_err(db_error("replace draft run"))?;
            }
        }

        write_league(&mut tx, &commit.league).await?;
        let written = write_squads(&mut tx, &commit.squads).await?;

        if let Some(run) = &commit.run {
            sqlx::query(
                "INSERT INTO draft_window_league_runs
                    (id, window_id, league_id, dry_run, executed_at, snapshot, result)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(run.id)
            .bind(run.window_id)
            .bind(run.league_id)
            .bind(run.dry_run)
            .bind(run.executed_at)
            .bind(Json(&run.snapshot))
            .bind(Json(&run.result))
            .execute(&mut *tx)
            .await
            .map_err(db_error("insert draft run"))?;

            sqlx::query("UPDATE draft_windows SET executed_at = $2 WHERE id = $1")
                .bind(run.window_id)
                .bind(run.executed_at)
                .execute(&mut *tx)
                .await
                .map_err(db_error("mark window executed"))?;
        }

        tx.commit().await.map_err(db_error("commit draft"))?;
        info!(squad_count = written.len(), "Draft committed");
        Ok(written)
    }
}
