use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{Postgres, Row, Transaction};
use tracing::{debug, instrument, warn};

use super::models::{
    DraftType, FantasyBoostRole, FantasyDraft, FantasyLeague, FantasySquad, SquadPhaseBoost,
};
use crate::shared::{AppError, LeagueId, PhaseId, SeasonId, SquadId};
use crate::storage::postgres::{db_error, lock_league, parse_column};
use crate::storage::{InMemoryStore, PostgresStore, StoreState};

/// Fantasy leagues, their squads and everything squads declare
#[async_trait]
pub trait LeagueRepository: Send + Sync {
    async fn create_league(&self, league: FantasyLeague) -> Result<FantasyLeague, AppError>;
    async fn get_league(&self, league_id: LeagueId) -> Result<Option<FantasyLeague>, AppError>;
    async fn list_leagues(&self, season_id: SeasonId) -> Result<Vec<FantasyLeague>, AppError>;
    async fn update_league(&self, league: &FantasyLeague) -> Result<(), AppError>;

    /// Fails with `Conflict` once the league holds `max_squads` squads
    async fn create_squad(&self, squad: FantasySquad) -> Result<FantasySquad, AppError>;
    async fn get_squad(&self, squad_id: SquadId) -> Result<Option<FantasySquad>, AppError>;
    /// Ordered by squad id
    async fn list_squads(&self, league_id: LeagueId) -> Result<Vec<FantasySquad>, AppError>;

    /// Writes roster and core-squad fields of every squad or none of them.
    /// Each squad's `version` must match the stored one, otherwise `Conflict`.
    /// Returns the squads with their new versions.
    async fn update_squads(&self, squads: &[FantasySquad])
        -> Result<Vec<FantasySquad>, AppError>;

    /// One row per (squad, draft type, role)
    async fn upsert_draft_preference(&self, draft: FantasyDraft)
        -> Result<FantasyDraft, AppError>;
    async fn list_draft_preferences(
        &self,
        league_id: LeagueId,
        draft_type: DraftType,
    ) -> Result<Vec<FantasyDraft>, AppError>;

    async fn create_boost_role(&self, role: FantasyBoostRole)
        -> Result<FantasyBoostRole, AppError>;
    async fn list_boost_roles(&self) -> Result<Vec<FantasyBoostRole>, AppError>;

    async fn upsert_phase_boost(&self, boost: SquadPhaseBoost) -> Result<(), AppError>;
    async fn get_phase_boost(
        &self,
        squad_id: SquadId,
        phase_id: PhaseId,
    ) -> Result<Option<SquadPhaseBoost>, AppError>;
}

/// Applies roster writes under an already-held write guard
pub(crate) fn apply_squad_updates(
    state: &mut StoreState,
    squads: &[FantasySquad],
) -> Result<Vec<FantasySquad>, AppError> {
    for squad in squads {
        let stored = state
            .squads
            .get(&squad.id)
            .ok_or_else(|| AppError::NotFound(format!("Squad {} not found", squad.id)))?;
        if stored.version != squad.version {
            warn!(
                squad_id = squad.id,
                expected = squad.version,
                actual = stored.version,
                "Stale squad write rejected"
            );
            return Err(AppError::Conflict(format!(
                "Squad {} was modified concurrently",
                squad.id
            )));
        }
    }

    let mut written = Vec::with_capacity(squads.len());
    for squad in squads {
        if let Some(stored) = state.squads.get_mut(&squad.id) {
            stored.current_squad = squad.current_squad.clone();
            stored.current_core_squad = squad.current_core_squad.clone();
            stored.future_core_squad = squad.future_core_squad.clone();
            stored.version += 1;
            written.push(stored.clone());
        }
    }
    Ok(written)
}

#[async_trait]
impl LeagueRepository for InMemoryStore {
    #[instrument(skip(self, league))]
    async fn create_league(&self, mut league: FantasyLeague) -> Result<FantasyLeague, AppError> {
        let mut state = self.write().await;
        league.id = state.next_id();
        state.leagues.insert(league.id, league.clone());
        debug!(league_id = league.id, name = %league.name, "League created in memory");
        Ok(league)
    }

    async fn get_league(&self, league_id: LeagueId) -> Result<Option<FantasyLeague>, AppError> {
        Ok(self.read().await.leagues.get(&league_id).cloned())
    }

    async fn list_leagues(&self, season_id: SeasonId) -> Result<Vec<FantasyLeague>, AppError> {
        Ok(self
            .read()
            .await
            .leagues
            .values()
            .filter(|l| l.season_id == season_id)
            .cloned()
            .collect())
    }

    async fn update_league(&self, league: &FantasyLeague) -> Result<(), AppError> {
        let mut state = self.write().await;
        match state.leagues.get_mut(&league.id) {
            Some(stored) => {
                *stored = league.clone();
                Ok(())
            }
            None => Err(AppError::NotFound(format!("League {} not found", league.id))),
        }
    }

    #[instrument(skip(self, squad))]
    async fn create_squad(&self, mut squad: FantasySquad) -> Result<FantasySquad, AppError> {
        let mut state = self.write().await;
        let league = state
            .leagues
            .get(&squad.league_id)
            .ok_or_else(|| AppError::NotFound(format!("League {} not found", squad.league_id)))?;

        let existing: Vec<&FantasySquad> = state
            .squads
            .values()
            .filter(|s| s.league_id == squad.league_id)
            .collect();
        if existing.len() >= league.max_squads.max(0) as usize {
            return Err(AppError::Conflict(format!(
                "League {} is full",
                squad.league_id
            )));
        }
        if existing.iter().any(|s| s.user_id == squad.user_id) {
            return Err(AppError::Conflict(format!(
                "User {} already has a squad in league {}",
                squad.user_id, squad.league_id
            )));
        }

        squad.id = state.next_id();
        squad.version = 0;
        squad.total_points = 0.0;
        state.squads.insert(squad.id, squad.clone());
        debug!(squad_id = squad.id, league_id = squad.league_id, "Squad created in memory");
        Ok(squad)
    }

    async fn get_squad(&self, squad_id: SquadId) -> Result<Option<FantasySquad>, AppError> {
        Ok(self.read().await.squads.get(&squad_id).cloned())
    }

    async fn list_squads(&self, league_id: LeagueId) -> Result<Vec<FantasySquad>, AppError> {
        Ok(self
            .read()
            .await
            .squads
            .values()
            .filter(|s| s.league_id == league_id)
            .cloned()
            .collect())
    }

    #[instrument(skip(self, squads), fields(squad_count = squads.len()))]
    async fn update_squads(
        &self,
        squads: &[FantasySquad],
    ) -> Result<Vec<FantasySquad>, AppError> {
        let mut state = self.write().await;
        apply_squad_updates(&mut state, squads)
    }

    async fn upsert_draft_preference(
        &self,
        mut draft: FantasyDraft,
    ) -> Result<FantasyDraft, AppError> {
        let mut state = self.write().await;
        let existing = state
            .draft_preferences
            .values()
            .find(|d| {
                d.squad_id == draft.squad_id
                    && d.draft_type == draft.draft_type
                    && d.role == draft.role
            })
            .map(|d| d.id);

        draft.id = match existing {
            Some(id) => id,
            None => state.next_id(),
        };
        state.draft_preferences.insert(draft.id, draft.clone());
        Ok(draft)
    }

    async fn list_draft_preferences(
        &self,
        league_id: LeagueId,
        draft_type: DraftType,
    ) -> Result<Vec<FantasyDraft>, AppError> {
        Ok(self
            .read()
            .await
            .draft_preferences
            .values()
            .filter(|d| d.league_id == league_id && d.draft_type == draft_type)
            .cloned()
            .collect())
    }

    async fn create_boost_role(
        &self,
        mut role: FantasyBoostRole,
    ) -> Result<FantasyBoostRole, AppError> {
        role.multipliers.validate()?;
        let mut state = self.write().await;
        role.id = state.next_id();
        state.boost_roles.insert(role.id, role.clone());
        Ok(role)
    }

    async fn list_boost_roles(&self) -> Result<Vec<FantasyBoostRole>, AppError> {
        Ok(self.read().await.boost_roles.values().cloned().collect())
    }

    async fn upsert_phase_boost(&self, boost: SquadPhaseBoost) -> Result<(), AppError> {
        let mut state = self.write().await;
        state
            .phase_boosts
            .insert((boost.squad_id, boost.phase_id), boost);
        Ok(())
    }

    async fn get_phase_boost(
        &self,
        squad_id: SquadId,
        phase_id: PhaseId,
    ) -> Result<Option<SquadPhaseBoost>, AppError> {
        Ok(self
            .read()
            .await
            .phase_boosts
            .get(&(squad_id, phase_id))
            .cloned())
    }
}

const LEAGUE_COLUMNS: &str = "id, season_id, name, max_squads, snake_draft_seed_order, \
     draft_seed_orders, draft_completed, mid_season_draft_pool";

const SQUAD_COLUMNS: &str = "id, league_id, user_id, name, current_squad, current_core_squad, \
     future_core_squad, total_points, version";

pub(crate) fn league_from_row(row: &PgRow) -> Result<FantasyLeague, AppError> {
    Ok(FantasyLeague {
        id: row.try_get("id")?,
        season_id: row.try_get("season_id")?,
        name: row.try_get("name")?,
        max_squads: row.try_get("max_squads")?,
        snake_draft_seed_order: row
            .try_get::<Option<Json<_>>, _>("snake_draft_seed_order")?
            .map(|order| order.0),
        draft_seed_orders: row.try_get::<Json<_>, _>("draft_seed_orders")?.0,
        draft_completed: row.try_get("draft_completed")?,
        mid_season_draft_pool: row
            .try_get::<Option<Json<_>>, _>("mid_season_draft_pool")?
            .map(|pool| pool.0),
    })
}

pub(crate) fn squad_from_row(row: &PgRow) -> Result<FantasySquad, AppError> {
    Ok(FantasySquad {
        id: row.try_get("id")?,
        league_id: row.try_get("league_id")?,
        user_id: row.try_get("user_id")?,
        name: row.try_get("name")?,
        current_squad: row.try_get::<Json<_>, _>("current_squad")?.0,
        current_core_squad: row.try_get::<Json<_>, _>("current_core_squad")?.0,
        future_core_squad: row.try_get::<Json<_>, _>("future_core_squad")?.0,
        total_points: row.try_get("total_points")?,
        version: row.try_get("version")?,
    })
}

fn draft_from_row(row: &PgRow) -> Result<FantasyDraft, AppError> {
    let draft_type: String = row.try_get("draft_type")?;
    let role: Option<String> = row.try_get("role")?;
    Ok(FantasyDraft {
        id: row.try_get("id")?,
        league_id: row.try_get("league_id")?,
        squad_id: row.try_get("squad_id")?,
        draft_type: parse_column(&draft_type, "draft_type")?,
        role: role.map(|r| parse_column(&r, "role")).transpose()?,
        order: row.try_get::<Json<_>, _>("order")?.0,
    })
}

fn boost_role_from_row(row: &PgRow) -> Result<FantasyBoostRole, AppError> {
    Ok(FantasyBoostRole {
        id: row.try_get("id")?,
        label: row.try_get("label")?,
        multipliers: row.try_get::<Json<_>, _>("multipliers")?.0,
        allowed_player_roles: row.try_get::<Json<_>, _>("allowed_player_roles")?.0,
    })
}

/// Writes league fields inside a caller-owned transaction
pub(crate) async fn write_league(
    tx: &mut Transaction<'static, Postgres>,
    league: &FantasyLeague,
) -> Result<(), AppError> {
    let result = sqlx::query(
        "UPDATE fantasy_leagues SET name = $2, max_squads = $3, snake_draft_seed_order = $4,
            draft_seed_orders = $5, draft_completed = $6, mid_season_draft_pool = $7
         WHERE id = $1",
    )
    .bind(league.id)
    .bind(&league.name)
    .bind(league.max_squads)
    .bind(league.snake_draft_seed_order.as_ref().map(Json))
    .bind(Json(&league.draft_seed_orders))
    .bind(league.draft_completed)
    .bind(league.mid_season_draft_pool.as_ref().map(Json))
    .execute(&mut **tx)
    .await
    .map_err(db_error("update league"))?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("League {} not found", league.id)));
    }
    Ok(())
}

/// Version-checked roster writes inside a caller-owned transaction
pub(crate) async fn write_squads(
    tx: &mut Transaction<'static, Postgres>,
    squads: &[FantasySquad],
) -> Result<Vec<FantasySquad>, AppError> {
    let mut written = Vec::with_capacity(squads.len());
    for squad in squads {
        let row = sqlx::query(&format!(
            "UPDATE fantasy_squads SET current_squad = $2, current_core_squad = $3,
                future_core_squad = $4, version = version + 1
             WHERE id = $1 AND version = $5
             RETURNING {}",
            SQUAD_COLUMNS
        ))
        .bind(squad.id)
        .bind(Json(&squad.current_squad))
        .bind(Json(&squad.current_core_squad))
        .bind(Json(&squad.future_core_squad))
        .bind(squad.version)
        .fetch_optional(&mut **tx)
        .await
        .map_err(db_error("update squad"))?;

        match row {
            Some(row) => written.push(squad_from_row(&row)?),
            None => {
                warn!(squad_id = squad.id, version = squad.version, "Stale squad write rejected");
                return Err(AppError::Conflict(format!(
                    "Squad {} was modified concurrently",
                    squad.id
                )));
            }
        }
    }
    Ok(written)
}

#[async_trait]
impl LeagueRepository for PostgresStore {
    #[instrument(skip(self, league))]
    async fn create_league(&self, mut league: FantasyLeague) -> Result<FantasyLeague, AppError> {
        league.id = sqlx::query_scalar(
            "INSERT INTO fantasy_leagues (season_id, name, max_squads, snake_draft_seed_order,
                draft_seed_orders, draft_completed, mid_season_draft_pool)
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
        )
        .bind(league.season_id)
        .bind(&league.name)
        .bind(league.max_squads)
        .bind(league.snake_draft_seed_order.as_ref().map(Json))
        .bind(Json(&league.draft_seed_orders))
        .bind(league.draft_completed)
        .bind(league.mid_season_draft_pool.as_ref().map(Json))
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("create league"))?;

        debug!(league_id = league.id, "League created in database");
        Ok(league)
    }

    async fn get_league(&self, league_id: LeagueId) -> Result<Option<FantasyLeague>, AppError> {
        sqlx::query(&format!(
            "SELECT {} FROM fantasy_leagues WHERE id = $1",
            LEAGUE_COLUMNS
        ))
        .bind(league_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("get league"))?
        .as_ref()
        .map(league_from_row)
        .transpose()
    }

    async fn list_leagues(&self, season_id: SeasonId) -> Result<Vec<FantasyLeague>, AppError> {
        sqlx::query(&format!(
            "SELECT {} FROM fantasy_leagues WHERE season_id = $1 ORDER BY id",
            LEAGUE_COLUMNS
        ))
        .bind(season_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list leagues"))?
        .iter()
        .map(league_from_row)
        .collect()
    }

    async fn update_league(&self, league: &FantasyLeague) -> Result<(), AppError> {
        let mut tx = self.begin().await?;
        write_league(&mut tx, league).await?;
        tx.commit().await.map_err(db_error("commit league"))?;
        Ok(())
    }

    #[instrument(skip(self, squad))]
    async fn create_squad(&self, mut squad: FantasySquad) -> Result<FantasySquad, AppError> {
        let mut tx = self.begin().await?;
        lock_league(&mut tx, squad.league_id).await?;

        let capacity: Option<(i32, i64)> = sqlx::query_as(
            "SELECT l.max_squads, (SELECT COUNT(*) FROM fantasy_squads s WHERE s.league_id = l.id)
             FROM fantasy_leagues l WHERE l.id = $1",
        )
        .bind(squad.league_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error("count squads"))?;

        let (max_squads, count) = capacity
            .ok_or_else(|| AppError::NotFound(format!("League {} not found", squad.league_id)))?;
        if count >= max_squads as i64 {
            return Err(AppError::Conflict(format!("League {} is full", squad.league_id)));
        }

        squad.id = sqlx::query_scalar(
            "INSERT INTO fantasy_squads (league_id, user_id, name, current_squad,
                current_core_squad, future_core_squad, total_points, version)
             VALUES ($1, $2, $3, $4, $5, $6, 0, 0) RETURNING id",
        )
        .bind(squad.league_id)
        .bind(squad.user_id)
        .bind(&squad.name)
        .bind(Json(&squad.current_squad))
        .bind(Json(&squad.current_core_squad))
        .bind(Json(&squad.future_core_squad))
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("create squad"))?;

        tx.commit().await.map_err(db_error("commit squad"))?;
        squad.version = 0;
        squad.total_points = 0.0;
        Ok(squad)
    }

    async fn get_squad(&self, squad_id: SquadId) -> Result<Option<FantasySquad>, AppError> {
        sqlx::query(&format!(
            "SELECT {} FROM fantasy_squads WHERE id = $1",
            SQUAD_COLUMNS
        ))
        .bind(squad_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("get squad"))?
        .as_ref()
        .map(squad_from_row)
        .transpose()
    }

    async fn list_squads(&self, league_id: LeagueId) -> Result<Vec<FantasySquad>, AppError> {
        sqlx::query(&format!(
            "SELECT {} FROM fantasy_squads WHERE league_id = $1 ORDER BY id",
            SQUAD_COLUMNS
        ))
        .bind(league_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list squads"))?
        .iter()
        .map(squad_from_row)
        .collect()
    }

    #[instrument(skip(self, squads), fields(squad_count = squads.len()))]
    async fn update_squads(
        &self,
        squads: &[FantasySquad],
    ) -> Result<Vec<FantasySquad>, AppError> {
        let mut tx = self.begin().await?;
        let written = write_squads(&mut tx, squads).await?;
        tx.commit().await.map_err(db_error("commit squads"))?;
        Ok(written)
    }

    async fn upsert_draft_preference(
        &self,
        mut draft: FantasyDraft,
    ) -> Result<FantasyDraft, AppError> {
        draft.id = sqlx::query_scalar(
            r#"INSERT INTO fantasy_drafts (league_id, squad_id, draft_type, role, "order")
               VALUES ($1, $2, $3, $4, $5)
               ON CONFLICT (squad_id, draft_type, role) DO UPDATE SET "order" = EXCLUDED."order"
               RETURNING id"#,
        )
        .bind(draft.league_id)
        .bind(draft.squad_id)
        .bind(draft.draft_type.to_string())
        .bind(draft.role.map(|r| r.to_string()))
        .bind(Json(&draft.order))
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("upsert draft preference"))?;
        Ok(draft)
    }

    async fn list_draft_preferences(
        &self,
        league_id: LeagueId,
        draft_type: DraftType,
    ) -> Result<Vec<FantasyDraft>, AppError> {
        sqlx::query(
            r#"SELECT id, league_id, squad_id, draft_type, role, "order" FROM fantasy_drafts
               WHERE league_id = $1 AND draft_type = $2 ORDER BY id"#,
        )
        .bind(league_id)
        .bind(draft_type.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list draft preferences"))?
        .iter()
        .map(draft_from_row)
        .collect()
    }

    async fn create_boost_role(
        &self,
        mut role: FantasyBoostRole,
    ) -> Result<FantasyBoostRole, AppError> {
        role.multipliers.validate()?;
        role.id = sqlx::query_scalar(
            "INSERT INTO fantasy_boost_roles (label, multipliers, allowed_player_roles)
             VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&role.label)
        .bind(Json(&role.multipliers))
        .bind(Json(&role.allowed_player_roles))
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("create boost role"))?;
        Ok(role)
    }

    async fn list_boost_roles(&self) -> Result<Vec<FantasyBoostRole>, AppError> {
        sqlx::query("SELECT id, label, multipliers, allowed_player_roles FROM fantasy_boost_roles ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("list boost roles"))?
            .iter()
            .map(boost_role_from_row)
            .collect()
    }

    async fn upsert_phase_boost(&self, boost: SquadPhaseBoost) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO squad_phase_boosts (squad_id, phase_id, assignments) VALUES ($1, $2, $3)
             ON CONFLICT (squad_id, phase_id) DO UPDATE SET assignments = EXCLUDED.assignments",
        )
        .bind(boost.squad_id)
        .bind(boost.phase_id)
        .bind(Json(&boost.assignments))
        .execute(&self.pool)
        .await
        .map_err(db_error("upsert phase boost"))?;
        Ok(())
    }

    async fn get_phase_boost(
        &self,
        squad_id: SquadId,
        phase_id: PhaseId,
    ) -> Result<Option<SquadPhaseBoost>, AppError> {
        let row = sqlx::query(
            "SELECT assignments FROM squad_phase_boosts WHERE squad_id = $1 AND phase_id = $2",
        )
        .bind(squad_id)
        .bind(phase_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("get phase boost"))?;

        row.map(|row| -> Result<SquadPhaseBoost, AppError> {
            Ok(SquadPhaseBoost {
                squad_id,
                phase_id,
                assignments: row.try_get::<Json<_>, _>("assignments")?.0,
            })
        })
        .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    async fn league_with_squads(store: &InMemoryStore, count: i64) -> (FantasyLeague, Vec<FantasySquad>) {
        let league = store
            .create_league(FantasyLeague {
                id: 0,
                season_id: 1,
                name: "Office League".into(),
                max_squads: count as i32,
                snake_draft_seed_order: None,
                draft_seed_orders: BTreeMap::new(),
                draft_completed: false,
                mid_season_draft_pool: None,
            })
            .await
            .unwrap();

        let mut squads = Vec::new();
        for user_id in 1..=count {
            squads.push(
                store
                    .create_squad(FantasySquad {
                        id: 0,
                        league_id: league.id,
                        user_id,
                        name: format!("Squad {}", user_id),
                        current_squad: vec![],
                        current_core_squad: vec![],
                        future_core_squad: vec![],
                        total_points: 0.0,
                        version: 0,
                    })
                    .await
                    .unwrap(),
            );
        }
        (league, squads)
    }

    #[tokio::test]
    async fn full_league_rejects_new_squads() {
        let store = InMemoryStore::new();
        let (league, squads) = league_with_squads(&store, 2).await;

        let extra = FantasySquad {
            user_id: 99,
            ..squads[0].clone()
        };
        let result = store.create_squad(extra).await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert_eq!(store.list_squads(league.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn stale_roster_write_is_a_conflict_and_writes_nothing() {
        let store = InMemoryStore::new();
        let (_, squads) = league_with_squads(&store, 2).await;

        let mut first = squads[0].clone();
        first.current_squad = vec![1, 2];
        let written = store.update_squads(&[first.clone()]).await.unwrap();
        assert_eq!(written[0].version, 1);

        // Second writer still holds version 0 of the first squad
        let mut second = squads[1].clone();
        second.current_squad = vec![3];
        first.current_squad = vec![4];
        let result = store.update_squads(&[second, first]).await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
        let untouched = store.get_squad(squads[1].id).await.unwrap().unwrap();
        assert!(untouched.current_squad.is_empty());
        assert_eq!(untouched.version, 0);
    }

    #[tokio::test]
    async fn draft_preferences_are_upserted_per_role() {
        let store = InMemoryStore::new();
        let (league, squads) = league_with_squads(&store, 1).await;

        let pref = FantasyDraft {
            id: 0,
            league_id: league.id,
            squad_id: squads[0].id,
            draft_type: DraftType::MidSeason,
            role: None,
            order: vec![5, 6],
        };
        let first = store.upsert_draft_preference(pref.clone()).await.unwrap();
        let second = store
            .upsert_draft_preference(FantasyDraft { order: vec![7], ..pref })
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        let stored = store
            .list_draft_preferences(league.id, DraftType::MidSeason)
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].order, vec![7]);
    }
}
