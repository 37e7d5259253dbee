use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::Row;
use tracing::{debug, instrument};

use super::models::{
    FantasyMatchEvent, FantasyPlayerEvent, MatchScoringBatch, PlayerMatchEvent,
    PlayerMatchEventWrite,
};
use super::rules::PointsBreakdown;
use crate::shared::{AppError, MatchId, SquadId};
use crate::storage::postgres::db_error;
use crate::storage::{InMemoryStore, PostgresStore};

/// Raw performance rows and every row the scoring pipeline derives from them
#[async_trait]
pub trait ScoringRepository: Send + Sync {
    /// Get-or-create by (player, match), overwriting raw columns and points
    async fn upsert_player_match_events(
        &self,
        events: &[PlayerMatchEventWrite],
    ) -> Result<Vec<PlayerMatchEvent>, AppError>;
    async fn list_player_match_events(
        &self,
        match_id: MatchId,
    ) -> Result<Vec<PlayerMatchEvent>, AppError>;
    async fn list_player_match_events_for_matches(
        &self,
        match_ids: &[MatchId],
    ) -> Result<Vec<PlayerMatchEvent>, AppError>;

    /// All rows for the squads, optionally narrowed to one match
    async fn list_fantasy_player_events(
        &self,
        squad_ids: &[SquadId],
        match_id: Option<MatchId>,
    ) -> Result<Vec<FantasyPlayerEvent>, AppError>;
    async fn list_fantasy_match_events(
        &self,
        squad_ids: &[SquadId],
    ) -> Result<Vec<FantasyMatchEvent>, AppError>;

    /// Upserts fantasy rows and rewrites squad totals in one unit
    async fn commit_match_scoring(&self, batch: &MatchScoringBatch) -> Result<(), AppError>;
}

#[async_trait]
impl ScoringRepository for InMemoryStore {
    #[instrument(skip(self, events), fields(event_count = events.len()))]
    async fn upsert_player_match_events(
        &self,
        events: &[PlayerMatchEventWrite],
    ) -> Result<Vec<PlayerMatchEvent>, AppError> {
        let mut state = self.write().await;
        let mut stored = Vec::with_capacity(events.len());

        for event in events {
            let existing = state
                .player_match_events
                .values()
                .find(|e| e.player_id == event.player_id && e.match_id == event.match_id)
                .map(|e| e.id);
            let id = match existing {
                Some(id) => id,
                None => state.next_id(),
            };

            let row = PlayerMatchEvent {
                id,
                player_id: event.player_id,
                match_id: event.match_id,
                team_id: event.team_id,
                raw: event.raw.clone(),
                points: event.points,
            };
            state.player_match_events.insert(id, row.clone());
            stored.push(row);
        }

        Ok(stored)
    }

    async fn list_player_match_events(
        &self,
        match_id: MatchId,
    ) -> Result<Vec<PlayerMatchEvent>, AppError> {
        Ok(self
            .read()
            .await
            .player_match_events
            .values()
            .filter(|e| e.match_id == match_id)
            .cloned()
            .collect())
    }

    async fn list_player_match_events_for_matches(
        &self,
        match_ids: &[MatchId],
    ) -> Result<Vec<PlayerMatchEvent>, AppError> {
        Ok(self
            .read()
            .await
            .player_match_events
            .values()
            .filter(|e| match_ids.contains(&e.match_id))
            .cloned()
            .collect())
    }

    async fn list_fantasy_player_events(
        &self,
        squad_ids: &[SquadId],
        match_id: Option<MatchId>,
    ) -> Result<Vec<FantasyPlayerEvent>, AppError> {
        Ok(self
            .read()
            .await
            .fantasy_player_events
            .values()
            .filter(|e| squad_ids.contains(&e.squad_id))
            .filter(|e| match_id.map_or(true, |m| e.match_id == m))
            .cloned()
            .collect())
    }

    async fn list_fantasy_match_events(
        &self,
        squad_ids: &[SquadId],
    ) -> Result<Vec<FantasyMatchEvent>, AppError> {
        Ok(self
            .read()
            .await
            .fantasy_match_events
            .values()
            .filter(|e| squad_ids.contains(&e.squad_id))
            .cloned()
            .collect())
    }

    #[instrument(skip(self, batch), fields(match_id = batch.match_id))]
    async fn commit_match_scoring(&self, batch: &MatchScoringBatch) -> Result<(), AppError> {
        let mut state = self.write().await;

        if let Some((squad_id, _)) = batch
            .squad_totals
            .iter()
            .find(|(squad_id, _)| !state.squads.contains_key(squad_id))
        {
            return Err(AppError::NotFound(format!("Squad {} not found", squad_id)));
        }

        for event in &batch.player_events {
            state
                .fantasy_player_events
                .insert((event.squad_id, event.player_match_event_id), event.clone());
        }
        for event in &batch.match_events {
            state
                .fantasy_match_events
                .insert((event.squad_id, event.match_id), event.clone());
        }
        for (squad_id, total) in &batch.squad_totals {
            if let Some(squad) = state.squads.get_mut(squad_id) {
                squad.total_points = *total;
            }
        }

        debug!(
            player_events = batch.player_events.len(),
            match_events = batch.match_events.len(),
            "Match scoring committed in memory"
        );
        Ok(())
    }
}

const PME_COLUMNS: &str = "id, player_id, match_id, team_id, raw, batting_points, \
     bowling_points, fielding_points, other_points, total_points_all";

const FPE_COLUMNS: &str =
    "squad_id, player_match_event_id, player_id, match_id, boost_role_id, base_points, boost_points";

const FME_COLUMNS: &str = "squad_id, match_id, league_id, total_base_points, total_boost_points, \
     total_points, players_count, match_rank, running_rank, running_total_points";

fn player_event_from_row(row: &PgRow) -> Result<PlayerMatchEvent, AppError> {
    Ok(PlayerMatchEvent {
        id: row.try_get("id")?,
        player_id: row.try_get("player_id")?,
        match_id: row.try_get("match_id")?,
        team_id: row.try_get("team_id")?,
        raw: row.try_get::<Json<_>, _>("raw")?.0,
        points: PointsBreakdown {
            batting: row.try_get("batting_points")?,
            bowling: row.try_get("bowling_points")?,
            fielding: row.try_get("fielding_points")?,
            other: row.try_get("other_points")?,
            total: row.try_get("total_points_all")?,
        },
    })
}

fn fantasy_player_event_from_row(row: &PgRow) -> Result<FantasyPlayerEvent, AppError> {
    Ok(FantasyPlayerEvent {
        squad_id: row.try_get("squad_id")?,
        player_match_event_id: row.try_get("player_match_event_id")?,
        player_id: row.try_get("player_id")?,
        match_id: row.try_get("match_id")?,
        boost_role_id: row.try_get("boost_role_id")?,
        base_points: row.try_get("base_points")?,
        boost_points: row.try_get("boost_points")?,
    })
}

fn fantasy_match_event_from_row(row: &PgRow) -> Result<FantasyMatchEvent, AppError> {
    Ok(FantasyMatchEvent {
        squad_id: row.try_get("squad_id")?,
        match_id: row.try_get("match_id")?,
        league_id: row.try_get("league_id")?,
        total_base_points: row.try_get("total_base_points")?,
        total_boost_points: row.try_get("total_boost_points")?,
        total_points: row.try_get("total_points")?,
        players_count: row.try_get("players_count")?,
        match_rank: row.try_get("match_rank")?,
        running_rank: row.try_get("running_rank")?,
        running_total_points: row.try_get("running_total_points")?,
    })
}

#[async_trait]
impl ScoringRepository for PostgresStore {
    #[instrument(skip(self, events), fields(event_count = events.len()))]
    async fn upsert_player_match_events(
        &self,
        events: &[PlayerMatchEventWrite],
    ) -> Result<Vec<PlayerMatchEvent>, AppError> {
        let mut tx = self.begin().await?;
        let mut stored = Vec::with_capacity(events.len());

        for event in events {
            let row = sqlx::query(&format!(
                "INSERT INTO player_match_events (player_id, match_id, team_id, raw, batting_points,
                    bowling_points, fielding_points, other_points, total_points_all)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                 ON CONFLICT (player_id, match_id) DO UPDATE SET
                    team_id = EXCLUDED.team_id, raw = EXCLUDED.raw,
                    batting_points = EXCLUDED.batting_points,
                    bowling_points = EXCLUDED.bowling_points,
                    fielding_points = EXCLUDED.fielding_points,
                    other_points = EXCLUDED.other_points,
                    total_points_all = EXCLUDED.total_points_all
                 RETURNING {}",
                PME_COLUMNS
            ))
            .bind(event.player_id)
            .bind(event.match_id)
            .bind(event.team_id)
            .bind(Json(&event.raw))
            .bind(event.points.batting)
            .bind(event.points.bowling)
            .bind(event.points.fielding)
            .bind(event.points.other)
            .bind(event.points.total)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error("upsert player match event"))?;

            stored.push(player_event_from_row(&row)?);
        }

        tx.commit()
            .await
            .map_err(db_error("commit player match events"))?;
        Ok(stored)
    }

    async fn list_player_match_events(
        &self,
        match_id: MatchId,
    ) -> Result<Vec<PlayerMatchEvent>, AppError> {
        sqlx::query(&format!(
            "SELECT {} FROM player_match_events WHERE match_id = $1 ORDER BY id",
            PME_COLUMNS
        ))
        .bind(match_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list player match events"))?
        .iter()
        .map(player_event_from_row)
        .collect()
    }

    async fn list_player_match_events_for_matches(
        &self,
        match_ids: &[MatchId],
    ) -> Result<Vec<PlayerMatchEvent>, AppError> {
        sqlx::query(&format!(
            "SELECT {} FROM player_match_events WHERE match_id = ANY($1) ORDER BY id",
            PME_COLUMNS
        ))
        .bind(match_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list player match events"))?
        .iter()
        .map(player_event_from_row)
        .collect()
    }

    async fn list_fantasy_player_events(
        &self,
        squad_ids: &[SquadId],
        match_id: Option<MatchId>,
    ) -> Result<Vec<FantasyPlayerEvent>, AppError> {
        sqlx::query(&format!(
            "SELECT {} FROM fantasy_player_events
             WHERE squad_id = ANY($1) AND ($2::BIGINT IS NULL OR match_id = $2)
             ORDER BY squad_id, player_match_event_id",
            FPE_COLUMNS
        ))
        .bind(squad_ids)
        .bind(match_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list fantasy player events"))?
        .iter()
        .map(fantasy_player_event_from_row)
        .collect()
    }

    async fn list_fantasy_match_events(
        &self,
        squad_ids: &[SquadId],
    ) -> Result<Vec<FantasyMatchEvent>, AppError> {
        sqlx::query(&format!(
            "SELECT {} FROM fantasy_match_events WHERE squad_id = ANY($1) ORDER BY squad_id, match_id",
            FME_COLUMNS
        ))
        .bind(squad_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list fantasy match events"))?
        .iter()
        .map(fantasy_match_event_from_row)
        .collect()
    }

    #[instrument(skip(self, batch), fields(match_id = batch.match_id))]
    async fn commit_match_scoring(&self, batch: &MatchScoringBatch) -> Result<(), AppError> {
        let mut tx = self.begin().await?;

        // Row locks on every squad whose total is rewritten, in id order
        let mut squad_ids: Vec<SquadId> = batch.squad_totals.iter().map(|(id, _)| *id).collect();
        squad_ids.sort_unstable();
        sqlx::query("SELECT id FROM fantasy_squads WHERE id = ANY($1) ORDER BY id FOR UPDATE")
            .bind(&squad_ids)
            .fetch_all(&mut *tx)
            .await
            .map_err(db_error("lock squads"))?;

        for event in &batch.player_events {
            sqlx::query(
                "INSERT INTO fantasy_player_events (squad_id, player_match_event_id, player_id,
                    match_id, boost_role_id, base_points, boost_points)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)
                 ON CONFLICT (squad_id, player_match_event_id) DO UPDATE SET
                    boost_role_id = EXCLUDED.boost_role_id,
                    base_points = EXCLUDED.base_points,
                    boost_points = EXCLUDED.boost_points",
            )
            .bind(event.squad_id)
            .bind(event.player_match_event_id)
            .bind(event.player_id)
            .bind(event.match_id)
            .bind(event.boost_role_id)
            .bind(event.base_points)
            .bind(event.boost_points)
            .execute(&mut *tx)
            .await
            .map_err(db_error("upsert fantasy player event"))?;
        }

        for event in &batch.match_events {
            sqlx::query(
                "INSERT INTO fantasy_match_events (squad_id, match_id, league_id, total_base_points,
                    total_boost_points, total_points, players_count, match_rank, running_rank,
                    running_total_points)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                 ON CONFLICT (squad_id, match_id) DO UPDATE SET
                    total_base_points = EXCLUDED.total_base_points,
                    total_boost_points = EXCLUDED.total_boost_points,
                    total_points = EXCLUDED.total_points,
                    players_count = EXCLUDED.players_count,
                    match_rank = EXCLUDED.match_rank,
                    running_rank = EXCLUDED.running_rank,
                    running_total_points = EXCLUDED.running_total_points",
            )
            .bind(event.squad_id)
            .bind(event.match_id)
            .bind(event.league_id)
            .bind(event.total_base_points)
            .bind(event.total_boost_points)
            .bind(event.total_points)
            .bind(event.players_count)
            .bind(event.match_rank)
            .bind(event.running_rank)
            .bind(event.running_total_points)
            .execute(&mut *tx)
            .await
            .map_err(db_error("upsert fantasy match event"))?;
        }

        for (squad_id, total) in &batch.squad_totals {
            sqlx::query("UPDATE fantasy_squads SET total_points = $2 WHERE id = $1")
                .bind(squad_id)
                .bind(total)
                .execute(&mut *tx)
                .await
                .map_err(db_error("update squad total"))?;
        }

        tx.commit().await.map_err(db_error("commit match scoring"))?;
        debug!(
            player_events = batch.player_events.len(),
            match_events = batch.match_events.len(),
            "Match scoring committed in database"
        );
        Ok(())
    }
}
