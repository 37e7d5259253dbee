use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::Row;
use tracing::{debug, info, instrument, warn};

use super::models::{FantasyTrade, TradeStatus};
use crate::league::repository::{apply_squad_updates, write_squads};
use crate::league::FantasySquad;
use crate::shared::{AppError, LeagueId, TradeId};
use crate::storage::postgres::{db_error, lock_league, parse_column};
use crate::storage::{InMemoryStore, PostgresStore};

#[async_trait]
pub trait TradeRepository: Send + Sync {
    async fn create_trade(&self, trade: FantasyTrade) -> Result<FantasyTrade, AppError>;
    async fn get_trade(&self, trade_id: TradeId) -> Result<Option<FantasyTrade>, AppError>;
    /// Ordered by trade id
    async fn list_trades(
        &self,
        league_id: LeagueId,
        status: Option<TradeStatus>,
    ) -> Result<Vec<FantasyTrade>, AppError>;

    /// Moves a pending trade to `Accepted` and every still-pending trade in
    /// `rejected` to `Rejected` in one unit
    async fn accept_trade(
        &self,
        trade_id: TradeId,
        rejected: &[TradeId],
        now: DateTime<Utc>,
    ) -> Result<FantasyTrade, AppError>;

    async fn reject_trade(
        &self,
        trade_id: TradeId,
        now: DateTime<Utc>,
    ) -> Result<FantasyTrade, AppError>;

    /// Writes both rosters and closes an accepted trade in one unit
    async fn close_trade(
        &self,
        trade_id: TradeId,
        squads: &[FantasySquad],
        now: DateTime<Utc>,
    ) -> Result<FantasyTrade, AppError>;
}

fn expect_status(trade: &FantasyTrade, expected: TradeStatus) -> Result<(), AppError> {
    if trade.status != expected {
        warn!(trade_id = trade.id, status = %trade.status, %expected, "Trade in unexpected state");
        return Err(AppError::Conflict(format!(
            "Trade {} is {}, expected {}",
            trade.id, trade.status, expected
        )));
    }
    Ok(())
}

#[async_trait]
impl TradeRepository for InMemoryStore {
    #[instrument(skip(self, trade))]
    async fn create_trade(&self, mut trade: FantasyTrade) -> Result<FantasyTrade, AppError> {
        let mut state = self.write().await;
        trade.id = state.next_id();
        state.trades.insert(trade.id, trade.clone());
        debug!(trade_id = trade.id, league_id = trade.league_id, "Trade created");
        Ok(trade)
    }

    async fn get_trade(&self, trade_id: TradeId) -> Result<Option<FantasyTrade>, AppError> {
        Ok(self.read().await.trades.get(&trade_id).cloned())
    }

    async fn list_trades(
        &self,
        league_id: LeagueId,
        status: Option<TradeStatus>,
    ) -> Result<Vec<FantasyTrade>, AppError> {
        Ok(self
            .read()
            .await
            .trades
            .values()
            .filter(|t| t.league_id == league_id && status.map_or(true, |s| t.status == s))
            .cloned()
            .collect())
    }

    #[instrument(skip(self, rejected))]
    async fn accept_trade(
        &self,
        trade_id: TradeId,
        rejected: &[TradeId],
        now: DateTime<Utc>,
    ) -> Result<FantasyTrade, AppError> {
        let mut state = self.write().await;
        let trade = state
            .trades
            .get(&trade_id)
            .ok_or_else(|| AppError::NotFound(format!("Trade {} not found", trade_id)))?;
        expect_status(trade, TradeStatus::Pending)?;

        for id in rejected {
            if let Some(other) = state.trades.get_mut(id) {
                if other.status == TradeStatus::Pending {
                    other.status = TradeStatus::Rejected;
                    other.updated_at = now;
                }
            }
        }

        let mut accepted = None;
        if let Some(trade) = state.trades.get_mut(&trade_id) {
            trade.status = TradeStatus::Accepted;
            trade.updated_at = now;
            accepted = Some(trade.clone());
        }
        accepted.ok_or(AppError::Internal)
    }

    async fn reject_trade(
        &self,
        trade_id: TradeId,
        now: DateTime<Utc>,
    ) -> Result<FantasyTrade, AppError> {
        let mut state = self.write().await;
        let trade = state
            .trades
            .get_mut(&trade_id)
            .ok_or_else(|| AppError::NotFound(format!("Trade {} not found", trade_id)))?;
        expect_status(trade, TradeStatus::Pending)?;

        trade.status = TradeStatus::Rejected;
        trade.updated_at = now;
        Ok(trade.clone())
    }

    #[instrument(skip(self, squads))]
    async fn close_trade(
        &self,
        trade_id: TradeId,
        squads: &[FantasySquad],
        now: DateTime<Utc>,
    ) -> Result<FantasyTrade, AppError> {
        let mut state = self.write().await;
        let trade = state
            .trades
            .get(&trade_id)
            .ok_or_else(|| AppError::NotFound(format!("Trade {} not found", trade_id)))?;
        expect_status(trade, TradeStatus::Accepted)?;

        apply_squad_updates(&mut state, squads)?;

        let mut closed = None;
        if let Some(trade) = state.trades.get_mut(&trade_id) {
            trade.status = TradeStatus::Closed;
            trade.updated_at = now;
            closed = Some(trade.clone());
        }
        info!(trade_id, "Trade closed");
        closed.ok_or(AppError::Internal)
    }
}

const TRADE_COLUMNS: &str = "id, league_id, initiator_id, receiver_id, players_given, \
     players_received, status, created_at, updated_at";

fn trade_from_row(row: &PgRow) -> Result<FantasyTrade, AppError> {
    let status: String = row.try_get("status")?;
    Ok(FantasyTrade {
        id: row.try_get("id")?,
        league_id: row.try_get("league_id")?,
        initiator_id: row.try_get("initiator_id")?,
        receiver_id: row.try_get("receiver_id")?,
        players_given: row.try_get::<Json<_>, _>("players_given")?.0,
        players_received: row.try_get::<Json<_>, _>("players_received")?.0,
        status: parse_column(&status, "status")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

impl PostgresStore {
    /// Loads a trade row locked for the rest of the transaction
    async fn lock_trade(
        tx: &mut sqlx::Transaction<'static, sqlx::Postgres>,
        trade_id: TradeId,
    ) -> Result<FantasyTrade, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM fantasy_trades WHERE id = $1 FOR UPDATE",
            TRADE_COLUMNS
        ))
        .bind(trade_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(db_error("lock trade"))?
        .ok_or_else(|| AppError::NotFound(format!("Trade {} not found", trade_id)))?;
        trade_from_row(&row)
    }

    async fn set_trade_status(
        tx: &mut sqlx::Transaction<'static, sqlx::Postgres>,
        trade_id: TradeId,
        status: TradeStatus,
        now: DateTime<Utc>,
    ) -> Result<FantasyTrade, AppError> {
        let row = sqlx::query(&format!(
            "UPDATE fantasy_trades SET status = $2, updated_at = $3 WHERE id = $1 RETURNING {}",
            TRADE_COLUMNS
        ))
        .bind(trade_id)
        .bind(status.to_string())
        .bind(now)
        .fetch_one(&mut **tx)
        .await
        .map_err(db_error("update trade status"))?;
        trade_from_row(&row)
    }
}

#[async_trait]
impl TradeRepository for PostgresStore {
    #[instrument(skip(self, trade))]
    async fn create_trade(&self, mut trade: FantasyTrade) -> Result<FantasyTrade, AppError> {
        trade.id = sqlx::query_scalar(
            "INSERT INTO fantasy_trades (league_id, initiator_id, receiver_id, players_given,
                players_received, status, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING id",
        )
        .bind(trade.league_id)
        .bind(trade.initiator_id)
        .bind(trade.receiver_id)
        .bind(Json(&trade.players_given))
        .bind(Json(&trade.players_received))
        .bind(trade.status.to_string())
        .bind(trade.created_at)
        .bind(trade.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("create trade"))?;

        Ok(trade)
    }

    async fn get_trade(&self, trade_id: TradeId) -> Result<Option<FantasyTrade>, AppError> {
        sqlx::query(&format!(
            "SELECT {} FROM fantasy_trades WHERE id = $1",
            TRADE_COLUMNS
        ))
        .bind(trade_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("get trade"))?
        .as_ref()
        .map(trade_from_row)
        .transpose()
    }

    async fn list_trades(
        &self,
        league_id: LeagueId,
        status: Option<TradeStatus>,
    ) -> Result<Vec<FantasyTrade>, AppError> {
        sqlx::query(&format!(
            "SELECT {} FROM fantasy_trades
             WHERE league_id = $1 AND ($2::TEXT IS NULL OR status = $2)
             ORDER BY id",
            TRADE_COLUMNS
        ))
        .bind(league_id)
        .bind(status.map(|s| s.to_string()))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list trades"))?
        .iter()
        .map(trade_from_row)
        .collect()
    }

    #[instrument(skip(self, rejected))]
    async fn accept_trade(
        &self,
        trade_id: TradeId,
        rejected: &[TradeId],
        now: DateTime<Utc>,
    ) -> Result<FantasyTrade, AppError> {
        let mut tx = self.begin().await?;
        let trade = Self::lock_trade(&mut tx, trade_id).await?;
        lock_league(&mut tx, trade.league_id).await?;
        expect_status(&trade, TradeStatus::Pending)?;

        sqlx::query(
            "UPDATE fantasy_trades SET status = $2, updated_at = $3
             WHERE id = ANY($1) AND status = $4",
        )
        .bind(rejected)
        .bind(TradeStatus::Rejected.to_string())
        .bind(now)
        .bind(TradeStatus::Pending.to_string())
        .execute(&mut *tx)
        .await
        .map_err(db_error("reject conflicting trades"))?;

        let accepted = Self::set_trade_status(&mut tx, trade_id, TradeStatus::Accepted, now).await?;
        tx.commit().await.map_err(db_error("commit accept"))?;
        Ok(accepted)
    }

    async fn reject_trade(
        &self,
        trade_id: TradeId,
        now: DateTime<Utc>,
    ) -> Result<FantasyTrade, AppError> {
        let mut tx = self.begin().await?;
        let trade = Self::lock_trade(&mut tx, trade_id).await?;
        expect_status(&trade, TradeStatus::Pending)?;

        let rejected = Self::set_trade_status(&mut tx, trade_id, TradeStatus::Rejected, now).await?;
        tx.commit().await.map_err(db_error("commit reject"))?;
        Ok(rejected)
    }

    #[instrument(skip(self, squads))]
    async fn close_trade(
        &self,
        trade_id: TradeId,
        squads: &[FantasySquad],
        now: DateTime<Utc>,
    ) -> Result<FantasyTrade, AppError> {
        let mut tx = self.begin().await?;
        let trade = Self::lock_trade(&mut tx, trade_id).await?;
        lock_league(&mut tx, trade.league_id).await?;
        expect_status(&trade, TradeStatus::Accepted)?;

        write_squads(&mut tx, squads).await?;
        let closed = Self::set_trade_status(&mut tx, trade_id, TradeStatus::Closed, now).await?;
        tx.commit().await.map_err(db_error("commit trade close"))?;

        info!(trade_id, "Trade closed");
        Ok(closed)
    }
}
