use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{info, warn};

use crate::shared::{AppError, LeagueId};

/// PostgreSQL implementation of every repository trait.
///
/// Composite writes run in one transaction; league-scoped writes take
/// `pg_advisory_xact_lock(league_id)` first. The expected tables are listed in
/// `storage/schema.sql`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pub(crate) pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(db_error("connect"))?;

        info!("Connected to PostgreSQL");
        Ok(Self::new(pool))
    }

    pub(crate) async fn begin(&self) -> Result<Transaction<'static, Postgres>, AppError> {
        self.pool.begin().await.map_err(db_error("begin transaction"))
    }
}

/// Maps a sqlx failure to `DatabaseError`, logging the failed operation
pub(crate) fn db_error(operation: &'static str) -> impl Fn(sqlx::Error) -> AppError {
    move |e| {
        warn!(error = %e, operation, "Database operation failed");
        AppError::DatabaseError(e.to_string())
    }
}

/// Serializes league-scoped writes across processes until the transaction ends
pub(crate) async fn lock_league(
    tx: &mut Transaction<'static, Postgres>,
    league_id: LeagueId,
) -> Result<(), AppError> {
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(league_id)
        .execute(&mut **tx)
        .await
        .map_err(db_error("advisory lock"))?;
    Ok(())
}

/// Reads a text column written from a strum `Display` value
pub(crate) fn parse_column<T: std::str::FromStr>(value: &str, column: &str) -> Result<T, AppError> {
    value.parse::<T>().map_err(|_| {
        warn!(column, value, "Unrecognised value in database column");
        AppError::DatabaseError(format!("Unrecognised {} value {:?}", column, value))
    })
}
