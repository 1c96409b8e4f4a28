use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tracing::{debug, info};

use common::{
    Error, Result, SignalStateRecord, SignalStore, SIGNAL_STATE_PARTITION, SIGNAL_STATE_ROW,
};

/// Signal state persisted in SQLite, one row keyed by
/// `("SIGNAL_STATE", "CURRENT")`.
#[derive(Debug, Clone)]
pub struct SqliteSignalStore {
    db: SqlitePool,
}

impl SqliteSignalStore {
    /// Connect to `database_url`, creating the file if needed, and run migrations.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(10));

        // One analysis run at a time; a single connection also keeps
        // `sqlite::memory:` databases alive across queries.
        let db = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = Self { db };
        store.migrate().await?;
        info!("Signal state database ready");
        Ok(store)
    }

    /// Wrap an existing pool. The caller is responsible for migrations.
    pub fn from_pool(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.db)
            .await
            .map_err(|e| Error::Config(format!("Database migration failed: {e}")))
    }
}

#[async_trait]
impl SignalStore for SqliteSignalStore {
    async fn get(&self) -> Result<Option<SignalStateRecord>> {
        let row = sqlx::query(
            r#"
            SELECT active, signal_type, start_date, end_date,
                   conditions_failing_since, last_updated, days_active
            FROM signal_state
            WHERE partition_key = ?1 AND row_key = ?2
            "#,
        )
        .bind(SIGNAL_STATE_PARTITION)
        .bind(SIGNAL_STATE_ROW)
        .fetch_optional(&self.db)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(SignalStateRecord {
            active: row.try_get("active")?,
            signal_type: row.try_get("signal_type")?,
            start_date: row.try_get("start_date")?,
            end_date: row.try_get("end_date")?,
            conditions_failing_since: row.try_get("conditions_failing_since")?,
            last_updated: row.try_get("last_updated")?,
            days_active: row.try_get("days_active")?,
        }))
    }

    async fn put(&self, record: &SignalStateRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO signal_state (
                partition_key, row_key, active, signal_type, start_date, end_date,
                conditions_failing_since, last_updated, days_active
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(partition_key, row_key) DO UPDATE SET
                active = excluded.active,
                signal_type = excluded.signal_type,
                start_date = excluded.start_date,
                end_date = excluded.end_date,
                conditions_failing_since = excluded.conditions_failing_since,
                last_updated = excluded.last_updated,
                days_active = excluded.days_active
            "#,
        )
        .bind(SIGNAL_STATE_PARTITION)
        .bind(SIGNAL_STATE_ROW)
        .bind(record.active)
        .bind(&record.signal_type)
        .bind(&record.start_date)
        .bind(&record.end_date)
        .bind(&record.conditions_failing_since)
        .bind(&record.last_updated)
        .bind(record.days_active)
        .execute(&self.db)
        .await?;

        debug!(active = record.active, signal = %record.signal_type, "Signal state persisted");
        Ok(())
    }
}
