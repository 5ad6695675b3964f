use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    SqlitePool,
};

use crate::{
    models::{Record, Settings, TimeWindow},
    store::{ConfigStore, RecordStore},
};

// ── Pool ───────────────────────────────────────────────────────────────────

/// Open the SQLite pool (creating the file if needed) and apply the embedded
/// migrations.
pub async fn connect(database_url: &str) -> anyhow::Result<SqlitePool> {
    let options = database_url
        .parse::<SqliteConnectOptions>()
        .with_context(|| format!("invalid DATABASE_URL '{database_url}'"))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    migrate(&pool).await?;
    Ok(pool)
}

/// Run embedded migrations (files in migrations/).
pub async fn migrate(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Database migrations applied");
    Ok(())
}

// ── Records ────────────────────────────────────────────────────────────────

/// Fetch every record for one client between `start` and `end` inclusive,
/// oldest first.
pub async fn get_records_by_client_and_time(
    pool: &SqlitePool,
    client: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<Record>, sqlx::Error> {
    let records: Vec<Record> = sqlx::query_as(
        "SELECT client, time, cpu, gpu, ram, ram_total, swap, swap_total, load, temp,
                disk, disk_total, net_in, net_out, net_total_up, net_total_down,
                process, connections, connections_udp
         FROM records
         WHERE client = ?1 AND time >= ?2 AND time <= ?3
         ORDER BY time ASC",
    )
    .bind(client)
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;

    Ok(records)
}

// ── Settings ───────────────────────────────────────────────────────────────

/// Read the single settings row. A missing row means the schema was tampered
/// with and is reported as an error.
pub async fn get_settings(pool: &SqlitePool) -> Result<Settings, sqlx::Error> {
    sqlx::query_as("SELECT geoip_enabled FROM settings WHERE id = 1")
        .fetch_one(pool)
        .await
}

// ── Port implementations ───────────────────────────────────────────────────

#[async_trait]
impl RecordStore for SqlitePool {
    async fn query(&self, client: &str, window: TimeWindow) -> anyhow::Result<Vec<Record>> {
        Ok(get_records_by_client_and_time(self, client, window.start, window.end).await?)
    }
}

#[async_trait]
impl ConfigStore for SqlitePool {
    async fn settings(&self) -> anyhow::Result<Settings> {
        get_settings(self).await.context("settings row unavailable")
    }
}
