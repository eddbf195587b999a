use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::{
    codec::parse_address,
    domain::{Address, AppState},
};

/// Last persisted view of one app plus the feed position it reflects.
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    pub app_address: Address,
    pub state: AppState,
    pub last_sequence: Option<u64>,
    pub updated_at: DateTime<Utc>,
}

#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn save_checkpoint(
        &self,
        app_address: Address,
        state: &AppState,
        last_sequence: Option<u64>,
    ) -> Result<()>;
    async fn load_checkpoint(&self, app_address: Address) -> Result<Option<Checkpoint>>;
    async fn clear_checkpoint(&self, app_address: Address) -> Result<bool>;
}

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn list_checkpoints(&self) -> Result<Vec<Checkpoint>> {
        let rows = sqlx::query(
            "SELECT app_address, state_json, last_sequence, updated_at
             FROM app_state_checkpoints ORDER BY updated_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .context("failed to list checkpoints")?;

        rows.iter().map(checkpoint_from_row).collect()
    }
}

#[async_trait]
impl CheckpointStore for Storage {
    async fn save_checkpoint(
        &self,
        app_address: Address,
        state: &AppState,
        last_sequence: Option<u64>,
    ) -> Result<()> {
        let state_json = serde_json::to_string(state).context("failed to encode app state")?;
        let last_sequence = last_sequence
            .map(i64::try_from)
            .transpose()
            .context("event sequence exceeds sqlite integer range")?;

        sqlx::query(
            "INSERT INTO app_state_checkpoints (app_address, state_json, last_sequence, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(app_address) DO UPDATE SET
                state_json = excluded.state_json,
                last_sequence = excluded.last_sequence,
                updated_at = excluded.updated_at",
        )
        .bind(address_key(app_address))
        .bind(state_json)
        .bind(last_sequence)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to save checkpoint for app {app_address:?}"))?;
        Ok(())
    }

    async fn load_checkpoint(&self, app_address: Address) -> Result<Option<Checkpoint>> {
        let row = sqlx::query(
            "SELECT app_address, state_json, last_sequence, updated_at
             FROM app_state_checkpoints WHERE app_address = ?1",
        )
        .bind(address_key(app_address))
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("failed to load checkpoint for app {app_address:?}"))?;

        row.as_ref().map(checkpoint_from_row).transpose()
    }

    async fn clear_checkpoint(&self, app_address: Address) -> Result<bool> {
        let result = sqlx::query("DELETE FROM app_state_checkpoints WHERE app_address = ?1")
            .bind(address_key(app_address))
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to clear checkpoint for app {app_address:?}"))?;
        Ok(result.rows_affected() > 0)
    }
}

fn address_key(address: Address) -> String {
    format!("{address:?}")
}

fn checkpoint_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Checkpoint> {
    let app_address: String = row.try_get("app_address")?;
    let state_json: String = row.try_get("state_json")?;
    let last_sequence: Option<i64> = row.try_get("last_sequence")?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at")?;

    let state: AppState = serde_json::from_str(&state_json)
        .with_context(|| format!("corrupt checkpoint state for app {app_address}"))?;
    let last_sequence = last_sequence
        .map(u64::try_from)
        .transpose()
        .with_context(|| format!("negative event sequence for app {app_address}"))?;

    Ok(Checkpoint {
        app_address: parse_address(&app_address)?,
        state,
        last_sequence,
        updated_at,
    })
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

pub fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
