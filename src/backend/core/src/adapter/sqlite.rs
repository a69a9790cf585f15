//! SQLite adapter using sqlx.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use super::{rows_to_snapshot, snapshot_to_rows, Adapter, PolicyRow};
use crate::config::DatabaseConfig;
use crate::error::{GatekeeperError, Result};
use crate::rbac::models::PolicySnapshot;

/// Persists policy snapshots in the `policy_rules` table.
#[derive(Debug, Clone)]
pub struct SqliteAdapter {
    pool: SqlitePool,
}

impl SqliteAdapter {
    /// Connect with default pool settings, creating the database file if
    /// needed, and create the policy table.
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with(&DatabaseConfig {
            url: url.to_string(),
            ..DatabaseConfig::default()
        })
        .await
    }

    /// Connect using a [`DatabaseConfig`].
    pub async fn connect_with(config: &DatabaseConfig) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)?.create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_with(options)
            .await?;

        let adapter = Self { pool };
        if config.auto_migrate {
            adapter.migrate().await?;
        }

        info!(url = %config.url, "Connected to policy database");
        Ok(adapter)
    }

    /// Create or upgrade the policy table.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Get the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl Adapter for SqliteAdapter {
    async fn load_all(&self) -> Result<PolicySnapshot> {
        let rows = sqlx::query_as::<_, PolicyRow>(
            r#"
            SELECT ptype, v0, v1, v2
            FROM policy_rules
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(rows = rows.len(), "Loaded policy rows");
        rows_to_snapshot(rows)
    }

    async fn save_all(&self, snapshot: &PolicySnapshot) -> Result<()> {
        let rows = snapshot_to_rows(snapshot);

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(GatekeeperError::transaction)?;

        sqlx::query("DELETE FROM policy_rules")
            .execute(&mut *tx)
            .await?;

        for row in &rows {
            sqlx::query(
                r#"
                INSERT INTO policy_rules (ptype, v0, v1, v2)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(&row.ptype)
            .bind(&row.v0)
            .bind(&row.v1)
            .bind(&row.v2)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await.map_err(GatekeeperError::transaction)?;

        debug!(rows = rows.len(), "Saved policy rows");
        Ok(())
    }
}
