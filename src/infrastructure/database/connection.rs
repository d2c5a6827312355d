//! Database connection pool manager.
//!
//! SQLite with WAL mode for concurrent readers alongside the single
//! writer. Handles pool configuration, migrations, and shutdown.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};

use crate::domain::errors::{DomainError, DomainResult};

pub struct DatabaseConnection {
    pool: SqlitePool,
}

impl DatabaseConnection {
    /// Create a connection pool for `database_url`
    /// (e.g. `sqlite:agent.db`).
    ///
    /// WAL journal, NORMAL synchronous, foreign keys on, 5s busy
    /// timeout.
    pub async fn new(database_url: &str) -> DomainResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| DomainError::DatabaseError(format!("invalid database URL: {e}")))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5))
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(|e| DomainError::DatabaseError(format!("failed to create pool: {e}")))?;

        Ok(Self { pool })
    }

    /// In-memory database for tests.
    ///
    /// Pinned to a single pooled connection that never expires: each
    /// `:memory:` connection is its own database, so the pool must not
    /// recycle it.
    pub async fn in_memory() -> DomainResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| DomainError::DatabaseError(format!("invalid database URL: {e}")))?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| DomainError::DatabaseError(format!("failed to create pool: {e}")))?;

        Ok(Self { pool })
    }

    /// Apply pending migrations. Safe to call repeatedly.
    pub async fn migrate(&self) -> DomainResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DomainError::DatabaseError(format!("migration failed: {e}")))?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the pool gracefully during shutdown.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_connection_and_migration() {
        let db = DatabaseConnection::in_memory()
            .await
            .expect("failed to create connection");
        db.migrate().await.expect("failed to run migrations");

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type='table' \
             AND name NOT LIKE 'sqlite_%' AND name != '_sqlx_migrations' ORDER BY name",
        )
        .fetch_all(db.pool())
        .await
        .expect("failed to query tables");

        let names: Vec<&str> = tables.iter().map(|t| t.0.as_str()).collect();
        assert!(names.contains(&"tasks"));
        assert!(names.contains(&"thoughts"));
        assert!(names.contains(&"correlations"));

        db.close().await;
        assert!(db.pool().is_closed());
    }

    #[tokio::test]
    async fn test_migration_is_idempotent() {
        let db = DatabaseConnection::in_memory().await.unwrap();
        db.migrate().await.expect("first run");
        db.migrate().await.expect("second run");
        db.close().await;
    }

    #[tokio::test]
    async fn test_file_backed_database_uses_wal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.db");
        let db = DatabaseConnection::new(&format!("sqlite:{}", path.display()))
            .await
            .expect("failed to open file database");
        db.migrate().await.unwrap();

        let mode: (String,) = sqlx::query_as("PRAGMA journal_mode")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(mode.0.to_lowercase(), "wal");
        db.close().await;
    }
}
