// Persisted spawn table (SQLite via sqlx).

use serde::Serialize;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use thiserror::Error;

use crate::extract::SpawnRow;

#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    Sql(#[from] sqlx::Error),
    #[error("stored spawn row is not valid JSON: {0}")]
    Row(#[from] serde_json::Error),
}

/// Per-bucket row counts, for status reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct BucketCount {
    pub bucket: String,
    pub row_count: i64,
}

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        // Every connection to an in-memory database is a separate database.
        let in_memory = database_url.contains(":memory:");
        let mut options = SqlitePoolOptions::new().max_connections(if in_memory { 1 } else { 5 });
        if in_memory {
            options = options.idle_timeout(None).max_lifetime(None);
        }
        let pool = options.connect(database_url).await?;
        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS spawn_rows (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                pokemon TEXT NOT NULL DEFAULT '',
                bucket TEXT NOT NULL DEFAULT '',
                data TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Replace the whole table with `rows`, in one transaction.
    pub async fn replace_rows(&self, rows: &[SpawnRow]) -> Result<u64, DbError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM spawn_rows").execute(&mut *tx).await?;

        let mut inserted = 0;
        for row in rows {
            let data = serde_json::to_string(row)?;
            sqlx::query("INSERT INTO spawn_rows (pokemon, bucket, data) VALUES (?, ?, ?)")
                .bind(row.pokemon.as_str())
                .bind(row.bucket.as_str())
                .bind(data)
                .execute(&mut *tx)
                .await?;
            inserted += 1;
        }
        tx.commit().await?;
        Ok(inserted)
    }

    /// All rows in insertion order.
    pub async fn load_rows(&self) -> Result<Vec<SpawnRow>, DbError> {
        let stored: Vec<(String,)> = sqlx::query_as("SELECT data FROM spawn_rows ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        stored
            .into_iter()
            .map(|(data,)| serde_json::from_str(&data).map_err(DbError::from))
            .collect()
    }

    pub async fn bucket_counts(&self) -> Result<Vec<BucketCount>, sqlx::Error> {
        sqlx::query_as::<_, BucketCount>(
            "SELECT bucket, COUNT(*) AS row_count FROM spawn_rows GROUP BY bucket ORDER BY bucket",
        )
        .fetch_all(&self.pool)
        .await
    }
}
