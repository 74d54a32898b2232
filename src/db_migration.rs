use log::{debug, info};
use sqlx::SqlitePool;

use crate::errors::{DbError, DbResult};

// Embed all migration SQL files at compile time
const MIGRATION_CRAVINGS: &str = include_str!("../migrations/0001_cravings.sql");

// List of migrations with their names and SQL content
const MIGRATIONS: &[(&str, &str)] = &[("0001_cravings.sql", MIGRATION_CRAVINGS)];

/// Apply any pending migrations to the given pool.
///
/// Bookkeeping lives in a `schema_migrations` table; each migration runs at
/// most once, in list order.
pub async fn initialize_database(pool: &SqlitePool) -> DbResult<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            name TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    for (name, sql) in MIGRATIONS {
        let applied: Option<String> =
            sqlx::query_scalar("SELECT name FROM schema_migrations WHERE name = ?")
                .bind(name)
                .fetch_optional(pool)
                .await?;

        if applied.is_some() {
            debug!("migration {} already applied, skipping", name);
            continue;
        }

        let mut tx = pool.begin().await?;
        sqlx::raw_sql(sql)
            .execute(&mut *tx)
            .await
            .map_err(|e| DbError::Migration(format!("{}: {}", name, e)))?;
        sqlx::query("INSERT INTO schema_migrations (name, applied_at) VALUES (?, ?)")
            .bind(name)
            .bind(chrono::Utc::now().to_rfc3339())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!("applied migration {}", name);
    }

    Ok(())
}
