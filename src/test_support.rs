use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use crate::db_migration;

/// Migrated in-memory database for tests. Pinned to a single connection that
/// never recycles: every pooled SQLite connection to `:memory:` would
/// otherwise see its own empty database.
pub async fn memory_pool() -> SqlitePool {
    let _ = env_logger::builder().is_test(true).try_init();
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory pool");
    db_migration::initialize_database(&pool)
        .await
        .expect("migrations");
    pool
}
