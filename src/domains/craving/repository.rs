use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use sqlx::{query, query_as, SqlitePool};
use uuid::Uuid;

use crate::domains::craving::types::{CravingRecord, CravingRow};
use crate::errors::{DbError, DomainError, DomainResult};

/// The one tombstone filter every read path shares. Queries must not inline
/// their own copy of this predicate.
const ACTIVE_PREDICATE: &str = "deleted_at IS NULL";

/// Trait defining the satellite-side craving store.
///
/// The same table backs both the local display cache and the durable outbound
/// queue: a row exists until it is drained (removed) or archived (tombstoned).
#[async_trait]
pub trait CravingRepository: Send + Sync {
    /// Persist a new record. Durable once this returns `Ok`; a failure here
    /// must be surfaced to the caller, never swallowed.
    async fn append(&self, record: &CravingRecord) -> DomainResult<()>;

    /// All non-tombstoned records in insertion order. Materialized snapshot,
    /// safe to iterate while the table changes underneath.
    async fn list_all(&self) -> DomainResult<Vec<CravingRecord>>;

    /// Hard-delete by identity. Idempotent: removing an unknown or
    /// already-removed id is a no-op, not an error.
    async fn remove(&self, id: Uuid) -> DomainResult<()>;

    /// Tombstone by identity. Errors with `EntityNotFound` when the id does
    /// not exist or is already tombstoned.
    async fn tombstone(&self, id: Uuid) -> DomainResult<()>;

    /// Primary-side idempotent insert keyed on `id`; a duplicate delivery of
    /// the same record is a no-op.
    async fn merge_remote(&self, record: &CravingRecord) -> DomainResult<()>;
}

/// SQLite implementation for CravingRepository
#[derive(Debug, Clone)]
pub struct SqliteCravingRepository {
    pool: SqlitePool,
}

impl SqliteCravingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn map_row_to_entity(row: CravingRow) -> DomainResult<CravingRecord> {
        row.into_entity()
            .map_err(|e| DomainError::Internal(format!("Failed to map row to entity: {}", e)))
    }
}

#[async_trait]
impl CravingRepository for SqliteCravingRepository {
    async fn append(&self, record: &CravingRecord) -> DomainResult<()> {
        query(
            "INSERT INTO cravings (id, description, intensity, resistance, created_at, deleted_at)
             VALUES (?, ?, ?, ?, ?, NULL)",
        )
        .bind(record.id.to_string())
        .bind(&record.description)
        .bind(record.intensity)
        .bind(record.resistance)
        .bind(record.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        debug!("appended craving {} to local queue", record.id);
        Ok(())
    }

    async fn list_all(&self) -> DomainResult<Vec<CravingRecord>> {
        let sql = format!(
            "SELECT id, description, intensity, resistance, created_at, deleted_at
             FROM cravings WHERE {} ORDER BY seq ASC",
            ACTIVE_PREDICATE
        );
        let rows = query_as::<_, CravingRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::from)?;

        rows.into_iter()
            .map(Self::map_row_to_entity)
            .collect::<DomainResult<Vec<CravingRecord>>>()
    }

    async fn remove(&self, id: Uuid) -> DomainResult<()> {
        let result = query("DELETE FROM cravings WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(DbError::from)?;

        // 0 rows affected is fine: the queue contract makes removal idempotent.
        if result.rows_affected() == 0 {
            debug!("remove({}) matched no rows", id);
        }
        Ok(())
    }

    async fn tombstone(&self, id: Uuid) -> DomainResult<()> {
        let sql = format!(
            "UPDATE cravings SET deleted_at = ? WHERE id = ? AND {}",
            ACTIVE_PREDICATE
        );
        let result = query(&sql)
            .bind(Utc::now().to_rfc3339())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            Err(DomainError::EntityNotFound("Craving".to_string(), id))
        } else {
            Ok(())
        }
    }

    async fn merge_remote(&self, record: &CravingRecord) -> DomainResult<()> {
        let result = query(
            "INSERT INTO cravings (id, description, intensity, resistance, created_at, deleted_at)
             VALUES (?, ?, ?, ?, ?, NULL)
             ON CONFLICT(id) DO NOTHING",
        )
        .bind(record.id.to_string())
        .bind(&record.description)
        .bind(record.intensity)
        .bind(record.resistance)
        .bind(record.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            debug!("duplicate delivery of craving {}, ignored", record.id);
        }
        Ok(())
    }
}
