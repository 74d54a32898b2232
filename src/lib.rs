//! Offline-first craving capture core for a wrist-worn satellite device.
//!
//! Cravings recorded here are delivered to the primary device at least once,
//! in the order queued, across arbitrary disconnection windows. The transport
//! is best-effort and unacknowledged; the primary side deduplicates by record
//! identity.

use std::sync::Arc;

use log::info;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

// Public modules
pub mod domains;
pub mod errors;
pub mod validation;

// Private modules
mod db_migration;

#[cfg(test)]
pub(crate) mod test_support;

use domains::craving::repository::{CravingRepository, SqliteCravingRepository};
use domains::craving::service::{CravingService, CravingServiceImpl};
use domains::sync::ingest::IngestWorker;
use domains::sync::orchestrator::SyncOrchestrator;
use domains::sync::transport::TransportChannel;
use errors::{DbError, DomainError, ServiceError, ServiceResult};

/// Configuration for either side of the link.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Path to the SQLite database file; created if missing.
    pub db_path: String,
    /// Stable identifier of this device, used for log correlation.
    pub device_id: String,
}

async fn open_pool(config: &CoreConfig) -> ServiceResult<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(&config.db_path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .map_err(|e| {
            ServiceError::Domain(DomainError::Database(DbError::ConnectionPool(e.to_string())))
        })?;
    db_migration::initialize_database(&pool)
        .await
        .map_err(|e| ServiceError::Domain(DomainError::Database(e)))?;
    Ok(pool)
}

/// The satellite-side object graph: one pool, one repository, one sync worker,
/// one service, constructed explicitly and injected rather than held in
/// process-global state.
pub struct SatelliteCore {
    pool: SqlitePool,
    service: Arc<dyn CravingService>,
    orchestrator: Arc<SyncOrchestrator>,
    device_id: String,
}

impl SatelliteCore {
    pub async fn initialize(
        config: CoreConfig,
        transport: Arc<dyn TransportChannel>,
    ) -> ServiceResult<Self> {
        let pool = open_pool(&config).await?;
        let repo: Arc<dyn CravingRepository> =
            Arc::new(SqliteCravingRepository::new(pool.clone()));
        let orchestrator = Arc::new(SyncOrchestrator::spawn(repo.clone(), transport));
        let service = Arc::new(CravingServiceImpl::new(repo, orchestrator.clone()));
        info!("satellite core initialized on device {}", config.device_id);
        Ok(Self {
            pool,
            service,
            orchestrator,
            device_id: config.device_id,
        })
    }

    pub fn craving_service(&self) -> Arc<dyn CravingService> {
        self.service.clone()
    }

    pub fn orchestrator(&self) -> Arc<SyncOrchestrator> {
        self.orchestrator.clone()
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn db_pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn shutdown(self) {
        self.orchestrator.shutdown().await;
        self.pool.close().await;
        info!("satellite core on device {} shut down", self.device_id);
    }
}

/// The primary-side object graph: durable store plus the ingest worker that
/// consumes the transport's receive side.
pub struct PrimaryCore {
    pool: SqlitePool,
    repo: Arc<dyn CravingRepository>,
    ingest: IngestWorker,
    device_id: String,
}

impl PrimaryCore {
    pub async fn initialize(
        config: CoreConfig,
        transport: &dyn TransportChannel,
    ) -> ServiceResult<Self> {
        let pool = open_pool(&config).await?;
        let repo: Arc<dyn CravingRepository> =
            Arc::new(SqliteCravingRepository::new(pool.clone()));
        let ingest = IngestWorker::spawn(transport, repo.clone())?;
        info!("primary core initialized on device {}", config.device_id);
        Ok(Self {
            pool,
            repo,
            ingest,
            device_id: config.device_id,
        })
    }

    pub fn repository(&self) -> Arc<dyn CravingRepository> {
        self.repo.clone()
    }

    pub fn db_pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn shutdown(self) {
        self.ingest.shutdown().await;
        self.pool.close().await;
        info!("primary core on device {} shut down", self.device_id);
    }
}
