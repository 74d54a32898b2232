use async_trait::async_trait;
use log::info;
use std::sync::Arc;
use uuid::Uuid;

use crate::domains::craving::repository::CravingRepository;
use crate::domains::craving::types::{CravingResponse, NewCraving};
use crate::domains::sync::orchestrator::SyncOrchestrator;
use crate::errors::ServiceResult;
use crate::validation::Validate;

/// Boundary exposed to the presentation layer.
#[async_trait]
pub trait CravingService: Send + Sync {
    /// Validate and capture a craving. The returned identity is minted here,
    /// before any transport is involved, so it is stable across retries.
    async fn record_craving(&self, new_craving: NewCraving) -> ServiceResult<Uuid>;

    /// Non-archived cravings in the order they were recorded.
    async fn list_active_cravings(&self) -> ServiceResult<Vec<CravingResponse>>;

    /// Soft-delete a craving; it disappears from reads and is never
    /// transmitted afterwards.
    async fn archive(&self, id: Uuid) -> ServiceResult<()>;
}

pub struct CravingServiceImpl {
    repo: Arc<dyn CravingRepository>,
    orchestrator: Arc<SyncOrchestrator>,
}

impl CravingServiceImpl {
    pub fn new(repo: Arc<dyn CravingRepository>, orchestrator: Arc<SyncOrchestrator>) -> Self {
        Self { repo, orchestrator }
    }
}

#[async_trait]
impl CravingService for CravingServiceImpl {
    async fn record_craving(&self, new_craving: NewCraving) -> ServiceResult<Uuid> {
        new_craving.validate().map_err(|e| {
            // Invalid input never reaches the queue or the transport.
            info!("rejected craving: {}", e);
            e
        })?;

        let record = new_craving.into_record();
        let id = record.id;
        let disposition = self.orchestrator.submit(record).await?;
        info!("craving {} recorded ({:?})", id, disposition);
        Ok(id)
    }

    async fn list_active_cravings(&self) -> ServiceResult<Vec<CravingResponse>> {
        let records = self.repo.list_all().await?;
        Ok(records.into_iter().map(CravingResponse::from).collect())
    }

    async fn archive(&self, id: Uuid) -> ServiceResult<()> {
        // The worker task owns every queue mutation; tombstoning through it
        // means an archive can never land in the middle of a drain.
        self.orchestrator.archive(id).await?;
        info!("craving {} archived", id);
        Ok(())
    }
}
