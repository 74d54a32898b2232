//! Primary-side ingest: turns incoming wire payloads into durable records.
//!
//! The satellite delivers at-least-once, so `id` is treated as an idempotency
//! key; replays of the same message never create a second record.

use log::{info, warn};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::domains::craving::repository::CravingRepository;
use crate::domains::sync::envelope::{SyncEnvelope, SyncPayload};
use crate::domains::sync::transport::TransportChannel;
use crate::errors::{ServiceError, ServiceResult};

/// Background consumer of the transport's receive side.
pub struct IngestWorker {
    handle: std::sync::Mutex<Option<JoinHandle<()>>>,
    stop: std::sync::Mutex<Option<oneshot::Sender<()>>>,
}

impl IngestWorker {
    /// Take the transport's incoming channel and start applying messages.
    /// Fails if the receive side was already taken.
    pub fn spawn(
        transport: &dyn TransportChannel,
        repo: Arc<dyn CravingRepository>,
    ) -> ServiceResult<Self> {
        let incoming = transport.take_incoming().ok_or_else(|| {
            ServiceError::Configuration("transport receive side already taken".to_string())
        })?;
        let (stop_tx, stop_rx) = oneshot::channel();
        let handle = tokio::spawn(run(incoming, repo, stop_rx));
        Ok(Self {
            handle: std::sync::Mutex::new(Some(handle)),
            stop: std::sync::Mutex::new(Some(stop_tx)),
        })
    }

    /// Stop consuming. Messages already received are applied first.
    pub async fn shutdown(&self) {
        if let Some(stop) = self.stop.lock().expect("stop lock poisoned").take() {
            let _ = stop.send(());
        }
        let handle = self.handle.lock().expect("handle lock poisoned").take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

async fn run(
    mut incoming: mpsc::UnboundedReceiver<SyncPayload>,
    repo: Arc<dyn CravingRepository>,
    mut stop: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            // Pending messages win over the stop signal, so everything
            // delivered before shutdown is applied.
            biased;
            payload = incoming.recv() => {
                match payload {
                    Some(payload) => apply(&payload, repo.as_ref()).await,
                    None => {
                        info!("transport closed, ingest worker stopping");
                        break;
                    }
                }
            }
            _ = &mut stop => {
                while let Ok(payload) = incoming.try_recv() {
                    apply(&payload, repo.as_ref()).await;
                }
                info!("ingest worker stopped");
                break;
            }
        }
    }
}

/// A poison message must not wedge the loop: decode and persistence failures
/// are logged and the message is skipped.
async fn apply(payload: &SyncPayload, repo: &dyn CravingRepository) {
    let record = match SyncEnvelope::from_payload(payload).and_then(SyncEnvelope::into_record) {
        Ok(record) => record,
        Err(e) => {
            warn!("dropping undecodable message: {}", e);
            return;
        }
    };
    let id = record.id;
    if let Err(e) = repo.merge_remote(&record).await {
        warn!("failed to persist craving {}: {}", id, e);
    }
}
