//! Decides, for every new record and every reachability transition, whether a
//! craving travels over the link now or waits in the local durable queue, and
//! drains the queue when the peer comes back.

use log::{debug, error, info, warn};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::domains::craving::repository::CravingRepository;
use crate::domains::craving::types::CravingRecord;
use crate::domains::sync::envelope::SyncEnvelope;
use crate::domains::sync::transport::TransportChannel;
use crate::errors::{DomainResult, ServiceError, ServiceResult};

/// Which path a newly created record took. Exactly one of the two, never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDisposition {
    /// Handed to the transport while reachable.
    SentImmediately,
    /// Appended to the local durable queue.
    Queued,
}

/// Messages that can be sent to the sync worker
#[derive(Debug)]
enum OrchestratorMessage {
    RecordCreated {
        record: CravingRecord,
        reply: oneshot::Sender<DomainResult<SyncDisposition>>,
    },
    /// Tombstone a record. Routed through the worker so a tombstone can never
    /// interleave with a drain in progress.
    Archive {
        id: Uuid,
        reply: oneshot::Sender<DomainResult<()>>,
    },
    /// Force a drain attempt now; replies with the number of records drained.
    Flush {
        reply: oneshot::Sender<DomainResult<usize>>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncState {
    Idle,
    Draining,
}

/// Public handle to the sync worker. All queue mutations funnel through the
/// worker task, which is the sole writer to the local store.
pub struct SyncOrchestrator {
    sender: mpsc::Sender<OrchestratorMessage>,
    handle: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl SyncOrchestrator {
    /// Spawn the worker. If the transport is already reachable, any records
    /// left over from a previous run are drained right away.
    pub fn spawn(
        repo: Arc<dyn CravingRepository>,
        transport: Arc<dyn TransportChannel>,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(64);
        let reachability = transport.reachability();
        let worker = OrchestratorWorker {
            repo,
            transport,
            reachability,
            receiver,
            state: SyncState::Idle,
        };
        let handle = tokio::spawn(worker.run());
        Self {
            sender,
            handle: std::sync::Mutex::new(Some(handle)),
        }
    }

    /// Route a freshly created record: immediate send when reachable, queue
    /// append otherwise (or when the send fails).
    pub async fn submit(&self, record: CravingRecord) -> ServiceResult<SyncDisposition> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(OrchestratorMessage::RecordCreated { record, reply })
            .await
            .map_err(|_| ServiceError::WorkerUnavailable("sync worker stopped".to_string()))?;
        response
            .await
            .map_err(|_| ServiceError::WorkerUnavailable("sync worker dropped reply".to_string()))?
            .map_err(ServiceError::Domain)
    }

    /// Tombstone a record, serialized with drains on the worker task. A
    /// record the worker already drained before this message is processed
    /// reports `EntityNotFound`.
    pub async fn archive(&self, id: Uuid) -> ServiceResult<()> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(OrchestratorMessage::Archive { id, reply })
            .await
            .map_err(|_| ServiceError::WorkerUnavailable("sync worker stopped".to_string()))?;
        response
            .await
            .map_err(|_| ServiceError::WorkerUnavailable("sync worker dropped reply".to_string()))?
            .map_err(ServiceError::Domain)
    }

    /// Force a drain attempt now. Returns the number of records drained.
    pub async fn flush(&self) -> ServiceResult<usize> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(OrchestratorMessage::Flush { reply })
            .await
            .map_err(|_| ServiceError::WorkerUnavailable("sync worker stopped".to_string()))?;
        response
            .await
            .map_err(|_| ServiceError::WorkerUnavailable("sync worker dropped reply".to_string()))?
            .map_err(ServiceError::Domain)
    }

    /// Stop the worker and wait for it to finish.
    pub async fn shutdown(&self) {
        let (reply, response) = oneshot::channel();
        if self
            .sender
            .send(OrchestratorMessage::Shutdown { reply })
            .await
            .is_ok()
        {
            let _ = response.await;
        }
        let handle = self.handle.lock().expect("handle lock poisoned").take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

struct OrchestratorWorker {
    repo: Arc<dyn CravingRepository>,
    transport: Arc<dyn TransportChannel>,
    reachability: watch::Receiver<bool>,
    receiver: mpsc::Receiver<OrchestratorMessage>,
    state: SyncState,
}

impl OrchestratorWorker {
    async fn run(mut self) {
        if *self.reachability.borrow_and_update() {
            if let Err(e) = self.drain().await {
                error!("startup drain failed: {}", e);
            }
        }

        loop {
            tokio::select! {
                changed = self.reachability.changed() => {
                    if changed.is_err() {
                        info!("reachability signal closed, stopping sync worker");
                        break;
                    }
                    let reachable = *self.reachability.borrow_and_update();
                    debug!("reachability changed: {}", reachable);
                    if reachable {
                        if let Err(e) = self.drain().await {
                            error!("drain failed: {}", e);
                        }
                    }
                }
                message = self.receiver.recv() => {
                    match message {
                        Some(OrchestratorMessage::RecordCreated { record, reply }) => {
                            let _ = reply.send(self.handle_new_record(record).await);
                        }
                        Some(OrchestratorMessage::Archive { id, reply }) => {
                            let _ = reply.send(self.repo.tombstone(id).await);
                        }
                        Some(OrchestratorMessage::Flush { reply }) => {
                            let _ = reply.send(self.drain().await);
                        }
                        Some(OrchestratorMessage::Shutdown { reply }) => {
                            let _ = reply.send(());
                            break;
                        }
                        None => break,
                    }
                }
            }
        }
    }

    /// Exactly one of {successful immediate send, queue append} per record.
    /// An append failure is fatal to the attempt and travels back to the
    /// caller; it must never be silently dropped.
    async fn handle_new_record(
        &mut self,
        record: CravingRecord,
    ) -> DomainResult<SyncDisposition> {
        if self.transport.is_reachable() {
            let payload = SyncEnvelope::from_record(&record).to_payload();
            match self.transport.send(payload) {
                Ok(()) => {
                    debug!("craving {} sent immediately", record.id);
                    return Ok(SyncDisposition::SentImmediately);
                }
                Err(e) => warn!("immediate send of {} failed ({}), queuing", record.id, e),
            }
        }
        self.repo.append(&record).await?;
        Ok(SyncDisposition::Queued)
    }

    /// Drain the queue snapshot in FIFO order. Each entry is removed after the
    /// send is attempted whether or not the transport reported success: the
    /// link cannot confirm receipt, and the primary side deduplicates by id
    /// (at-least-once delivery).
    ///
    /// A record created while draining arrives as its own `RecordCreated`
    /// message after this pass and is never folded into the snapshot.
    async fn drain(&mut self) -> DomainResult<usize> {
        // Single worker task makes a nested drain unreachable; the guard keeps
        // the state machine honest if that ever changes.
        if self.state == SyncState::Draining {
            return Ok(0);
        }
        self.state = SyncState::Draining;
        let result = self.drain_snapshot().await;
        self.state = SyncState::Idle;
        result
    }

    async fn drain_snapshot(&mut self) -> DomainResult<usize> {
        let snapshot = self.repo.list_all().await?;
        if snapshot.is_empty() {
            return Ok(0);
        }
        info!("draining {} queued cravings", snapshot.len());

        let total = snapshot.len();
        let mut drained = 0;
        for (index, record) in snapshot.into_iter().enumerate() {
            // Abandon the rest of the snapshot as soon as the link drops.
            // Entries not yet removed stay queued for the next drain.
            if !*self.reachability.borrow_and_update() {
                warn!("link dropped mid-drain, {} records left queued", total - index);
                break;
            }
            let payload = SyncEnvelope::from_record(&record).to_payload();
            if let Err(e) = self.transport.send(payload) {
                warn!("drain send of {} failed: {}", record.id, e);
            }
            self.repo.remove(record.id).await?;
            drained += 1;
        }
        Ok(drained)
    }
}
