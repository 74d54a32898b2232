use log::warn;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::{mpsc, watch};

use crate::domains::sync::envelope::SyncPayload;

/// Transport-level failures. `Ok` from a send only ever means "handed to the
/// transport"; there is no acknowledgment channel in this link.
#[derive(Debug, Error, Clone)]
pub enum TransportError {
    #[error("peer is not reachable")]
    Unreachable,

    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Bidirectional, best-effort, session-oriented message link between the
/// satellite and primary device.
pub trait TransportChannel: Send + Sync {
    /// Current link state. Can flap at any time.
    fn is_reachable(&self) -> bool;

    /// Level-triggered reachability signal. The watch channel collapses
    /// duplicate notifications to the latest value, so spurious repeats are
    /// harmless to consumers.
    fn reachability(&self) -> watch::Receiver<bool>;

    /// Fire-and-forget send. Must not block; fails fast with `Unreachable`
    /// while the link is down so callers can fall back to queuing.
    fn send(&self, payload: SyncPayload) -> Result<(), TransportError>;

    /// Take the receive side of the link (messages from the peer). One-shot:
    /// returns `None` after the first take.
    fn take_incoming(&self) -> Option<mpsc::UnboundedReceiver<SyncPayload>>;
}

/// In-process transport: two linked endpoints sharing one reachability state.
///
/// Backs the end-to-end tests and any single-process deployment of both sides;
/// a production build substitutes the platform device link behind the same
/// trait.
pub struct InMemoryTransport {
    reachable_tx: Arc<watch::Sender<bool>>,
    reachable_rx: watch::Receiver<bool>,
    outbound: mpsc::UnboundedSender<SyncPayload>,
    incoming: Mutex<Option<mpsc::UnboundedReceiver<SyncPayload>>>,
    fail_sends: Arc<AtomicBool>,
}

impl InMemoryTransport {
    /// Build both ends of a link. The link starts unreachable.
    pub fn pair() -> (InMemoryTransport, InMemoryTransport) {
        let (reachable_tx, reachable_rx) = watch::channel(false);
        let reachable_tx = Arc::new(reachable_tx);
        let (a_to_b_tx, a_to_b_rx) = mpsc::unbounded_channel();
        let (b_to_a_tx, b_to_a_rx) = mpsc::unbounded_channel();

        let a = InMemoryTransport {
            reachable_tx: Arc::clone(&reachable_tx),
            reachable_rx: reachable_rx.clone(),
            outbound: a_to_b_tx,
            incoming: Mutex::new(Some(b_to_a_rx)),
            fail_sends: Arc::new(AtomicBool::new(false)),
        };
        let b = InMemoryTransport {
            reachable_tx,
            reachable_rx,
            outbound: b_to_a_tx,
            incoming: Mutex::new(Some(a_to_b_rx)),
            fail_sends: Arc::new(AtomicBool::new(false)),
        };
        (a, b)
    }

    /// Flip the shared link state; both endpoints observe the change.
    pub fn set_reachable(&self, reachable: bool) {
        // send only errs when every receiver is gone, which means nobody is
        // watching the link anyway.
        let _ = self.reachable_tx.send(reachable);
    }

    /// Make subsequent sends from this endpoint fail while still reachable.
    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }
}

impl TransportChannel for InMemoryTransport {
    fn is_reachable(&self) -> bool {
        *self.reachable_rx.borrow()
    }

    fn reachability(&self) -> watch::Receiver<bool> {
        self.reachable_rx.clone()
    }

    fn send(&self, payload: SyncPayload) -> Result<(), TransportError> {
        if !self.is_reachable() {
            return Err(TransportError::Unreachable);
        }
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(TransportError::SendFailed("injected failure".to_string()));
        }
        if self.outbound.send(payload).is_err() {
            // Best-effort: the peer end was dropped mid-session. The message
            // is lost, which the delivery contract already allows.
            warn!("peer receive side closed, message dropped");
        }
        Ok(())
    }

    fn take_incoming(&self) -> Option<mpsc::UnboundedReceiver<SyncPayload>> {
        self.incoming.lock().expect("incoming lock poisoned").take()
    }
}
