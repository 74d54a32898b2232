pub mod envelope;
pub mod ingest;
pub mod orchestrator;
pub mod transport;

pub use envelope::{SyncAction, SyncEnvelope, SyncPayload};
pub use ingest::IngestWorker;
pub use orchestrator::SyncOrchestrator;
pub use transport::{InMemoryTransport, TransportChannel, TransportError};
