//! plinth-ingest — the event-triggered ingestion handler.
//!
//! One invocation per delivered object-finalize event, each on an
//! independent execution context:
//!
//! ```text
//! RESOLVING_CONFIG → CONNECTING → ENSURING_SCHEMA → INSERTING → ACKNOWLEDGED
//!        └──────────────┴──────────────┴───────────────┴──→ FAILED
//! ```
//!
//! The handler never retries internally; failures are converted into a
//! retry disposition for the at-least-once delivery channel. The only
//! shared mutable resource is the remote database.

pub mod error;
pub mod event;
pub mod handler;
pub mod resolver;
pub mod store;

pub use error::{HandlerError, IngestResult};
pub use event::StorageEvent;
pub use handler::{Disposition, HandlerFailure, IngestHandler, Phase, RetryPolicy};
pub use resolver::{ConfigResolver, DbEndpoint, DbParams, EnvResolver, MappedResolver, SecretStore, StaticResolver};
pub use store::{Connector, MemoryConnector, MemoryDb, PgConnector, UploadRecord, UploadStore};
