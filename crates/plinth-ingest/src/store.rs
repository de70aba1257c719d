//! Upload persistence.
//!
//! `UploadStore` is one invocation's scoped database connection: acquired
//! through a `Connector` at CONNECTING, consumed by `close` (or dropped) on
//! every exit path. The Postgres implementation rides sqlx; the in-memory
//! implementation backs tests and the dev runner.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgConnectOptions;
use sqlx::{Connection, Row};
use time::OffsetDateTime;
use tracing::debug;

use crate::error::{HandlerError, IngestResult};
use crate::resolver::{DbEndpoint, DbParams};

/// The one bit-exact on-disk contract: the uploads table.
pub const CREATE_UPLOADS_TABLE: &str = "\
CREATE TABLE IF NOT EXISTS uploads (
    id SERIAL PRIMARY KEY,
    file_name VARCHAR(255) NOT NULL,
    upload_timestamp TIMESTAMP DEFAULT CURRENT_TIMESTAMP
)";

const INSERT_UPLOAD: &str = "\
INSERT INTO uploads (file_name, upload_timestamp) VALUES ($1, NOW())
RETURNING id, file_name, upload_timestamp";

/// One recorded upload event. Rows are never updated or deleted by this
/// system; duplicates for a redelivered file are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadRecord {
    pub id: i64,
    pub file_name: String,
    pub upload_timestamp: OffsetDateTime,
}

/// A connection scoped to one invocation.
#[async_trait]
pub trait UploadStore: Send + std::fmt::Debug {
    /// Idempotent create-if-absent for the uploads table. Safe under
    /// concurrent invocations racing on first creation.
    async fn ensure_schema(&mut self) -> IngestResult<()>;

    /// Insert one row for the event's file name.
    async fn insert_upload(&mut self, file_name: &str) -> IngestResult<UploadRecord>;

    /// Commit outstanding work and release the connection.
    async fn close(self: Box<Self>) -> IngestResult<()>;
}

/// Opens a store from resolved connection parameters.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, params: &DbParams) -> IngestResult<Box<dyn UploadStore>>;
}

// ── Postgres ───────────────────────────────────────────────────────

/// Connects to Postgres over a network host or the managed unix socket.
#[derive(Debug, Default, Clone)]
pub struct PgConnector;

#[async_trait]
impl Connector for PgConnector {
    async fn connect(&self, params: &DbParams) -> IngestResult<Box<dyn UploadStore>> {
        let opts = PgConnectOptions::new()
            .database(&params.database)
            .username(&params.user)
            .password(&params.password);
        let opts = match &params.endpoint {
            DbEndpoint::ManagedSocket(conn) => opts.socket(DbEndpoint::socket_path(conn)),
            DbEndpoint::Host(host) => opts.host(host),
        };

        let conn = sqlx::PgConnection::connect_with(&opts)
            .await
            .map_err(|e| HandlerError::Connection(e.to_string()))?;
        debug!(database = %params.database, "connected");
        Ok(Box::new(PgUploadStore { conn }))
    }
}

/// Postgres-backed store over a single scoped connection.
#[derive(Debug)]
pub struct PgUploadStore {
    conn: sqlx::PgConnection,
}

#[async_trait]
impl UploadStore for PgUploadStore {
    async fn ensure_schema(&mut self) -> IngestResult<()> {
        sqlx::query(CREATE_UPLOADS_TABLE)
            .execute(&mut self.conn)
            .await
            .map_err(|e| HandlerError::Database(e.to_string()))?;
        Ok(())
    }

    async fn insert_upload(&mut self, file_name: &str) -> IngestResult<UploadRecord> {
        let row = sqlx::query(INSERT_UPLOAD)
            .bind(file_name)
            .fetch_one(&mut self.conn)
            .await
            .map_err(|e| HandlerError::Database(e.to_string()))?;

        let id: i32 = row
            .try_get("id")
            .map_err(|e| HandlerError::Database(e.to_string()))?;
        let file_name: String = row
            .try_get("file_name")
            .map_err(|e| HandlerError::Database(e.to_string()))?;
        let upload_timestamp: time::PrimitiveDateTime = row
            .try_get("upload_timestamp")
            .map_err(|e| HandlerError::Database(e.to_string()))?;

        Ok(UploadRecord {
            id: id as i64,
            file_name,
            upload_timestamp: upload_timestamp.assume_utc(),
        })
    }

    async fn close(self: Box<Self>) -> IngestResult<()> {
        self.conn
            .close()
            .await
            .map_err(|e| HandlerError::Database(e.to_string()))?;
        Ok(())
    }
}

// ── In-memory ──────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct MemoryDbInner {
    schema_created: bool,
    /// How many ensure-schema calls actually created the table.
    creations: u32,
    next_id: i64,
    rows: Vec<UploadRecord>,
    fail_inserts: bool,
}

/// Shared in-memory database for tests and the dev runner.
#[derive(Debug, Default, Clone)]
pub struct MemoryDb {
    inner: Arc<Mutex<MemoryDbInner>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> Vec<UploadRecord> {
        self.lock().rows.clone()
    }

    pub fn schema_created(&self) -> bool {
        self.lock().schema_created
    }

    /// Number of ensure-schema calls that performed the creation (as
    /// opposed to observing the table already present).
    pub fn creations(&self) -> u32 {
        self.lock().creations
    }

    /// Make subsequent inserts fail, simulating a statement error.
    pub fn fail_inserts(&self, fail: bool) {
        self.lock().fail_inserts = fail;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryDbInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Connector over a `MemoryDb`; counts connection attempts so tests can
/// assert that failed validation never opens one.
#[derive(Debug, Default)]
pub struct MemoryConnector {
    pub db: MemoryDb,
    attempts: AtomicU32,
    refuse: bool,
}

impl MemoryConnector {
    pub fn new(db: MemoryDb) -> Self {
        Self {
            db,
            attempts: AtomicU32::new(0),
            refuse: false,
        }
    }

    /// A connector whose connections always fail.
    pub fn refusing(db: MemoryDb) -> Self {
        Self {
            db,
            attempts: AtomicU32::new(0),
            refuse: true,
        }
    }

    pub fn connections_attempted(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, _params: &DbParams) -> IngestResult<Box<dyn UploadStore>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.refuse {
            return Err(HandlerError::Connection("connection refused".to_string()));
        }
        Ok(Box::new(MemoryStore {
            db: self.db.clone(),
        }))
    }
}

#[derive(Debug)]
struct MemoryStore {
    db: MemoryDb,
}

#[async_trait]
impl UploadStore for MemoryStore {
    async fn ensure_schema(&mut self) -> IngestResult<()> {
        let mut inner = self.db.lock();
        // Create-if-absent: losing the race is a no-op, never an error.
        if !inner.schema_created {
            inner.schema_created = true;
            inner.creations += 1;
        }
        Ok(())
    }

    async fn insert_upload(&mut self, file_name: &str) -> IngestResult<UploadRecord> {
        let mut inner = self.db.lock();
        if !inner.schema_created {
            return Err(HandlerError::Database(
                "relation \"uploads\" does not exist".to_string(),
            ));
        }
        if inner.fail_inserts {
            return Err(HandlerError::Database("insert failed".to_string()));
        }
        inner.next_id += 1;
        let record = UploadRecord {
            id: inner.next_id,
            file_name: file_name.to_string(),
            upload_timestamp: OffsetDateTime::now_utc(),
        };
        inner.rows.push(record.clone());
        Ok(record)
    }

    async fn close(self: Box<Self>) -> IngestResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::StaticResolver;
    use crate::resolver::{DB_HOST, DB_NAME, DB_PASS, DB_USER};

    fn params() -> DbParams {
        let resolver = StaticResolver::new([
            (DB_NAME, "app"),
            (DB_USER, "svc"),
            (DB_PASS, "secret"),
            (DB_HOST, "10.0.0.5"),
        ]);
        DbParams::resolve(&resolver).unwrap()
    }

    #[tokio::test]
    async fn ensure_schema_is_idempotent() {
        let db = MemoryDb::new();
        let connector = MemoryConnector::new(db.clone());

        let mut store = connector.connect(&params()).await.unwrap();
        store.ensure_schema().await.unwrap();
        store.ensure_schema().await.unwrap();
        store.close().await.unwrap();

        assert!(db.schema_created());
        assert_eq!(db.creations(), 1);
    }

    #[tokio::test]
    async fn insert_before_schema_fails() {
        let db = MemoryDb::new();
        let connector = MemoryConnector::new(db.clone());

        let mut store = connector.connect(&params()).await.unwrap();
        let err = store.insert_upload("a.csv").await.unwrap_err();
        assert!(matches!(err, HandlerError::Database(_)));
    }

    #[tokio::test]
    async fn inserts_assign_monotonic_ids() {
        let db = MemoryDb::new();
        let connector = MemoryConnector::new(db.clone());

        let mut store = connector.connect(&params()).await.unwrap();
        store.ensure_schema().await.unwrap();
        let first = store.insert_upload("a.csv").await.unwrap();
        let second = store.insert_upload("b.csv").await.unwrap();

        assert!(second.id > first.id);
        assert_eq!(db.rows().len(), 2);
    }

    #[tokio::test]
    async fn refusing_connector_counts_attempts() {
        let db = MemoryDb::new();
        let connector = MemoryConnector::refusing(db);

        let err = connector.connect(&params()).await.unwrap_err();
        assert!(matches!(err, HandlerError::Connection(_)));
        assert_eq!(connector.connections_attempted(), 1);
    }

    #[test]
    fn uploads_ddl_matches_contract() {
        assert!(CREATE_UPLOADS_TABLE.contains("CREATE TABLE IF NOT EXISTS uploads"));
        assert!(CREATE_UPLOADS_TABLE.contains("id SERIAL PRIMARY KEY"));
        assert!(CREATE_UPLOADS_TABLE.contains("file_name VARCHAR(255) NOT NULL"));
        assert!(CREATE_UPLOADS_TABLE.contains("upload_timestamp TIMESTAMP DEFAULT CURRENT_TIMESTAMP"));
    }
}
