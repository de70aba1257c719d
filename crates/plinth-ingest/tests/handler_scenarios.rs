//! End-to-end handler scenarios against the in-memory store.

use std::sync::Arc;

use plinth_ingest::{
    Disposition, HandlerError, IngestHandler, MemoryConnector, MemoryDb, Phase, RetryPolicy,
    StaticResolver, StorageEvent,
};
use plinth_ingest::resolver::{CLOUD_SQL_CONNECTION_NAME, DB_HOST, DB_NAME, DB_PASS, DB_USER};

fn full_resolver() -> StaticResolver {
    StaticResolver::new([
        (DB_NAME, "app"),
        (DB_USER, "svc"),
        (DB_PASS, "secret"),
        (DB_HOST, "10.0.0.5"),
    ])
}

fn handler(resolver: StaticResolver, connector: Arc<MemoryConnector>) -> IngestHandler {
    IngestHandler::new(Arc::new(resolver), connector)
}

#[tokio::test]
async fn valid_event_reaches_acknowledged_with_one_row() {
    let db = MemoryDb::new();
    let connector = Arc::new(MemoryConnector::new(db.clone()));
    let handler = handler(full_resolver(), connector.clone());

    let event = StorageEvent::finalize("report.csv", "upload-stack-bucket");
    let record = handler.handle(&event).await.unwrap();

    assert_eq!(record.file_name, "report.csv");
    let rows = db.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].file_name, "report.csv");
    assert_eq!(connector.connections_attempted(), 1);
}

#[tokio::test]
async fn missing_name_fails_validation_with_zero_db_work() {
    let db = MemoryDb::new();
    let connector = Arc::new(MemoryConnector::new(db.clone()));
    let handler = handler(full_resolver(), connector.clone());

    let event: StorageEvent = serde_json::from_str("{}").unwrap();
    let failure = handler.handle(&event).await.unwrap_err();

    assert!(matches!(failure.error, HandlerError::Validation(_)));
    assert_eq!(failure.phase, Phase::Validating);
    assert_eq!(failure.disposition, Disposition::Drop);
    assert_eq!(connector.connections_attempted(), 0);
    assert!(db.rows().is_empty());
    assert!(!db.schema_created());
}

#[tokio::test]
async fn missing_config_key_fails_before_connecting() {
    let db = MemoryDb::new();
    let connector = Arc::new(MemoryConnector::new(db.clone()));
    // No password, no endpoint.
    let resolver = StaticResolver::new([(DB_NAME, "app"), (DB_USER, "svc")]);
    let handler = handler(resolver, connector.clone());

    let failure = handler
        .handle(&StorageEvent::finalize("a.csv", "b"))
        .await
        .unwrap_err();

    assert!(matches!(failure.error, HandlerError::Config(_)));
    assert_eq!(failure.phase, Phase::ResolvingConfig);
    // Redelivery after the operator restores the key must succeed, so
    // a config failure asks the channel to retry.
    assert_eq!(failure.disposition, Disposition::Retry);
    assert_eq!(connector.connections_attempted(), 0);
}

#[tokio::test]
async fn connection_failure_is_retryable() {
    let db = MemoryDb::new();
    let connector = Arc::new(MemoryConnector::refusing(db.clone()));
    let handler = handler(full_resolver(), connector.clone());

    let failure = handler
        .handle(&StorageEvent::finalize("a.csv", "b"))
        .await
        .unwrap_err();

    assert!(matches!(failure.error, HandlerError::Connection(_)));
    assert_eq!(failure.phase, Phase::Connecting);
    assert_eq!(failure.disposition, Disposition::Retry);
    assert!(db.rows().is_empty());
}

#[tokio::test]
async fn socket_style_config_also_resolves() {
    let db = MemoryDb::new();
    let connector = Arc::new(MemoryConnector::new(db.clone()));
    let resolver = StaticResolver::new([
        (DB_NAME, "app"),
        (DB_USER, "svc"),
        (DB_PASS, "secret"),
        (CLOUD_SQL_CONNECTION_NAME, "demo:us-central1:inst"),
    ]);
    let handler = handler(resolver, connector);

    handler
        .handle(&StorageEvent::finalize("a.csv", "b"))
        .await
        .unwrap();
    assert_eq!(db.rows().len(), 1);
}

#[tokio::test]
async fn concurrent_cold_invocations_create_table_once() {
    let db = MemoryDb::new();
    let connector = Arc::new(MemoryConnector::new(db.clone()));
    let handler = Arc::new(handler(full_resolver(), connector));

    let event = StorageEvent::finalize("report.csv", "upload-stack-bucket");
    let a = {
        let handler = handler.clone();
        let event = event.clone();
        tokio::spawn(async move { handler.handle(&event).await })
    };
    let b = {
        let handler = handler.clone();
        let event = event.clone();
        tokio::spawn(async move { handler.handle(&event).await })
    };

    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    // The table was created exactly once; both invocations acknowledged;
    // duplicate rows for the same file are accepted.
    assert_eq!(db.creations(), 1);
    let rows = db.rows();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.file_name == "report.csv"));
}

#[tokio::test]
async fn insert_failure_releases_connection_and_retries() {
    let db = MemoryDb::new();
    db.fail_inserts(true);
    let connector = Arc::new(MemoryConnector::new(db.clone()));
    let handler = handler(full_resolver(), connector);

    let failure = handler
        .handle(&StorageEvent::finalize("a.csv", "b"))
        .await
        .unwrap_err();

    assert!(matches!(failure.error, HandlerError::Database(_)));
    assert_eq!(failure.phase, Phase::Inserting);
    assert_eq!(failure.disposition, Disposition::Retry);
    assert!(db.rows().is_empty());
}

#[tokio::test]
async fn validation_retry_is_opt_in_policy() {
    let db = MemoryDb::new();
    let connector = Arc::new(MemoryConnector::new(db.clone()));
    let handler = IngestHandler::new(Arc::new(full_resolver()), connector).with_policy(RetryPolicy {
        retry_validation_errors: true,
    });

    let event: StorageEvent = serde_json::from_str("{}").unwrap();
    let failure = handler.handle(&event).await.unwrap_err();
    assert_eq!(failure.disposition, Disposition::Retry);
}
