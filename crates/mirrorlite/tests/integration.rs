//! Full stack tests over the public replica surface.
//!
//! The remote side is the shared in-memory backend, so the suite runs
//! self-contained: independent replicas built against the same
//! `MemoryStore` observe each other exactly as two processes sharing a
//! real container would, just with tightened intervals.

// Integration tests use expect/unwrap extensively for clarity -- panicking
// on failure is the correct behavior in test code.
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::missing_panics_doc)]

use std::time::Duration;

use mirrorlite::{
    ConfigError, Error, MemoryStore, Replica, ReplicaConfig, SqlMap, SqlValue, StoreError,
    StoreEvent, SyncTuning, TransactionError,
};

const CONTAINER: &str = "trashme_tests_ci";
const FILENAME: &str = "index.sqlite";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn fast_tuning() -> SyncTuning {
    SyncTuning::new()
        .with_poll_interval(Duration::from_millis(100))
        .with_backup_interval(Duration::from_millis(50))
}

fn build_remote(memory: &MemoryStore) -> Replica {
    Replica::build(
        ReplicaConfig::memory(memory.clone(), CONTAINER, FILENAME).with_tuning(fast_tuning()),
    )
    .expect("build failed")
}

fn map(pairs: &[(&str, SqlValue)]) -> SqlMap {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), v.clone()))
        .collect()
}

fn info_row(text: &str) -> SqlMap {
    map(&[("info", SqlValue::from(text))])
}

async fn count(replica: &Replica) -> i64 {
    replica
        .query_value("SELECT COUNT(*) FROM lorem", &[])
        .await
        .expect("count query failed")
        .and_then(|v| v.as_integer())
        .expect("count was not an integer")
}

/// Build a throwaway reader against the same remote and count its rows,
/// the way an independent process would. Returns -1 when the remote has
/// no usable database yet.
async fn count_remote(memory: &MemoryStore) -> i64 {
    let reader = build_remote(memory);
    reader.connect().await.expect("reader connect failed");
    let result = reader
        .query_value("SELECT COUNT(*) FROM lorem", &[])
        .await
        .ok()
        .flatten()
        .and_then(|v| v.as_integer())
        .unwrap_or(-1);
    reader.close().await.expect("reader close failed");
    result
}

#[tokio::test]
async fn full_stack_round_trip() {
    init_tracing();
    let memory = MemoryStore::new();
    let db = build_remote(&memory);
    db.connect().await.expect("connect failed");

    db.query("CREATE TABLE IF NOT EXISTS lorem (info TEXT)", &[])
        .await
        .expect("schema creation failed");
    assert_eq!(count(&db).await, 0);

    // Schema statements do not count as operations: nothing was uploaded
    // yet, so an independent reader sees no database at all.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(count_remote(&memory).await, -1);

    db.insert("lorem", &info_row("first"))
        .await
        .expect("insert failed");
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(count_remote(&memory).await, 1);

    for _ in 0..5 {
        db.insert("lorem", &info_row("more"))
            .await
            .expect("insert failed");
    }
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(count_remote(&memory).await, 6);

    db.close().await.expect("close failed");
}

#[tokio::test]
async fn live_reader_follows_the_writer() {
    init_tracing();
    let memory = MemoryStore::new();

    let writer = build_remote(&memory);
    writer.connect().await.expect("writer connect failed");
    writer
        .query("CREATE TABLE IF NOT EXISTS lorem (info TEXT)", &[])
        .await
        .expect("schema creation failed");
    writer
        .insert("lorem", &info_row("first"))
        .await
        .expect("insert failed");
    tokio::time::sleep(Duration::from_millis(300)).await;

    let reader = build_remote(&memory);
    reader.connect().await.expect("reader connect failed");
    assert_eq!(count(&reader).await, 1);

    // The reader hears about the writer's next upload via polling and
    // announces the connection swap.
    let mut events = reader.subscribe();
    writer
        .insert("lorem", &info_row("second"))
        .await
        .expect("insert failed");

    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Ok(StoreEvent::RemoteUpdate) = events.recv().await {
                break;
            }
        }
    })
    .await
    .expect("timed out waiting for remote update");

    assert_eq!(count(&reader).await, 2);

    writer.close().await.expect("writer close failed");
    reader.close().await.expect("reader close failed");
}

#[tokio::test]
async fn destroy_after_close_removes_the_remote_database() {
    init_tracing();
    let memory = MemoryStore::new();
    let db = build_remote(&memory);
    db.connect().await.expect("connect failed");
    db.query("CREATE TABLE lorem (info TEXT)", &[])
        .await
        .expect("schema creation failed");
    db.insert("lorem", &info_row("x")).await.expect("insert failed");
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!memory.is_empty());

    db.close().await.expect("close failed");
    db.destroy().await.expect("destroy failed");
    assert!(memory.is_empty());
}

#[tokio::test]
async fn local_backend_persists_without_any_network() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("local.sqlite");

    let db = Replica::build(ReplicaConfig::local(&path)).expect("build failed");
    db.connect().await.expect("connect failed");
    db.query("CREATE TABLE lorem (info TEXT)", &[])
        .await
        .expect("schema creation failed");
    db.insert("lorem", &info_row("kept")).await.expect("insert failed");
    db.close().await.expect("close failed");

    // Reopen: the data survived in place.
    let reopened = Replica::build(ReplicaConfig::local(&path)).expect("build failed");
    reopened.connect().await.expect("connect failed");
    assert_eq!(count(&reopened).await, 1);

    reopened.destroy().await.expect("destroy failed");
    assert!(!path.exists());
}

#[tokio::test]
async fn transactions_work_through_the_facade() {
    let dir = tempfile::tempdir().unwrap();
    let db = Replica::build(ReplicaConfig::local(dir.path().join("t.sqlite")))
        .expect("build failed");
    db.query("CREATE TABLE lorem (info TEXT)", &[])
        .await
        .expect("schema creation failed");

    let txn = db.begin().await.expect("begin failed");

    // Nesting is an explicit, stated limitation.
    let err = db.begin().await.expect_err("nested begin must fail");
    assert!(matches!(
        err,
        Error::Store(StoreError::Transaction(TransactionError::NestedUnsupported))
    ));

    db.insert("lorem", &info_row("txn")).await.expect("insert failed");
    db.commit(txn).await.expect("commit failed");
    assert_eq!(count(&db).await, 1);

    db.close().await.expect("close failed");
}

#[tokio::test]
async fn build_rejects_bad_configuration() {
    let memory = MemoryStore::new();
    let err = Replica::build(ReplicaConfig::memory(memory, "", FILENAME)).unwrap_err();
    assert!(matches!(err, Error::Config(ConfigError::EmptyContainer)));
}

#[tokio::test]
async fn replace_and_status_round_out_the_surface() {
    let memory = MemoryStore::new();
    let db = build_remote(&memory);
    db.connect().await.expect("connect failed");
    db.query(
        "CREATE TABLE settings (key TEXT, value TEXT)",
        &[],
    )
    .await
    .expect("schema creation failed");

    let key = map(&[("key", SqlValue::from("theme"))]);
    db.replace(
        "settings",
        &map(&[("value", SqlValue::from("dark"))]),
        &key,
    )
    .await
    .expect("replace-insert failed");
    db.replace(
        "settings",
        &map(&[("value", SqlValue::from("light"))]),
        &key,
    )
    .await
    .expect("replace-update failed");

    let rows = db.select("settings", &SqlMap::new()).await.expect("select failed");
    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows.first().unwrap().get("value"),
        Some(&SqlValue::Text("light".to_owned()))
    );

    // Wait for the upload so status reports a confirmed tag.
    tokio::time::sleep(Duration::from_millis(300)).await;
    let status = db.status().await;
    assert!(status.connected);
    assert!(status.current.is_some());
    assert!(status.last_backup_at.is_some());

    db.close().await.expect("close failed");
    let status = db.status().await;
    assert!(!status.connected);
}
