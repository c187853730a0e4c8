//! The [`LocalStore`] connection and query surface.
//!
//! A store owns at most one live `SQLite` connection over its current
//! backing file. The connection opens lazily on first use, is reused until
//! [`LocalStore::close`], and is replaced wholesale (never shared) when the
//! sync layer swaps in a freshly downloaded copy via
//! [`LocalStore::reconnect_at`].
//!
//! All statements serialize through an async mutex around the connection,
//! which gives the ordering guarantee the replication layer relies on: one
//! statement completes before the next begins, and the engine's atomic
//! `VACUUM INTO` snapshot never interleaves with a half-applied write.
//!
//! Uses [`sqlx`] with runtime query construction (not compile-time checked)
//! so no database file is needed at build time. All queries are
//! parameterized to prevent SQL injection.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};

use mirrorlite_types::{SqlMap, SqlRow, SqlValue, StoreEvent, TransactionId};
use sqlx::query::Query;
use sqlx::sqlite::{
    Sqlite, SqliteArguments, SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqliteRow,
};
use sqlx::{Column, Connection, Row, TypeInfo, ValueRef};
use tokio::sync::{Mutex, broadcast};

use crate::error::StoreError;
use crate::sql::{self, Statement};
use crate::transaction::TransactionTracker;

/// Capacity of the store event broadcast channel.
///
/// Consumers that coalesce (the backup queue) treat a lagged receiver the
/// same as a burst of change signals, so a small buffer loses nothing.
const EVENT_BUFFER: usize = 64;

/// Upper bound on bind parameters per bulk-insert chunk, kept well under
/// `SQLite`'s historical 999-variable limit.
const MAX_BULK_BINDS: usize = 500;

/// Local `SQLite` store over a single database file.
///
/// Cheap to clone; clones share the same connection, transaction
/// bookkeeping, and event channel.
#[derive(Debug, Clone)]
pub struct LocalStore {
    inner: Arc<StoreInner>,
}

#[derive(Debug)]
struct StoreInner {
    /// Current backing file. Changes only through `reconnect_at`.
    path: StdMutex<PathBuf>,
    /// The live connection, if open. The mutex serializes all statements.
    conn: Mutex<Option<SqliteConnection>>,
    /// Open transaction handles.
    tracker: StdMutex<TransactionTracker>,
    /// Change / remote-update notifications.
    events: broadcast::Sender<StoreEvent>,
}

/// Lock a std mutex, recovering the guard if a panicking thread poisoned it.
fn lock<T>(mutex: &StdMutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Open a connection over `path`, creating the file when absent and
/// enabling foreign-key enforcement.
async fn open_connection(path: &Path) -> Result<SqliteConnection, StoreError> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Delete);
    let conn = SqliteConnection::connect_with(&options).await?;
    tracing::debug!(path = %path.display(), "Opened SQLite connection");
    Ok(conn)
}

/// Return the open connection, opening one at the store's current path if
/// needed.
async fn ensure_open<'a>(
    inner: &StoreInner,
    guard: &'a mut Option<SqliteConnection>,
) -> Result<&'a mut SqliteConnection, StoreError> {
    let conn = match guard.take() {
        Some(conn) => conn,
        None => {
            let path = lock(&inner.path).clone();
            open_connection(&path).await?
        }
    };
    Ok(guard.insert(conn))
}

/// Attach bind values to a query in placeholder order.
fn bind_values<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    params: &[SqlValue],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for value in params {
        query = match value {
            SqlValue::Null => query.bind(None::<i64>),
            SqlValue::Integer(v) => query.bind(*v),
            SqlValue::Real(v) => query.bind(*v),
            SqlValue::Text(v) => query.bind(v.clone()),
            SqlValue::Blob(v) => query.bind(v.clone()),
        };
    }
    query
}

/// Decode one column of a row into an [`SqlValue`] based on its runtime
/// storage class.
fn decode_column(row: &SqliteRow, index: usize) -> Result<SqlValue, StoreError> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(SqlValue::Null);
    }
    let type_name = raw.type_info().name().to_owned();
    drop(raw);

    let value = match type_name.as_str() {
        "INTEGER" | "BOOLEAN" => SqlValue::Integer(row.try_get::<i64, _>(index)?),
        "REAL" => SqlValue::Real(row.try_get::<f64, _>(index)?),
        "BLOB" => SqlValue::Blob(row.try_get::<Vec<u8>, _>(index)?),
        _ => SqlValue::Text(row.try_get::<String, _>(index)?),
    };
    Ok(value)
}

/// Convert a driver row into a column/value map.
fn row_to_map(row: &SqliteRow) -> Result<SqlRow, StoreError> {
    let mut map = SqlRow::new();
    for column in row.columns() {
        map.insert(column.name().to_owned(), decode_column(row, column.ordinal())?);
    }
    Ok(map)
}

impl LocalStore {
    /// Create a store over a database file. The connection opens on first
    /// use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            inner: Arc::new(StoreInner {
                path: StdMutex::new(path.into()),
                conn: Mutex::new(None),
                tracker: StdMutex::new(TransactionTracker::new()),
                events,
            }),
        }
    }

    /// Open the connection if it is not already open. Idempotent: a second
    /// call while connected returns without side effects.
    pub async fn connect(&self) -> Result<(), StoreError> {
        let mut guard = self.inner.conn.lock().await;
        let _ = ensure_open(&self.inner, &mut guard).await?;
        Ok(())
    }

    /// Whether a connection is currently open.
    pub async fn is_connected(&self) -> bool {
        self.inner.conn.lock().await.is_some()
    }

    /// The current backing file path.
    pub fn path(&self) -> PathBuf {
        lock(&self.inner.path).clone()
    }

    /// Subscribe to change and remote-update notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.inner.events.subscribe()
    }

    /// Broadcast a store event to all subscribers.
    ///
    /// Called internally after mutating statements; the sync layer also
    /// calls it to announce a completed connection swap.
    pub fn notify(&self, event: StoreEvent) {
        let _ = self.inner.events.send(event);
    }

    // -----------------------------------------------------------------------
    // Raw statements
    // -----------------------------------------------------------------------

    /// Execute an arbitrary statement and return the number of affected
    /// rows.
    ///
    /// Raw statements never emit a change notification; they are the
    /// escape hatch for schema management, which does not participate in
    /// replication triggering.
    pub async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<u64, StoreError> {
        let statement = Statement {
            sql: sql.to_owned(),
            params: params.to_vec(),
        };
        self.execute(&statement).await
    }

    /// Run an arbitrary query and return all result rows.
    pub async fn query_rows(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<Vec<SqlRow>, StoreError> {
        let statement = Statement {
            sql: sql.to_owned(),
            params: params.to_vec(),
        };
        let rows = self.fetch_all(&statement).await?;
        rows.iter().map(row_to_map).collect()
    }

    /// Run an arbitrary query and return the first column of the first
    /// row, if any.
    pub async fn query_value(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<Option<SqlValue>, StoreError> {
        let statement = Statement {
            sql: sql.to_owned(),
            params: params.to_vec(),
        };
        let row = self.fetch_optional(&statement).await?;
        row.as_ref().map(|r| decode_column(r, 0)).transpose()
    }

    // -----------------------------------------------------------------------
    // Table helpers
    // -----------------------------------------------------------------------

    /// Select all rows matching an equality predicate (empty predicate
    /// selects everything).
    pub async fn select(&self, table: &str, predicate: &SqlMap) -> Result<Vec<SqlRow>, StoreError> {
        let statement = sql::select(table, predicate);
        let rows = self.fetch_all(&statement).await?;
        rows.iter().map(row_to_map).collect()
    }

    /// Select the first row matching an equality predicate.
    pub async fn row(&self, table: &str, predicate: &SqlMap) -> Result<Option<SqlRow>, StoreError> {
        let statement = sql::select(table, predicate);
        let row = self.fetch_optional(&statement).await?;
        row.as_ref().map(row_to_map).transpose()
    }

    /// Select a single value from the first matching row: the named column
    /// when `column` is given and present, otherwise the first column of
    /// the result.
    pub async fn value(
        &self,
        table: &str,
        predicate: &SqlMap,
        column: Option<&str>,
    ) -> Result<Option<SqlValue>, StoreError> {
        let statement = sql::select(table, predicate);
        let Some(row) = self.fetch_optional(&statement).await? else {
            return Ok(None);
        };

        let index = column
            .and_then(|name| row.columns().iter().find(|c| c.name() == name))
            .map_or(0, Column::ordinal);
        Ok(Some(decode_column(&row, index)?))
    }

    /// Select one column from every matching row.
    pub async fn col(
        &self,
        table: &str,
        predicate: &SqlMap,
        column: &str,
    ) -> Result<Vec<SqlValue>, StoreError> {
        let rows = self.select(table, predicate).await?;
        Ok(rows
            .into_iter()
            .map(|mut row| row.remove(column).unwrap_or(SqlValue::Null))
            .collect())
    }

    /// Insert a single row.
    pub async fn insert(&self, table: &str, values: &SqlMap) -> Result<u64, StoreError> {
        if values.is_empty() {
            return Err(StoreError::InvalidArgument(
                "insert requires at least one column".to_owned(),
            ));
        }
        let affected = self.execute(&sql::insert(table, values)).await?;
        self.notify(StoreEvent::Change);
        Ok(affected)
    }

    /// Insert many rows sharing one column list, chunked to stay under the
    /// engine's bind-variable limit.
    pub async fn insert_bulk(
        &self,
        table: &str,
        columns: &[String],
        rows: &[Vec<SqlValue>],
    ) -> Result<u64, StoreError> {
        if columns.is_empty() {
            return Err(StoreError::InvalidArgument(
                "insert_bulk requires at least one column".to_owned(),
            ));
        }
        for row in rows {
            if row.len() != columns.len() {
                return Err(StoreError::InvalidArgument(format!(
                    "row arity {} does not match {} columns",
                    row.len(),
                    columns.len()
                )));
            }
        }
        if rows.is_empty() {
            return Ok(0);
        }

        let rows_per_chunk = MAX_BULK_BINDS
            .checked_div(columns.len())
            .unwrap_or(1)
            .max(1);
        let mut affected: u64 = 0;
        for chunk in rows.chunks(rows_per_chunk) {
            let count = self.execute(&sql::insert_bulk(table, columns, chunk)).await?;
            affected = affected.saturating_add(count);
        }
        self.notify(StoreEvent::Change);
        Ok(affected)
    }

    /// Update matching rows. An empty value map is a no-op returning 0.
    pub async fn update(
        &self,
        table: &str,
        values: &SqlMap,
        predicate: &SqlMap,
    ) -> Result<u64, StoreError> {
        if values.is_empty() {
            return Ok(0);
        }
        let affected = self.execute(&sql::update(table, values, predicate)).await?;
        self.notify(StoreEvent::Change);
        Ok(affected)
    }

    /// Single-row upsert: update the row matching `predicate` when it
    /// exists, otherwise insert `values` merged with the predicate values.
    ///
    /// The select and the mutation are two statements; wrap the call in a
    /// transaction when concurrent writers may target the same key.
    pub async fn replace(
        &self,
        table: &str,
        values: &SqlMap,
        predicate: &SqlMap,
    ) -> Result<(), StoreError> {
        let existing = self.row(table, predicate).await?;
        if existing.is_some() {
            let _ = self.update(table, values, predicate).await?;
        } else {
            let mut merged = values.clone();
            for (column, value) in predicate {
                merged.insert(column.clone(), value.clone());
            }
            let _ = self.insert(table, &merged).await?;
        }
        Ok(())
    }

    /// Delete matching rows (empty predicate deletes everything).
    pub async fn delete(&self, table: &str, predicate: &SqlMap) -> Result<u64, StoreError> {
        let affected = self.execute(&sql::delete(table, predicate)).await?;
        self.notify(StoreEvent::Change);
        Ok(affected)
    }

    /// Remove every row of a table.
    pub async fn truncate(&self, table: &str) -> Result<u64, StoreError> {
        let affected = self.execute(&sql::truncate(table)).await?;
        self.notify(StoreEvent::Change);
        Ok(affected)
    }

    // -----------------------------------------------------------------------
    // Transactions
    // -----------------------------------------------------------------------

    /// Open a transaction and return its opaque handle.
    ///
    /// Only single-level transactions are supported: calling `begin` while
    /// a transaction is already open fails with
    /// [`TransactionError::NestedUnsupported`] and leaves the open
    /// transaction untouched.
    ///
    /// [`TransactionError::NestedUnsupported`]: crate::error::TransactionError::NestedUnsupported
    pub async fn begin(&self) -> Result<TransactionId, StoreError> {
        let id = lock(&self.inner.tracker).open_root()?;

        match self.execute(&Statement::bare("BEGIN".to_owned())).await {
            Ok(_) => {
                tracing::debug!(%id, "Transaction opened");
                Ok(id)
            }
            Err(err) => {
                // BEGIN never ran; release the reservation.
                let _ = lock(&self.inner.tracker).close(id);
                Err(err)
            }
        }
    }

    /// Commit the transaction behind `id`.
    ///
    /// Rejected when the handle is unknown or a deeper level is still
    /// open. If the engine `COMMIT` itself fails, the bookkeeping entry is
    /// reinstated so the caller can still roll back.
    pub async fn commit(&self, id: TransactionId) -> Result<(), StoreError> {
        let level = lock(&self.inner.tracker).close(id)?;

        if level == 0 {
            if let Err(err) = self.execute(&Statement::bare("COMMIT".to_owned())).await {
                lock(&self.inner.tracker).reinstate(id, level);
                return Err(err);
            }
            tracing::debug!(%id, "Transaction committed");
            self.notify(StoreEvent::Change);
        }
        Ok(())
    }

    /// Roll back the transaction behind `id`.
    ///
    /// Subject to the same handle validation as [`LocalStore::commit`].
    /// Emits no change notification: the aborted statements' effects are
    /// gone, and any signals they produced coalesce into a backup of the
    /// unchanged committed state.
    pub async fn rollback(&self, id: TransactionId) -> Result<(), StoreError> {
        let level = lock(&self.inner.tracker).close(id)?;

        if level == 0 {
            if let Err(err) = self.execute(&Statement::bare("ROLLBACK".to_owned())).await {
                lock(&self.inner.tracker).reinstate(id, level);
                return Err(err);
            }
            tracing::debug!(%id, "Transaction rolled back");
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Snapshot and lifecycle
    // -----------------------------------------------------------------------

    /// Write an atomic, point-in-time-consistent copy of the live database
    /// to `destination` using the engine's native `VACUUM INTO`.
    ///
    /// Fails while a transaction is open (an engine restriction); the
    /// backup queue tolerates that and retries after the commit lands.
    pub async fn snapshot_to(&self, destination: &Path) -> Result<(), StoreError> {
        let statement = Statement {
            sql: "VACUUM INTO ?".to_owned(),
            params: vec![SqlValue::Text(destination.to_string_lossy().into_owned())],
        };
        let _ = self.execute(&statement).await?;
        tracing::debug!(destination = %destination.display(), "Snapshot written");
        Ok(())
    }

    /// Close the connection and clear transaction bookkeeping. No-op when
    /// already closed.
    pub async fn close(&self) -> Result<(), StoreError> {
        let mut guard = self.inner.conn.lock().await;
        if let Some(conn) = guard.take() {
            conn.close().await?;
            lock(&self.inner.tracker).clear();
            tracing::debug!("SQLite connection closed");
        }
        Ok(())
    }

    /// Remove the backing database file. Closes the connection first.
    pub async fn destroy(&self) -> Result<(), StoreError> {
        self.close().await?;
        let path = self.path();
        tokio::fs::remove_file(&path).await?;
        tracing::debug!(path = %path.display(), "Removed backing database file");
        Ok(())
    }

    /// Close the connection, retarget the backing file, and reopen.
    ///
    /// Replication plumbing: the sync layer calls this to install a freshly
    /// downloaded copy. The old connection is fully closed before the new
    /// one opens; applications never call this directly.
    pub async fn reconnect_at(&self, path: impl Into<PathBuf>) -> Result<(), StoreError> {
        self.close().await?;
        *lock(&self.inner.path) = path.into();
        self.connect().await
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    async fn execute(&self, statement: &Statement) -> Result<u64, StoreError> {
        let mut guard = self.inner.conn.lock().await;
        let conn = ensure_open(&self.inner, &mut guard).await?;
        tracing::debug!(sql = %statement.sql, "Executing statement");
        let result = bind_values(sqlx::query(&statement.sql), &statement.params)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }

    async fn fetch_all(&self, statement: &Statement) -> Result<Vec<SqliteRow>, StoreError> {
        let mut guard = self.inner.conn.lock().await;
        let conn = ensure_open(&self.inner, &mut guard).await?;
        tracing::debug!(sql = %statement.sql, "Executing query");
        let rows = bind_values(sqlx::query(&statement.sql), &statement.params)
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows)
    }

    async fn fetch_optional(&self, statement: &Statement) -> Result<Option<SqliteRow>, StoreError> {
        let mut guard = self.inner.conn.lock().await;
        let conn = ensure_open(&self.inner, &mut guard).await?;
        tracing::debug!(sql = %statement.sql, "Executing query");
        let row = bind_values(sqlx::query(&statement.sql), &statement.params)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use mirrorlite_types::{SqlMap, SqlValue, StoreEvent};
    use tokio::sync::broadcast::error::TryRecvError;

    use super::*;
    use crate::error::{StoreError, TransactionError};

    fn map(pairs: &[(&str, SqlValue)]) -> SqlMap {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect()
    }

    async fn fixture() -> (LocalStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path().join("test.sqlite"));
        store
            .query(
                "CREATE TABLE lorem (id INTEGER PRIMARY KEY, info TEXT, score REAL)",
                &[],
            )
            .await
            .unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn insert_and_select_round_trip() {
        let (store, _dir) = fixture().await;

        store
            .insert("lorem", &map(&[("info", SqlValue::from("first"))]))
            .await
            .unwrap();

        let rows = store.select("lorem", &SqlMap::new()).await.unwrap();
        assert_eq!(rows.len(), 1);
        let row = rows.first().unwrap();
        assert_eq!(row.get("info"), Some(&SqlValue::Text("first".to_owned())));
    }

    #[tokio::test]
    async fn value_picks_named_or_first_column() {
        let (store, _dir) = fixture().await;
        store
            .insert(
                "lorem",
                &map(&[
                    ("info", SqlValue::from("x")),
                    ("score", SqlValue::Real(0.5)),
                ]),
            )
            .await
            .unwrap();

        let named = store
            .value("lorem", &SqlMap::new(), Some("info"))
            .await
            .unwrap();
        assert_eq!(named, Some(SqlValue::Text("x".to_owned())));

        // No column requested: first column of the result (id).
        let first = store.value("lorem", &SqlMap::new(), None).await.unwrap();
        assert_eq!(first, Some(SqlValue::Integer(1)));
    }

    #[tokio::test]
    async fn query_value_runs_arbitrary_sql() {
        let (store, _dir) = fixture().await;
        store
            .insert("lorem", &map(&[("info", SqlValue::from("a"))]))
            .await
            .unwrap();
        store
            .insert("lorem", &map(&[("info", SqlValue::from("b"))]))
            .await
            .unwrap();

        let count = store
            .query_value("SELECT COUNT(*) FROM lorem", &[])
            .await
            .unwrap();
        assert_eq!(count, Some(SqlValue::Integer(2)));
    }

    #[tokio::test]
    async fn replace_updates_existing_and_inserts_missing() {
        let (store, _dir) = fixture().await;

        // Missing: inserts values merged with the predicate.
        store
            .replace(
                "lorem",
                &map(&[("score", SqlValue::Real(1.0))]),
                &map(&[("info", SqlValue::from("key"))]),
            )
            .await
            .unwrap();
        let rows = store.select("lorem", &SqlMap::new()).await.unwrap();
        assert_eq!(rows.len(), 1);

        // Present: updates in place, no second row.
        store
            .replace(
                "lorem",
                &map(&[("score", SqlValue::Real(2.0))]),
                &map(&[("info", SqlValue::from("key"))]),
            )
            .await
            .unwrap();
        let rows = store.select("lorem", &SqlMap::new()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows.first().unwrap().get("score"),
            Some(&SqlValue::Real(2.0))
        );
    }

    #[tokio::test]
    async fn update_with_empty_values_is_a_noop() {
        let (store, _dir) = fixture().await;
        let affected = store
            .update("lorem", &SqlMap::new(), &SqlMap::new())
            .await
            .unwrap();
        assert_eq!(affected, 0);
    }

    #[tokio::test]
    async fn truncate_clears_the_table() {
        let (store, _dir) = fixture().await;
        store
            .insert_bulk(
                "lorem",
                &["info".to_owned()],
                &[
                    vec![SqlValue::from("a")],
                    vec![SqlValue::from("b")],
                    vec![SqlValue::from("c")],
                ],
            )
            .await
            .unwrap();

        store.truncate("lorem").await.unwrap();
        let rows = store.select("lorem", &SqlMap::new()).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn insert_bulk_rejects_arity_mismatch() {
        let (store, _dir) = fixture().await;
        let err = store
            .insert_bulk(
                "lorem",
                &["info".to_owned()],
                &[vec![SqlValue::from("a"), SqlValue::from("extra")]],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn nested_begin_is_rejected_without_disturbing_the_open_transaction() {
        let (store, _dir) = fixture().await;

        let outer = store.begin().await.unwrap();
        let err = store.begin().await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Transaction(TransactionError::NestedUnsupported)
        ));

        // The original transaction still works end to end.
        store
            .insert("lorem", &map(&[("info", SqlValue::from("inside"))]))
            .await
            .unwrap();
        store.commit(outer).await.unwrap();

        let count = store
            .query_value("SELECT COUNT(*) FROM lorem", &[])
            .await
            .unwrap();
        assert_eq!(count, Some(SqlValue::Integer(1)));
    }

    #[tokio::test]
    async fn commit_with_unknown_handle_fails() {
        let (store, _dir) = fixture().await;
        let stray = mirrorlite_types::TransactionId::new();
        let err = store.commit(stray).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Transaction(TransactionError::UnknownHandle(_))
        ));
    }

    #[tokio::test]
    async fn rollback_discards_uncommitted_rows() {
        let (store, _dir) = fixture().await;

        let txn = store.begin().await.unwrap();
        store
            .insert("lorem", &map(&[("info", SqlValue::from("doomed"))]))
            .await
            .unwrap();
        store.rollback(txn).await.unwrap();

        let count = store
            .query_value("SELECT COUNT(*) FROM lorem", &[])
            .await
            .unwrap();
        assert_eq!(count, Some(SqlValue::Integer(0)));
    }

    #[tokio::test]
    async fn mutations_emit_change_events_and_schema_statements_do_not() {
        let (store, _dir) = fixture().await;
        let mut events = store.subscribe();

        // Raw statement: no notification.
        store
            .query("CREATE TABLE extra (x INTEGER)", &[])
            .await
            .unwrap();
        assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));

        store
            .insert("lorem", &map(&[("info", SqlValue::from("ping"))]))
            .await
            .unwrap();
        assert_eq!(events.try_recv().unwrap(), StoreEvent::Change);
    }

    #[tokio::test]
    async fn connect_is_idempotent_and_close_is_safe_to_repeat() {
        let (store, _dir) = fixture().await;

        store.connect().await.unwrap();
        store.connect().await.unwrap();
        assert!(store.is_connected().await);

        store.close().await.unwrap();
        store.close().await.unwrap();
        assert!(!store.is_connected().await);

        // Queries lazily reopen after a close.
        let count = store
            .query_value("SELECT COUNT(*) FROM lorem", &[])
            .await
            .unwrap();
        assert_eq!(count, Some(SqlValue::Integer(0)));
    }

    #[tokio::test]
    async fn snapshot_produces_an_openable_consistent_copy() {
        let (store, dir) = fixture().await;
        store
            .insert("lorem", &map(&[("info", SqlValue::from("kept"))]))
            .await
            .unwrap();

        let snapshot_path = dir.path().join("snapshot.sqlite");
        store.snapshot_to(&snapshot_path).await.unwrap();

        let copy = LocalStore::new(&snapshot_path);
        let count = copy
            .query_value("SELECT COUNT(*) FROM lorem", &[])
            .await
            .unwrap();
        assert_eq!(count, Some(SqlValue::Integer(1)));
    }

    #[tokio::test]
    async fn reconnect_at_swaps_the_backing_file() {
        let (store, dir) = fixture().await;
        store
            .insert("lorem", &map(&[("info", SqlValue::from("old"))]))
            .await
            .unwrap();

        // Build a replacement file with different content.
        let replacement = dir.path().join("replacement.sqlite");
        let other = LocalStore::new(&replacement);
        other
            .query("CREATE TABLE lorem (id INTEGER PRIMARY KEY, info TEXT)", &[])
            .await
            .unwrap();
        other
            .insert_bulk(
                "lorem",
                &["info".to_owned()],
                &[vec![SqlValue::from("a")], vec![SqlValue::from("b")]],
            )
            .await
            .unwrap();
        other.close().await.unwrap();

        store.reconnect_at(&replacement).await.unwrap();
        let count = store
            .query_value("SELECT COUNT(*) FROM lorem", &[])
            .await
            .unwrap();
        assert_eq!(count, Some(SqlValue::Integer(2)));
        assert_eq!(store.path(), replacement);
    }
}
