//! SQLite-backed [`DocumentStore`].
//!
//! Documents live in a single `documents` table keyed by
//! `(collection, doc_id)` with the body stored as JSON text. Runtime
//! pragmas match the CLI's expectations:
//! - `journal_mode = WAL` so readers never block the writer
//! - `busy_timeout = 5s` to absorb short lock contention
//!
//! String-valued equality filters are pushed down to SQLite via
//! `json_extract`; every filter is re-checked in Rust on the decoded body.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use anyhow::Context;
use rusqlite::{Connection, OptionalExtension, params_from_iter, types::Type};
use serde_json::{Map, Value};

use super::{Document, DocumentStore, Filter, StoreError, generate_id};

/// Busy timeout used for store connections.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Latest schema version understood by this binary.
pub const LATEST_SCHEMA_VERSION: u32 = 1;

/// Migration v1: the document table and its lookup index.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS documents (
    collection TEXT NOT NULL CHECK (length(collection) > 0),
    doc_id TEXT NOT NULL CHECK (length(doc_id) > 0),
    body_json TEXT NOT NULL CHECK (json_valid(body_json)),
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL,
    PRIMARY KEY (collection, doc_id)
) WITHOUT ROWID;

CREATE INDEX IF NOT EXISTS idx_documents_collection_updated
    ON documents(collection, updated_at_us DESC);
";

const MIGRATIONS: &[(u32, &str)] = &[(1, MIGRATION_V1_SQL)];

/// Read `PRAGMA user_version` as a `u32`.
///
/// # Errors
///
/// Returns an error if querying SQLite fails or the version is negative.
pub fn current_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    u32::try_from(version).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(0, Type::Integer, Box::new(error))
    })
}

/// Apply all pending migrations in ascending order.
///
/// # Errors
///
/// Returns an error if any migration fails.
pub fn migrate(conn: &mut Connection) -> rusqlite::Result<u32> {
    let mut current = current_schema_version(conn)?;

    for (version, sql) in MIGRATIONS {
        if *version <= current {
            continue;
        }

        let tx = conn.transaction()?;
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", i64::from(*version))?;
        tx.commit()?;
        current = *version;
    }

    Ok(current)
}

fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    let _journal_mode: String =
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
    Ok(())
}

/// Document store persisted in a single SQLite file.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the store at `path`, apply pragmas and migrate.
    ///
    /// # Errors
    ///
    /// Returns an error if opening, configuring or migrating the database fails.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create store directory {}", parent.display()))?;
        }

        let mut conn = Connection::open(path)
            .with_context(|| format!("open document store {}", path.display()))?;

        configure_connection(&conn).context("configure sqlite pragmas")?;
        migrate(&mut conn).context("apply store migrations")?;

        tracing::debug!(path = %path.display(), "opened document store");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open a private in-memory store.
    ///
    /// # Errors
    ///
    /// Returns an error if migration fails.
    pub fn open_in_memory() -> anyhow::Result<Self> {
        let mut conn = Connection::open_in_memory().context("open in-memory store")?;
        migrate(&mut conn).context("apply store migrations")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("sqlite connection lock poisoned".into()))
    }
}

fn decode_body(collection: &str, id: &str, body: &str) -> Result<Map<String, Value>, StoreError> {
    match serde_json::from_str::<Value>(body)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Corrupt {
            collection: collection.to_string(),
            id: id.to_string(),
            reason: format!("expected a JSON object, found {other}"),
        }),
    }
}

fn now_us() -> i64 {
    chrono::Utc::now().timestamp_micros()
}

/// JSON path for a top-level field, or `None` when it cannot be quoted safely.
fn json_path(field: &str) -> Option<String> {
    if field.contains('"') || field.contains('\\') {
        None
    } else {
        Some(format!("$.\"{field}\""))
    }
}

impl DocumentStore for SqliteStore {
    fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let conn = self.lock()?;
        let body: Option<String> = conn
            .query_row(
                "SELECT body_json FROM documents WHERE collection = ?1 AND doc_id = ?2",
                [collection, id],
                |row| row.get(0),
            )
            .optional()?;

        body.map(|body| {
            decode_body(collection, id, &body).map(|data| Document::new(id.to_string(), data))
        })
        .transpose()
    }

    fn set_document(
        &self,
        collection: &str,
        id: &str,
        data: Map<String, Value>,
    ) -> Result<(), StoreError> {
        let body = serde_json::to_string(&Value::Object(data))?;
        let ts = now_us();
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO documents (collection, doc_id, body_json, created_at_us, updated_at_us) \
             VALUES (?1, ?2, ?3, ?4, ?4) \
             ON CONFLICT(collection, doc_id) DO UPDATE SET \
             body_json = excluded.body_json, updated_at_us = excluded.updated_at_us",
            rusqlite::params![collection, id, body, ts],
        )?;
        Ok(())
    }

    fn delete_document(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "DELETE FROM documents WHERE collection = ?1 AND doc_id = ?2",
            [collection, id],
        )?;
        Ok(changed > 0)
    }

    fn query(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Document>, StoreError> {
        let mut sql = String::from("SELECT doc_id, body_json FROM documents WHERE collection = ?1");
        let mut args: Vec<String> = vec![collection.to_string()];

        for filter in filters {
            let (Some(path), Some(text)) = (json_path(&filter.field), filter.value.as_str()) else {
                continue;
            };
            args.push(path);
            let path_idx = args.len();
            args.push(text.to_string());
            let value_idx = args.len();
            sql.push_str(&format!(
                " AND json_type(body_json, ?{path_idx}) = 'text' \
                 AND json_extract(body_json, ?{path_idx}) = ?{value_idx}"
            ));
        }
        sql.push_str(" ORDER BY doc_id ASC");

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args.iter()), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut docs = Vec::new();
        for row in rows {
            let (id, body) = row?;
            let data = decode_body(collection, &id, &body)?;
            if filters.iter().all(|f| f.matches(&data)) {
                docs.push(Document::new(id, data));
            }
        }
        Ok(docs)
    }

    fn add_document(
        &self,
        collection: &str,
        data: Map<String, Value>,
    ) -> Result<String, StoreError> {
        let body = serde_json::to_string(&Value::Object(data))?;
        let ts = now_us();
        let conn = self.lock()?;

        loop {
            let id = generate_id();
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO documents \
                 (collection, doc_id, body_json, created_at_us, updated_at_us) \
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                rusqlite::params![collection, id, body, ts],
            )?;
            if inserted == 1 {
                return Ok(id);
            }
        }
    }

    fn delete_batch(&self, collection: &str, ids: &[String]) -> Result<usize, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut removed = 0;
        {
            let mut stmt =
                tx.prepare("DELETE FROM documents WHERE collection = ?1 AND doc_id = ?2")?;
            for id in ids {
                removed += stmt.execute([collection, id.as_str()])?;
            }
        }
        tx.commit()?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: &Value) -> Map<String, Value> {
        value.as_object().expect("object literal").clone()
    }

    #[test]
    fn open_sets_wal_and_busy_timeout() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("nested/store.db");
        let store = SqliteStore::open(&path).expect("open store");
        let conn = store.lock().expect("lock");

        let journal_mode: String = conn
            .pragma_query_value(None, "journal_mode", |row| row.get(0))
            .expect("query journal_mode");
        assert_eq!(journal_mode.to_ascii_lowercase(), "wal");

        let busy_timeout_ms: u64 = conn
            .pragma_query_value(None, "busy_timeout", |row| row.get(0))
            .expect("query busy_timeout");
        assert_eq!(u128::from(busy_timeout_ms), DEFAULT_BUSY_TIMEOUT.as_millis());

        assert_eq!(
            current_schema_version(&conn).expect("version"),
            LATEST_SCHEMA_VERSION
        );
    }

    #[test]
    fn migrate_is_idempotent() -> rusqlite::Result<()> {
        let mut conn = Connection::open_in_memory()?;
        assert_eq!(migrate(&mut conn)?, LATEST_SCHEMA_VERSION);
        assert_eq!(migrate(&mut conn)?, LATEST_SCHEMA_VERSION);
        Ok(())
    }

    #[test]
    fn set_replaces_whole_document() {
        let store = SqliteStore::open_in_memory().expect("open");
        store
            .set_document("p", "1", obj(&json!({"title": "A", "value": 10})))
            .expect("set");
        store
            .set_document("p", "1", obj(&json!({"title": "B"})))
            .expect("replace");

        let doc = store.get_document("p", "1").expect("get").expect("exists");
        assert_eq!(doc.str_field("title"), Some("B"));
        assert!(!doc.data.contains_key("value"));
    }

    #[test]
    fn query_pushes_down_string_filters_and_rechecks_others() {
        let store = SqliteStore::open_in_memory().expect("open");
        store
            .set_document("t", "u1_1", obj(&json!({"userId": "u1", "projectId": "1"})))
            .expect("set");
        store
            .set_document("t", "x", obj(&json!({"userId": "u1", "projectId": 1})))
            .expect("set");
        store
            .set_document("t", "y", obj(&json!({"userId": "u2", "projectId": "1"})))
            .expect("set");

        let by_string = store
            .query("t", &[Filter::eq("userId", "u1"), Filter::eq("projectId", "1")])
            .expect("query");
        assert_eq!(by_string.len(), 1);
        assert_eq!(by_string[0].id, "u1_1");

        let by_number = store
            .query("t", &[Filter::eq("projectId", 1)])
            .expect("query");
        assert_eq!(by_number.len(), 1);
        assert_eq!(by_number[0].id, "x");
    }

    #[test]
    fn delete_batch_is_counted() {
        let store = SqliteStore::open_in_memory().expect("open");
        store.set_document("t", "a", Map::new()).expect("set");
        store.set_document("t", "b", Map::new()).expect("set");

        let removed = store
            .delete_batch("t", &["a".into(), "b".into(), "missing".into()])
            .expect("batch");
        assert_eq!(removed, 2);
        assert!(store.query("t", &[]).expect("query").is_empty());
    }

    #[test]
    fn add_document_persists_across_reopen() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("store.db");

        let id = {
            let store = SqliteStore::open(&path).expect("open");
            store
                .add_document("notes", obj(&json!({"text": "kept"})))
                .expect("add")
        };

        let store = SqliteStore::open(&path).expect("reopen");
        let doc = store.get_document("notes", &id).expect("get").expect("exists");
        assert_eq!(doc.str_field("text"), Some("kept"));
    }
}
