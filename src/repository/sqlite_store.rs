//! SQLite Document Store
//!
//! Stores each document as a JSON text column keyed by (collection, key).
//! Merge writes go through SQLite's `json_patch`.

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::{DomainError, DomainResult};
use super::traits::{Document, Fields, ItemStore, WriteMode};

pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) a database file and run migrations
    pub fn open(path: &Path) -> DomainResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DomainError::Internal(format!("Failed to create {}: {}", parent.display(), e)))?;
            }
        }
        let conn = Connection::open(path)
            .map_err(|e| DomainError::Internal(format!("Failed to open db: {}", e)))?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> DomainResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| DomainError::Internal(format!("Failed to open db: {}", e)))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> DomainResult<Self> {
        run_migrations(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

/// Run database migrations
fn run_migrations(conn: &Connection) -> DomainResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS documents (
            collection TEXT NOT NULL,
            key TEXT NOT NULL,
            fields TEXT NOT NULL,
            updated_at INTEGER NOT NULL,
            PRIMARY KEY (collection, key)
        )",
        [],
    )
    .map_err(|e| DomainError::Internal(e.to_string()))?;
    Ok(())
}

fn parse_fields(key: &str, raw: &str) -> DomainResult<Fields> {
    serde_json::from_str::<Fields>(raw)
        .map_err(|e| DomainError::Internal(format!("Corrupt document {}: {}", key, e)))
}

#[async_trait]
impl ItemStore for SqliteStore {
    async fn get(&self, collection: &str, key: &str) -> DomainResult<Option<Fields>> {
        let conn = self.conn.lock().await;
        let raw: Option<String> = conn
            .query_row(
                "SELECT fields FROM documents WHERE collection = ? AND key = ?",
                params![collection, key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| DomainError::TransientFetch(e.to_string()))?;

        raw.map(|raw| parse_fields(key, &raw)).transpose()
    }

    async fn set(&self, collection: &str, key: &str, fields: Fields, mode: WriteMode) -> DomainResult<()> {
        let body = serde_json::to_string(&fields).map_err(|e| DomainError::Internal(e.to_string()))?;
        let now = chrono::Utc::now().timestamp_millis();
        let sql = match mode {
            WriteMode::Replace => {
                "INSERT INTO documents (collection, key, fields, updated_at) VALUES (?, ?, ?, ?)
                 ON CONFLICT(collection, key) DO UPDATE SET fields = excluded.fields, updated_at = excluded.updated_at"
            }
            WriteMode::Merge => {
                "INSERT INTO documents (collection, key, fields, updated_at) VALUES (?, ?, ?, ?)
                 ON CONFLICT(collection, key) DO UPDATE SET fields = json_patch(documents.fields, excluded.fields), updated_at = excluded.updated_at"
            }
        };

        let conn = self.conn.lock().await;
        conn.execute(sql, params![collection, key, body, now])
            .map_err(|e| DomainError::Store(e.to_string()))?;
        Ok(())
    }

    async fn delete(&self, collection: &str, key: &str) -> DomainResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "DELETE FROM documents WHERE collection = ? AND key = ?",
            params![collection, key],
        )
        .map_err(|e| DomainError::Store(e.to_string()))?;
        Ok(())
    }

    async fn list_all(&self, collection: &str) -> DomainResult<Vec<Document>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare("SELECT key, fields FROM documents WHERE collection = ? ORDER BY key")
            .map_err(|e| DomainError::TransientFetch(e.to_string()))?;

        let mut rows = stmt
            .query(params![collection])
            .map_err(|e| DomainError::TransientFetch(e.to_string()))?;

        let mut documents = Vec::new();
        while let Some(row) = rows.next().map_err(|e| DomainError::TransientFetch(e.to_string()))? {
            let key: String = row.get(0).map_err(|e| DomainError::Internal(e.to_string()))?;
            let raw: String = row.get(1).map_err(|e| DomainError::Internal(e.to_string()))?;
            let fields = parse_fields(&key, &raw)?;
            documents.push(Document { key, fields });
        }
        Ok(documents)
    }
}
