//! libSQL backend: owns the shared connection and hands out transactions.
//!
//! Supports local file, in-memory, and remote (`libsql://`, `http(s)://`)
//! databases. One connection is shared by every component in the process.

use std::path::Path;
use std::sync::Arc;

use libsql::{Connection, Database as LibSqlDatabase, Transaction};
use tracing::info;

use crate::error::DatabaseError;
use crate::store::migrations;

/// libSQL database backend.
///
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

fn is_remote(url: &str) -> bool {
    url.starts_with("libsql://") || url.starts_with("http://") || url.starts_with("https://")
}

impl LibSqlBackend {
    /// Open whatever `url` names and run migrations.
    pub async fn open(url: &str, auth_token: &str) -> Result<Self, DatabaseError> {
        if url == ":memory:" {
            return Self::new_memory().await;
        }
        if is_remote(url) {
            return Self::new_remote(url, auth_token).await;
        }
        Self::new_local(Path::new(url)).await
    }

    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_database(db).await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Connect to a remote libSQL server and run migrations.
    pub async fn new_remote(url: &str, auth_token: &str) -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_remote(url.to_string(), auth_token.to_string())
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open remote database: {e}")))?;

        let backend = Self::from_database(db).await?;
        info!(url = %url, "Remote database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;
        Self::from_database(db).await
    }

    async fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        migrations::run_migrations(&conn).await?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    /// The shared connection. Statements run on it commit individually.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Begin a transaction on the shared connection. Finish it with
    /// [`commit`] or [`rollback`].
    pub async fn transaction(&self) -> Result<Transaction, DatabaseError> {
        self.conn
            .transaction()
            .await
            .map_err(|e| DatabaseError::Transaction(format!("begin: {e}")))
    }
}

/// Commit `tx`, mapping the failure into a `DatabaseError`.
pub async fn commit(tx: Transaction) -> Result<(), DatabaseError> {
    tx.commit()
        .await
        .map_err(|e| DatabaseError::Transaction(format!("commit: {e}")))
}

/// Roll back `tx`, mapping the failure into a `DatabaseError`.
pub async fn rollback(tx: Transaction) -> Result<(), DatabaseError> {
    tx.rollback()
        .await
        .map_err(|e| DatabaseError::Transaction(format!("rollback: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_memory() {
        let backend = LibSqlBackend::open(":memory:", "").await.unwrap();
        let mut rows = backend
            .conn()
            .query(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='classifications'",
                (),
            )
            .await
            .unwrap();
        let row = rows.next().await.unwrap().unwrap();
        assert_eq!(row.get::<i64>(0).unwrap(), 1);
    }

    #[tokio::test]
    async fn open_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let db_path = tmp.path().join("nested").join("dir").join("classifier.db");
        let backend = LibSqlBackend::open(db_path.to_str().unwrap(), "").await.unwrap();
        assert!(db_path.exists());
        drop(backend);
    }

    #[tokio::test]
    async fn reopen_keeps_schema() {
        let tmp = tempfile::tempdir().unwrap();
        let db_path = tmp.path().join("classifier.db");
        drop(LibSqlBackend::new_local(&db_path).await.unwrap());
        // Second open must not re-run applied migrations.
        LibSqlBackend::new_local(&db_path).await.unwrap();
    }

    #[test]
    fn remote_urls_detected() {
        assert!(is_remote("libsql://classifier.turso.io"));
        assert!(is_remote("https://db.example.com"));
        assert!(!is_remote("./data/classifier.db"));
        assert!(!is_remote("/var/lib/classifier.db"));
    }
}
