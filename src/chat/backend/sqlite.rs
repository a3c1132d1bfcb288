//! `SQLite`-backed document store.

use std::sync::Arc;

use chrono::Utc;
use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;

use crate::chat::backend::document::{DocumentBackend, StoreFuture};
use crate::chat::core::config::StorageConfig;
use crate::chat::core::errors::BackendError;

/// `SQLite` implementation of [`DocumentBackend`]: one row per path, JSON body.
pub struct SqliteDocumentBackend {
    conn: Arc<Connection>,
    table: String,
}

impl SqliteDocumentBackend {
    /// Open the database file from `config` and create the table if needed.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened.
    pub async fn new(config: &StorageConfig) -> Result<Self, BackendError> {
        let conn = Connection::open(&config.sqlite_path).await?;
        Self::with_connection(Arc::new(conn), &config.documents_table).await
    }

    /// Private in-memory database, mainly for tests.
    ///
    /// # Errors
    /// Returns an error if the database cannot be created.
    pub async fn in_memory(table: &str) -> Result<Self, BackendError> {
        let conn = Connection::open_in_memory().await?;
        Self::with_connection(Arc::new(conn), table).await
    }

    /// Use an existing connection.
    ///
    /// # Errors
    /// Returns an error if the table cannot be created.
    pub async fn with_connection(conn: Arc<Connection>, table: &str) -> Result<Self, BackendError> {
        let table = table.to_string();
        let table_name = table.clone();

        conn.call(move |conn| {
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {table_name} (
                    path TEXT PRIMARY KEY,
                    body TEXT NOT NULL,
                    updated_at INTEGER NOT NULL
                )"
            ))?;
            Ok(())
        })
        .await?;

        Ok(Self { conn, table })
    }
}

impl DocumentBackend for SqliteDocumentBackend {
    fn get(&self, path: &str) -> StoreFuture<'_, Result<Option<serde_json::Value>, BackendError>> {
        let path = path.to_string();
        Box::pin(async move {
            let table = self.table.clone();
            let key = path.clone();
            let body = self
                .conn
                .call(move |conn| {
                    let body = conn
                        .query_row(
                            &format!("SELECT body FROM {table} WHERE path = ?1"),
                            rusqlite::params![key],
                            |row| row.get::<_, String>(0),
                        )
                        .optional()?;
                    Ok(body)
                })
                .await?;

            match body {
                Some(json) => {
                    let value = serde_json::from_str(&json)
                        .map_err(|source| BackendError::CorruptDocument { path, source })?;
                    Ok(Some(value))
                }
                None => Ok(None),
            }
        })
    }

    fn set(
        &self,
        path: &str,
        value: serde_json::Value,
    ) -> StoreFuture<'_, Result<(), BackendError>> {
        let path = path.to_string();
        Box::pin(async move {
            let table = self.table.clone();
            let body = value.to_string();
            let updated_at = Utc::now().timestamp_millis();

            self.conn
                .call(move |conn| {
                    conn.execute(
                        &format!(
                            "INSERT OR REPLACE INTO {table} (path, body, updated_at)
                             VALUES (?1, ?2, ?3)"
                        ),
                        rusqlite::params![path, body, updated_at],
                    )?;
                    Ok(())
                })
                .await?;
            Ok(())
        })
    }

    fn list_paths(&self) -> StoreFuture<'_, Result<Vec<String>, BackendError>> {
        Box::pin(async move {
            let table = self.table.clone();
            let paths = self
                .conn
                .call(move |conn| {
                    let mut stmt = conn.prepare(&format!("SELECT path FROM {table} ORDER BY path"))?;
                    let paths = stmt
                        .query_map([], |row| row.get::<_, String>(0))?
                        .collect::<Result<Vec<_>, rusqlite::Error>>()?;
                    Ok(paths)
                })
                .await?;
            Ok(paths)
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::chat::core::errors::ChatError;

    #[tokio::test]
    async fn documents_round_trip_through_sqlite() {
        let backend = SqliteDocumentBackend::in_memory("documents").await.unwrap();
        assert_eq!(backend.get("alice-x-com").await.unwrap(), None);

        backend
            .set("alice-x-com", json!({ "first-name": "Alice" }))
            .await
            .unwrap();
        backend
            .set("alice-x-com", json!({ "first-name": "Alicia" }))
            .await
            .unwrap();

        assert_eq!(
            backend.get("alice-x-com").await.unwrap(),
            Some(json!({ "first-name": "Alicia" }))
        );
        assert_eq!(
            backend.list_paths().await.unwrap(),
            vec!["alice-x-com".to_string()]
        );
    }

    #[tokio::test]
    async fn corrupt_row_is_invalid_document() {
        let backend = SqliteDocumentBackend::in_memory("documents").await.unwrap();
        backend
            .conn
            .call(|conn| {
                conn.execute(
                    "INSERT INTO documents (path, body, updated_at) VALUES ('alice-x-com', '{oops', 0)",
                    [],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        let err = backend.get("alice-x-com").await.unwrap_err();
        assert!(matches!(err, BackendError::CorruptDocument { ref path, .. } if path == "alice-x-com"));
        assert!(matches!(
            ChatError::from(err),
            ChatError::InvalidDocument { .. }
        ));
    }

    #[tokio::test]
    async fn file_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            sqlite_path: dir.path().join("chat.sqlite"),
            documents_table: "documents".to_string(),
        };

        let backend = SqliteDocumentBackend::new(&config).await.unwrap();
        backend.set("users", json!([])).await.unwrap();
        drop(backend);

        let reopened = SqliteDocumentBackend::new(&config).await.unwrap();
        assert_eq!(reopened.get("users").await.unwrap(), Some(json!([])));
    }
}
