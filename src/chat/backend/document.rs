//! Document backend contract.

use std::future::Future;
use std::pin::Pin;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::chat::core::errors::{BackendError, ChatError, ChatResult};

/// Boxed future type for backend operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Key/value store of JSON documents addressed by path.
///
/// Each call is a single request against one path. There are no multi-path
/// transactions: callers sequence read-modify-write themselves and the last
/// writer wins.
pub trait DocumentBackend: Send + Sync {
    /// Read the document at `path`; `None` when nothing is stored there.
    ///
    /// # Errors
    /// Returns an error if the backend cannot be reached.
    fn get(&self, path: &str) -> StoreFuture<'_, Result<Option<serde_json::Value>, BackendError>>;

    /// Replace the document at `path`.
    ///
    /// # Errors
    /// Returns an error if the backend cannot be reached.
    fn set(&self, path: &str, value: serde_json::Value)
    -> StoreFuture<'_, Result<(), BackendError>>;

    /// Every path that currently holds a document.
    ///
    /// # Errors
    /// Returns an error if the backend cannot be reached.
    fn list_paths(&self) -> StoreFuture<'_, Result<Vec<String>, BackendError>>;
}

/// Read and decode the document at `path`.
///
/// # Errors
/// Returns `Transport` on backend failure and `InvalidDocument` when the stored
/// value does not decode as `T`.
pub async fn get_typed<T: DeserializeOwned>(
    backend: &dyn DocumentBackend,
    path: &str,
) -> ChatResult<Option<T>> {
    let Some(value) = backend.get(path).await? else {
        return Ok(None);
    };
    serde_json::from_value(value)
        .map(Some)
        .map_err(|source| ChatError::InvalidDocument {
            path: path.to_string(),
            source,
        })
}

/// Encode `value` as a JSON document for `path`.
///
/// # Errors
/// Returns `InvalidDocument` if `value` cannot be encoded.
pub fn encode<T: Serialize>(path: &str, value: &T) -> ChatResult<serde_json::Value> {
    serde_json::to_value(value).map_err(|source| ChatError::InvalidDocument {
        path: path.to_string(),
        source,
    })
}
