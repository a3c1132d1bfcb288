//! Blob store contract and an in-process implementation.

use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use url::Url;

use crate::chat::backend::document::StoreFuture;
use crate::chat::core::errors::BlobError;

/// Byte storage addressed by path, able to hand out a URL per stored blob.
///
/// Storing and resolving are separate calls; a failure between them leaves
/// the bytes stored with nothing pointing at them.
pub trait BlobStore: Send + Sync {
    /// Store `bytes` at `path`, replacing any previous blob.
    ///
    /// # Errors
    /// Returns an error if the bytes cannot be stored.
    fn put(&self, path: &str, bytes: Vec<u8>) -> StoreFuture<'_, Result<(), BlobError>>;

    /// Durable download URL of the blob at `path`.
    ///
    /// # Errors
    /// Returns an error if the blob is missing or no URL can be built.
    fn download_url(&self, path: &str) -> StoreFuture<'_, Result<Url, BlobError>>;
}

/// `DashMap`-backed [`BlobStore`] serving URLs under a fixed base.
#[derive(Debug)]
pub struct InMemoryBlobStore {
    base_url: Url,
    blobs: DashMap<String, Vec<u8>>,
    fail_puts: AtomicBool,
    fail_urls: AtomicBool,
}

impl InMemoryBlobStore {
    /// Empty store whose URLs are `base_url` joined with the blob path.
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            blobs: DashMap::new(),
            fail_puts: AtomicBool::new(false),
            fail_urls: AtomicBool::new(false),
        }
    }

    /// Make `put` fail.
    pub fn set_fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    /// Make `download_url` fail.
    pub fn set_fail_urls(&self, fail: bool) {
        self.fail_urls.store(fail, Ordering::SeqCst);
    }

    /// Bytes stored at `path`.
    #[must_use]
    pub fn bytes(&self, path: &str) -> Option<Vec<u8>> {
        self.blobs.get(path).map(|entry| entry.value().clone())
    }
}

impl BlobStore for InMemoryBlobStore {
    fn put(&self, path: &str, bytes: Vec<u8>) -> StoreFuture<'_, Result<(), BlobError>> {
        let path = path.to_string();
        Box::pin(async move {
            if self.fail_puts.load(Ordering::SeqCst) {
                return Err(BlobError::Unavailable(format!("put of {path} refused")));
            }
            self.blobs.insert(path, bytes);
            Ok(())
        })
    }

    fn download_url(&self, path: &str) -> StoreFuture<'_, Result<Url, BlobError>> {
        let path = path.to_string();
        Box::pin(async move {
            if self.fail_urls.load(Ordering::SeqCst) {
                return Err(BlobError::Unavailable(format!("url of {path} refused")));
            }
            if !self.blobs.contains_key(&path) {
                return Err(BlobError::Url(format!("no blob at {path}")));
            }
            self.base_url
                .join(&path)
                .map_err(|err| BlobError::Url(err.to_string()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> InMemoryBlobStore {
        InMemoryBlobStore::new(Url::parse("https://cdn.example.com/").unwrap())
    }

    #[tokio::test]
    async fn url_follows_put() {
        let store = store();
        assert!(store.download_url("images/a.png").await.is_err());
        store.put("images/a.png", vec![1, 2, 3]).await.unwrap();
        assert_eq!(
            store.download_url("images/a.png").await.unwrap().as_str(),
            "https://cdn.example.com/images/a.png"
        );
        assert_eq!(store.bytes("images/a.png"), Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn url_fault_keeps_bytes() {
        let store = store();
        store.set_fail_urls(true);
        store.put("images/a.png", vec![9]).await.unwrap();
        assert!(store.download_url("images/a.png").await.is_err());
        assert_eq!(store.bytes("images/a.png"), Some(vec![9]));
    }
}
