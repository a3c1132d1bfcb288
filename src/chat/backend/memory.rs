//! In-process document backend with switchable transport faults.

use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::{DashMap, DashSet};

use crate::chat::backend::document::{DocumentBackend, StoreFuture};
use crate::chat::core::errors::BackendError;

/// `DashMap`-backed [`DocumentBackend`].
///
/// Faults can be switched on per path or globally to reproduce partial writes
/// without a real network.
#[derive(Debug, Default)]
pub struct InMemoryDocumentBackend {
    documents: DashMap<String, serde_json::Value>,
    failing_reads: DashSet<String>,
    failing_writes: DashSet<String>,
    offline: AtomicBool,
}

impl InMemoryDocumentBackend {
    /// Empty backend with no faults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `get` of `path` fail until [`Self::heal`].
    pub fn fail_reads_of(&self, path: &str) {
        self.failing_reads.insert(path.to_string());
    }

    /// Make every `set` of `path` fail until [`Self::heal`].
    pub fn fail_writes_to(&self, path: &str) {
        self.failing_writes.insert(path.to_string());
    }

    /// Make every call fail.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Clear every fault.
    pub fn heal(&self) {
        self.failing_reads.clear();
        self.failing_writes.clear();
        self.set_offline(false);
    }

    /// Current document at `path`, bypassing faults.
    #[must_use]
    pub fn snapshot(&self, path: &str) -> Option<serde_json::Value> {
        self.documents.get(path).map(|entry| entry.value().clone())
    }

    fn check_online(&self) -> Result<(), BackendError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable("backend offline".to_string()));
        }
        Ok(())
    }
}

impl DocumentBackend for InMemoryDocumentBackend {
    fn get(&self, path: &str) -> StoreFuture<'_, Result<Option<serde_json::Value>, BackendError>> {
        let path = path.to_string();
        Box::pin(async move {
            self.check_online()?;
            if self.failing_reads.contains(&path) {
                return Err(BackendError::Unavailable(format!("read of {path} refused")));
            }
            Ok(self.documents.get(&path).map(|entry| entry.value().clone()))
        })
    }

    fn set(
        &self,
        path: &str,
        value: serde_json::Value,
    ) -> StoreFuture<'_, Result<(), BackendError>> {
        let path = path.to_string();
        Box::pin(async move {
            self.check_online()?;
            if self.failing_writes.contains(&path) {
                return Err(BackendError::Unavailable(format!("write to {path} refused")));
            }
            self.documents.insert(path, value);
            Ok(())
        })
    }

    fn list_paths(&self) -> StoreFuture<'_, Result<Vec<String>, BackendError>> {
        Box::pin(async move {
            self.check_online()?;
            let mut paths: Vec<String> = self
                .documents
                .iter()
                .map(|entry| entry.key().clone())
                .collect();
            paths.sort();
            Ok(paths)
        })
    }
}
