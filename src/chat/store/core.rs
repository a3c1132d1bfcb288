//! Chat store orchestration.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::chat::backend::document::{self, DocumentBackend};
use crate::chat::backend::memory::InMemoryDocumentBackend;
use crate::chat::backend::sqlite::SqliteDocumentBackend;
use crate::chat::blob::blob_store::{BlobStore, InMemoryBlobStore};
use crate::chat::blob::fs::FsBlobStore;
use crate::chat::core::config::ChatConfig;
use crate::chat::core::errors::{ChatError, ChatResult};
use crate::chat::core::ids::{NormalizedId, is_valid_email};
use crate::chat::core::records::UserRecord;

/// Backend dependencies for the chat store.
pub struct ChatBackends {
    /// Document backend for records, the search list and logs.
    pub documents: Arc<dyn DocumentBackend>,
    /// Blob store for uploaded media.
    pub blobs: Arc<dyn BlobStore>,
}

impl ChatBackends {
    /// `SQLite` documents and filesystem blobs, from config.
    ///
    /// # Errors
    /// Returns an error if any backend cannot be initialized.
    pub async fn sqlite(config: &ChatConfig) -> ChatResult<Self> {
        let documents = Arc::new(SqliteDocumentBackend::new(&config.storage).await?);
        let blobs = Arc::new(FsBlobStore::new(&config.blob)?);
        Ok(Self { documents, blobs })
    }

    /// In-process backends; the concrete handles are returned for fault control.
    #[must_use]
    pub fn in_memory(
        blob_base_url: Url,
    ) -> (Self, Arc<InMemoryDocumentBackend>, Arc<InMemoryBlobStore>) {
        let documents = Arc::new(InMemoryDocumentBackend::new());
        let blobs = Arc::new(InMemoryBlobStore::new(blob_base_url));
        let backends = Self {
            documents: documents.clone(),
            blobs: blobs.clone(),
        };
        (backends, documents, blobs)
    }
}

/// Progress of [`ChatStore::create_conversation`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CreationStage {
    /// Nothing read or written yet.
    NotStarted,
    /// Sender's record loaded.
    UserRecordFetched,
    /// Summary present in the sender's record.
    SummaryAppended,
    /// Message log written.
    LogInitialized,
    /// Finished.
    Done,
    /// Stopped on an error.
    Failed,
}

impl CreationStage {
    /// Stable string form for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::UserRecordFetched => "user_record_fetched",
            Self::SummaryAppended => "summary_appended",
            Self::LogInitialized => "log_initialized",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for CreationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Conversation store over a document backend and a blob store.
///
/// Every operation is one async call returning a typed result. Nothing is
/// retried internally and no lock is held across calls: the backend alone
/// orders writes to a path.
pub struct ChatStore {
    pub(super) config: ChatConfig,
    pub(super) documents: Arc<dyn DocumentBackend>,
    pub(super) blobs: Arc<dyn BlobStore>,
}

impl ChatStore {
    /// Create a new chat store.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn new(config: ChatConfig, backends: ChatBackends) -> ChatResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            documents: backends.documents,
            blobs: backends.blobs,
        })
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &ChatConfig {
        &self.config
    }

    pub(super) async fn read<T: DeserializeOwned>(&self, path: &str) -> ChatResult<Option<T>> {
        document::get_typed(self.documents.as_ref(), path).await
    }

    pub(super) async fn write<T: Serialize>(&self, path: &str, value: &T) -> ChatResult<()> {
        let value = document::encode(path, value)?;
        self.documents.set(path, value).await?;
        Ok(())
    }

    pub(super) async fn user_record(&self, id: &NormalizedId) -> ChatResult<Option<UserRecord>> {
        self.read(id.record_path()).await
    }
}

/// Reject addresses that cannot be a key owner.
pub(super) fn require_email(email: &str) -> ChatResult<()> {
    if is_valid_email(email) {
        Ok(())
    } else {
        Err(ChatError::InvalidEmail(email.to_string()))
    }
}
