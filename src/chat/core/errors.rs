//! Error types for the chat persistence core.

use thiserror::Error;

/// Failure reported by a document backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// `SQLite` storage error (sync).
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// `SQLite` storage error (async).
    #[error("tokio-rusqlite error: {0}")]
    TokioSqlite(#[from] tokio_rusqlite::Error),
    /// Backend unreachable or refused the request.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    /// Stored bytes at `path` are not valid JSON.
    #[error("corrupt document at {path}: {source}")]
    CorruptDocument {
        /// Backend path of the document.
        path: String,
        /// Decode failure.
        #[source]
        source: serde_json::Error,
    },
}

/// Failure reported by a blob store.
#[derive(Debug, Error)]
pub enum BlobError {
    /// I/O error while reading or writing blob bytes.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// The blob exists but no URL can be built for it.
    #[error("cannot build url: {0}")]
    Url(String),
    /// Blob store unreachable or refused the request.
    #[error("blob store unavailable: {0}")]
    Unavailable(String),
}

/// Chat store error type.
///
/// Absence is not an error in general: lookups return `Option` or `bool`.
/// `NotFound` is only raised where the caller required the document to exist.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Backend unreachable or failed; propagated without local recovery.
    #[error("transport error: {0}")]
    Transport(#[source] BackendError),
    /// A document the operation requires does not exist.
    #[error("document not found: {0}")]
    NotFound(String),
    /// The current user has no record in the directory.
    #[error("no user record for {0}")]
    UserRecordMissing(String),
    /// The conversation summary was written but the message log was not.
    ///
    /// Retrying either the whole creation or the log initialization alone is
    /// safe.
    #[error("conversation summary {conversation_id} written but message log failed: {source}")]
    LogInitializationFailed {
        /// Conversation whose log is missing.
        conversation_id: String,
        /// Underlying backend failure.
        #[source]
        source: BackendError,
    },
    /// The directory entry was written but the search list append failed.
    #[error("directory entry {normalized_id} written but search list update failed: {source}")]
    PartialWriteFailure {
        /// User present in the directory but absent from the search list.
        normalized_id: String,
        /// Underlying backend failure.
        #[source]
        source: BackendError,
    },
    /// The message log was appended but the sender's summary was not refreshed.
    #[error("message appended to {conversation_id} but summary is stale: {reason}")]
    StaleSummary {
        /// Conversation whose summary lags behind its log.
        conversation_id: String,
        /// Why the refresh did not happen.
        reason: String,
    },
    /// A different message is already logged under the same id.
    ///
    /// Ids built from a formatted timestamp collide for two sends within one
    /// tick of the date format; the later message was not stored.
    #[error("message id {message_id} already used in {conversation_id} by another message")]
    MessageIdCollision {
        /// Conversation holding the earlier message.
        conversation_id: String,
        /// Colliding id.
        message_id: String,
    },
    /// Blob bytes could not be stored.
    #[error("upload of {path} failed: {source}")]
    UploadFailed {
        /// Blob path.
        path: String,
        /// Underlying blob failure.
        #[source]
        source: BlobError,
    },
    /// Blob bytes were stored but no download URL could be resolved.
    #[error("uploaded {path} but download url is unavailable: {source}")]
    DownloadUrlUnavailable {
        /// Blob path; the bytes stay stored and unreferenced.
        path: String,
        /// Underlying blob failure.
        #[source]
        source: BlobError,
    },
    /// Email address rejected before any backend call.
    #[error("invalid email address: {0}")]
    InvalidEmail(String),
    /// A stored document does not have the expected shape.
    #[error("invalid document at {path}: {source}")]
    InvalidDocument {
        /// Backend path of the document.
        path: String,
        /// Decode failure.
        #[source]
        source: serde_json::Error,
    },
    /// Invalid configuration or unsupported values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ChatError {
    /// Whether repeating the same call cannot duplicate data.
    #[must_use]
    pub const fn is_retry_safe(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::LogInitializationFailed { .. } | Self::StaleSummary { .. }
        )
    }
}

impl From<BackendError> for ChatError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::CorruptDocument { path, source } => Self::InvalidDocument { path, source },
            other => Self::Transport(other),
        }
    }
}

/// Convenience result alias for chat store operations.
pub type ChatResult<T> = Result<T, ChatError>;
