//! Persistence core of the messenger client.
//!
//! - `core`: configuration, errors, identifiers, message kinds and documents
//! - `backend`: document backends (`SQLite`, in-memory)
//! - `blob`: blob stores for uploaded media (filesystem, in-memory)
//! - `store`: the conversation store and its operations

pub mod backend;
pub mod blob;
pub mod core;
pub mod store;

pub use self::core::{
    BackendError, BlobConfig, BlobError, ChatConfig, ChatError, ChatResult, ConversationId,
    ConversationSummary, DateFormatConfig, KindTag, LatestMessage, MessageKind, MessageLog,
    MessageRecord, NormalizedId, OutgoingMessage, SearchEntry, StorageConfig, User, UserRecord,
    format_wire_date, normalize,
};
pub use backend::{DocumentBackend, InMemoryDocumentBackend, SqliteDocumentBackend, StoreFuture};
pub use blob::{BlobStore, FsBlobStore, InMemoryBlobStore};
pub use store::{BackfillReport, ChatBackends, ChatStore, CreationStage};
