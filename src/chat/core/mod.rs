//! Core chat types and identifiers.

pub mod config;
pub mod dates;
pub mod errors;
pub mod ids;
pub mod kinds;
pub mod records;

pub use config::{BlobConfig, ChatConfig, DateFormatConfig, StorageConfig};
pub use dates::format_wire_date;
pub use errors::{BackendError, BlobError, ChatError, ChatResult};
pub use ids::{
    ConversationId, NormalizedId, is_valid_email, message_id, normalize,
    profile_picture_file_name,
};
pub use kinds::{
    AudioItem, ContactItem, KindTag, LinkItem, LocationItem, MediaItem, MessageKind,
};
pub use records::{
    ConversationSummary, LatestMessage, MessageLog, MessageRecord, OutgoingMessage, SearchEntry,
    User, UserRecord,
};
