//! Conversation store: registration, conversations, messages and uploads.

pub mod conversations;
pub mod core;
pub mod directory;
pub mod media;

pub use self::core::{ChatBackends, ChatStore, CreationStage};
pub use directory::BackfillReport;
