//! Identifier types and the key layout of the document backend.
//!
//! Every storage key derived from an email goes through [`normalize`]; there
//! is no other place in the crate that rewrites an address.

use core::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Path of the flat user search list.
pub const SEARCH_LIST_PATH: &str = "users";

/// Prefix shared by every conversation id.
pub const CONVERSATION_PREFIX: &str = "conversation_";

/// Folder that holds uploaded images in the blob store.
pub const IMAGES_FOLDER: &str = "images";

static EMAIL_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok());

/// Storage key derived from an email address.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedId(String);

impl NormalizedId {
    /// Borrow the key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Backend path of this user's record.
    #[must_use]
    pub fn record_path(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NormalizedId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Replace every `.` and `@` in `email` with `-`.
///
/// Case is preserved: `A@x.com` and `a@x.com` are different keys.
#[must_use]
pub fn normalize(email: &str) -> NormalizedId {
    NormalizedId(email.replace(['.', '@'], "-"))
}

/// Loose shape check: one `@`, no whitespace, a dot in the domain.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(email))
}

/// Identifier of a conversation and backend path of its message log.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    /// Conversation opened by the message with `message_id`.
    #[must_use]
    pub fn for_first_message(message_id: &str) -> Self {
        Self(format!("{CONVERSATION_PREFIX}{message_id}"))
    }

    /// Wrap an id read back from a summary.
    #[must_use]
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Borrow the id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Backend path of the message log.
    #[must_use]
    pub fn log_path(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Message id: `<otherUserEmail>_<safeCurrentEmail>_<dateString>`.
///
/// `date_string` is expected to come from
/// [`format_wire_date`](crate::chat::core::dates::format_wire_date), so it
/// carries no `.`. Two messages between the same pair that format to the same
/// date string get the same id.
#[must_use]
pub fn message_id(other_user_email: &str, current: &NormalizedId, date_string: &str) -> String {
    format!("{other_user_email}_{current}_{date_string}")
}

/// Blob path for an uploaded image.
#[must_use]
pub fn image_path(file_name: &str) -> String {
    format!("{IMAGES_FOLDER}/{file_name}")
}

/// File name of a user's profile picture.
#[must_use]
pub fn profile_picture_file_name(email: &str) -> String {
    format!("{}_profile_picture.png", normalize(email))
}
