//! Domain values and the JSON documents they are stored as.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chat::core::config::DateFormatConfig;
use crate::chat::core::dates::format_wire_date;
use crate::chat::core::errors::ChatResult;
use crate::chat::core::ids::{message_id, normalize, ConversationId, NormalizedId};
use crate::chat::core::kinds::MessageKind;

/// Registered account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Raw email address, as typed at registration.
    pub email_address: String,
}

impl User {
    /// Build a user.
    #[must_use]
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email_address: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            email_address: email_address.into(),
        }
    }

    /// Storage key of this user.
    #[must_use]
    pub fn normalized_id(&self) -> NormalizedId {
        normalize(&self.email_address)
    }

    /// Name shown in the search list.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Search list entry for this user.
    #[must_use]
    pub fn search_entry(&self) -> SearchEntry {
        SearchEntry {
            name: self.display_name(),
            email: self.normalized_id().as_str().to_string(),
        }
    }
}

/// One element of the flat `users` list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchEntry {
    /// `"{first} {last}"`.
    pub name: String,
    /// Normalized id of the user.
    pub email: String,
}

/// Document stored at a user's normalized id.
///
/// Fields this crate does not own are carried through rewrites untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Given name.
    #[serde(rename = "first-name", default)]
    pub first_name: String,
    /// Family name.
    #[serde(rename = "last-name", default)]
    pub last_name: String,
    /// Conversations this user started, oldest first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversations: Option<Vec<ConversationSummary>>,
    /// Unrecognized fields.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl UserRecord {
    /// Directory entry for a new user, with no conversations.
    #[must_use]
    pub fn for_user(user: &User) -> Self {
        Self {
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            conversations: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Take `user`'s names, keeping conversations and unknown fields.
    pub fn apply_user(&mut self, user: &User) {
        self.first_name.clone_from(&user.first_name);
        self.last_name.clone_from(&user.last_name);
    }

    /// Name shown in the search list.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Summary with the given id, if present.
    pub fn summary_mut(&mut self, id: &ConversationId) -> Option<&mut ConversationSummary> {
        self.conversations
            .as_mut()?
            .iter_mut()
            .find(|summary| summary.id == id.as_str())
    }
}

/// Preview of the last message of a conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestMessage {
    /// Wire date of the message.
    pub date: String,
    /// Whether the owner has read it.
    pub is_read: bool,
    /// Rendered text of the message.
    pub message: String,
}

/// Per-user view of one conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    /// `conversation_<messageId>`.
    pub id: String,
    /// Email of the other participant, as passed by the caller.
    pub other_user_email: String,
    /// Display name of the other participant.
    pub name: String,
    /// Preview of the latest message.
    pub latest_message: LatestMessage,
}

/// Stored form of one message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Message id.
    pub id: String,
    /// Kind tag, e.g. `"text"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Rendered text.
    pub content: String,
    /// Wire date.
    pub date: String,
    /// Normalized id of the sender.
    pub sender_email: String,
    /// Whether the recipient has read it.
    pub is_read: bool,
    /// Display name recorded with the message.
    pub name: String,
}

impl MessageRecord {
    /// Whether `other` carries the same message, ignoring the read flag.
    #[must_use]
    pub fn same_message(&self, other: &Self) -> bool {
        self.id == other.id
            && self.kind == other.kind
            && self.content == other.content
            && self.date == other.date
            && self.sender_email == other.sender_email
            && self.name == other.name
    }
}

/// Document stored at a conversation id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageLog {
    /// Messages, oldest first.
    #[serde(default)]
    pub messages: Vec<MessageRecord>,
}

impl MessageLog {
    /// Logged message with `id`, if any.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&MessageRecord> {
        self.messages.iter().find(|message| message.id == id)
    }
}

/// Message handed to the store by the UI layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    /// Message id.
    pub message_id: String,
    /// Send instant.
    pub sent_date: DateTime<Utc>,
    /// Content.
    pub kind: MessageKind,
}

impl OutgoingMessage {
    /// Wrap a message whose id was generated elsewhere.
    #[must_use]
    pub fn new(message_id: impl Into<String>, sent_date: DateTime<Utc>, kind: MessageKind) -> Self {
        Self {
            message_id: message_id.into(),
            sent_date,
            kind,
        }
    }

    /// Build a message with the standard id for this sender, recipient and instant.
    ///
    /// # Errors
    /// Returns an error if the date configuration is invalid.
    pub fn compose(
        current_user_email: &str,
        other_user_email: &str,
        sent_date: DateTime<Utc>,
        kind: MessageKind,
        dates: &DateFormatConfig,
    ) -> ChatResult<Self> {
        let date_string = format_wire_date(sent_date, dates)?;
        let id = message_id(other_user_email, &normalize(current_user_email), &date_string);
        Ok(Self::new(id, sent_date, kind))
    }

    /// Stored form of this message.
    ///
    /// # Errors
    /// Returns an error if the date configuration is invalid.
    pub fn to_record(
        &self,
        sender: &NormalizedId,
        name: &str,
        dates: &DateFormatConfig,
    ) -> ChatResult<MessageRecord> {
        Ok(MessageRecord {
            id: self.message_id.clone(),
            kind: self.kind.kind_tag().as_str().to_string(),
            content: self.kind.render_to_string(),
            date: format_wire_date(self.sent_date, dates)?,
            sender_email: sender.as_str().to_string(),
            is_read: false,
            name: name.to_string(),
        })
    }

    /// Unread preview of this message.
    ///
    /// # Errors
    /// Returns an error if the date configuration is invalid.
    pub fn latest_message(&self, dates: &DateFormatConfig) -> ChatResult<LatestMessage> {
        Ok(LatestMessage {
            date: format_wire_date(self.sent_date, dates)?,
            is_read: false,
            message: self.kind.render_to_string(),
        })
    }
}
