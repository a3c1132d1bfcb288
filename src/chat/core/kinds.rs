//! Message content kinds and their storage rendering.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Remote or local media attached to a photo or video message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    /// Location of the media, when already uploaded.
    pub url: Option<String>,
    /// Width and height in points.
    pub size: (f64, f64),
}

/// Shared location.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocationItem {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

/// Voice clip.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AudioItem {
    /// Location of the audio file.
    pub url: String,
    /// Duration in seconds.
    pub duration_secs: f32,
}

/// Shared contact card.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactItem {
    /// Name shown on the card.
    pub display_name: String,
    /// Email addresses on the card.
    pub emails: Vec<String>,
    /// Phone numbers on the card.
    pub phone_numbers: Vec<String>,
}

/// Link with preview metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkItem {
    /// Text typed by the sender.
    pub text: String,
    /// Link target.
    pub url: String,
    /// Page title, if fetched.
    pub title: Option<String>,
}

/// Content of a message, over the closed set of supported kinds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MessageKind {
    /// Plain text.
    Text(String),
    /// Styled text, carried as its plain string.
    AttributedText(String),
    /// Photo.
    Photo(MediaItem),
    /// Video.
    Video(MediaItem),
    /// Location pin.
    Location(LocationItem),
    /// Emoji-only message.
    Emoji(String),
    /// Voice clip.
    Audio(AudioItem),
    /// Contact card.
    Contact(ContactItem),
    /// Link with preview.
    LinkPreview(LinkItem),
    /// Application-defined payload.
    Custom(serde_json::Value),
}

/// Discriminant of [`MessageKind`], as written to the `type` field.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KindTag {
    /// `text`
    Text,
    /// `attributed_text`
    AttributedText,
    /// `photo`
    Photo,
    /// `video`
    Video,
    /// `location`
    Location,
    /// `emoji`
    Emoji,
    /// `audio`
    Audio,
    /// `contact`
    Contact,
    /// `link_preview`
    LinkPreview,
    /// `custom`
    Custom,
}

impl KindTag {
    /// Every tag, in declaration order.
    pub const ALL: [Self; 10] = [
        Self::Text,
        Self::AttributedText,
        Self::Photo,
        Self::Video,
        Self::Location,
        Self::Emoji,
        Self::Audio,
        Self::Contact,
        Self::LinkPreview,
        Self::Custom,
    ];

    /// Stable string form for storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::AttributedText => "attributed_text",
            Self::Photo => "photo",
            Self::Video => "video",
            Self::Location => "location",
            Self::Emoji => "emoji",
            Self::Audio => "audio",
            Self::Contact => "contact",
            Self::LinkPreview => "link_preview",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for KindTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KindTag {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tag| tag.as_str() == value)
            .ok_or_else(|| value.to_string())
    }
}

impl MessageKind {
    /// Storage discriminant of this content.
    #[must_use]
    pub const fn kind_tag(&self) -> KindTag {
        match self {
            Self::Text(_) => KindTag::Text,
            Self::AttributedText(_) => KindTag::AttributedText,
            Self::Photo(_) => KindTag::Photo,
            Self::Video(_) => KindTag::Video,
            Self::Location(_) => KindTag::Location,
            Self::Emoji(_) => KindTag::Emoji,
            Self::Audio(_) => KindTag::Audio,
            Self::Contact(_) => KindTag::Contact,
            Self::LinkPreview(_) => KindTag::LinkPreview,
            Self::Custom(_) => KindTag::Custom,
        }
    }

    /// Plain text written to `content` and to the summary preview.
    ///
    /// Only `Text` has a rendering; every other kind is stored as `""`, which
    /// is what existing stored conversations contain for them.
    #[must_use]
    pub fn render_to_string(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::AttributedText(_)
            | Self::Photo(_)
            | Self::Video(_)
            | Self::Location(_)
            | Self::Emoji(_)
            | Self::Audio(_)
            | Self::Contact(_)
            | Self::LinkPreview(_)
            | Self::Custom(_) => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_renders_verbatim() {
        let kind = MessageKind::Text("hello there".to_string());
        assert_eq!(kind.render_to_string(), "hello there");
        assert_eq!(kind.kind_tag().as_str(), "text");
    }

    #[test]
    fn non_text_kinds_render_empty() {
        let kinds = [
            MessageKind::AttributedText("bold".to_string()),
            MessageKind::Photo(MediaItem {
                url: Some("https://cdn/p.png".to_string()),
                size: (100.0, 80.0),
            }),
            MessageKind::Emoji("🙂".to_string()),
            MessageKind::Custom(serde_json::json!({ "a": 1 })),
        ];
        for kind in kinds {
            assert_eq!(kind.render_to_string(), "", "{}", kind.kind_tag());
        }
    }

    #[test]
    fn tags_parse_back() {
        for tag in KindTag::ALL {
            assert_eq!(tag.as_str().parse::<KindTag>(), Ok(tag));
        }
        assert!("linkPreview".parse::<KindTag>().is_err());
    }

    #[test]
    fn tags_are_lowercase_and_distinct() {
        let mut seen = std::collections::HashSet::new();
        for tag in KindTag::ALL {
            assert_eq!(tag.as_str(), tag.as_str().to_lowercase());
            assert!(seen.insert(tag.as_str()));
        }
    }
}
