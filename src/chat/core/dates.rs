//! Wire date format shared by summaries and message records.

use std::fmt::Write;

use chrono::{DateTime, FixedOffset, Utc};

use crate::chat::core::config::DateFormatConfig;
use crate::chat::core::errors::{ChatError, ChatResult};

/// Render `instant` the way stored documents spell dates.
///
/// The configured pattern is applied in the configured offset, then every `.`
/// is dropped so the string can be embedded in message ids.
///
/// # Errors
/// Returns an error if the configured offset is out of range or the pattern
/// contains an unknown specifier.
pub fn format_wire_date(instant: DateTime<Utc>, config: &DateFormatConfig) -> ChatResult<String> {
    let offset = FixedOffset::east_opt(config.utc_offset_seconds).ok_or_else(|| {
        ChatError::InvalidConfig(format!(
            "dates.utc_offset_seconds {} is out of range",
            config.utc_offset_seconds
        ))
    })?;
    let mut rendered = String::new();
    write!(
        rendered,
        "{}",
        instant.with_timezone(&offset).format(&config.pattern)
    )
    .map_err(|_| {
        ChatError::InvalidConfig(format!("dates.pattern {:?} is not valid", config.pattern))
    })?;
    Ok(rendered.replace('.', ""))
}
