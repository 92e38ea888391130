//! Discord message objects
//!
//! Only the fields the renderer reads are typed. Everything else the API
//! sends is kept in `extra` so JSON output reproduces the native schema.

use std::fmt;
use std::str::FromStr;

use chrono::format::{DelayedFormat, StrftimeItems};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::Error;
use crate::snowflake::{ChannelId, MessageId, UserId};

const CDN_URL: &str = "https://cdn.discordapp.com";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub author: User,
    #[serde(default)]
    pub content: String,
    pub timestamp: Timestamp,
    #[serde(default)]
    pub embeds: Vec<Embed>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_reference: Option<MessageReference>,
    /// Outer `None`: key absent. `Some(None)`: Discord sent `null` because
    /// the original was deleted.
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub referenced_message: Option<Option<Box<Message>>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Message {
    pub fn is_reply(&self) -> bool {
        self.message_reference.is_some()
    }

    /// The message this one replies to, if Discord resolved it.
    pub fn referenced(&self) -> Option<&Message> {
        self.referenced_message.as_ref()?.as_deref()
    }
}

/// Wraps a present field in `Some` so an explicit `null` is kept apart from
/// a missing key.
fn deserialize_present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// An ISO 8601 timestamp that serializes back to the exact text it was
/// parsed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timestamp {
    raw: String,
    parsed: DateTime<FixedOffset>,
}

impl Timestamp {
    pub fn as_datetime(&self) -> DateTime<FixedOffset> {
        self.parsed
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn format<'a>(&self, fmt: &'a str) -> DelayedFormat<StrftimeItems<'a>> {
        self.parsed.format(fmt)
    }
}

impl FromStr for Timestamp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = DateTime::parse_from_rfc3339(s)
            .map_err(|e| Error::SerializationError(format!("invalid timestamp {:?}: {}", s, e)))?;
        Ok(Self {
            raw: s.to_string(),
            parsed,
        })
    }
}

impl From<DateTime<FixedOffset>> for Timestamp {
    fn from(parsed: DateTime<FixedOffset>) -> Self {
        Self {
            raw: parsed.to_rfc3339(),
            parsed,
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<MessageId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<ChannelId>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub global_name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default = "default_discriminator")]
    pub discriminator: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_discriminator() -> String {
    "0".to_string()
}

impl User {
    /// Global display name, falling back to the username.
    pub fn display_name(&self) -> &str {
        match self.global_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.username,
        }
    }

    /// PNG avatar URL, or the default avatar when none is set.
    pub fn avatar_url(&self) -> String {
        match self.avatar.as_deref() {
            Some(hash) if !hash.is_empty() => {
                format!("{}/avatars/{}/{}.png", CDN_URL, self.id, hash)
            }
            _ => format!("{}/embed/avatars/{}.png", CDN_URL, self.default_avatar_index()),
        }
    }

    fn default_avatar_index(&self) -> u64 {
        match self.discriminator.parse::<u64>() {
            Ok(discriminator) if discriminator != 0 => discriminator % 5,
            _ => (self.id.get() >> 22) % 6,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Embed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<EmbedThumbnail>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedThumbnail {
    pub url: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
