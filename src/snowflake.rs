//! Discord snowflake identifiers
//!
//! Snowflakes are 64-bit, time-ordered ids. The upper 42 bits hold the
//! milliseconds elapsed since the Discord epoch, so ordering ids orders
//! messages by creation time.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// Milliseconds between the Unix epoch and 2015-01-01T00:00:00Z.
pub const DISCORD_EPOCH_MS: u64 = 1_420_070_400_000;

/// Parse a decimal snowflake. Zero is not a valid id.
pub fn parse_snowflake(s: &str) -> Result<u64> {
    match s.parse::<u64>() {
        Ok(0) | Err(_) => Err(Error::InvalidSnowflake(s.to_string())),
        Ok(v) => Ok(v),
    }
}

/// Discord sends ids as strings, but numbers are accepted too.
fn deserialize_string_or_number<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as _;

    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s.parse::<u64>().map_err(D::Error::custom),
        serde_json::Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| D::Error::custom(format!("snowflake out of range: {}", n))),
        other => Err(D::Error::custom(format!(
            "expected string or number, got {:?}",
            other
        ))),
    }
}

macro_rules! snowflake_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            pub const fn get(self) -> u64 {
                self.0
            }

            /// Creation time encoded in the id.
            pub fn created_at(self) -> Option<DateTime<Utc>> {
                let ms = (self.0 >> 22).checked_add(DISCORD_EPOCH_MS)?;
                DateTime::from_timestamp_millis(i64::try_from(ms).ok()?)
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                parse_snowflake(s).map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.collect_str(&self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                deserialize_string_or_number(deserializer).map(Self)
            }
        }
    };
}

snowflake_type!(
    /// Id of a channel.
    ChannelId
);
snowflake_type!(
    /// Id of a message.
    MessageId
);
snowflake_type!(
    /// Id of a user.
    UserId
);

/// Inclusive range of message ids, always normalised so `from <= to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageRange {
    pub from: MessageId,
    pub to: MessageId,
}

impl MessageRange {
    pub fn new(a: MessageId, b: MessageId) -> Self {
        if a > b {
            Self { from: b, to: a }
        } else {
            Self { from: a, to: b }
        }
    }

    pub fn single(id: MessageId) -> Self {
        Self { from: id, to: id }
    }

    pub fn contains(&self, id: MessageId) -> bool {
        self.from <= id && id <= self.to
    }
}

impl FromStr for MessageRange {
    type Err = Error;

    /// Accepts `<id>` or `<from>..<to>`.
    fn from_str(s: &str) -> Result<Self> {
        match s.split_once("..") {
            Some((from, to)) => {
                let from = from
                    .parse::<MessageId>()
                    .map_err(|_| Error::InvalidRange(s.to_string()))?;
                let to = to
                    .parse::<MessageId>()
                    .map_err(|_| Error::InvalidRange(s.to_string()))?;
                Ok(Self::new(from, to))
            }
            None => s.parse().map(Self::single),
        }
    }
}
