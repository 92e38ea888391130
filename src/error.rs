//! Error types for the Discord exporter

use thiserror::Error;

use crate::snowflake::MessageId;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid snowflake: {0:?}")]
    InvalidSnowflake(String),

    #[error("Invalid message range: {0:?}")]
    InvalidRange(String),

    #[error("Missing $DISCORD_TOKEN, see --help")]
    MissingToken,

    #[error("Discord API returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Rate limited by Discord too many times ({0} waits)")]
    RateLimited(usize),

    #[error("Failed to fetch chunk after {after}: {source}")]
    Fetch {
        after: MessageId,
        #[source]
        source: Box<Error>,
    },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Interrupted")]
    Interrupted,

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Http(err.to_string())
    }
}
