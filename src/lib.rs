//! Discord Message Exporter Library
//!
//! This library provides tools to:
//! - Fetch a range of channel messages between two snowflake ids
//! - Render them as block-quoted Markdown with emoji, mentions and GIF embeds
//!   rewritten into portable Markdown/HTML
//! - Dump them as the raw Discord JSON objects

pub mod config;
pub mod discord;
pub mod error;
pub mod fetch;
pub mod model;
pub mod render;
pub mod snowflake;

// Re-export common types
pub use config::Config;
pub use discord::DiscordClient;
pub use error::{Error, Result};
pub use fetch::{fetch_messages, FetchFailure, MessageSource, PageState, Paginator};
pub use model::{Embed, Message, Timestamp, User};
pub use render::{OutputMode, RenderConfig};
pub use snowflake::{ChannelId, MessageId, MessageRange, UserId};

// Commands module uses re-exported types, so it must be declared after the re-exports
pub mod commands;
