//! Output rendering
//!
//! Renders an ordered message list either as block-quoted Markdown or as the
//! raw Discord JSON objects.

pub mod json;
pub mod markdown;

use std::fmt;
use std::io::Write;
use std::str::FromStr;

use chrono::format::{Item, StrftimeItems};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::model::Message;

pub use json::render_json;
pub use markdown::{render_markdown, ContentRenderer};

/// Default timestamp format, e.g. `03/01/2024 10:00 AM`.
pub const DEFAULT_DATE_FORMAT: &str = "%m/%d/%Y %I:%M %p";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum OutputMode {
    #[default]
    #[serde(rename = "md", alias = "markdown")]
    Markdown,
    #[serde(rename = "json")]
    Json,
}

impl OutputMode {
    /// File extension appended to the output path.
    pub fn extension(self) -> &'static str {
        match self {
            OutputMode::Markdown => "md",
            OutputMode::Json => "json",
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "md" | "markdown" => Ok(OutputMode::Markdown),
            "json" => Ok(OutputMode::Json),
            other => Err(Error::InvalidArgument(format!(
                "unknown output mode {:?} (expected md, json)",
                other
            ))),
        }
    }
}

/// Settings that shape Markdown output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderConfig {
    /// Emit `<img>`/`<a>` tags instead of plain Markdown images.
    pub allow_html: bool,
    /// chrono strftime format for message headers.
    pub date_format: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            allow_html: true,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }
}

impl RenderConfig {
    pub fn validate(&self) -> Result<()> {
        if StrftimeItems::new(&self.date_format).any(|item| matches!(item, Item::Error)) {
            return Err(Error::InvalidArgument(format!(
                "invalid date format {:?}",
                self.date_format
            )));
        }
        Ok(())
    }
}

/// Render `messages` to `w` in the requested mode.
pub fn render<W: Write>(
    mode: OutputMode,
    w: W,
    messages: &[Message],
    config: &RenderConfig,
) -> Result<()> {
    match mode {
        OutputMode::Markdown => render_markdown(w, messages, config),
        OutputMode::Json => render_json(w, messages),
    }
}
