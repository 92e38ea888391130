//! Configuration for the Discord API and export output
//!
//! Loads configuration from discord_export.yml, then lets environment
//! variables override it. CLI flags override both (see `main.rs`).

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::discord::DISCORD_API_URL;
use crate::error::{Error, Result};
use crate::fetch::MAX_PAGE_SIZE;
use crate::render::{OutputMode, RenderConfig, DEFAULT_DATE_FORMAT};

/// Default constants (fallback if discord_export.yml not found)
pub const CONFIG_FILE: &str = "discord_export.yml";
pub const DEFAULT_OUTPUT_FILE: &str = "output";
pub const TOKEN_ENV: &str = "DISCORD_TOKEN";
pub const API_URL_ENV: &str = "DISCORD_API_URL";

/// YAML config structures
#[derive(Debug, Default, Deserialize)]
struct YamlConfig {
    discord: Option<DiscordSection>,
    output: Option<OutputSection>,
    fetch: Option<FetchSection>,
}

#[derive(Debug, Default, Deserialize)]
struct DiscordSection {
    token: Option<String>,
    api_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OutputSection {
    mode: Option<OutputMode>,
    file: Option<String>,
    allow_html: Option<bool>,
    date_format: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FetchSection {
    page_size: Option<usize>,
}

/// Main configuration struct
#[derive(Debug, Clone)]
pub struct Config {
    pub token: Option<String>,
    pub api_url: String,
    pub output_mode: OutputMode,
    pub output_file: String,
    pub allow_html: bool,
    pub date_format: String,
    pub page_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Load configuration from discord_export.yml or use defaults.
    /// Environment variables take precedence over file values.
    pub fn new() -> Self {
        Self::load_from_file(CONFIG_FILE)
            .or_else(|_| Self::load_from_file(Path::new("..").join(CONFIG_FILE)))
            .unwrap_or_else(|_| Self::from_yaml(YamlConfig::default()))
    }

    /// Resolve a value: `${VAR}` placeholders and the explicit env var both
    /// beat the literal file value.
    fn resolve_env_string(value: Option<String>, env_key: &str) -> Option<String> {
        if let Some(ref v) = value {
            if let Some(var_name) = v.strip_prefix("${").and_then(|r| r.strip_suffix('}')) {
                if let Ok(env_val) = std::env::var(var_name) {
                    return Some(env_val);
                }
            }
        }
        if let Ok(env_val) = std::env::var(env_key) {
            if !env_val.trim().is_empty() {
                return Some(env_val);
            }
        }
        value.filter(|v| !v.trim().is_empty() && !v.starts_with("${"))
    }

    /// Load .env file into environment variables using dotenvy
    fn load_dotenv() {
        if dotenvy::dotenv().is_err() {
            let _ = dotenvy::from_filename("../.env");
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!(
                "failed to read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let yaml: YamlConfig = serde_yaml::from_str(&content).map_err(|e| {
            Error::Config(format!(
                "failed to parse {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Ok(Self::from_yaml(yaml))
    }

    fn from_yaml(yaml: YamlConfig) -> Self {
        Self::load_dotenv();

        let discord = yaml.discord.unwrap_or_default();
        let output = yaml.output.unwrap_or_default();
        let fetch = yaml.fetch.unwrap_or_default();

        Self {
            token: Self::resolve_env_string(discord.token, TOKEN_ENV),
            api_url: Self::resolve_env_string(discord.api_url, API_URL_ENV)
                .unwrap_or_else(|| DISCORD_API_URL.to_string()),
            output_mode: output.mode.unwrap_or_default(),
            output_file: output
                .file
                .unwrap_or_else(|| DEFAULT_OUTPUT_FILE.to_string()),
            allow_html: output.allow_html.unwrap_or(true),
            date_format: output
                .date_format
                .unwrap_or_else(|| DEFAULT_DATE_FORMAT.to_string()),
            page_size: fetch.page_size.unwrap_or(MAX_PAGE_SIZE),
        }
    }

    /// Token required by the API client.
    pub fn require_token(&self) -> Result<&str> {
        self.token.as_deref().ok_or(Error::MissingToken)
    }

    pub fn render_config(&self) -> RenderConfig {
        RenderConfig {
            allow_html: self.allow_html,
            date_format: self.date_format.clone(),
        }
    }
}
