//! Minimal Discord REST client (channel message history).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::fetch::MessageSource;
use crate::model::Message;
use crate::snowflake::{ChannelId, MessageId};
use crate::{Error, Result};

pub const DISCORD_API_URL: &str = "https://discord.com/api/v10";

/// How many 429 responses a single page request will wait out.
pub const MAX_RATE_LIMIT_WAITS: usize = 5;

#[derive(Debug, Clone)]
pub struct DiscordClient {
    http: Client,
    token: String,
    base_url: String,
}

impl DiscordClient {
    /// Create client with the provided token against the public API.
    pub fn new<S: Into<String>>(token: S) -> Result<Self> {
        Self::with_base_url(token, DISCORD_API_URL)
    }

    /// Create client with custom base url (proxies and tests).
    pub fn with_base_url<S1: Into<String>, S2: Into<String>>(
        token: S1,
        base_url: S2,
    ) -> Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(Error::MissingToken);
        }

        let http = Client::builder()
            .user_agent(format!(
                "DiscordBot (discord_export, {})",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Http(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            token,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Up to `limit` messages with id greater than `after`, newest first.
    pub async fn messages_after(
        &self,
        channel: ChannelId,
        after: MessageId,
        limit: usize,
    ) -> Result<Vec<Message>> {
        let url = format!("{}/channels/{}/messages", self.base_url, channel);
        let query = [("after", after.to_string()), ("limit", limit.to_string())];

        let mut waits = 0;
        loop {
            let response = self
                .http
                .get(&url)
                .header("Authorization", &self.token)
                .query(&query)
                .send()
                .await?;

            let status = response.status();
            let retry_header = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<f64>().ok());
            let text = response.text().await?;

            if status == StatusCode::TOO_MANY_REQUESTS {
                if waits >= MAX_RATE_LIMIT_WAITS {
                    return Err(Error::RateLimited(waits));
                }
                waits += 1;

                let delay = rate_limit_delay(&text, retry_header);
                warn!(
                    %channel,
                    %after,
                    delay_ms = delay.as_millis() as u64,
                    attempt = waits,
                    "rate limited by Discord, waiting"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            if !status.is_success() {
                return Err(Error::Api {
                    status: status.as_u16(),
                    body: text,
                });
            }

            let page: Vec<Message> = serde_json::from_str(&text).map_err(|e| {
                Error::SerializationError(format!("Discord returned invalid messages: {}", e))
            })?;
            debug!(%channel, %after, size = page.len(), "received message page");
            return Ok(page);
        }
    }
}

#[async_trait]
impl MessageSource for DiscordClient {
    async fn messages_after(
        &self,
        channel: ChannelId,
        after: MessageId,
        limit: usize,
    ) -> Result<Vec<Message>> {
        DiscordClient::messages_after(self, channel, after, limit).await
    }
}

#[derive(Debug, Deserialize)]
struct RateLimitBody {
    retry_after: f64,
}

/// The JSON body is more precise than the header, so it wins.
fn rate_limit_delay(body: &str, header: Option<f64>) -> Duration {
    let seconds = serde_json::from_str::<RateLimitBody>(body)
        .ok()
        .map(|b| b.retry_after)
        .or(header)
        .unwrap_or(1.0);

    if seconds.is_finite() && seconds > 0.0 {
        Duration::from_secs_f64(seconds.min(60.0))
    } else {
        Duration::ZERO
    }
}
