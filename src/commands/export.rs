//! Export a message range from one channel to Markdown or JSON.

use std::fs::{self, File};
use std::future::Future;
use std::io;
use std::path::PathBuf;

use tracing::{error, info, warn};

use crate::config::Config;
use crate::discord::DiscordClient;
use crate::error::{Error, Result};
use crate::fetch::{fetch_messages, MessageSource};
use crate::model::Message;
use crate::render::{render, OutputMode, RenderConfig};
use crate::snowflake::{ChannelId, MessageRange};

/// Where the rendered document goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Stdout,
    File(PathBuf),
}

impl Destination {
    /// `-` means stdout; anything else gets the mode's extension appended.
    pub fn from_arg(file: &str, mode: OutputMode) -> Self {
        if file == "-" {
            Destination::Stdout
        } else {
            Destination::File(PathBuf::from(format!("{}.{}", file, mode.extension())))
        }
    }
}

/// Output settings, resolved from config and CLI flags.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub mode: OutputMode,
    pub file: String,
    pub render: RenderConfig,
    pub page_size: usize,
}

impl ExportOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            mode: config.output_mode,
            file: config.output_file.clone(),
            render: config.render_config(),
            page_size: config.page_size,
        }
    }
}

/// A fully validated export job.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub channel: ChannelId,
    pub range: MessageRange,
    pub mode: OutputMode,
    pub destination: Destination,
    pub render: RenderConfig,
    pub page_size: usize,
}

impl ExportRequest {
    /// Validate raw arguments. Nothing touches the network or disk here.
    pub fn parse(channel: &str, messages: &str, options: ExportOptions) -> Result<Self> {
        let channel: ChannelId = channel.parse()?;
        let range: MessageRange = messages.parse()?;
        options.render.validate()?;

        Ok(Self {
            channel,
            range,
            mode: options.mode,
            destination: Destination::from_arg(&options.file, options.mode),
            render: options.render,
            page_size: options.page_size,
        })
    }
}

/// Run an export against the live Discord API.
pub async fn run(config: &Config, request: ExportRequest) -> Result<()> {
    let token = config.require_token()?;
    let client = DiscordClient::with_base_url(token, &config.api_url)?;
    export(&client, &request).await
}

/// Fetch and render `request` using `source`, aborting on Ctrl-C.
pub async fn export<S: MessageSource + ?Sized>(source: &S, request: &ExportRequest) -> Result<()> {
    export_until(source, request, ctrl_c()).await
}

/// Like [`export`], but aborts with [`Error::Interrupted`] when `cancel`
/// resolves before the fetch finishes.
///
/// A file destination is removed again if anything fails after it was
/// created, so no truncated export is left behind.
pub async fn export_until<S, F>(source: &S, request: &ExportRequest, cancel: F) -> Result<()>
where
    S: MessageSource + ?Sized,
    F: Future<Output = ()>,
{
    match &request.destination {
        Destination::Stdout => {
            let messages = fetch_or_interrupt(source, request, cancel).await?;
            render(request.mode, io::stdout().lock(), &messages, &request.render)
        }
        Destination::File(path) => {
            let file = File::create(path)?;

            let result = match fetch_or_interrupt(source, request, cancel).await {
                Ok(messages) => render(request.mode, &file, &messages, &request.render)
                    .map(|()| messages.len()),
                Err(err) => Err(err),
            };
            drop(file);

            match result {
                Ok(count) => {
                    info!(file = %path.display(), messages = count, "export written");
                    Ok(())
                }
                Err(err) => {
                    if let Err(e) = fs::remove_file(path) {
                        warn!(file = %path.display(), error = %e, "cannot clean up output file");
                    }
                    Err(err)
                }
            }
        }
    }
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

async fn fetch_or_interrupt<S, F>(
    source: &S,
    request: &ExportRequest,
    cancel: F,
) -> Result<Vec<Message>>
where
    S: MessageSource + ?Sized,
    F: Future<Output = ()>,
{
    tokio::select! {
        result = fetch_messages(source, request.channel, request.range, request.page_size) => {
            result.map_err(|failure| {
                error!(
                    channel_id = %request.channel,
                    gathered = failure.partial.len(),
                    error = %failure.error,
                    "failed to fetch messages"
                );
                Error::from(failure)
            })
        }
        () = cancel => {
            warn!("interrupted, aborting export");
            Err(Error::Interrupted)
        }
    }
}
