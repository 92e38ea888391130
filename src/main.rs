//! Discord Message Exporter CLI - main entry point

use std::path::PathBuf;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use discord_export::commands::{self, ExportOptions, ExportRequest};
use discord_export::{Config, OutputMode};

const USAGE: &str = "\
Usages:
  DISCORD_TOKEN= discord_export [flags] <channelID> <messageID>
  DISCORD_TOKEN= discord_export [flags] <channelID> <messageIDFrom>..<messageIDTo>";

#[derive(Parser)]
#[command(name = "discord_export")]
#[command(about = "Export a range of Discord messages to Markdown or JSON", long_about = None)]
#[command(version, after_help = USAGE)]
struct Cli {
    /// Channel to export from
    channel_id: String,

    /// A message id, or an inclusive `from..to` range (order does not matter)
    messages: String,

    /// Output mode: md | json
    #[arg(long)]
    output: Option<OutputMode>,

    /// Output file without extension, or `-` for stdout
    #[arg(long)]
    file: Option<String>,

    /// Allow HTML in markdown output
    #[arg(long)]
    md_allow_html: Option<bool>,

    /// chrono strftime format for message timestamps
    #[arg(long)]
    md_date_format: Option<String>,

    /// Messages per API request (1-100)
    #[arg(long)]
    page_size: Option<usize>,

    /// Config file (default: discord_export.yml)
    #[arg(long, env = "DISCORD_EXPORT_CONFIG")]
    config: Option<PathBuf>,
}

impl Cli {
    fn options(&self, config: &Config) -> ExportOptions {
        let mut options = ExportOptions::from_config(config);
        if let Some(mode) = self.output {
            options.mode = mode;
        }
        if let Some(file) = &self.file {
            options.file = file.clone();
        }
        if let Some(allow_html) = self.md_allow_html {
            options.render.allow_html = allow_html;
        }
        if let Some(format) = &self.md_date_format {
            options.render.date_format = format.clone();
        }
        if let Some(page_size) = self.page_size {
            options.page_size = page_size;
        }
        options
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env for local development
    let _ = dotenvy::dotenv();

    // Logs go to stderr so `--file -` output stays clean
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("discord_export=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::new(),
    };

    let request = ExportRequest::parse(&cli.channel_id, &cli.messages, cli.options(&config))?;

    if let Err(err) = commands::export_run(&config, request).await {
        error!(error = %err, "export failed");
        return Err(err.into());
    }

    Ok(())
}
