//! Tests for export command

use async_trait::async_trait;

use discord_export::commands::export::{export, run};
use discord_export::commands::{Destination, ExportOptions, ExportRequest};
use discord_export::{
    ChannelId, Config, Error, Message, MessageId, MessageSource, OutputMode, RenderConfig,
    Result,
};

use crate::MemoryChannel;

struct BrokenChannel;

#[async_trait]
impl MessageSource for BrokenChannel {
    async fn messages_after(
        &self,
        _channel: ChannelId,
        _after: MessageId,
        _limit: usize,
    ) -> Result<Vec<Message>> {
        Err(Error::Api {
            status: 403,
            body: "Missing Access".into(),
        })
    }
}

fn options(file: &str, mode: OutputMode) -> ExportOptions {
    ExportOptions {
        mode,
        file: file.to_string(),
        render: RenderConfig::default(),
        page_size: 100,
    }
}

#[test]
fn test_export_output_path() {
    let request =
        ExportRequest::parse("900", "1..2", options("output", OutputMode::Markdown)).unwrap();
    assert_eq!(
        request.destination,
        Destination::File("output.md".into())
    );
}

#[tokio::test]
async fn test_export_markdown_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("export");
    let request = ExportRequest::parse(
        "900",
        "40..30",
        options(base.to_str().unwrap(), OutputMode::Markdown),
    )
    .unwrap();

    export(&MemoryChannel::new(1..=100), &request).await.unwrap();

    let written = std::fs::read_to_string(dir.path().join("export.md")).unwrap();
    assert!(written.starts_with("> <img src="));
    assert!(written.contains("> message 30\n"));
    assert!(written.contains("> message 40\n"));
    assert!(!written.contains("message 41"));
    assert!(written.lines().all(|l| l.is_empty() || l.starts_with("> ")));
}

#[tokio::test]
async fn test_export_failure_leaves_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("broken");
    let request = ExportRequest::parse(
        "900",
        "1..2",
        options(base.to_str().unwrap(), OutputMode::Json),
    )
    .unwrap();

    let err = export(&BrokenChannel, &request).await.unwrap_err();

    assert!(err.to_string().contains("Missing Access"));
    assert!(!dir.path().join("broken.json").exists());
}

#[tokio::test]
async fn test_export_run_requires_token() {
    let mut config = Config::default();
    config.token = None;
    config.api_url = "http://127.0.0.1:9".to_string();

    let request = ExportRequest::parse("900", "1", options("-", OutputMode::Json)).unwrap();
    let err = run(&config, request).await.unwrap_err();
    assert!(matches!(err, Error::MissingToken));
}
