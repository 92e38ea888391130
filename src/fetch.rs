//! Paginated retrieval of a message range
//!
//! Discord only pages forward with `after=<id>`, newest first within a page.
//! The loop stops on the upper-bound id, not on a count, so a range of any
//! length is fetched with as few requests as the page size allows.

use async_trait::async_trait;
use tracing::info;

use crate::error::Error;
use crate::model::Message;
use crate::snowflake::{ChannelId, MessageId, MessageRange};

/// Largest page Discord will return.
pub const MAX_PAGE_SIZE: usize = 100;

/// A source of message pages, newest first, as the Discord API returns them.
#[async_trait]
pub trait MessageSource: Send + Sync {
    async fn messages_after(
        &self,
        channel: ChannelId,
        after: MessageId,
        limit: usize,
    ) -> crate::Result<Vec<Message>>;
}

/// Pagination state. `FoundUpperBound` and `Exhausted` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    Fetching { after: MessageId },
    FoundUpperBound,
    Exhausted,
}

impl PageState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PageState::Fetching { .. })
    }
}

/// Accumulates pages and decides when to stop, without any I/O.
#[derive(Debug)]
pub struct Paginator {
    upper: MessageId,
    page_size: usize,
    state: PageState,
    messages: Vec<Message>,
}

impl Paginator {
    /// The cursor starts one below `range.from` so the lower bound is included.
    pub fn new(range: MessageRange, page_size: usize) -> Self {
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        let after = MessageId::new(range.from.get().saturating_sub(1));
        Self {
            upper: range.to,
            page_size,
            state: PageState::Fetching { after },
            messages: Vec::with_capacity(page_size),
        }
    }

    pub fn state(&self) -> PageState {
        self.state
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Feed one page as returned by the API (newest first).
    ///
    /// Pages offered after a terminal state are ignored.
    pub fn accept(&mut self, mut page: Vec<Message>) -> PageState {
        if self.state.is_terminal() {
            return self.state;
        }

        page.reverse();
        let page_len = page.len();
        let last_id = page.last().map(|m| m.id);
        let stop_at = page.iter().position(|m| m.id >= self.upper);
        let base = self.messages.len();
        self.messages.extend(page);

        self.state = if let Some(ix) = stop_at {
            self.messages.truncate(base + ix + 1);
            PageState::FoundUpperBound
        } else {
            match last_id {
                Some(after) if page_len >= self.page_size => PageState::Fetching { after },
                _ => PageState::Exhausted,
            }
        };

        self.state
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}

/// A failed fetch, with whatever was gathered before the error.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct FetchFailure {
    pub partial: Vec<Message>,
    #[source]
    pub error: Error,
}

impl From<FetchFailure> for Error {
    fn from(failure: FetchFailure) -> Self {
        failure.error
    }
}

/// Fetch `range` from `channel`, ascending by id.
pub async fn fetch_messages<S: MessageSource + ?Sized>(
    source: &S,
    channel: ChannelId,
    range: MessageRange,
    page_size: usize,
) -> Result<Vec<Message>, FetchFailure> {
    let mut paginator = Paginator::new(range, page_size);

    while let PageState::Fetching { after } = paginator.state() {
        let page = match source
            .messages_after(channel, after, paginator.page_size())
            .await
        {
            Ok(page) => page,
            Err(err) => {
                return Err(FetchFailure {
                    partial: paginator.into_messages(),
                    error: Error::Fetch {
                        after,
                        source: Box::new(err),
                    },
                });
            }
        };

        info!(size = page.len(), %after, "fetched chunk of messages");

        match paginator.accept(page) {
            PageState::FoundUpperBound => info!(
                %channel,
                from = %range.from,
                to = %range.to,
                size = paginator.messages().len(),
                "found message to stop at"
            ),
            PageState::Exhausted => info!(
                %channel,
                from = %range.from,
                to = %range.to,
                size = paginator.messages().len(),
                "reached end of messages"
            ),
            PageState::Fetching { .. } => {}
        }
    }

    Ok(paginator.into_messages())
}
