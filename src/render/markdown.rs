//! Markdown output
//!
//! Each run of consecutive messages by one author becomes a single
//! block quote with one header. Message content goes through three rewrite
//! passes, in this order: custom emoji, user mentions, Tenor links.

use std::collections::HashMap;
use std::io::{BufWriter, Write};
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::{debug, warn};

use crate::error::Result;
use crate::model::Message;
use crate::render::RenderConfig;
use crate::snowflake::{MessageId, UserId};

const EMOJI_CDN_URL: &str = "https://cdn.discordapp.com/emojis";
const EMOJI_SIZE: u32 = 24;
const EMOJI_ONLY_SIZE: u32 = 48;
const REPLY_PREVIEW_WIDTH: usize = 80;
const UNKNOWN_AUTHOR: &str = "[*unknown*]";

static RE_EMOJI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(a)?:(\w+):(\d+)>").expect("emoji regex"));
static RE_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<@!?(\d+)>").expect("mention regex"));
static RE_TENOR_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https://tenor\.com/view/\S+").expect("tenor regex"));

/// Write `messages` as block-quoted Markdown, oldest first.
///
/// The input is not modified; sorting happens on a copy.
pub fn render_markdown<W: Write>(w: W, messages: &[Message], config: &RenderConfig) -> Result<()> {
    config.validate()?;

    let mut msgs = messages.to_vec();
    msgs.sort_by_key(|m| m.id);

    let mut bw = BufWriter::new(w);
    let mut content = ContentRenderer::new(&msgs, config);
    let mut runs = 0usize;

    for (i, msg) in msgs.iter().enumerate() {
        let collapse = i > 0 && msg.author.id == msgs[i - 1].author.id;
        if !collapse {
            if i > 0 {
                writeln!(bw)?;
            }
            write_header(&mut bw, msg, config)?;
            runs += 1;
        }

        writeln!(bw, "> ")?;

        if msg.is_reply() {
            match msg.referenced() {
                Some(original) => {
                    let preview = content.render(msg, &single_line(&original.content));
                    writeln!(
                        bw,
                        "> > Replying to **{}**: {}",
                        original.author.display_name(),
                        preview
                    )?;
                }
                None => writeln!(bw, "> > Replying to *unknown message*.")?,
            }
            writeln!(bw, "> ")?;
        }

        writeln!(bw, "{}", md_quote(&content.render(msg, &msg.content)))?;
    }

    bw.flush()?;
    debug!(messages = msgs.len(), runs, "rendered markdown");
    Ok(())
}

fn write_header<W: Write>(w: &mut W, msg: &Message, config: &RenderConfig) -> Result<()> {
    let name = msg.author.display_name();
    let avatar = msg.author.avatar_url();

    write!(w, "> ")?;
    if config.allow_html {
        write!(
            w,
            r#"<img src="{}?size=48" alt="{}'s avatar" width="20" />"#,
            escape_html(&avatar),
            escape_html(name)
        )?;
    } else {
        write!(w, "![{}'s avatar]({}?size=20)", name, avatar)?;
    }
    writeln!(
        w,
        " **{}** – *{}*",
        name,
        msg.timestamp.format(&config.date_format)
    )?;
    Ok(())
}

/// Runs the rewrite passes and memoizes results per (message id, content).
///
/// Mentions resolve only against authors present in the rendered batch.
pub struct ContentRenderer<'a> {
    config: &'a RenderConfig,
    authors: HashMap<UserId, String>,
    cache: HashMap<(MessageId, String), String>,
}

impl<'a> ContentRenderer<'a> {
    pub fn new(messages: &[Message], config: &'a RenderConfig) -> Self {
        let authors = messages
            .iter()
            .map(|m| (m.author.id, m.author.display_name().to_string()))
            .collect();

        Self {
            config,
            authors,
            cache: HashMap::new(),
        }
    }

    /// Render `content` in the context of `msg` (its embeds feed the link pass).
    pub fn render(&mut self, msg: &Message, content: &str) -> String {
        let key = (msg.id, content.to_string());
        if let Some(cached) = self.cache.get(&key) {
            return cached.clone();
        }

        let text = content.replace('\n', "\n\n");
        let text = render_emojis(&text, self.config);
        let text = render_mentions(&text, &self.authors);
        let text = render_tenor_links(&text, msg, self.config);

        self.cache.insert(key, text.clone());
        text
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

fn render_emojis(text: &str, config: &RenderConfig) -> String {
    let emoji_only =
        RE_EMOJI.is_match(text) && RE_EMOJI.replace_all(text, "").trim().is_empty();
    let size = if emoji_only { EMOJI_ONLY_SIZE } else { EMOJI_SIZE };

    RE_EMOJI
        .replace_all(text, |caps: &Captures| {
            let animated = caps.get(1).is_some();
            let name = &caps[2];
            let id = &caps[3];
            let ext = if animated { "gif" } else { "webp" };

            if config.allow_html {
                // 2x pixels, displayed at `size`.
                let url = format!(
                    "{}/{}.{}?size={}&quality=lossless",
                    EMOJI_CDN_URL,
                    id,
                    ext,
                    size * 2
                );
                format!(
                    r#"<img src="{}" alt=":{}:" width="{}" />"#,
                    escape_html(&url),
                    escape_html(name),
                    size
                )
            } else {
                let url = format!(
                    "{}/{}.{}?size={}&quality=lossless",
                    EMOJI_CDN_URL, id, ext, size
                );
                format!("![:{}:]({})", name, url)
            }
        })
        .into_owned()
}

fn render_mentions(text: &str, authors: &HashMap<UserId, String>) -> String {
    RE_MENTION
        .replace_all(text, |caps: &Captures| {
            let name = caps[1]
                .parse::<UserId>()
                .ok()
                .and_then(|id| authors.get(&id))
                .map(String::as_str)
                .unwrap_or(UNKNOWN_AUTHOR);
            format!("@{}", name)
        })
        .into_owned()
}

fn render_tenor_links(text: &str, msg: &Message, config: &RenderConfig) -> String {
    RE_TENOR_LINK
        .replace_all(text, |caps: &Captures| {
            let link = &caps[0];

            let Some(embed) = msg.embeds.iter().find(|e| e.url.as_deref() == Some(link)) else {
                warn!(message_id = %msg.id, tenor_url = link, "failed to find Tenor GIF embed");
                return link.to_string();
            };
            let Some(thumbnail) = embed.thumbnail.as_ref() else {
                warn!(message_id = %msg.id, tenor_url = link, "Tenor GIF embed has no thumbnail");
                return link.to_string();
            };

            if config.allow_html {
                format!(
                    r#"<a href="{}"><img alt="Tenor GIF" src="{}" width="400px" /></a>"#,
                    escape_html(link),
                    escape_html(&thumbnail.url)
                )
            } else {
                format!("[![Tenor GIF]({})]({})", thumbnail.url, link)
            }
        })
        .into_owned()
}

/// First line of `text`, cut at the wrap width with an ellipsis.
pub fn single_line(text: &str) -> String {
    let first = text.lines().next().unwrap_or("");
    let wrapped = wrap_text(first, REPLY_PREVIEW_WIDTH);
    let mut lines = wrapped.lines();
    let head = lines.next().unwrap_or("").to_string();
    if lines.next().is_some() {
        head + "..."
    } else {
        head
    }
}

/// Greedy word wrap at `width` characters. Words longer than `width` get a
/// line of their own.
pub fn wrap_text(text: &str, width: usize) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut line = String::new();
    let mut line_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        if line_len > 0 && line_len + 1 + word_len > width {
            lines.push(std::mem::take(&mut line));
            line_len = 0;
        }
        if line_len > 0 {
            line.push(' ');
            line_len += 1;
        }
        line.push_str(word);
        line_len += word_len;
    }
    if !line.is_empty() {
        lines.push(line);
    }

    lines.join("\n")
}

/// Prefix every line with a block-quote marker.
pub fn md_quote(text: &str) -> String {
    text.split('\n')
        .map(|line| format!("> {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::tests::message;
    use crate::model::{Embed, EmbedThumbnail, MessageReference};
    use serde_json::Map;

    fn html() -> RenderConfig {
        RenderConfig::default()
    }

    fn plain() -> RenderConfig {
        RenderConfig {
            allow_html: false,
            ..RenderConfig::default()
        }
    }

    fn render_to_string(msgs: &[Message], config: &RenderConfig) -> String {
        let mut out = Vec::new();
        render_markdown(&mut out, msgs, config).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn tenor_embed(url: &str, thumbnail: Option<&str>) -> Embed {
        Embed {
            url: Some(url.to_string()),
            thumbnail: thumbnail.map(|t| EmbedThumbnail {
                url: t.to_string(),
                extra: Map::new(),
            }),
            extra: Map::new(),
        }
    }

    fn reply_ref() -> Option<MessageReference> {
        Some(MessageReference {
            message_id: None,
            channel_id: None,
            extra: Map::new(),
        })
    }

    #[test]
    fn emoji_only_content_is_large() {
        let out = render_emojis("  <:wave:123>  ", &plain());
        assert_eq!(
            out,
            "  ![:wave:](https://cdn.discordapp.com/emojis/123.webp?size=48&quality=lossless)  "
        );
    }

    #[test]
    fn emoji_with_text_is_small() {
        let out = render_emojis("<:wave:123> hello", &plain());
        assert_eq!(
            out,
            "![:wave:](https://cdn.discordapp.com/emojis/123.webp?size=24&quality=lossless) hello"
        );
    }

    #[test]
    fn several_emoji_alone_are_large() {
        let out = render_emojis("<:a1:1> <:b2:2>", &plain());
        assert_eq!(out.matches("size=48").count(), 2);
    }

    #[test]
    fn animated_emoji_html_uses_gif_and_double_resolution() {
        let out = render_emojis("<a:party:456>", &html());
        assert_eq!(
            out,
            r#"<img src="https://cdn.discordapp.com/emojis/456.gif?size=96&amp;quality=lossless" alt=":party:" width="48" />"#
        );
    }

    #[test]
    fn text_without_emoji_is_unchanged() {
        assert_eq!(render_emojis("just text <not:an emoji>", &html()), "just text <not:an emoji>");
    }

    #[test]
    fn mentions_resolve_against_batch_authors() {
        let mut authors = HashMap::new();
        authors.insert(UserId::new(7), "Nelly".to_string());

        assert_eq!(
            render_mentions("hi <@7> and <@!7>", &authors),
            "hi @Nelly and @Nelly"
        );
    }

    #[test]
    fn unknown_mentions_render_placeholder() {
        let authors = HashMap::new();
        assert_eq!(
            render_mentions("hi <@8> <@99999999999999999999999>", &authors),
            "hi @[*unknown*] @[*unknown*]"
        );
    }

    #[test]
    fn tenor_link_becomes_thumbnail() {
        let link = "https://tenor.com/view/cat-jump-123";
        let mut msg = message(1, 1);
        msg.embeds = vec![tenor_embed(link, Some("https://media.tenor.com/cat.png"))];

        assert_eq!(
            render_tenor_links(link, &msg, &html()),
            r#"<a href="https://tenor.com/view/cat-jump-123"><img alt="Tenor GIF" src="https://media.tenor.com/cat.png" width="400px" /></a>"#
        );
        assert_eq!(
            render_tenor_links(link, &msg, &plain()),
            "[![Tenor GIF](https://media.tenor.com/cat.png)](https://tenor.com/view/cat-jump-123)"
        );
    }

    #[test]
    fn tenor_link_without_matching_embed_is_kept() {
        let link = "look https://tenor.com/view/cat-jump-123";
        let mut msg = message(1, 1);
        assert_eq!(render_tenor_links(link, &msg, &html()), link);

        msg.embeds = vec![tenor_embed("https://tenor.com/view/cat-jump-123", None)];
        assert_eq!(render_tenor_links(link, &msg, &html()), link);
    }

    #[test]
    fn single_line_truncates_long_text() {
        let long = "word ".repeat(30);
        let line = single_line(&long);
        assert!(line.ends_with("..."));
        assert!(line.chars().count() <= REPLY_PREVIEW_WIDTH + 3);

        assert_eq!(single_line("first\nsecond"), "first");
        assert_eq!(single_line("short"), "short");
        assert_eq!(single_line(""), "");
    }

    #[test]
    fn wrap_text_breaks_on_words() {
        assert_eq!(wrap_text("aa bb cc", 5), "aa bb\ncc");
        assert_eq!(wrap_text("abcdefgh ij", 4), "abcdefgh\nij");
    }

    #[test]
    fn md_quote_prefixes_each_line() {
        assert_eq!(md_quote("a\n\nb"), "> a\n> \n> b");
    }

    #[test]
    fn content_renderer_memoizes_by_id_and_content() {
        let msgs = vec![message(1, 7)];
        let config = html();
        let mut renderer = ContentRenderer::new(&msgs, &config);

        let first = renderer.render(&msgs[0], "hey <@7> <:wave:1>");
        let second = renderer.render(&msgs[0], "hey <@7> <:wave:1>");
        assert_eq!(first, second);
        assert_eq!(renderer.cached(), 1);

        renderer.render(&msgs[0], "other");
        assert_eq!(renderer.cached(), 2);
    }

    #[test]
    fn content_newlines_become_paragraphs() {
        let msgs = vec![message(1, 7)];
        let config = plain();
        let mut renderer = ContentRenderer::new(&msgs, &config);
        assert_eq!(renderer.render(&msgs[0], "a\nb"), "a\n\nb");
    }

    #[test]
    fn collapses_consecutive_messages_by_author() {
        let mut a1 = message(1, 7);
        a1.content = "one".to_string();
        let mut a2 = message(2, 7);
        a2.content = "two".to_string();
        let mut b1 = message(3, 8);
        b1.content = "three".to_string();

        let out = render_to_string(&[a1, a2, b1], &plain());
        let expected = [
            "> ![user7's avatar](https://cdn.discordapp.com/embed/avatars/0.png?size=20) **user7** – *03/01/2024 10:00 AM*",
            "> ",
            "> one",
            "> ",
            "> two",
            "",
            "> ![user8's avatar](https://cdn.discordapp.com/embed/avatars/0.png?size=20) **user8** – *03/01/2024 10:00 AM*",
            "> ",
            "> three",
            "",
        ]
        .join("\n");
        assert_eq!(out, expected);
    }

    #[test]
    fn html_header_escapes_name() {
        let mut msg = message(1, 7);
        msg.author.global_name = Some("<Nelly>".to_string());

        let out = render_to_string(&[msg], &html());
        assert!(out.starts_with(
            r#"> <img src="https://cdn.discordapp.com/embed/avatars/0.png?size=48" alt="&lt;Nelly&gt;'s avatar" width="20" /> **<Nelly>** – *03/01/2024 10:00 AM*"#
        ));
    }

    #[test]
    fn sorts_a_copy_of_the_input() {
        let msgs = vec![message(2, 8), message(1, 7)];
        let out = render_to_string(&msgs, &plain());

        assert!(out.find("message 1").unwrap() < out.find("message 2").unwrap());
        assert_eq!(msgs[0].id, MessageId::new(2));
    }

    #[test]
    fn reply_renders_preview_line() {
        let mut original = message(1, 8);
        original.content = "hello <@7>\nsecond line".to_string();
        let mut reply = message(2, 7);
        reply.content = "hi back".to_string();
        reply.message_reference = reply_ref();
        reply.referenced_message = Some(Some(Box::new(original)));

        let out = render_to_string(&[message(0, 7), reply], &plain());
        assert!(out.contains("> > Replying to **user8**: hello @user7\n> \n> hi back\n"));
    }

    #[test]
    fn unresolved_reply_renders_placeholder() {
        let mut reply = message(2, 7);
        reply.message_reference = reply_ref();

        let out = render_to_string(&[reply], &plain());
        assert!(out.contains("> > Replying to *unknown message*.\n> \n> message 2\n"));
    }

    #[test]
    fn reply_does_not_break_a_run() {
        let mut reply = message(2, 7);
        reply.message_reference = reply_ref();

        let out = render_to_string(&[message(1, 7), reply], &plain());
        assert_eq!(out.matches("**user7**").count(), 1);
    }

    #[test]
    fn rendering_is_repeatable() {
        let mut msg = message(1, 7);
        msg.content = "<:wave:1> <@7> <@9>".to_string();
        let msgs = vec![msg];

        assert_eq!(render_to_string(&msgs, &html()), render_to_string(&msgs, &html()));
    }
}
