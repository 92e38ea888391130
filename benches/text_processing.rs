use criterion::{black_box, criterion_group, criterion_main, Criterion};
use discord_export::render::markdown::{single_line, wrap_text, ContentRenderer};
use discord_export::render::{render_markdown, RenderConfig};
use discord_export::Message;
use serde_json::json;

fn message(id: u64, author: u64, content: &str) -> Message {
    serde_json::from_value(json!({
        "id": id.to_string(),
        "channel_id": "900",
        "author": {"id": author.to_string(), "username": format!("user{}", author)},
        "content": content,
        "timestamp": "2024-03-01T10:00:00+00:00",
        "embeds": [{
            "url": "https://tenor.com/view/cat-jump-123",
            "thumbnail": {"url": "https://media.tenor.com/cat.png"}
        }]
    }))
    .expect("message")
}

fn sample_messages() -> Vec<Message> {
    (1..=500)
        .map(|id| {
            message(
                id,
                1 + id % 7,
                "hey <@3> look <:wave:123> <a:party:456>\nhttps://tenor.com/view/cat-jump-123 \
                 and some trailing text to wrap around the preview width",
            )
        })
        .collect()
}

fn content_benchmark(c: &mut Criterion) {
    let msgs = sample_messages();
    let config = RenderConfig::default();

    c.bench_function("content_rewrite_passes", |b| {
        b.iter(|| {
            let mut renderer = ContentRenderer::new(&msgs, &config);
            for msg in &msgs {
                black_box(renderer.render(msg, black_box(&msg.content)));
            }
        });
    });
}

fn markdown_benchmark(c: &mut Criterion) {
    let msgs = sample_messages();
    let config = RenderConfig::default();

    c.bench_function("render_markdown_500", |b| {
        b.iter(|| {
            let mut out = Vec::with_capacity(1 << 20);
            render_markdown(&mut out, black_box(&msgs), &config).expect("render");
            black_box(out.len());
        });
    });
}

fn wrap_benchmark(c: &mut Criterion) {
    let text = "Rust async Discord export pagination rendering".repeat(32);

    c.bench_function("wrap_and_single_line", |b| {
        b.iter(|| {
            black_box(wrap_text(black_box(&text), 80));
            black_box(single_line(black_box(&text)));
        });
    });
}

criterion_group!(
    text_processing,
    content_benchmark,
    markdown_benchmark,
    wrap_benchmark
);
criterion_main!(text_processing);
