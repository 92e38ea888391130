//! JSON output: the fetched messages as Discord sent them.

use std::io::{BufWriter, Write};

use crate::error::Result;
use crate::model::Message;

/// Write `messages` as an indented JSON array followed by a newline.
pub fn render_json<W: Write>(w: W, messages: &[Message]) -> Result<()> {
    let mut bw = BufWriter::new(w);
    serde_json::to_writer_pretty(&mut bw, messages)?;
    bw.write_all(b"\n")?;
    bw.flush()?;
    Ok(())
}
