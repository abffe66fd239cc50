//! TUI-less "say" command

use std::error::Error;
use std::io::{self, Write};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::core::chat_stream::{ChatStreamService, StreamMessage, StreamParams};
use crate::core::client::AiClient;

pub async fn run_say(
    client: Arc<AiClient>,
    prompt: Vec<String>,
    incremental: bool,
) -> Result<(), Box<dyn Error>> {
    let prompt = prompt.join(" ");
    if prompt.trim().is_empty() {
        eprintln!("Usage: nexchat say <prompt>");
        std::process::exit(1);
    }

    let (stream_service, mut rx) = ChatStreamService::new();
    stream_service.spawn_stream(StreamParams {
        client,
        prompt,
        history: Vec::new(),
        cancel_token: CancellationToken::new(),
        stream_id: 0,
        incremental,
    });

    let mut stdout = io::stdout();
    let failed = print_stream(&mut rx, &mut stdout).await?;
    if failed {
        std::process::exit(1);
    }
    Ok(())
}

/// Copy stream chunks to `out` until the stream ends. Errors go to stderr;
/// returns whether one occurred.
pub async fn print_stream<W: Write>(
    rx: &mut tokio::sync::mpsc::UnboundedReceiver<(StreamMessage, u64)>,
    out: &mut W,
) -> io::Result<bool> {
    let mut failed = false;
    let mut ends_with_newline = true;
    while let Some((message, _)) = rx.recv().await {
        match message {
            StreamMessage::Chunk(content) => {
                if content.is_empty() {
                    continue;
                }
                ends_with_newline = content.ends_with('\n');
                out.write_all(content.as_bytes())?;
                out.flush()?;
            }
            StreamMessage::Error(err) => {
                if !ends_with_newline {
                    writeln!(out)?;
                    ends_with_newline = true;
                }
                eprintln!("❌ {err}");
                failed = true;
            }
            StreamMessage::End => break,
        }
    }
    if !ends_with_newline {
        writeln!(out)?;
    }
    out.flush()?;
    Ok(failed)
}
