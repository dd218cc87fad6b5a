//! Wire framing and payload types for the line protocol.
//!
//! Each request and each response is exactly one newline-terminated, UTF-8
//! encoded JSON line; the newline is the sole delimiter. A request is
//! either a JSON array of strings or a single JSON string (normalized to a
//! one-element batch). A response is a JSON array of `[text, label]`
//! pairs in input order.

use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt};

use crate::config::ServerConfig;
use crate::error::{Result, SentimentError};

/// A classification request: a batch of texts, or one bare string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Request {
    Batch(Vec<String>),
    Single(String),
}

impl Request {
    /// Normalize to batch form; a single string becomes a one-element batch.
    pub fn into_batch(self) -> Vec<String> {
        match self {
            Request::Batch(texts) => texts,
            Request::Single(text) => vec![text],
        }
    }
}

/// Read one newline-terminated frame from a buffered reader.
///
/// The buffering layer reassembles frames split across TCP segments, so
/// the returned string is always one complete frame with the terminator
/// and any trailing whitespace stripped.
///
/// Returns `None` on clean EOF before any bytes of a frame. EOF in the
/// middle of a frame and frames larger than
/// [`ServerConfig::MAX_FRAME_BYTES`] are errors.
pub async fn read_frame<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    // Cap how much one frame may buffer before the size check can run.
    let n = (&mut *reader)
        .take(ServerConfig::MAX_FRAME_BYTES as u64 + 1)
        .read_line(&mut line)
        .await?;

    if n == 0 {
        return Ok(None);
    }
    if n > ServerConfig::MAX_FRAME_BYTES {
        return Err(SentimentError::Validation {
            field: "frame".to_string(),
            message: format!(
                "frame size exceeds maximum {}",
                ServerConfig::MAX_FRAME_BYTES
            ),
        });
    }
    if !line.ends_with('\n') {
        return Err(SentimentError::Validation {
            field: "frame".to_string(),
            message: "connection closed mid-frame".to_string(),
        });
    }

    line.truncate(line.trim_end().len());
    Ok(Some(line))
}

/// Write one frame: the payload followed by the newline terminator.
///
/// `write_all` retries short writes until every byte is flushed or the
/// connection errors.
pub async fn write_frame<W: AsyncWriteExt + Unpin>(writer: &mut W, payload: &str) -> Result<()> {
    writer.write_all(payload.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}
