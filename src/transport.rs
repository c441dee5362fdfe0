//! Dual-mode frame codec.
//!
//! Two wire conventions coexist on the same stream and are told apart per
//! message, with no prior negotiation:
//!
//! - header-framed: `Content-Length: <N>\r\n`, a blank line, then exactly
//!   N bytes of JSON body;
//! - line-framed: one complete JSON document terminated by a newline.
//!
//! A line containing the `Content-Length:` token selects the header form;
//! any other non-blank line is itself the body. Different callers of the
//! same server send different framings, so the decoder assumes neither.

use std::str::FromStr;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::protocol::Message;

/// Maximum bytes per message (1 MiB).
pub const MAX_MESSAGE_BYTES: usize = 1024 * 1024;

const HEADER_TOKEN: &str = "Content-Length:";

/// Outgoing wire convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// `Content-Length` header, blank line, counted body.
    Header,
    /// One JSON document per newline-terminated line.
    Line,
}

impl FromStr for Framing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "header" => Ok(Self::Header),
            "line" => Ok(Self::Line),
            other => Err(format!("unknown framing {other:?} (expected 'header' or 'line')")),
        }
    }
}

/// Framing or decoding failure. `is_fatal` separates errors that poison the
/// stream from ones the caller may log and read past.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("invalid framing header: {0:?}")]
    InvalidHeader(String),
    #[error("frame body truncated: expected {expected} bytes")]
    Truncated { expected: usize },
    #[error("message exceeds {MAX_MESSAGE_BYTES} byte limit: {0} bytes")]
    TooLarge(usize),
    #[error("frame is not valid UTF-8")]
    InvalidUtf8,
    #[error("malformed message: {0}")]
    Decode(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FrameError {
    /// True when the underlying stream can no longer be read from. A
    /// truncated body leaves the stream at end-of-file, which the next
    /// read reports as a clean close, so it is not fatal here.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

/// Serialize a message in the given framing.
///
/// `serde_json` escapes control characters, so a line-framed body never
/// contains a raw newline of its own.
pub fn encode_message(message: &Message, framing: Framing) -> Result<Vec<u8>, serde_json::Error> {
    let body = serde_json::to_string(message)?;
    Ok(match framing {
        Framing::Header => format!("Content-Length: {}\r\n\r\n{body}", body.len()).into_bytes(),
        Framing::Line => {
            let mut bytes = body.into_bytes();
            bytes.push(b'\n');
            bytes
        }
    })
}

/// Encode and write a message, flushing so the peer sees it immediately.
pub async fn write_message<W>(
    writer: &mut W,
    message: &Message,
    framing: Framing,
) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    let bytes = encode_message(message, framing)?;
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}

/// Incremental decoder over a buffered byte stream.
pub struct MessageReader<R> {
    inner: R,
}

impl<R> MessageReader<R>
where
    R: AsyncBufRead + Unpin,
{
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Decode the next message, skipping blank separator lines.
    ///
    /// `Ok(None)` is a clean end of stream at a message boundary. An error
    /// is a single bad frame unless `is_fatal` says otherwise; the caller
    /// decides whether to log-and-continue or stop.
    pub async fn next_message(&mut self) -> Result<Option<Message>, FrameError> {
        loop {
            let mut line = Vec::new();
            let n = self.inner.read_until(b'\n', &mut line).await?;
            if n == 0 {
                return Ok(None);
            }
            if n > MAX_MESSAGE_BYTES {
                return Err(FrameError::TooLarge(n));
            }

            let text = std::str::from_utf8(&line)
                .map_err(|_| FrameError::InvalidUtf8)?
                .trim();
            if text.is_empty() {
                continue;
            }

            if text.contains(HEADER_TOKEN) {
                return self.read_header_framed(text).await.map(Some);
            }

            return Ok(Some(serde_json::from_str(text)?));
        }
    }

    async fn read_header_framed(&mut self, header: &str) -> Result<Message, FrameError> {
        let declared = parse_content_length(header)?;

        // Consume the separator line between header and body.
        let mut separator = Vec::new();
        let n = self.inner.read_until(b'\n', &mut separator).await?;
        if n == 0 {
            return Err(FrameError::Truncated { expected: declared });
        }

        if declared > MAX_MESSAGE_BYTES {
            // Drain the declared body so the next frame starts aligned.
            let mut body = (&mut self.inner).take(declared as u64);
            tokio::io::copy(&mut body, &mut tokio::io::sink()).await?;
            return Err(FrameError::TooLarge(declared));
        }

        // The body is a counted byte run: embedded newlines are content,
        // not terminators.
        let mut body = vec![0u8; declared];
        self.inner.read_exact(&mut body).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                FrameError::Truncated { expected: declared }
            } else {
                FrameError::Io(e)
            }
        })?;

        Ok(serde_json::from_slice(&body)?)
    }
}

fn parse_content_length(header: &str) -> Result<usize, FrameError> {
    header
        .splitn(2, ':')
        .nth(1)
        .and_then(|v| v.trim().parse::<usize>().ok())
        .ok_or_else(|| FrameError::InvalidHeader(header.to_string()))
}
