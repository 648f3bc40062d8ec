//! Response writing in protocol order.
//!
//! # Responsibilities
//! - Emit status line, header block and body onto a sink
//! - Support chunked bodies followed by trailer fields
//! - Refuse any call made out of order
//!
//! # State Transitions
//! ```text
//! AwaitingStatusLine → AwaitingHeaders: write_status_line
//! AwaitingHeaders → AwaitingBody: write_headers
//! AwaitingBody → Done: write_body
//! AwaitingBody → StreamingChunks: write_chunked_body (repeatable)
//! AwaitingBody | StreamingChunks → AwaitingTrailers: write_chunked_body_done
//! AwaitingTrailers → Done: write_trailers
//! ```
//!
//! # Design Decisions
//! - Each call builds its bytes up front and writes them with one `write_all`,
//!   so a rejected call leaves the wire untouched
//! - Once a body starts as chunked it cannot switch to a plain body, and vice versa
//! - A handler that never reaches `Done` leaves a truncated response; nothing fixes it up

use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::headers::{HeaderMap, CRLF};
use crate::http::status::{StatusCode, StatusError};

/// Where a [`ResponseWriter`] is in the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    AwaitingStatusLine,
    AwaitingHeaders,
    AwaitingBody,
    /// At least one chunk of a chunked body has been written.
    StreamingChunks,
    /// The zero-length chunk has been written; trailers close the message.
    AwaitingTrailers,
    Done,
}

/// Errors reported by [`ResponseWriter`].
#[derive(Debug, Error)]
pub enum WriteError {
    /// The call is not legal in the writer's current state.
    #[error("cannot {operation} while writer is in state {state:?}")]
    OutOfOrder {
        operation: &'static str,
        state: WriterState,
    },

    #[error(transparent)]
    Status(#[from] StatusError),

    #[error("failed to write {what}: {source}")]
    Io {
        what: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Baseline headers for a plain body of `content_length` bytes.
///
/// Callers adjust the result before [`ResponseWriter::write_headers`], e.g.
/// replacing `content-length` with `transfer-encoding: chunked`.
pub fn default_headers(content_length: usize) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.set("content-length", &content_length.to_string());
    headers.set("connection", "close");
    headers.set("content-type", "text/plain");
    headers
}

/// Trailer fields declared by the `Trailer` header, each seeded with an empty value.
///
/// Fill the values with [`HeaderMap::update`] before calling
/// [`ResponseWriter::write_trailers`].
pub fn trailers_from_headers(headers: &HeaderMap) -> HeaderMap {
    let mut trailers = HeaderMap::new();
    if let Some(declared) = headers.get("trailer") {
        declared
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .for_each(|name| trailers.update(name, ""));
    }
    trailers
}

/// Writes one response onto `sink`, enforcing the legal call order.
#[derive(Debug)]
pub struct ResponseWriter<W> {
    sink: W,
    state: WriterState,
}

impl<W: AsyncWrite + Unpin> ResponseWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            state: WriterState::AwaitingStatusLine,
        }
    }

    pub fn state(&self) -> WriterState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == WriterState::Done
    }

    /// Borrow the sink.
    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    /// Give back the sink.
    pub fn into_inner(self) -> W {
        self.sink
    }

    /// Emit `HTTP/1.1 <code> <reason>`.
    pub async fn write_status_line(&mut self, status: StatusCode) -> Result<(), WriteError> {
        self.expect(&[WriterState::AwaitingStatusLine], "write status line")?;

        let line = format!("HTTP/1.1 {} {}\r\n", status.as_u16(), status.reason());
        self.emit(line.as_bytes(), "status line").await?;
        self.transition(WriterState::AwaitingHeaders);
        Ok(())
    }

    /// Emit a status line for a numeric code; unknown codes are rejected.
    pub async fn write_status_code(&mut self, code: u16) -> Result<(), WriteError> {
        self.expect(&[WriterState::AwaitingStatusLine], "write status line")?;
        let status = StatusCode::try_from(code)?;
        self.write_status_line(status).await
    }

    /// Emit one `key: value` line per field and the blank line ending the block.
    pub async fn write_headers(&mut self, headers: &HeaderMap) -> Result<(), WriteError> {
        self.expect(&[WriterState::AwaitingHeaders], "write headers")?;

        let mut block = Vec::new();
        headers.write_field_lines(&mut block);
        block.extend_from_slice(CRLF);

        self.emit(&block, "headers").await?;
        self.transition(WriterState::AwaitingBody);
        Ok(())
    }

    /// Emit the whole body verbatim. Returns the number of bytes written.
    pub async fn write_body(&mut self, body: &[u8]) -> Result<usize, WriteError> {
        self.expect(&[WriterState::AwaitingBody], "write body")?;

        self.emit(body, "body").await?;
        self.transition(WriterState::Done);
        Ok(body.len())
    }

    /// Emit one chunk: hex length, payload, terminator.
    ///
    /// Returns the payload length. An empty payload writes nothing, since a
    /// zero-length chunk would end the body.
    pub async fn write_chunked_body(&mut self, chunk: &[u8]) -> Result<usize, WriteError> {
        self.expect(
            &[WriterState::AwaitingBody, WriterState::StreamingChunks],
            "write chunk",
        )?;

        if !chunk.is_empty() {
            let size_line = format!("{:x}\r\n", chunk.len());
            let mut frame = Vec::with_capacity(size_line.len() + chunk.len() + CRLF.len());
            frame.extend_from_slice(size_line.as_bytes());
            frame.extend_from_slice(chunk);
            frame.extend_from_slice(CRLF);
            self.emit(&frame, "chunk").await?;
        }

        if self.state == WriterState::AwaitingBody {
            self.transition(WriterState::StreamingChunks);
        }
        Ok(chunk.len())
    }

    /// Emit the zero-length chunk that ends a chunked body.
    pub async fn write_chunked_body_done(&mut self) -> Result<(), WriteError> {
        self.expect(
            &[WriterState::AwaitingBody, WriterState::StreamingChunks],
            "finish chunked body",
        )?;

        self.emit(b"0\r\n", "last chunk").await?;
        self.transition(WriterState::AwaitingTrailers);
        Ok(())
    }

    /// Emit trailer fields and the blank line that ends the message.
    pub async fn write_trailers(&mut self, trailers: &HeaderMap) -> Result<(), WriteError> {
        self.expect(&[WriterState::AwaitingTrailers], "write trailers")?;

        let mut block = Vec::new();
        trailers.write_field_lines(&mut block);
        block.extend_from_slice(CRLF);

        self.emit(&block, "trailers").await?;
        self.transition(WriterState::Done);
        Ok(())
    }

    fn expect(&self, allowed: &[WriterState], operation: &'static str) -> Result<(), WriteError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(WriteError::OutOfOrder {
                operation,
                state: self.state,
            })
        }
    }

    async fn emit(&mut self, bytes: &[u8], what: &'static str) -> Result<(), WriteError> {
        self.sink
            .write_all(bytes)
            .await
            .map_err(|source| WriteError::Io { what, source })?;
        self.sink
            .flush()
            .await
            .map_err(|source| WriteError::Io { what, source })
    }

    fn transition(&mut self, next: WriterState) {
        tracing::trace!(from = ?self.state, to = ?next, "Response writer state");
        self.state = next;
    }
}
