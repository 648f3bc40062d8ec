//! Request parsing over an async byte stream.
//!
//! Reads whatever the stream has into a [`ReadBuffer`], lets [`Request::parse`]
//! take as many complete tokens as it can, drops the consumed bytes and
//! repeats until the request is done or the stream ends.

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::http::buffer::ReadBuffer;
use crate::http::request::{Request, RequestError};

/// Initial buffer size when none is configured.
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Drives a [`Request`] to completion from a reader.
#[derive(Debug)]
pub struct RequestParser<R> {
    reader: R,
    buffer: ReadBuffer,
}

impl<R: AsyncRead + Unpin> RequestParser<R> {
    pub fn new(reader: R) -> Self {
        Self::with_buffer_size(reader, DEFAULT_BUFFER_SIZE)
    }

    /// Start with `size` bytes of buffer; it doubles whenever it fills up.
    pub fn with_buffer_size(reader: R, size: usize) -> Self {
        Self {
            reader,
            buffer: ReadBuffer::with_capacity(size),
        }
    }

    /// Read and parse until the request is done.
    ///
    /// Fails with [`RequestError::Incomplete`] if the stream ends first.
    pub async fn parse(mut self) -> Result<Request, RequestError> {
        let mut request = Request::new();

        while !request.is_done() {
            let n = self.reader.read(self.buffer.spare_mut()).await?;
            if n == 0 {
                tracing::debug!(
                    state = ?request.state(),
                    buffered = self.buffer.len(),
                    "Stream ended before request was complete"
                );
                return Err(RequestError::Incomplete);
            }
            self.buffer.advance(n);

            let consumed = request.parse(self.buffer.filled())?;
            self.buffer.consume(consumed);
        }

        Ok(request)
    }
}

/// Parse one request from `reader` with the default buffer size.
pub async fn request_from_reader<R>(reader: R) -> Result<Request, RequestError>
where
    R: AsyncRead + Unpin,
{
    RequestParser::new(reader).parse().await
}
