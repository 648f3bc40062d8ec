//! Request model and incremental token parsing.
//!
//! # Responsibilities
//! - Hold the parsed request line, header fields and body
//! - Advance the parse state one token at a time from buffered bytes
//! - Reject malformed syntax and body framing violations
//!
//! # State Transitions
//! ```text
//! Initialized → ParsingHeaders: request line parsed
//! ParsingHeaders → ParsingBody: blank line ends the header section
//! ParsingBody → Done: Content-Length absent, or body reached Content-Length
//! Done: terminal, any further parse is an error
//! ```
//!
//! # Design Decisions
//! - Parsing never looks back: a state is left exactly once
//! - Only `Content-Length` frames the body; chunked request bodies are not read
//! - Returning 0 consumed bytes means "give me more input"

use thiserror::Error;

use crate::http::headers::{find_crlf, HeaderError, HeaderMap, CRLF};

/// The only protocol version accepted in request lines.
pub const HTTP_VERSION: &str = "1.1";

/// Errors that abort parsing of a request.
#[derive(Debug, Error)]
pub enum RequestError {
    /// Request line is not `METHOD SP TARGET SP VERSION`.
    #[error("request line does not consist of 3 parts: {0}")]
    RequestLineParts(String),

    /// Request line bytes are not valid UTF-8.
    #[error("request line is not valid UTF-8")]
    RequestLineEncoding,

    /// Method is empty or contains something other than `A-Z`.
    #[error("request method contains other than capital letters: {0}")]
    InvalidMethod(String),

    /// Version token is not of the form `HTTP/x`.
    #[error("malformed HTTP version: {0}")]
    MalformedVersion(String),

    /// Version is well formed but not 1.1.
    #[error("HTTP version not supported: {0}")]
    UnsupportedVersion(String),

    #[error(transparent)]
    Header(#[from] HeaderError),

    /// `Content-Length` is not a non-negative integer.
    #[error("invalid content length: {0}")]
    InvalidContentLength(String),

    /// More body bytes arrived than `Content-Length` declared.
    #[error("content is greater than provided length {0}")]
    BodyTooLong(usize),

    /// The stream ended before the request was complete.
    #[error("incomplete request")]
    Incomplete,

    /// Parse attempted on a request that is already done.
    #[error("request has already been processed")]
    AlreadyDone,

    #[error("failed to read request: {0}")]
    Io(#[from] std::io::Error),
}

/// Parse progress of a [`Request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    /// Waiting for the request line.
    Initialized,
    /// Reading header field lines.
    ParsingHeaders,
    /// Reading the `Content-Length` framed body.
    ParsingBody,
    /// Request fully parsed.
    Done,
}

/// First line of a request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RequestLine {
    /// Uppercase method token, e.g. `GET`.
    pub method: String,
    /// Request target, kept opaque.
    pub target: String,
    /// Version number without the `HTTP/` prefix; always `1.1`.
    pub version: String,
}

/// A request being parsed, or fully parsed once [`Request::is_done`] holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub request_line: RequestLine,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    state: ParseState,
}

impl Default for Request {
    fn default() -> Self {
        Self::new()
    }
}

impl Request {
    /// An empty request in the `Initialized` state.
    pub fn new() -> Self {
        Self {
            request_line: RequestLine::default(),
            headers: HeaderMap::new(),
            body: Vec::new(),
            state: ParseState::Initialized,
        }
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == ParseState::Done
    }

    pub fn method(&self) -> &str {
        &self.request_line.method
    }

    pub fn target(&self) -> &str {
        &self.request_line.target
    }

    /// Parse as many tokens as `data` allows, returning the bytes consumed.
    ///
    /// Stops when a token needs more input or the request is done. Calling
    /// this on a done request fails with [`RequestError::AlreadyDone`].
    pub fn parse(&mut self, data: &[u8]) -> Result<usize, RequestError> {
        if self.is_done() {
            return Err(RequestError::AlreadyDone);
        }

        let mut parsed = 0;
        while !self.is_done() {
            let n = self.parse_single(&data[parsed..])?;
            if n == 0 && !self.is_done() {
                break;
            }
            parsed += n;
        }
        Ok(parsed)
    }

    fn parse_single(&mut self, data: &[u8]) -> Result<usize, RequestError> {
        match self.state {
            ParseState::Initialized => {
                let Some((request_line, n)) = parse_request_line(data)? else {
                    return Ok(0);
                };
                self.request_line = request_line;
                self.transition(ParseState::ParsingHeaders);
                Ok(n)
            }
            ParseState::ParsingHeaders => {
                let (n, done) = self.headers.parse(data)?;
                if done {
                    self.transition(ParseState::ParsingBody);
                }
                Ok(n)
            }
            ParseState::ParsingBody => {
                let Some(raw) = self.headers.get("content-length") else {
                    self.transition(ParseState::Done);
                    return Ok(0);
                };
                let content_length = parse_content_length(raw)?;

                self.body.extend_from_slice(data);
                if self.body.len() > content_length {
                    return Err(RequestError::BodyTooLong(content_length));
                }
                if self.body.len() == content_length {
                    self.transition(ParseState::Done);
                }
                Ok(data.len())
            }
            ParseState::Done => Err(RequestError::AlreadyDone),
        }
    }

    fn transition(&mut self, next: ParseState) {
        tracing::trace!(from = ?self.state, to = ?next, "Request parse state");
        self.state = next;
    }
}

fn parse_content_length(raw: &str) -> Result<usize, RequestError> {
    raw.parse::<usize>()
        .map_err(|_| RequestError::InvalidContentLength(raw.to_string()))
}

/// Parse the request line if a full line is buffered.
///
/// Returns the line and the bytes consumed including the terminator, or
/// `None` when no terminator has arrived yet.
fn parse_request_line(data: &[u8]) -> Result<Option<(RequestLine, usize)>, RequestError> {
    let Some(idx) = find_crlf(data) else {
        return Ok(None);
    };

    let line = std::str::from_utf8(&data[..idx]).map_err(|_| RequestError::RequestLineEncoding)?;
    let request_line = request_line_from_str(line)?;

    Ok(Some((request_line, idx + CRLF.len())))
}

fn request_line_from_str(line: &str) -> Result<RequestLine, RequestError> {
    let parts: Vec<&str> = line.split(' ').collect();
    let [method, target, version] = parts.as_slice() else {
        return Err(RequestError::RequestLineParts(line.to_string()));
    };

    if method.is_empty() || !method.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(RequestError::InvalidMethod(method.to_string()));
    }

    let Some(number) = version.strip_prefix("HTTP/") else {
        return Err(RequestError::MalformedVersion(version.to_string()));
    };
    if number != HTTP_VERSION {
        return Err(RequestError::UnsupportedVersion(number.to_string()));
    }

    Ok(RequestLine {
        method: method.to_string(),
        target: target.to_string(),
        version: number.to_string(),
    })
}
