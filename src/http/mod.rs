//! HTTP/1.1 message handling over raw byte streams.
//!
//! # Data Flow
//! ```text
//! TCP connection (server.rs, one task per connection)
//!     → parser.rs (read into buffer.rs, feed request.rs)
//!     → request.rs (request line → headers.rs → Content-Length body)
//!     → Handler (decides the response)
//!     → response.rs (status line → headers → body | chunks + trailers)
//!     → connection closed
//! ```

pub mod buffer;
pub mod headers;
pub mod parser;
pub mod request;
pub mod response;
pub mod server;
pub mod status;

pub use headers::{HeaderError, HeaderMap};
pub use parser::{request_from_reader, RequestParser};
pub use request::{ParseState, Request, RequestError, RequestLine};
pub use response::{default_headers, trailers_from_headers, ResponseWriter, WriteError, WriterState};
pub use server::{serve, Handler, HttpServer, ServerError};
pub use status::{StatusCode, StatusError};
