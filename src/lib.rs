//! HTTP/1.1 server built directly on TCP byte streams.
//!
//! Requests are parsed incrementally from whatever the socket delivers and
//! responses are written through a [`ResponseWriter`] that only accepts calls
//! in protocol order.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::ServerConfig;
pub use http::{
    default_headers, serve, Handler, HeaderMap, HttpServer, Request, ResponseWriter, StatusCode,
};
