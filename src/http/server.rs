//! Connection-accepting HTTP server.
//!
//! # Responsibilities
//! - Bind the listener and run the accept loop in its own task
//! - Spawn one task per accepted connection
//! - Parse the request, then hand it and a response writer to the handler
//! - Answer unparseable requests with 400 without calling the handler
//! - Close every connection after its single response
//!
//! # Design Decisions
//! - `close()` stops accepting but never aborts connections in flight
//! - The closed flag separates a deliberate close from a failing `accept`;
//!   the latter is logged and the loop keeps going
//! - The handler alone drives the writer to completion; a handler that stops
//!   early leaves a truncated response on the wire

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::task::{JoinError, JoinHandle};
use tracing::Instrument;

use crate::config::validation::{validate_config, ValidationError};
use crate::config::{ListenerConfig, ServerConfig};
use crate::http::parser::RequestParser;
use crate::http::request::{Request, RequestError};
use crate::http::response::{default_headers, ResponseWriter, WriteError};
use crate::http::status::StatusCode;
use crate::lifecycle::Shutdown;
use crate::net::connection::{ConnectionGuard, ConnectionTracker};
use crate::net::listener::{ConnectionPermit, Listener, ListenerError};

/// Produces the response for one parsed request.
///
/// Implementations must drive `writer` from its initial state to done:
/// status line, headers, then a body (plain, or chunks plus trailers).
pub trait Handler: Send + Sync + 'static {
    fn handle<W>(
        &self,
        writer: &mut ResponseWriter<W>,
        request: &Request,
    ) -> impl Future<Output = ()> + Send
    where
        W: AsyncWrite + Unpin + Send;
}

/// Errors starting or stopping the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid configuration: {}", join_errors(.0))]
    Config(Vec<ValidationError>),

    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("failed to read local address: {0}")]
    LocalAddr(#[source] std::io::Error),

    #[error("accept loop terminated abnormally: {0}")]
    Join(#[from] JoinError),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A running server. Dropping it does not stop the accept loop; call [`HttpServer::close`].
#[derive(Debug)]
pub struct HttpServer {
    local_addr: SocketAddr,
    shutdown: Shutdown,
    connections: ConnectionTracker,
    accept_task: Option<JoinHandle<()>>,
}

/// Bind `0.0.0.0:<port>` with default settings and start serving.
pub async fn serve<H: Handler>(port: u16, handler: H) -> Result<HttpServer, ServerError> {
    let config = ServerConfig {
        listener: ListenerConfig::for_port(port),
        ..ServerConfig::default()
    };
    HttpServer::serve(&config, handler).await
}

impl HttpServer {
    /// Validate `config`, bind the configured listener and start the accept loop.
    pub async fn serve<H: Handler>(config: &ServerConfig, handler: H) -> Result<Self, ServerError> {
        validate_config(config).map_err(ServerError::Config)?;

        let listener = Listener::bind(&config.listener).await?;
        let local_addr = listener.local_addr().map_err(ServerError::LocalAddr)?;

        let shutdown = Shutdown::new();
        let connections = ConnectionTracker::new();

        let accept_loop = AcceptLoop {
            listener,
            handler: Arc::new(handler),
            shutdown: shutdown.clone(),
            // Subscribe before spawning so an immediate close() is not missed.
            shutdown_rx: shutdown.subscribe(),
            connections: connections.clone(),
            read_buffer_size: config.http.read_buffer_size,
        };
        let accept_task = tokio::spawn(accept_loop.run());

        tracing::info!(address = %local_addr, "HTTP server started");

        Ok(Self {
            local_addr,
            shutdown,
            connections,
            accept_task: Some(accept_task),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Connections accepted and not yet closed.
    pub fn active_connections(&self) -> u64 {
        self.connections.active_count()
    }

    /// Stop accepting and close the listening socket.
    ///
    /// Returns once the accept loop has exited. Connections already accepted
    /// keep running; use [`HttpServer::wait_idle`] to wait for them.
    pub async fn close(&mut self) -> Result<(), ServerError> {
        self.shutdown.trigger();
        if let Some(task) = self.accept_task.take() {
            task.await?;
        }
        tracing::info!(address = %self.local_addr, "HTTP server closed");
        Ok(())
    }

    /// Wait until every accepted connection has been closed.
    pub async fn wait_idle(&self) {
        self.connections.wait_idle().await;
    }
}

struct AcceptLoop<H> {
    listener: Listener,
    handler: Arc<H>,
    shutdown: Shutdown,
    shutdown_rx: broadcast::Receiver<()>,
    connections: ConnectionTracker,
    read_buffer_size: usize,
}

impl<H: Handler> AcceptLoop<H> {
    async fn run(mut self) {
        loop {
            let accepted = tokio::select! {
                biased;
                _ = self.shutdown_rx.recv() => break,
                accepted = self.listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, peer_addr, permit)) => {
                    let guard = self.connections.track();
                    let span = tracing::info_span!(
                        "connection",
                        connection_id = %guard.id(),
                        peer_addr = %peer_addr,
                    );
                    let connection = Connection {
                        handler: Arc::clone(&self.handler),
                        read_buffer_size: self.read_buffer_size,
                        _guard: guard,
                        _permit: permit,
                    };
                    tokio::spawn(connection.serve(stream).instrument(span));
                }
                Err(e) => {
                    if self.shutdown.is_triggered() {
                        break;
                    }
                    tracing::warn!(error = %e, "Failed to accept connection");
                }
            }
        }

        tracing::debug!("Accept loop stopped");
        // The listener is dropped with `self`, closing the socket.
    }
}

/// Everything one connection task owns. The guard and permit are released on drop.
struct Connection<H> {
    handler: Arc<H>,
    read_buffer_size: usize,
    _guard: ConnectionGuard,
    _permit: ConnectionPermit,
}

impl<H: Handler> Connection<H> {
    async fn serve(self, stream: TcpStream) {
        let (reader, writer) = stream.into_split();
        let mut writer = ResponseWriter::new(writer);

        match RequestParser::with_buffer_size(reader, self.read_buffer_size)
            .parse()
            .await
        {
            Ok(request) => {
                tracing::debug!(
                    method = %request.method(),
                    request_target = %request.target(),
                    body_len = request.body.len(),
                    "Request parsed"
                );
                self.handler.handle(&mut writer, &request).await;
                if !writer.is_done() {
                    tracing::debug!(state = ?writer.state(), "Handler left response unfinished");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Rejecting malformed request");
                if let Err(e) = write_bad_request(&mut writer, &e).await {
                    tracing::warn!(error = %e, "Failed to send 400 response");
                }
            }
        }

        let mut sink = writer.into_inner();
        if let Err(e) = sink.shutdown().await {
            tracing::debug!(error = %e, "Error closing connection");
        }
    }
}

/// Respond with 400 and the parse error text as a plain-text body.
async fn write_bad_request<W>(
    writer: &mut ResponseWriter<W>,
    error: &RequestError,
) -> Result<(), WriteError>
where
    W: AsyncWrite + Unpin,
{
    let body = error.to_string();
    writer.write_status_line(StatusCode::BadRequest).await?;
    writer.write_headers(&default_headers(body.len())).await?;
    writer.write_body(body.as_bytes()).await?;
    Ok(())
}
