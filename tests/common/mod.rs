//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use raw_http::config::{HttpConfig, ListenerConfig, ServerConfig};
use raw_http::{default_headers, Handler, HttpServer, Request, ResponseWriter, StatusCode};
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

/// Start a server on an ephemeral localhost port.
pub async fn start_server<H: Handler>(handler: H) -> HttpServer {
    let config = ServerConfig {
        listener: ListenerConfig {
            bind_address: "127.0.0.1:0".to_string(),
            max_connections: 64,
        },
        // Small on purpose so requests exercise buffer growth.
        http: HttpConfig { read_buffer_size: 8 },
        ..ServerConfig::default()
    };
    HttpServer::serve(&config, handler).await.unwrap()
}

/// Send `request`, half-close, and read everything until the server closes.
pub async fn send_raw(addr: SocketAddr, request: &[u8]) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();
    stream.shutdown().await.unwrap();
    read_to_close(&mut stream).await
}

/// Send `request` one byte at a time with a short pause between writes.
pub async fn send_trickle(addr: SocketAddr, request: &[u8]) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.set_nodelay(true).unwrap();
    for byte in request {
        stream.write_all(std::slice::from_ref(byte)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    read_to_close(&mut stream).await
}

pub async fn read_to_close(stream: &mut TcpStream) -> String {
    let mut response = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut response))
        .await
        .expect("server did not close the connection")
        .unwrap();
    String::from_utf8(response).unwrap()
}

/// Split a raw response into head and body at the first blank line.
pub fn split_response(response: &str) -> (&str, &str) {
    response.split_once("\r\n\r\n").expect("response has no header block")
}

/// Responds `200` with `"<METHOD> <target> <body>"` and counts invocations.
#[derive(Clone, Default)]
pub struct EchoHandler {
    pub calls: Arc<AtomicUsize>,
}

impl Handler for EchoHandler {
    async fn handle<W>(&self, writer: &mut ResponseWriter<W>, request: &Request)
    where
        W: AsyncWrite + Unpin + Send,
    {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let body = format!(
            "{} {} {}",
            request.method(),
            request.target(),
            String::from_utf8_lossy(&request.body)
        );
        writer.write_status_line(StatusCode::Ok).await.unwrap();
        writer
            .write_headers(&default_headers(body.len()))
            .await
            .unwrap();
        writer.write_body(body.as_bytes()).await.unwrap();
    }
}
