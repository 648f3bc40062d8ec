//! raw-http demo server.
//!
//! Serves a handful of fixed pages and a chunked stream with trailers.
//!
//! ```text
//! raw-http [--config server.toml] [--port 42069]
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use raw_http::config::{load_config, ServerConfig};
use raw_http::lifecycle::signals::wait_for_shutdown_signal;
use raw_http::observability::init_logging;
use raw_http::HttpServer;

mod routes;

#[derive(Parser)]
#[command(name = "raw-http")]
#[command(about = "Minimal HTTP/1.1 server written directly on TCP", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on, overriding the configured bind address's port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(port) = cli.port {
        let mut addr: SocketAddr = config.listener.bind_address.parse()?;
        addr.set_port(port);
        config.listener.bind_address = addr.to_string();
    }

    init_logging(&config.observability)?;

    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        read_buffer_size = config.http.read_buffer_size,
        "Configuration loaded"
    );

    let mut server = HttpServer::serve(&config, routes::DemoRoutes).await?;

    wait_for_shutdown_signal().await?;

    server.close().await?;
    server.wait_idle().await;

    tracing::info!("Shutdown complete");
    Ok(())
}
