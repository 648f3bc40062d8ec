//! Demo request handler for the binary.

use sha2::{Digest, Sha256};
use tokio::io::AsyncWrite;

use raw_http::http::response::{trailers_from_headers, WriteError};
use raw_http::{default_headers, Handler, Request, ResponseWriter, StatusCode};

/// Upper bound for `/stream/<n>`.
const MAX_STREAM_LINES: usize = 10_000;

const OK_PAGE: &str = r#"<html>
  <head>
    <title>200 OK</title>
  </head>
  <body>
    <h1>Success!</h1>
    <p>Your request was an absolute banger.</p>
  </body>
</html>
"#;

const BAD_REQUEST_PAGE: &str = r#"<html>
  <head>
    <title>400 Bad Request</title>
  </head>
  <body>
    <h1>Bad Request</h1>
    <p>Your request honestly kinda sucked.</p>
  </body>
</html>
"#;

const SERVER_ERROR_PAGE: &str = r#"<html>
  <head>
    <title>500 Internal Server Error</title>
  </head>
  <body>
    <h1>Internal Server Error</h1>
    <p>Okay, you know what? This one is on me.</p>
  </body>
</html>
"#;

const NOT_FOUND_PAGE: &str = r#"<html>
  <head>
    <title>404 Not Found</title>
  </head>
  <body>
    <h1>Not Found</h1>
    <p>Nothing lives here.</p>
  </body>
</html>
"#;

/// Routes:
/// - `/` → 200 page
/// - `/yourproblem` → 400 page
/// - `/myproblem` → 500 page
/// - `/stream/<n>` → `n` lines, chunked, with SHA-256 and length trailers
/// - anything else → 404 page
pub struct DemoRoutes;

impl Handler for DemoRoutes {
    async fn handle<W>(&self, writer: &mut ResponseWriter<W>, request: &Request)
    where
        W: AsyncWrite + Unpin + Send,
    {
        let target = request.target();
        let result = match target {
            "/" => html(writer, StatusCode::Ok, OK_PAGE).await,
            "/yourproblem" => html(writer, StatusCode::BadRequest, BAD_REQUEST_PAGE).await,
            "/myproblem" => html(writer, StatusCode::InternalServerError, SERVER_ERROR_PAGE).await,
            _ => match target.strip_prefix("/stream/").map(str::parse::<usize>) {
                Some(Ok(lines)) if lines <= MAX_STREAM_LINES => stream_lines(writer, lines).await,
                Some(_) => html(writer, StatusCode::BadRequest, BAD_REQUEST_PAGE).await,
                None => html(writer, StatusCode::NotFound, NOT_FOUND_PAGE).await,
            },
        };

        if let Err(e) = result {
            tracing::warn!(request_target = %target, error = %e, "Failed to write response");
        }
    }
}

async fn html<W>(writer: &mut ResponseWriter<W>, status: StatusCode, page: &str) -> Result<(), WriteError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_status_line(status).await?;

    let mut headers = default_headers(page.len());
    headers.update("content-type", "text/html");
    writer.write_headers(&headers).await?;

    writer.write_body(page.as_bytes()).await?;
    Ok(())
}

/// Stream `count` numbered lines, one chunk each, then trailers over the full body.
async fn stream_lines<W>(writer: &mut ResponseWriter<W>, count: usize) -> Result<(), WriteError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_status_line(StatusCode::Ok).await?;

    let mut headers = default_headers(0);
    headers.delete("content-length");
    headers.set("transfer-encoding", "chunked");
    headers.set("trailer", "X-Content-SHA256, X-Content-Length");
    writer.write_headers(&headers).await?;

    let mut hasher = Sha256::new();
    let mut total = 0;
    for i in 0..count {
        let line = format!("{i}: the quick brown fox jumps over the lazy dog\n");
        hasher.update(line.as_bytes());
        total += writer.write_chunked_body(line.as_bytes()).await?;
    }
    writer.write_chunked_body_done().await?;

    tracing::debug!(chunks = count, bytes = total, "Streamed chunked body");

    let mut trailers = trailers_from_headers(&headers);
    trailers.update("X-Content-SHA256", &format!("{:x}", hasher.finalize()));
    trailers.update("X-Content-Length", &total.to_string());
    writer.write_trailers(&trailers).await
}
