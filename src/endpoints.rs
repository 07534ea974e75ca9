//! Endpoint server for exposing metrics

use anyhow::Result;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::metrics::metrics;

fn http_response(status: &str, content_type: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        content_type,
        body.len(),
        body
    )
}

/// Serve `/metrics` in Prometheus text format and `/health` as a liveness probe
pub async fn endpoint_server(port: u16) -> Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;
    serve(listener).await
}

pub async fn serve(listener: TcpListener) -> Result<()> {
    tracing::info!("Metrics endpoint listening on {}", listener.local_addr()?);

    loop {
        match listener.accept().await {
            Ok((mut socket, _addr)) => {
                tokio::spawn(async move {
                    let mut buf = [0; 1024];
                    let n = match socket.read(&mut buf).await {
                        Ok(n) => n,
                        Err(e) => {
                            tracing::error!("Failed to read from socket: {}", e);
                            return;
                        }
                    };

                    let request = String::from_utf8_lossy(&buf[..n]);
                    let path = request.split_whitespace().nth(1).unwrap_or("/");
                    let response = match path {
                        "/metrics" => match metrics().render() {
                            Ok(body) => http_response("200 OK", "text/plain; version=0.0.4", &body),
                            Err(e) => http_response("500 Internal Server Error", "text/plain", &e.to_string()),
                        },
                        "/health" => http_response("200 OK", "text/plain", "ok"),
                        _ => http_response("404 Not Found", "text/plain", "not found"),
                    };

                    if let Err(e) = socket.write_all(response.as_bytes()).await {
                        tracing::error!("Failed to write response: {}", e);
                    }
                });
            }
            Err(e) => {
                tracing::error!("Failed to accept connection: {}", e);
            }
        }
    }
}
