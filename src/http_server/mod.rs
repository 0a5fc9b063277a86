//! REST mirror of the progress store
//!
//! Listens on `127.0.0.1:3001` by default and serves:
//! - `GET /api/health`
//! - `GET|POST /api/progress`, `GET|POST /api/sessions`
//! - `GET|PUT /api/settings`
//! - `GET /api/achievements`, `POST /api/achievements/check`
//! - `GET /api/export`, `POST /api/clear`
//!
//! Routing is a pure function over (method, path, query, body) so it can be
//! exercised without a socket; the tiny_http loop only does I/O.

mod handlers;

pub use handlers::{route, ApiResponse};

use std::io::Read;
use std::net::SocketAddr;
use std::thread;

use anyhow::{anyhow, Result};
use tiny_http::{Response, Server};
use tracing::{error, info};

use crate::stats::ProgressStore;

const MAX_BODY_BYTES: usize = 1024 * 1024; // 1 MiB

/// Bound REST server
pub struct HttpServer {
    server: Server,
    store: ProgressStore,
}

impl HttpServer {
    /// Bind to `addr` (`host:port`; port 0 picks a free one)
    pub fn bind(addr: &str, store: ProgressStore) -> Result<Self> {
        let server = Server::http(addr)
            .map_err(|e| anyhow!("Failed to start server on {}: {}", addr, e))?;
        Ok(Self { server, store })
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.server_addr().to_ip()
    }

    /// Serve requests on the current thread until the listener closes
    pub fn run(self) {
        if let Some(addr) = self.local_addr() {
            info!("[mathdrill:http] Server listening on http://{}", addr);
        }

        for mut request in self.server.incoming_requests() {
            let method = request.method().to_string();
            let url = request.url().to_string();
            let (path, query) = url.split_once('?').unwrap_or((url.as_str(), ""));

            let body = match read_request_body(&mut request) {
                Ok(body) => body,
                Err(response) => {
                    respond(request, response);
                    continue;
                }
            };

            let response = route(&self.store, &method, path, query, &body, chrono::Utc::now());
            if response.status >= 500 {
                error!("[mathdrill:http] {} {} -> {}", method, path, response.status);
            } else {
                info!("[mathdrill:http] {} {} -> {}", method, path, response.status);
            }
            respond(request, response);
        }
    }

    /// Serve requests on a background thread
    pub fn spawn(self) -> thread::JoinHandle<()> {
        thread::spawn(move || self.run())
    }
}

fn json_content_type() -> tiny_http::Header {
    tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).unwrap()
}

fn read_request_body(request: &mut tiny_http::Request) -> Result<String, ApiResponse> {
    let mut body = String::new();
    let mut reader = request.as_reader().take((MAX_BODY_BYTES + 1) as u64);
    if let Err(e) = reader.read_to_string(&mut body) {
        error!("[mathdrill:http] Failed to read body: {}", e);
        return Err(ApiResponse::error(400, "bad_request"));
    }

    if body.len() > MAX_BODY_BYTES {
        return Err(ApiResponse::error(413, "payload_too_large"));
    }

    Ok(body)
}

fn respond(request: tiny_http::Request, response: ApiResponse) {
    let body = serde_json::to_string(&response.body)
        .unwrap_or_else(|_| "{\"error\":\"serialize\"}".to_string());
    let response = Response::from_string(body)
        .with_status_code(response.status)
        .with_header(json_content_type());
    let _ = request.respond(response);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::TcpStream;

    fn raw_request(addr: SocketAddr, request: &str) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream.write_all(request.as_bytes()).unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        response
    }

    #[test]
    fn test_server_answers_health_over_tcp() {
        let server = HttpServer::bind("127.0.0.1:0", ProgressStore::in_memory().unwrap()).unwrap();
        let addr = server.local_addr().unwrap();
        server.spawn();

        let response = raw_request(
            addr,
            "GET /api/health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        );
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("application/json"));
        assert!(response.contains("\"status\":\"ok\""));
    }

    #[test]
    fn test_server_rejects_bad_json_over_tcp() {
        let server = HttpServer::bind("127.0.0.1:0", ProgressStore::in_memory().unwrap()).unwrap();
        let addr = server.local_addr().unwrap();
        server.spawn();

        let body = "{not json";
        let response = raw_request(
            addr,
            &format!(
                "POST /api/sessions HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            ),
        );
        assert!(response.starts_with("HTTP/1.1 400"));
    }
}
