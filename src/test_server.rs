//! Local HTTP server answering with canned pages, for exercising the real
//! `reqwest` code paths in tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Requests the server has seen, by path, in arrival order.
#[derive(Clone, Default)]
pub struct Hits(Arc<Mutex<Vec<String>>>);

impl Hits {
    pub fn paths(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// A running canned-response server.
pub struct CannedServer {
    pub base_url: String,
    pub hits: Hits,
}

impl CannedServer {
    /// Absolute URL for `path` on this server.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }
}

/// Client for talking to a [`CannedServer`], bypassing any proxy from the environment.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .unwrap()
}

/// Bind an ephemeral port and serve `routes` (`path`, status, body).
///
/// Paths without a route get a 404 page.
pub async fn serve(routes: &[(&str, u16, &str)]) -> CannedServer {
    let routes: Arc<HashMap<String, (u16, String)>> = Arc::new(
        routes
            .iter()
            .map(|(path, status, body)| (path.to_string(), (*status, body.to_string())))
            .collect(),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Hits::default();

    let log = hits.clone();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(respond(socket, routes.clone(), log.clone()));
        }
    });

    CannedServer {
        base_url: format!("http://{addr}/"),
        hits,
    }
}

async fn respond(mut socket: TcpStream, routes: Arc<HashMap<String, (u16, String)>>, hits: Hits) {
    let mut request = Vec::new();
    let mut chunk = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => request.extend_from_slice(&chunk[..n]),
        }
    }

    let head = String::from_utf8_lossy(&request);
    let path = head.split_whitespace().nth(1).unwrap_or("/").to_string();
    hits.0.lock().unwrap().push(path.clone());

    let (status, body) = routes
        .get(&path)
        .cloned()
        .unwrap_or_else(|| (404, "<html><body><h1>Page not found</h1></body></html>".to_string()));
    let reason = match status {
        200 => "OK",
        404 => "Not Found",
        _ => "Error",
    };
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}
