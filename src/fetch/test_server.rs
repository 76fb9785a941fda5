//! Minimal HTTP/1.1 server standing in for remote endpoints in tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// A canned response.
#[derive(Debug, Clone)]
pub(crate) struct Canned {
    pub status: u16,
    pub body: Vec<u8>,
}

impl Canned {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: Vec::new(),
        }
    }
}

type Routes = HashMap<String, Vec<Canned>>;

/// Handle to a running test server.
pub(crate) struct TestServer {
    pub base_url: String,
    routes: Arc<Mutex<Routes>>,
    requests: Arc<AtomicUsize>,
}

impl TestServer {
    /// Start serving on an ephemeral local port.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let routes: Arc<Mutex<Routes>> = Arc::default();
        let requests = Arc::new(AtomicUsize::new(0));

        let server_routes = routes.clone();
        let server_requests = requests.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                server_requests.fetch_add(1, Ordering::SeqCst);
                let routes = server_routes.clone();
                tokio::spawn(handle(socket, routes));
            }
        });

        Self {
            base_url,
            routes,
            requests,
        }
    }

    /// Register responses for `path`, served in order; the last one repeats.
    pub fn route(&self, path: &str, responses: Vec<Canned>) {
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_string(), responses);
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Number of connections accepted so far.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

async fn handle(mut socket: TcpStream, routes: Arc<Mutex<Routes>>) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }

    let request = String::from_utf8_lossy(&buf);
    let path = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();

    let canned = {
        let mut routes = routes.lock().unwrap();
        match routes.get_mut(&path) {
            Some(responses) if responses.len() > 1 => responses.remove(0),
            Some(responses) => responses[0].clone(),
            None => Canned::status(404),
        }
    };

    let head = format!(
        "HTTP/1.1 {} Test\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        canned.status,
        canned.body.len()
    );
    let _ = socket.write_all(head.as_bytes()).await;
    let _ = socket.write_all(&canned.body).await;
    let _ = socket.shutdown().await;
}
