//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, Request, StatusCode},
    response::IntoResponse,
    Router,
};
use quickstart_proxy::config::{InstanceConfig, ProxyConfig, VerbosityHandle};
use quickstart_proxy::{ProxyInstance, Shutdown};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

/// A request as the backend saw it.
#[derive(Debug, Clone)]
pub struct Captured {
    pub method: String,
    pub path_and_query: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

pub type Recorded = Arc<Mutex<Vec<Captured>>>;

#[derive(Clone)]
struct BackendState {
    recorded: Recorded,
    status: StatusCode,
    body: &'static str,
}

/// Start a backend that records every request and answers with `status` / `body`.
///
/// It also sends its own `Access-Control-Allow-Origin`, which the proxy must replace.
pub async fn start_recording_backend(
    status: StatusCode,
    body: &'static str,
) -> (SocketAddr, Recorded) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let recorded: Recorded = Arc::new(Mutex::new(Vec::new()));

    let state = BackendState {
        recorded: recorded.clone(),
        status,
        body,
    };
    let app = Router::new().fallback(record).with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (addr, recorded)
}

async fn record(State(state): State<BackendState>, request: Request<Body>) -> impl IntoResponse {
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    state.recorded.lock().unwrap().push(Captured {
        method: parts.method.to_string(),
        path_and_query: parts
            .uri
            .path_and_query()
            .map(|pq| pq.to_string())
            .unwrap_or_default(),
        headers: parts.headers,
        body,
    });

    (
        state.status,
        [
            ("content-type", "application/json"),
            ("access-control-allow-origin", "https://backend.example"),
        ],
        state.body,
    )
}

/// Start a raw backend answering every connection with a chunked response.
pub async fn start_chunked_backend(chunks: &'static [&'static str]) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut head = [0u8; 4096];
                let _ = tokio::io::AsyncReadExt::read(&mut socket, &mut head).await;

                let mut response = String::from(
                    "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n",
                );
                for chunk in chunks {
                    response.push_str(&format!("{:x}\r\n{}\r\n", chunk.len(), chunk));
                }
                response.push_str("0\r\n\r\n");
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// A port nothing listens on.
pub async fn unused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

pub fn test_config(name: &str, target_port: u16, admin: bool) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.bind_host = "127.0.0.1".into();
    config.observability.ansi = false;
    config.instances = vec![InstanceConfig::new(name, 1, target_port, admin)];
    config
}

/// Build and serve a single instance on an ephemeral port.
pub async fn start_proxy(
    config: &ProxyConfig,
    verbosity: VerbosityHandle,
) -> (SocketAddr, Shutdown) {
    let instance = ProxyInstance::new(config.instances[0].clone(), config, verbosity).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = instance.serve(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
