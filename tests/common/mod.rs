//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use request_shield::lifecycle::startup;
use request_shield::{Registry, ShieldConfig, Shutdown};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Start a backend that answers every request with its own request line,
/// followed by the `x-request-id` it received (or `-`).
#[allow(dead_code)]
pub async fn start_echo_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut buf = Vec::new();
                        let mut chunk = [0u8; 1024];
                        while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                            match socket.read(&mut chunk).await {
                                Ok(0) | Err(_) => return,
                                Ok(n) => buf.extend_from_slice(&chunk[..n]),
                            }
                        }
                        let head = String::from_utf8_lossy(&buf).to_string();
                        let request_line = head.lines().next().unwrap_or_default().to_string();
                        let request_id = head
                            .lines()
                            .find_map(|l| {
                                let (name, value) = l.split_once(':')?;
                                name.eq_ignore_ascii_case("x-request-id").then(|| value.trim().to_string())
                            })
                            .unwrap_or_else(|| "-".to_string());
                        let body = format!("{}\n{}", request_line, request_id);
                        let response = format!(
                            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// A running shield instance bound to an ephemeral port.
#[allow(dead_code)]
pub struct TestShield {
    pub addr: SocketAddr,
    pub registry: Arc<Registry>,
    pub rules_path: PathBuf,
    shutdown: Shutdown,
}

#[allow(dead_code)]
impl TestShield {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn admin(&self, path: &str) -> String {
        self.url(&format!("/api/waf{}", path))
    }

    pub fn stop(&self) {
        self.shutdown.trigger();
    }
}

impl Drop for TestShield {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start a shield whose rules file lives at `rules_path`.
pub async fn start_shield(rules_path: PathBuf, upstream: Option<SocketAddr>) -> TestShield {
    let mut config = ShieldConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.rules.file = rules_path.to_string_lossy().to_string();
    config.upstream.address = upstream.map(|a| a.to_string());

    let registry = startup::build_registry(&config.rules);
    let (server, listener) = startup::prepare(config, registry.clone()).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    // Give the accept loop a moment.
    tokio::time::sleep(Duration::from_millis(50)).await;

    TestShield {
        addr,
        registry,
        rules_path,
        shutdown,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
