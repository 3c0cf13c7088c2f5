//! Test utilities for Tinysocks
//!
//! This module provides common test utilities used across integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use tinysocks::config::ServerConfig;
use tinysocks::server::{Server, SessionEvent};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};

/// Create a test TCP listener on an available port
pub async fn create_test_listener() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// Spawn a server that echoes everything back until its peer closes
pub async fn spawn_echo_server() -> SocketAddr {
    let (listener, addr) = create_test_listener().await;

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                loop {
                    match stream.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            if stream.write_all(&buf[..n]).await.is_err() {
                                break;
                            }
                        }
                    }
                }
            });
        }
    });

    addr
}

/// A proxy running on a loopback port
pub struct TestProxy {
    /// Address clients connect to
    pub addr: SocketAddr,
    /// Session notifications
    pub events: mpsc::Receiver<SessionEvent>,
    /// Fire to stop accepting
    pub shutdown_tx: broadcast::Sender<bool>,
}

/// Start a proxy with test-friendly defaults
pub async fn spawn_proxy() -> TestProxy {
    let config = ServerConfig {
        listen_addr: "127.0.0.1:0".to_string(),
        connect_timeout: 2,
        ..Default::default()
    };

    let (events_tx, events) = mpsc::channel(64);
    let server = Server::bind(config).await.unwrap().with_events(events_tx);
    let addr = server.local_addr().unwrap();

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(server.run(shutdown_rx));

    TestProxy {
        addr,
        events,
        shutdown_tx,
    }
}

/// Connect to the proxy and finish method negotiation
pub async fn connect_and_negotiate(proxy: SocketAddr) -> TcpStream {
    let mut stream = TcpStream::connect(proxy).await.unwrap();
    stream
        .write_all(&socks5_mock::create_auth_request_no_auth())
        .await
        .unwrap();

    let mut reply = [0u8; 2];
    stream.read_exact(&mut reply).await.unwrap();
    assert_eq!(reply, [5, 0]);

    stream
}

/// Mock SOCKS5 handshake data
pub mod socks5_mock {
    use tinysocks::socks::*;

    /// Create a no-auth method selection request
    pub fn create_auth_request_no_auth() -> Vec<u8> {
        vec![SOCKS5_VERSION, 1, SOCKS5_AUTH_METHOD_NONE]
    }

    /// Create a request for `target` with the given command
    pub fn create_request(cmd: u8, target: &TargetAddr) -> Vec<u8> {
        let mut request = vec![SOCKS5_VERSION, cmd, SOCKS5_RESERVED];
        request.extend_from_slice(&target.to_bytes());
        request
    }

    /// Create a connect command to IPv4 address
    pub fn create_connect_ipv4(ip: [u8; 4], port: u16) -> Vec<u8> {
        create_request(
            SOCKS5_CMD_TCP_CONNECT,
            &TargetAddr::ipv4(ip.into(), port),
        )
    }

    /// Create a connect command to domain
    pub fn create_connect_domain(domain: &str, port: u16) -> Vec<u8> {
        create_request(
            SOCKS5_CMD_TCP_CONNECT,
            &TargetAddr::domain(domain.to_string(), port),
        )
    }
}
