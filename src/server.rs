//! SOCKS5 server
//!
//! Accepts inbound clients and runs one session task per connection:
//! handshake, destination dial, then relay.

use crate::config::ServerConfig;
use crate::socks::{handshake, relay, RelayStats, TargetAddr};
use crate::transport::{dial, SocketOpts};
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

/// Notifications about session progress
///
/// Delivered over the channel given to [`Server::with_events`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Handshake succeeded for `peer`, about to dial `target`
    Accepted {
        /// Client address
        peer: SocketAddr,
        /// Requested destination
        target: TargetAddr,
    },
    /// Destination connected, relay starting
    Established {
        /// Client address
        peer: SocketAddr,
        /// Requested destination
        target: TargetAddr,
    },
    /// Relay finished
    Closed {
        /// Client address
        peer: SocketAddr,
        /// Bytes moved in each direction, client to destination first
        stats: RelayStats,
    },
}

/// Sender half for [`SessionEvent`]s
///
/// The channel should be bounded. Events that do not fit are dropped, so a
/// slow observer never stalls or bloats a session.
pub type EventSender = mpsc::Sender<SessionEvent>;

/// SOCKS5 server bound to a listener
pub struct Server {
    listener: TcpListener,
    config: Arc<ServerConfig>,
    events: Option<EventSender>,
}

impl Server {
    /// Bind the listen address from `config`
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        let listener = TcpListener::bind(config.bind_addr())
            .await
            .with_context(|| format!("Failed to listen on {}", config.listen_addr))?;
        Ok(Self::from_listener(listener, config))
    }

    /// Serve on an already bound listener
    pub fn from_listener(listener: TcpListener, config: ServerConfig) -> Self {
        Server {
            listener,
            config: Arc::new(config),
            events: None,
        }
    }

    /// Report session progress on `events`
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .with_context(|| "Failed to read listener address")
    }

    /// Accept clients until `shutdown_rx` fires
    ///
    /// Accept errors are logged and the loop keeps going. Sessions already
    /// running are not interrupted by shutdown.
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<bool>) -> Result<()> {
        info!("SOCKS5 server listening on {}", self.local_addr()?);

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            warn!("Failed to accept connection: {}", e);
                            continue;
                        }
                    };

                    debug!("Accepted connection from {}", peer);

                    let session = Session::new(stream, peer);
                    let config = self.config.clone();
                    let events = self.events.clone();
                    tokio::spawn(async move {
                        if let Err(e) = session.run(&config, events.as_ref()).await {
                            debug!("Session {} ended: {:#}", peer, e);
                        }
                    });
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received, stopping server");
                    break;
                }
            }
        }

        Ok(())
    }
}

/// One accepted client connection
pub struct Session {
    stream: TcpStream,
    peer: SocketAddr,
}

impl Session {
    /// Wrap an accepted stream
    pub fn new(stream: TcpStream, peer: SocketAddr) -> Self {
        Session { stream, peer }
    }

    /// Run the session to completion
    ///
    /// Any failure before the relay drops the client connection without
    /// further replies; the handshake has already sent whatever reply was
    /// owed.
    pub async fn run(
        self,
        config: &ServerConfig,
        events: Option<&EventSender>,
    ) -> Result<RelayStats> {
        let Session { mut stream, peer } = self;
        let opts = SocketOpts::from_tcp_config(&config.tcp);

        if let Err(e) = opts.apply(&stream) {
            warn!("Failed to apply socket options to {}: {}", peer, e);
        }

        let target = handshake(&mut stream)
            .await
            .with_context(|| format!("SOCKS5 handshake with {} failed", peer))?;

        notify(
            events,
            SessionEvent::Accepted {
                peer,
                target: target.clone(),
            },
        );

        let remote = dial(&target, config.connect_timeout(), &opts).await?;

        info!("SOCKS5 tunnel established {} -> {}", peer, target);
        notify(
            events,
            SessionEvent::Established {
                peer,
                target: target.clone(),
            },
        );

        let stats = relay(stream, remote, config.buffer_size).await;

        debug!(
            "Session {} -> {} closed: sent={}, received={}",
            peer, target, stats.a_to_b, stats.b_to_a
        );
        notify(events, SessionEvent::Closed { peer, stats });

        Ok(stats)
    }
}

fn notify(events: Option<&EventSender>, event: SessionEvent) {
    if let Some(tx) = events {
        match tx.try_send(event) {
            Ok(()) | Err(TrySendError::Closed(_)) => {}
            Err(TrySendError::Full(event)) => {
                debug!("Event queue full, dropping {:?}", event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn test_config() -> ServerConfig {
        ServerConfig {
            listen_addr: "127.0.0.1:0".to_string(),
            connect_timeout: 2,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_server_bind_and_local_addr() {
        let server = Server::bind(test_config()).await.unwrap();
        let addr = server.local_addr().unwrap();
        assert!(addr.ip().is_loopback());
        assert!(addr.port() > 0);
    }

    #[tokio::test]
    async fn test_server_bind_invalid_addr() {
        let config = ServerConfig {
            listen_addr: "127.0.0.1:99999".to_string(),
            ..Default::default()
        };
        assert!(Server::bind(config).await.is_err());
    }

    #[tokio::test]
    async fn test_server_bind_host_name() {
        let config = ServerConfig {
            listen_addr: "localhost:0".to_string(),
            ..Default::default()
        };
        let server = Server::bind(config).await.unwrap();
        assert!(server.local_addr().unwrap().ip().is_loopback());
    }

    #[tokio::test]
    async fn test_server_bind_bare_port() {
        let config = ServerConfig {
            listen_addr: ":0".to_string(),
            ..Default::default()
        };
        let server = Server::bind(config).await.unwrap();
        assert!(server.local_addr().unwrap().ip().is_unspecified());
    }

    #[tokio::test]
    async fn test_server_stops_on_shutdown() {
        let server = Server::bind(test_config()).await.unwrap();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let handle = tokio::spawn(server.run(shutdown_rx));
        shutdown_tx.send(true).unwrap();

        let result = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("server did not stop")
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_session_dial_failure_closes_client() {
        let closed = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let dead_port = closed.local_addr().unwrap().port();
        drop(closed);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let mut client = TcpStream::connect(addr).await.unwrap();
        let (stream, peer) = listener.accept().await.unwrap();

        let (tx, mut rx) = mpsc::channel(8);
        let config = test_config();
        let session = tokio::spawn(async move {
            Session::new(stream, peer).run(&config, Some(&tx)).await
        });

        client.write_all(&[5, 1, 0]).await.unwrap();
        let mut method = [0u8; 2];
        client.read_exact(&mut method).await.unwrap();
        assert_eq!(method, [5, 0]);

        let mut request = vec![5, 1, 0, 1, 127, 0, 0, 1];
        request.extend_from_slice(&dead_port.to_be_bytes());
        client.write_all(&request).await.unwrap();

        let mut rest = Vec::new();
        client.read_to_end(&mut rest).await.unwrap();
        assert_eq!(rest, vec![5, 0, 0, 1, 0, 0, 0, 0, 0, 0]);

        assert!(session.await.unwrap().is_err());
        assert!(matches!(
            rx.recv().await,
            Some(SessionEvent::Accepted { .. })
        ));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_session_survives_full_event_queue() {
        let upstream = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let target = upstream.local_addr().unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let mut client = TcpStream::connect(addr).await.unwrap();
        let (stream, peer) = listener.accept().await.unwrap();

        // Room for one event and nobody draining it
        let (tx, mut rx) = mpsc::channel(1);
        let config = test_config();
        let session = tokio::spawn(async move {
            Session::new(stream, peer).run(&config, Some(&tx)).await
        });

        client.write_all(&[5, 1, 0]).await.unwrap();
        let mut method = [0u8; 2];
        client.read_exact(&mut method).await.unwrap();
        assert_eq!(method, [5, 0]);

        let mut request = vec![5, 1, 0, 1, 127, 0, 0, 1];
        request.extend_from_slice(&target.port().to_be_bytes());
        client.write_all(&request).await.unwrap();
        let mut reply = [0u8; 10];
        client.read_exact(&mut reply).await.unwrap();
        assert_eq!(reply, [5, 0, 0, 1, 0, 0, 0, 0, 0, 0]);

        let (mut remote, _) = upstream.accept().await.unwrap();
        client.write_all(b"data").await.unwrap();
        let mut buf = [0u8; 4];
        remote.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"data");

        drop(client);
        drop(remote);

        let stats = tokio::time::timeout(Duration::from_secs(2), session)
            .await
            .expect("session stalled on the event queue")
            .unwrap()
            .unwrap();
        assert_eq!(stats.a_to_b, 4);

        assert!(matches!(
            rx.recv().await,
            Some(SessionEvent::Accepted { .. })
        ));
        assert!(rx.try_recv().is_err());
    }
}
