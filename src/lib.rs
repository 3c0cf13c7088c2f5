//! # Tinysocks - Minimal SOCKS5 Forward Proxy
//!
//! Tinysocks accepts SOCKS5 clients, negotiates the "no authentication"
//! method, serves CONNECT requests for IPv4, IPv6 and domain targets, and
//! relays bytes between the client and the destination until either side
//! goes away. BIND and UDP ASSOCIATE are recognized and rejected.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tinysocks::config::ServerConfig;
//! use tinysocks::server::Server;
//! use tokio::sync::broadcast;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let server = Server::bind(ServerConfig::default()).await?;
//!     let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
//!
//!     server.run(shutdown_rx).await
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! SOCKS5 Client -> handshake -> dial -> relay <-> Target
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod server;
pub mod socks;
pub mod transport;

// Re-export commonly used items
pub use config::{load_config, Config, ServerConfig};
pub use error::{ProxyError, Socks5Error};
pub use server::{Server, SessionEvent};

/// Version of the Tinysocks library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the application
pub const NAME: &str = env!("CARGO_PKG_NAME");
