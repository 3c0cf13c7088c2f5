//! Outbound TCP dialing
//!
//! Opens the destination connection for a successful CONNECT request.

use super::SocketOpts;
use crate::error::ProxyError;
use crate::socks::TargetAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::{debug, warn};

/// Connect to a SOCKS5 target with a bounded connect timeout
///
/// Domain targets are resolved here, not during the handshake. An empty
/// domain never dials the local host. Socket options are applied best
/// effort once the connection is up.
pub async fn dial(
    target: &TargetAddr,
    connect_timeout: Duration,
    opts: &SocketOpts,
) -> Result<TcpStream, ProxyError> {
    if matches!(target, TargetAddr::Domain(domain, _) if domain.is_empty()) {
        return Err(ProxyError::Connection(format!(
            "Refusing to connect to {}: empty domain",
            target
        )));
    }

    let connect = async {
        match target {
            TargetAddr::Ip(addr) => TcpStream::connect(*addr).await,
            TargetAddr::Domain(domain, port) => TcpStream::connect((domain.as_str(), *port)).await,
        }
    };

    let stream = tokio::time::timeout(connect_timeout, connect)
        .await
        .map_err(|_| ProxyError::Timeout(format!("Connection timeout to {}", target)))?
        .map_err(|e| ProxyError::Connection(format!("Failed to connect to {}: {}", target, e)))?;

    if let Err(e) = opts.apply(&stream) {
        warn!("Failed to apply socket options: {}", e);
    }

    debug!("TCP connection established to {}", target);

    Ok(stream)
}
