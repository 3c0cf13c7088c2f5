//! SOCKS5 reply builder
//!
//! Constructs SOCKS5 reply messages.

use crate::error::Socks5ReplyCode;
use crate::socks::consts::*;
use std::io;
use std::net::{Ipv4Addr, SocketAddrV4};
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// A SOCKS5 reply
///
/// # SOCKS5 Reply Format
///
/// ```text
/// +----+-----+-------+------+----------+----------+
/// |VER | REP |  RSV  | ATYP | BND.ADDR | BND.PORT |
/// +----+-----+-------+------+----------+----------+
/// | 1  |  1  | X'00' |  1   | Variable |    2     |
/// +----+-----+-------+------+----------+----------+
/// ```
///
/// BIND and UDP ASSOCIATE are never served, so the bound address is always
/// the zero IPv4 address and port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reply {
    /// Reply status code
    pub code: Socks5ReplyCode,
    /// Bound address reported to the client
    pub bind_addr: SocketAddrV4,
}

impl Reply {
    /// Create a reply with the zero bound address
    pub fn new(code: Socks5ReplyCode) -> Self {
        Reply {
            code,
            bind_addr: SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0),
        }
    }

    /// Encode the reply as wire bytes
    pub fn to_bytes(&self) -> [u8; 10] {
        let mut reply = [0u8; 10];
        reply[0] = SOCKS5_VERSION;
        reply[1] = self.code.into();
        reply[2] = SOCKS5_RESERVED;
        reply[3] = SOCKS5_ADDR_TYPE_IPV4;
        reply[4..8].copy_from_slice(&self.bind_addr.ip().octets());
        reply[8..10].copy_from_slice(&self.bind_addr.port().to_be_bytes());
        reply
    }
}

/// Build and send a SOCKS5 reply with the given status code
pub async fn send_reply<S>(stream: &mut S, code: Socks5ReplyCode) -> io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    stream.write_all(&Reply::new(code).to_bytes()).await?;
    stream.flush().await
}

/// Send a success reply
pub async fn send_success<S>(stream: &mut S) -> io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    send_reply(stream, Socks5ReplyCode::Succeeded).await
}

/// Send a "command not supported" reply
pub async fn send_command_not_supported<S>(stream: &mut S) -> io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    send_reply(stream, Socks5ReplyCode::CommandNotSupported).await
}
