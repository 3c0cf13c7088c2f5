//! SOCKS5 request parser
//!
//! Parses SOCKS5 connection requests from the client.

use crate::error::Socks5Error;
use crate::socks::consts::*;
use crate::socks::types::{ConnectRequest, TargetAddr};
use std::net::{Ipv4Addr, Ipv6Addr};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

/// Parse a SOCKS5 request from the stream
///
/// # SOCKS5 Request Format
///
/// ```text
/// +----+-----+-------+------+----------+----------+
/// |VER | CMD |  RSV  | ATYP | DST.ADDR | DST.PORT |
/// +----+-----+-------+------+----------+----------+
/// | 1  |  1  | X'00' |  1   | Variable |    2     |
/// +----+-----+-------+------+----------+----------+
/// ```
///
/// The command byte is not validated here; the caller decides how to answer
/// commands other than CONNECT. An unknown address type stops parsing right
/// after the header so no address or port bytes are consumed.
pub async fn parse_request<S>(stream: &mut S) -> Result<ConnectRequest, Socks5Error>
where
    S: AsyncRead + Unpin,
{
    // Read: VER CMD RSV ATYP
    let mut header = [0u8; 4];
    stream.read_exact(&mut header).await?;

    let [version, cmd, reserved, addr_type] = header;

    if version != SOCKS5_VERSION {
        return Err(Socks5Error::UnsupportedVersion(version));
    }

    if reserved != SOCKS5_RESERVED {
        return Err(Socks5Error::InvalidReserved(reserved));
    }

    let target = parse_address(stream, addr_type).await?;

    debug!("Parsed SOCKS5 request: cmd={} target={}", cmd, target);

    Ok(ConnectRequest { cmd, target })
}

/// Parse the address and port portion of a SOCKS5 request
async fn parse_address<S>(stream: &mut S, addr_type: u8) -> Result<TargetAddr, Socks5Error>
where
    S: AsyncRead + Unpin,
{
    match addr_type {
        SOCKS5_ADDR_TYPE_IPV4 => {
            let mut addr = [0u8; 4];
            stream.read_exact(&mut addr).await?;
            let port = stream.read_u16().await?;

            Ok(TargetAddr::ipv4(Ipv4Addr::from(addr), port))
        }

        SOCKS5_ADDR_TYPE_DOMAIN => {
            let domain_len = stream.read_u8().await? as usize;

            let mut domain_buf = vec![0u8; domain_len];
            stream.read_exact(&mut domain_buf).await?;
            let domain = String::from_utf8(domain_buf).map_err(|e| {
                Socks5Error::InvalidDomain(String::from_utf8_lossy(e.as_bytes()).into_owned())
            })?;

            let port = stream.read_u16().await?;

            Ok(TargetAddr::domain(domain, port))
        }

        SOCKS5_ADDR_TYPE_IPV6 => {
            let mut addr = [0u8; 16];
            stream.read_exact(&mut addr).await?;
            let port = stream.read_u16().await?;

            Ok(TargetAddr::ipv6(Ipv6Addr::from(addr), port))
        }

        other => Err(Socks5Error::AddressTypeNotSupported(other)),
    }
}
