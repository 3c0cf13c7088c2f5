//! SOCKS5 handshake
//!
//! Drives the full server side handshake on an inbound stream: method
//! negotiation, request parsing and the final reply.

use crate::error::Socks5Error;
use crate::socks::auth::negotiate;
use crate::socks::command::{parse_request, send_command_not_supported, send_reply, send_success};
use crate::socks::types::TargetAddr;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

/// Run the SOCKS5 handshake on a stream
///
/// # Protocol Flow
///
/// 1. Method negotiation (only "no authentication" is accepted)
/// 2. Request parsing
/// 3. Reply: success for CONNECT, a negative reply for an unsupported
///    address type or command
///
/// On success the client has already received the success reply and the
/// returned [`TargetAddr`] formats as the `host:port` to dial. Every error
/// is fatal to the session and the caller is expected to drop the stream.
pub async fn handshake<S>(stream: &mut S) -> Result<TargetAddr, Socks5Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    negotiate(stream).await?;

    let request = match parse_request(stream).await {
        Ok(request) => request,
        Err(e) => return Err(reject(stream, e).await),
    };

    if !request.is_connect() {
        match request.command() {
            Some(cmd) => debug!("Rejecting SOCKS5 {} request", cmd),
            None => debug!("Rejecting unknown SOCKS5 command {:#04x}", request.cmd),
        }
        if let Err(e) = send_command_not_supported(stream).await {
            debug!("Failed to send command-not-supported reply: {}", e);
        }
        return Err(Socks5Error::CommandNotSupported(request.cmd));
    }

    send_success(stream).await?;

    debug!("SOCKS5 handshake complete, target {}", request.target);

    Ok(request.target)
}

/// Send the negative reply owed for `err`, if any, and hand the error back
async fn reject<S>(stream: &mut S, err: Socks5Error) -> Socks5Error
where
    S: AsyncWrite + Unpin,
{
    if let Some(code) = err.reply_code() {
        if let Err(e) = send_reply(stream, code).await {
            debug!("Failed to send {:?} reply: {}", code, e);
        }
    }
    err
}
