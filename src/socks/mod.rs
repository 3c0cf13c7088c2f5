//! SOCKS5 module for Tinysocks
//!
//! This module implements the server side of the SOCKS5 protocol: method
//! negotiation, request parsing, replies, and the byte relay that runs once
//! a CONNECT request succeeded.

mod auth;
mod command;
mod consts;
mod handshake;
mod relay;
mod types;

pub use auth::{negotiate, AuthMethod};
pub use command::{parse_request, send_reply, Reply};
pub use consts::*;
pub use handshake::handshake;
pub use relay::{relay, RelayStats, StreamCloser};
pub use types::{ConnectRequest, SocksCommand, TargetAddr};
