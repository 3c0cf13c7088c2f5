//! SOCKS5 request module
//!
//! Handles parsing SOCKS5 requests and building replies.

mod parser;
mod reply;

pub use parser::parse_request;
pub use reply::{send_command_not_supported, send_reply, send_success, Reply};
