//! SOCKS5 method negotiation
//!
//! Only "no authentication required" is ever selected.

use super::consts::*;
use crate::error::Socks5Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// Authentication method types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    /// No authentication required
    None,
}

impl AuthMethod {
    /// Convert to SOCKS5 method byte
    pub fn to_byte(self) -> u8 {
        match self {
            AuthMethod::None => SOCKS5_AUTH_METHOD_NONE,
        }
    }

    /// Parse from SOCKS5 method byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            SOCKS5_AUTH_METHOD_NONE => Some(AuthMethod::None),
            _ => None,
        }
    }
}

/// Perform method negotiation
///
/// ```text
/// client: VER | NMETHODS | METHODS...
/// server: VER | METHOD
/// ```
///
/// The offered methods are always consumed before answering. When the
/// version is wrong, no method was offered, or "no authentication" is
/// missing, the server answers `0xFF` and the session ends with an error.
pub async fn negotiate<S>(stream: &mut S) -> Result<AuthMethod, Socks5Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = [0u8; 2];
    stream.read_exact(&mut buf).await?;

    let [version, num_methods] = buf;

    let mut methods = vec![0u8; num_methods as usize];
    stream.read_exact(&mut methods).await?;

    let selected = if version == SOCKS5_VERSION {
        select_auth_method(&methods)
    } else {
        None
    };

    stream
        .write_all(&[
            SOCKS5_VERSION,
            selected
                .map(AuthMethod::to_byte)
                .unwrap_or(SOCKS5_AUTH_METHOD_NOT_ACCEPTABLE),
        ])
        .await?;
    stream.flush().await?;

    match selected {
        Some(method) => {
            debug!("Selected authentication method {:?}", method);
            Ok(method)
        }
        None if version != SOCKS5_VERSION => Err(Socks5Error::UnsupportedVersion(version)),
        None => Err(Socks5Error::NoAcceptableMethod),
    }
}

/// Pick the first supported method from the client's offer
fn select_auth_method(methods: &[u8]) -> Option<AuthMethod> {
    methods.iter().copied().find_map(AuthMethod::from_byte)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    #[test]
    fn test_auth_method_from_byte() {
        assert_eq!(AuthMethod::from_byte(0), Some(AuthMethod::None));
        assert_eq!(AuthMethod::from_byte(1), None);
        assert_eq!(AuthMethod::from_byte(2), None);
        assert_eq!(AuthMethod::from_byte(255), None);
    }

    #[test]
    fn test_select_auth_method() {
        assert_eq!(select_auth_method(&[0]), Some(AuthMethod::None));
        assert_eq!(select_auth_method(&[2, 1, 0]), Some(AuthMethod::None));
        assert_eq!(select_auth_method(&[2]), None);
        assert_eq!(select_auth_method(&[]), None);
    }

    #[tokio::test]
    async fn test_negotiate_selects_no_auth() {
        let mut stream = Builder::new().read(&[5, 1, 0]).write(&[5, 0]).build();
        let method = negotiate(&mut stream).await.unwrap();
        assert_eq!(method, AuthMethod::None);
    }

    #[tokio::test]
    async fn test_negotiate_no_auth_among_many() {
        let mut stream = Builder::new()
            .read(&[5, 3, 2, 1, 0])
            .write(&[5, 0])
            .build();
        assert!(negotiate(&mut stream).await.is_ok());
    }

    #[tokio::test]
    async fn test_negotiate_zero_methods() {
        let mut stream = Builder::new().read(&[5, 0]).write(&[5, 0xFF]).build();
        let result = negotiate(&mut stream).await;
        assert!(matches!(result, Err(Socks5Error::NoAcceptableMethod)));
    }

    #[tokio::test]
    async fn test_negotiate_without_no_auth() {
        let mut stream = Builder::new().read(&[5, 2, 1, 2]).write(&[5, 0xFF]).build();
        let result = negotiate(&mut stream).await;
        assert!(matches!(result, Err(Socks5Error::NoAcceptableMethod)));
    }

    #[tokio::test]
    async fn test_negotiate_wrong_version_still_answers() {
        let mut stream = Builder::new().read(&[4, 1, 0]).write(&[5, 0xFF]).build();
        let result = negotiate(&mut stream).await;
        assert!(matches!(result, Err(Socks5Error::UnsupportedVersion(4))));
    }

    #[tokio::test]
    async fn test_negotiate_truncated_methods() {
        let mut stream = Builder::new().read(&[5, 3, 0]).build();
        let result = negotiate(&mut stream).await;
        assert!(matches!(result, Err(Socks5Error::Io(_))));
    }
}
