//! Bidirectional relay between an established client and destination
//!
//! Each direction runs as its own task. A failed read closes the stream it
//! read from, a failed write closes the stream it wrote to, and every pending
//! operation in either direction watches both closers so the other loop
//! unblocks as soon as one side is closed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::consts::MIN_BUFFER_SIZE;

/// Close state for one side of a relay
///
/// Closing is idempotent: only the first call flips the state and wakes
/// waiters, every later call is a no-op.
#[derive(Debug, Default)]
pub struct StreamCloser {
    closed: AtomicBool,
    token: CancellationToken,
}

impl StreamCloser {
    /// Create an open closer
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the stream closed
    ///
    /// Returns `true` only for the call that actually closed it.
    pub fn close(&self) -> bool {
        let first = self
            .closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if first {
            self.token.cancel();
        }
        first
    }

    /// Whether the stream has been closed
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Resolves once the stream is closed
    pub async fn closed(&self) {
        self.token.cancelled().await
    }
}

/// Byte counters of a finished relay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    /// Bytes copied from the first stream to the second
    pub a_to_b: u64,
    /// Bytes copied from the second stream to the first
    pub b_to_a: u64,
}

/// Relay data bidirectionally between two streams
///
/// Spawns one task per direction and returns once both have exited. Both
/// streams are dropped by then. `buffer_size` is raised to at least 1 KiB.
pub async fn relay<A, B>(a: A, b: B, buffer_size: usize) -> RelayStats
where
    A: AsyncRead + AsyncWrite + Send + 'static,
    B: AsyncRead + AsyncWrite + Send + 'static,
{
    let buffer_size = buffer_size.max(MIN_BUFFER_SIZE);

    let (a_read, a_write) = tokio::io::split(a);
    let (b_read, b_write) = tokio::io::split(b);

    let a_closer = Arc::new(StreamCloser::new());
    let b_closer = Arc::new(StreamCloser::new());

    let a_to_b = tokio::spawn(copy_loop(
        "A->B",
        a_read,
        b_write,
        a_closer.clone(),
        b_closer.clone(),
        buffer_size,
    ));
    let b_to_a = tokio::spawn(copy_loop(
        "B->A",
        b_read,
        a_write,
        b_closer,
        a_closer,
        buffer_size,
    ));

    let (a_to_b, b_to_a) = tokio::join!(a_to_b, b_to_a);

    RelayStats {
        a_to_b: a_to_b.unwrap_or_else(|e| {
            debug!("A->B task failed: {}", e);
            0
        }),
        b_to_a: b_to_a.unwrap_or_else(|e| {
            debug!("B->A task failed: {}", e);
            0
        }),
    }
}

/// Copy chunks from `reader` to `writer` until either side fails or closes
async fn copy_loop<R, W>(
    direction: &'static str,
    mut reader: R,
    mut writer: W,
    src: Arc<StreamCloser>,
    dst: Arc<StreamCloser>,
    buffer_size: usize,
) -> u64
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; buffer_size];
    let mut total: u64 = 0;

    loop {
        let n = tokio::select! {
            biased;
            _ = src.closed() => break,
            _ = dst.closed() => break,
            result = reader.read(&mut buf) => match result {
                Ok(0) => {
                    debug!("{} reached EOF", direction);
                    src.close();
                    break;
                }
                Ok(n) => n,
                Err(e) => {
                    debug!("{} read error: {}", direction, e);
                    src.close();
                    break;
                }
            },
        };

        let written = tokio::select! {
            biased;
            _ = src.closed() => break,
            _ = dst.closed() => break,
            result = writer.write_all(&buf[..n]) => result,
        };

        if let Err(e) = written {
            debug!("{} write error: {}", direction, e);
            dst.close();
            break;
        }

        total += n as u64;
    }

    // Best effort, the peer may already be gone
    let _ = writer.shutdown().await;

    debug!("{} finished: {} bytes", direction, total);
    total
}
