//! The duplex byte stream a client is reachable through
//!
//! The transport (TCP accept loop, handshake) is an external collaborator;
//! this module only defines the handle the rest of the gateway programs
//! against, plus a TCP-backed default implementation built the same way
//! the original framework frames its server connections (length-delimited,
//! via `tokio_util::codec`).

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::SinkExt;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use crate::errors::SocketError;

static NEXT_SOCKET_ID: AtomicU64 = AtomicU64::new(0);

/// Identity of a [`ClientSocket`], used as the key of the registry's
/// `by_socket` index. Sockets are trait objects, so equality is established
/// by this handle rather than by the socket's own contents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SocketId(u64);

impl SocketId {
    fn next() -> Self {
        SocketId(NEXT_SOCKET_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A duplex byte stream to a connected client
#[async_trait]
pub trait ClientSocket: Send + Sync + fmt::Debug {
    /// Stable identity of this socket, used as the `by_socket` key
    fn id(&self) -> SocketId;

    /// Write `buffers` to the socket, returning the number of bytes written
    async fn send(&self, buffers: Vec<u8>) -> Result<usize, SocketError>;

    /// The peer address, or "unknown" if the socket has already been closed
    fn remote_endpoint(&self) -> String;

    /// Close the underlying stream. Safe to call more than once.
    async fn close(&self);
}

/// Default [`ClientSocket`] backed by a TCP stream framed with
/// [`LengthDelimitedCodec`], the same codec the rest of the runtime uses
/// for its own client/server wire protocol.
#[derive(Debug, Clone)]
pub struct TcpClientSocket {
    id: SocketId,
    remote_endpoint: String,
    frames: Arc<Mutex<Option<Framed<TcpStream, LengthDelimitedCodec>>>>,
}

impl TcpClientSocket {
    pub fn new(stream: TcpStream) -> Self {
        let remote_endpoint = stream
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        let frames = Framed::new(stream, LengthDelimitedCodec::new());
        TcpClientSocket {
            id: SocketId::next(),
            remote_endpoint,
            frames: Arc::new(Mutex::new(Some(frames))),
        }
    }
}

#[async_trait]
impl ClientSocket for TcpClientSocket {
    fn id(&self) -> SocketId {
        self.id
    }

    async fn send(&self, buffers: Vec<u8>) -> Result<usize, SocketError> {
        let expected = buffers.len();
        let mut guard = self.frames.lock().await;
        let frames = guard.as_mut().ok_or_else(|| SocketError::Io("closed".to_string()))?;
        frames
            .send(buffers.into())
            .await
            .map_err(|err| SocketError::Io(err.to_string()))?;
        Ok(expected)
    }

    fn remote_endpoint(&self) -> String {
        self.remote_endpoint.clone()
    }

    async fn close(&self) {
        let mut guard = self.frames.lock().await;
        guard.take();
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod test_support {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use tokio::sync::Mutex as TokioMutex;

    /// In-memory [`ClientSocket`] used across the gateway's own test suite
    #[derive(Debug)]
    pub struct MockSocket {
        id: SocketId,
        remote_endpoint: String,
        closed: AtomicBool,
        pub sent: TokioMutex<Vec<Vec<u8>>>,
        fail_next_sends: AtomicBool,
        fail_with_short_write: AtomicBool,
    }

    impl MockSocket {
        pub fn new(remote_endpoint: impl Into<String>) -> Arc<Self> {
            Arc::new(MockSocket {
                id: SocketId::next(),
                remote_endpoint: remote_endpoint.into(),
                closed: AtomicBool::new(false),
                sent: TokioMutex::new(Vec::new()),
                fail_next_sends: AtomicBool::new(false),
                fail_with_short_write: AtomicBool::new(false),
            })
        }

        pub fn fail_next_send(&self) {
            self.fail_next_sends.store(true, Ordering::SeqCst);
        }

        pub fn fail_next_send_with_short_write(&self) {
            self.fail_with_short_write.store(true, Ordering::SeqCst);
        }

        pub fn is_closed(&self) -> bool {
            self.closed.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ClientSocket for MockSocket {
        fn id(&self) -> SocketId {
            self.id
        }

        async fn send(&self, buffers: Vec<u8>) -> Result<usize, SocketError> {
            if self.closed.load(Ordering::SeqCst) {
                return Err(SocketError::Io("closed".to_string()));
            }
            if self.fail_with_short_write.swap(false, Ordering::SeqCst) {
                return Err(SocketError::ShortWrite {
                    written: buffers.len().saturating_sub(1),
                    expected: buffers.len(),
                });
            }
            if self.fail_next_sends.swap(false, Ordering::SeqCst) {
                return Err(SocketError::Io("injected failure".to_string()));
            }
            let expected = buffers.len();
            self.sent.lock().await.push(buffers);
            Ok(expected)
        }

        fn remote_endpoint(&self) -> String {
            if self.closed.load(Ordering::SeqCst) {
                "unknown".to_string()
            } else {
                self.remote_endpoint.clone()
            }
        }

        async fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }
}
