//! Per-client record tracked by the [`crate::registry::ClientRegistry`]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;

use crate::ids::ClientId;
use crate::message::Message;
use crate::socket::ClientSocket;

/// Mutable part of a [`ClientState`]
///
/// `disconnected_since = None` is the `+∞` sentinel from the design: it
/// means the client is currently connected. `Some(t)` means the client has
/// had no live socket since `t`.
struct Inner {
    socket: Option<Arc<dyn ClientSocket>>,
    disconnected_since: Option<Instant>,
    pending_singles: VecDeque<Message>,
    pending_batches: VecDeque<Vec<Message>>,
}

/// One known client, connected or within its grace window
///
/// `id` and `sender_index` never change for the life of the value; the rest
/// is guarded by an internal lock since both the registry (under the
/// gateway lock) and the client's assigned sender worker touch it.
pub struct ClientState {
    pub id: ClientId,
    pub sender_index: usize,
    inner: Mutex<Inner>,
}

impl ClientState {
    /// A freshly observed client, not yet connected
    pub fn new(id: ClientId, sender_index: usize) -> Arc<Self> {
        Arc::new(ClientState {
            id,
            sender_index,
            inner: Mutex::new(Inner {
                socket: None,
                disconnected_since: Some(Instant::now()),
                pending_singles: VecDeque::new(),
                pending_batches: VecDeque::new(),
            }),
        })
    }

    /// Installs `socket` as the current live socket, returning whichever
    /// socket it replaces (if any)
    pub async fn set_connected(&self, socket: Arc<dyn ClientSocket>) -> Option<Arc<dyn ClientSocket>> {
        let mut inner = self.inner.lock().await;
        let old = inner.socket.replace(socket);
        inner.disconnected_since = None;
        old
    }

    /// Marks the client as disconnected, recording `now` as the start of its
    /// grace window. The lingering socket (if any) is returned so the caller
    /// can close it.
    pub async fn set_disconnected(&self) -> Option<Arc<dyn ClientSocket>> {
        let mut inner = self.inner.lock().await;
        let old = inner.socket.take();
        inner.disconnected_since = Some(Instant::now());
        old
    }

    pub async fn is_connected(&self) -> bool {
        self.inner.lock().await.socket.is_some()
    }

    pub async fn socket(&self) -> Option<Arc<dyn ClientSocket>> {
        self.inner.lock().await.socket.clone()
    }

    /// Disconnection duration, or `None` if the client is currently connected
    pub async fn disconnected_for(&self) -> Option<std::time::Duration> {
        self.inner.lock().await.disconnected_since.map(|t| t.elapsed())
    }

    pub async fn push_single(&self, message: Message) {
        self.inner.lock().await.pending_singles.push_back(message);
    }

    pub async fn push_single_front(&self, message: Message) {
        self.inner.lock().await.pending_singles.push_front(message);
    }

    pub async fn pop_single(&self) -> Option<Message> {
        self.inner.lock().await.pending_singles.pop_front()
    }

    pub async fn peek_single_is_some(&self) -> bool {
        !self.inner.lock().await.pending_singles.is_empty()
    }

    pub async fn push_batch(&self, batch: Vec<Message>) {
        self.inner.lock().await.pending_batches.push_back(batch);
    }

    pub async fn push_batch_front(&self, batch: Vec<Message>) {
        self.inner.lock().await.pending_batches.push_front(batch);
    }

    pub async fn pop_batch(&self) -> Option<Vec<Message>> {
        self.inner.lock().await.pending_batches.pop_front()
    }

    pub async fn peek_batch_is_some(&self) -> bool {
        !self.inner.lock().await.pending_batches.is_empty()
    }
}
