//! Authoritative client registry (component B)
//!
//! Holds one [`ClientState`] per known [`ClientId`] plus two derived
//! indexes (`by_socket`, `by_proxied_actor`) that must never drift from the
//! primary table. Hot reads (`get`, `lookup_by_proxied_actor`) stay
//! lock-free on `DashMap`, the same map the teacher's own registry
//! (`rio-rs/src/registry.rs`'s `object_map`/`handler_map`) uses for its
//! trait-object store. The single gateway lock serializing structural
//! mutations across all three tables has no direct precedent in the
//! teacher, which doesn't have an equivalent multi-index invariant to
//! protect; it's the standard Rust pattern of a narrow mutex guarding
//! cross-table consistency while leaving single-table reads lock-free.
//! The round-robin `next_sender` counter is likewise without a teacher
//! equivalent — it's grounded on the `AtomicUsize`-based round-robin
//! counter (`counter: AtomicUsize`) in the retrieval pack's client
//! connection pool example.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex as AsyncMutex;

use crate::client_state::ClientState;
use crate::ids::{ActorId, ClientId};
use crate::registrar::{ClientObserverRegistrar, NullRegistrar};
use crate::socket::{ClientSocket, SocketId};

/// Authoritative client table plus its two derived indexes
pub struct ClientRegistry {
    clients: DashMap<ClientId, Arc<ClientState>>,
    by_socket: DashMap<SocketId, ClientId>,
    by_proxied_actor: DashMap<ActorId, ClientId>,
    gateway_lock: AsyncMutex<()>,
    next_sender: AtomicUsize,
    sender_queues: usize,
    registrar: Arc<dyn ClientObserverRegistrar>,
}

impl ClientRegistry {
    pub fn new(sender_queues: usize) -> Self {
        Self::with_registrar(sender_queues, Arc::new(NullRegistrar))
    }

    pub fn with_registrar(sender_queues: usize, registrar: Arc<dyn ClientObserverRegistrar>) -> Self {
        ClientRegistry {
            clients: DashMap::new(),
            by_socket: DashMap::new(),
            by_proxied_actor: DashMap::new(),
            gateway_lock: AsyncMutex::new(()),
            next_sender: AtomicUsize::new(0),
            sender_queues,
            registrar,
        }
    }

    fn next_sender_index(&self) -> usize {
        self.next_sender.fetch_add(1, Ordering::Relaxed) % self.sender_queues
    }

    /// Handles a new socket for `client_id`: creates the [`ClientState`] on
    /// first sight, or reconnects an existing one. Either way the returned
    /// state's socket is `socket`.
    ///
    /// Returns the state together with whichever socket it displaced (the
    /// caller is responsible for closing a displaced socket).
    pub async fn open(
        &self,
        client_id: ClientId,
        socket: Arc<dyn ClientSocket>,
    ) -> (Arc<ClientState>, Option<Arc<dyn ClientSocket>>) {
        let _guard = self.gateway_lock.lock().await;

        let state = self
            .clients
            .entry(client_id.clone())
            .or_insert_with(|| ClientState::new(client_id, self.next_sender_index()))
            .clone();

        let socket_id = socket.id();
        let old_socket = state.set_connected(socket).await;
        if let Some(old) = &old_socket {
            self.by_socket.remove(&old.id());
        }
        self.by_socket.insert(socket_id, state.id.clone());
        self.registrar.client_added(&state.id);

        (state, old_socket)
    }

    /// Marks the client owning `socket_id` as disconnected, starting its
    /// grace window. No-op if the socket is unknown (it may have already
    /// been superseded by a reconnect).
    pub async fn close_socket(&self, socket_id: SocketId) -> Option<Arc<ClientState>> {
        let _guard = self.gateway_lock.lock().await;

        let client_id = self.by_socket.remove(&socket_id)?.1;
        let state = self.clients.get(&client_id)?.clone();
        state.set_disconnected().await;
        Some(state)
    }

    /// Permanently removes `client_id` and every index entry pointing to it.
    /// Called once a client has been disconnected past its grace window.
    ///
    /// Returns the dropped state together with every `ActorId` that was
    /// proxied through it, now orphaned, so the caller can report them to
    /// the silo message center.
    pub async fn drop_client(&self, client_id: &ClientId) -> Option<(Arc<ClientState>, Vec<ActorId>)> {
        let _guard = self.gateway_lock.lock().await;

        let (_, state) = self.clients.remove(client_id)?;
        let mut orphaned = Vec::new();
        self.by_proxied_actor.retain(|actor, owner| {
            if owner == client_id {
                orphaned.push(actor.clone());
                false
            } else {
                true
            }
        });
        self.registrar.client_dropped(client_id);
        Some((state, orphaned))
    }

    /// Registers `actor` (a client-addressable object) as proxied through
    /// `client_id`.
    pub async fn register_proxied_actor(&self, actor: ActorId, client_id: ClientId) {
        let _guard = self.gateway_lock.lock().await;
        self.by_proxied_actor.insert(actor, client_id);
    }

    /// Registers `actor` as proxied through whichever client currently owns
    /// `socket_id`, resolved via `by_socket` without taking the gateway
    /// lock. A losing race against a concurrent disconnect just drops the
    /// registration, degrading to "not proxied here" for dispatch.
    pub fn record_sending_proxied_grain(&self, actor: ActorId, socket_id: SocketId) {
        if let Some(client_id) = self.by_socket.get(&socket_id).map(|entry| entry.clone()) {
            self.by_proxied_actor.insert(actor, client_id);
        }
    }

    pub async fn unregister_proxied_actor(&self, actor: &ActorId) {
        let _guard = self.gateway_lock.lock().await;
        self.by_proxied_actor.remove(actor);
    }

    /// Lock-free lookup of a client by id
    pub fn get(&self, client_id: &ClientId) -> Option<Arc<ClientState>> {
        self.clients.get(client_id).map(|entry| entry.clone())
    }

    /// Lock-free lookup of the client that owns a proxied client-addressable
    /// object
    pub fn lookup_by_proxied_actor(&self, actor: &ActorId) -> Option<ClientId> {
        self.by_proxied_actor.get(actor).map(|entry| entry.clone())
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Snapshot of every currently known client, used by the cleanup agent
    pub fn all_clients(&self) -> Vec<Arc<ClientState>> {
        self.clients.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Lock-free snapshot of every currently known client id
    pub fn client_ids(&self) -> Vec<ClientId> {
        self.clients.iter().map(|entry| entry.key().clone()).collect()
    }
}
