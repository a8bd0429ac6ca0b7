//! Fixed sender-worker pool (component D)
//!
//! Every connected client is pinned to exactly one of a small, fixed number
//! of worker tasks (`gateway_sender_queues`), the same fan-in-to-fixed-pool
//! shape the teacher's server uses for its `accept()` loop's `JoinSet`. A
//! worker drains one client's pending queues at a time; an `OutgoingItem`
//! with `payload: None` is a pure wake-up, used to resume draining after a
//! reconnect without requiring a fresh message to arrive first.

use std::sync::Arc;

use log::{debug, warn};
use tokio::sync::mpsc;

use crate::client_state::ClientState;
use crate::ids::ClientId;
use crate::message::Message;
use crate::registry::ClientRegistry;
use crate::serializer::Serializer;
use crate::silo_link::SiloMessageCenter;
use crate::stats::GatewayStats;

/// A single message, or a whole batch, queued for a client
#[derive(Debug)]
pub enum OutgoingPayload {
    Single(Message),
    Batch(Vec<Message>),
}

/// Unit of work handed to a sender worker's intake queue
#[derive(Debug)]
pub struct OutgoingItem {
    pub client_id: ClientId,
    /// `None` is a wake-up: drain whatever is already queued for this
    /// client without enqueuing anything new.
    pub payload: Option<OutgoingPayload>,
}

impl OutgoingItem {
    pub fn deliver(client_id: ClientId, payload: OutgoingPayload) -> Self {
        OutgoingItem {
            client_id,
            payload: Some(payload),
        }
    }

    pub fn wake_up(client_id: ClientId) -> Self {
        OutgoingItem {
            client_id,
            payload: None,
        }
    }
}

/// Fixed pool of sender workers, each fed by its own unbounded intake queue
pub struct SenderPool {
    intakes: Vec<mpsc::UnboundedSender<OutgoingItem>>,
}

impl SenderPool {
    /// Spawns `queues` worker tasks draining client outboxes through
    /// `registry`, serializing payloads with `serializer`. Items for a
    /// client the registry no longer knows about are handed to
    /// `silo_link`/`stats` per the "unknown client on send" policy (§7).
    pub fn spawn(
        queues: usize,
        registry: Arc<ClientRegistry>,
        serializer: Arc<dyn Serializer>,
        silo_link: Arc<dyn SiloMessageCenter>,
        stats: Arc<GatewayStats>,
    ) -> Self {
        let mut intakes = Vec::with_capacity(queues);
        for index in 0..queues {
            let (tx, rx) = mpsc::unbounded_channel();
            let registry = registry.clone();
            let serializer = serializer.clone();
            let silo_link = silo_link.clone();
            let stats = stats.clone();
            tokio::spawn(run_worker(index, rx, registry, serializer, silo_link, stats));
            intakes.push(tx);
        }
        SenderPool { intakes }
    }

    pub fn queue_count(&self) -> usize {
        self.intakes.len()
    }

    /// Enqueues `item` on the worker owning `sender_index`. Fails only if
    /// that worker has shut down.
    pub fn dispatch(&self, sender_index: usize, item: OutgoingItem) -> Result<(), OutgoingItem> {
        self.intakes[sender_index % self.intakes.len()]
            .send(item)
            .map_err(|err| err.0)
    }
}

async fn run_worker(
    index: usize,
    mut rx: mpsc::UnboundedReceiver<OutgoingItem>,
    registry: Arc<ClientRegistry>,
    serializer: Arc<dyn Serializer>,
    silo_link: Arc<dyn SiloMessageCenter>,
    stats: Arc<GatewayStats>,
) {
    debug!(worker_index:% = index; "sender worker started");
    while let Some(item) = rx.recv().await {
        let Some(state) = registry.get(&item.client_id) else {
            if let Some(payload) = item.payload {
                reject_unknown_client(&item.client_id, payload, silo_link.as_ref(), &stats).await;
            }
            continue;
        };

        if let Some(payload) = item.payload {
            match payload {
                OutgoingPayload::Single(message) => state.push_single(message).await,
                OutgoingPayload::Batch(batch) => state.push_batch(batch).await,
            }
        }

        drain_client(&registry, serializer.as_ref(), &state).await;
    }
    debug!(worker_index:% = index; "sender worker stopped");
}

/// "Unknown client on send" (§7): requests get an unrecoverable rejection
/// handed back to the silo; non-requests are simply counted as dropped.
async fn reject_unknown_client(
    client_id: &ClientId,
    payload: OutgoingPayload,
    silo_link: &dyn SiloMessageCenter,
    stats: &GatewayStats,
) {
    let messages = match payload {
        OutgoingPayload::Single(message) => vec![message],
        OutgoingPayload::Batch(batch) => batch,
    };
    for message in messages {
        if message.is_request() {
            warn!(client_id:% = client_id; "rejecting request for unknown client");
            let rejection = Message::unrecoverable_rejection(&message, client_id);
            if silo_link.forward(rejection).await.is_err() {
                stats.send_failed();
            }
        } else {
            stats.send_failed();
        }
    }
}

/// Drains `state`'s pending queues while it stays connected. Stops (leaving
/// whatever is left in the queues) the moment a send fails; the client is
/// marked disconnected so it resumes from the same point on reconnect.
async fn drain_client(registry: &ClientRegistry, serializer: &dyn Serializer, state: &Arc<ClientState>) {
    loop {
        if !state.is_connected().await {
            return;
        }

        if let Some(message) = state.pop_single().await {
            let Ok(bytes) = serializer.serialize(&message) else {
                warn!(client_id:% = state.id; "dropping undeliverable message, serialization failed");
                continue;
            };
            if !send_and_requeue_on_failure(registry, state, bytes, || {
                OutgoingPayload::Single(message.clone())
            })
            .await
            {
                return;
            }
            continue;
        }

        if let Some(batch) = state.pop_batch().await {
            let Ok(bytes) = serializer.serialize_batch(&batch) else {
                warn!(client_id:% = state.id; "dropping undeliverable batch, serialization failed");
                continue;
            };
            if !send_and_requeue_on_failure(registry, state, bytes, || OutgoingPayload::Batch(batch.clone())).await {
                return;
            }
            continue;
        }

        return;
    }
}

/// Sends `bytes` over the client's current socket. On failure, requeues the
/// payload built by `rebuild` at the front of the appropriate queue and
/// marks the client disconnected. Returns whether the send succeeded.
async fn send_and_requeue_on_failure(
    registry: &ClientRegistry,
    state: &Arc<ClientState>,
    bytes: Vec<u8>,
    rebuild: impl FnOnce() -> OutgoingPayload,
) -> bool {
    let Some(socket) = state.socket().await else {
        requeue_front(state, rebuild()).await;
        return false;
    };

    match socket.send(bytes).await {
        Ok(_) => true,
        Err(err) => {
            warn!(client_id:% = state.id, error:% = err; "send failed, disconnecting client");
            requeue_front(state, rebuild()).await;
            registry.close_socket(socket.id()).await;
            socket.close().await;
            false
        }
    }
}

async fn requeue_front(state: &Arc<ClientState>, payload: OutgoingPayload) {
    match payload {
        OutgoingPayload::Single(message) => state.push_single_front(message).await,
        OutgoingPayload::Batch(batch) => state.push_batch_front(batch).await,
    }
}
