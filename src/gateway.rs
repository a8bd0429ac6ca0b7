//! Top-level gateway, tying together the registry, sender pool, reply-route
//! cache and cleanup agent (component F: delivery dispatch)
//!
//! Construction follows the same two-step shape as the teacher's
//! `Server`/`ServerBuilder`: a `#[derive(Builder)]` struct for the
//! user-supplied parameters, then a constructor that spawns the pieces
//! that actually need a running tokio runtime.

use std::sync::Arc;

use derive_builder::Builder;
use log::warn;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::client_state::ClientState;
use crate::cleanup::CleanupAgent;
use crate::config::GatewayConfig;
use crate::errors::{GatewayBuilderError, SiloLinkError};
use crate::ids::{ClientId, SiloAddress};
use crate::message::Message;
use crate::registrar::{ClientObserverRegistrar, NullRegistrar};
use crate::registry::ClientRegistry;
use crate::reply_route_cache::ReplyRouteCache;
use crate::sender_pool::{OutgoingItem, OutgoingPayload, SenderPool};
use crate::serializer::{BincodeSerializer, Serializer};
use crate::silo_link::SiloMessageCenter;
use crate::socket::{ClientSocket, SocketId};
use crate::stats::GatewayStats;

/// User-supplied parameters for a [`Gateway`]
#[derive(Builder)]
#[builder(pattern = "owned", build_fn(error = "GatewayBuilderError", validate = "Self::validate"))]
pub struct GatewayParams {
    #[builder(default)]
    pub config: GatewayConfig,

    /// This gateway's own network identity, stamped onto every message it
    /// hands to a client so the client only ever sees the gateway, never
    /// the silo that happened to originate the message.
    pub gateway_address: SiloAddress,

    /// Where the gateway hands off messages it can't resolve to a local
    /// client (see [`crate::silo_link`])
    pub silo_link: Arc<dyn SiloMessageCenter>,

    #[builder(default = "Arc::new(BincodeSerializer)")]
    pub serializer: Arc<dyn Serializer>,

    /// Notified whenever a client is added to or dropped from the registry
    /// (see [`crate::registrar`])
    #[builder(default = "Arc::new(NullRegistrar)")]
    pub registrar: Arc<dyn ClientObserverRegistrar>,
}

impl GatewayParamsBuilder {
    fn validate(&self) -> Result<(), GatewayBuilderError> {
        if let Some(config) = &self.config {
            if config.gateway_sender_queues == 0 {
                return Err(GatewayBuilderError::NoSenderQueues);
            }
        }
        Ok(())
    }
}

pub type GatewayBuilder = GatewayParamsBuilder;

/// A running client gateway
pub struct Gateway {
    config: GatewayConfig,
    gateway_address: SiloAddress,
    registry: Arc<ClientRegistry>,
    reply_routes: Arc<ReplyRouteCache>,
    sender_pool: SenderPool,
    stats: Arc<GatewayStats>,
    silo_link: Arc<dyn SiloMessageCenter>,
    cleanup_cancellation: CancellationToken,
    cleanup_handle: JoinHandle<()>,
}

impl Gateway {
    /// Spawns the sender pool and cleanup agent and returns a ready
    /// [`Gateway`]
    pub fn start(params: GatewayParams) -> Self {
        let registry = Arc::new(ClientRegistry::with_registrar(
            params.config.gateway_sender_queues,
            params.registrar,
        ));
        let reply_routes = Arc::new(ReplyRouteCache::new(params.config.route_cache_ttl()));
        let stats = Arc::new(GatewayStats::new());
        let sender_pool = SenderPool::spawn(
            params.config.gateway_sender_queues,
            registry.clone(),
            params.serializer.clone(),
            params.silo_link.clone(),
            stats.clone(),
        );

        let cleanup_cancellation = CancellationToken::new();
        let cleanup_agent = CleanupAgent::new(
            registry.clone(),
            reply_routes.clone(),
            params.silo_link.clone(),
            stats.clone(),
            params.config.grace_window,
            params.config.cleanup_interval,
        );
        let cleanup_token = cleanup_cancellation.clone();
        let cleanup_handle = tokio::spawn(async move { cleanup_agent.run(cleanup_token).await });

        Gateway {
            config: params.config,
            gateway_address: params.gateway_address,
            registry,
            reply_routes,
            sender_pool,
            stats,
            silo_link: params.silo_link,
            cleanup_cancellation,
            cleanup_handle,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn stats(&self) -> &GatewayStats {
        &self.stats
    }

    /// Stops the cleanup agent. Already-spawned sender workers keep
    /// running; dropping the [`Gateway`] drops their intake queues, which
    /// ends them.
    pub async fn shutdown(self) {
        self.cleanup_cancellation.cancel();
        if let Err(err) = self.cleanup_handle.await {
            warn!(error:% = err; "cleanup agent task panicked");
        }
    }

    /// A socket just (re)connected for `client_id`
    pub async fn on_connected(&self, client_id: ClientId, socket: Arc<dyn ClientSocket>) -> Arc<ClientState> {
        let state = crate::connection_events::handle_connected(&self.registry, &self.sender_pool, client_id, socket).await;
        self.stats.client_connected();
        state
    }

    /// A socket dropped
    pub async fn on_disconnected(&self, socket_id: SocketId) {
        crate::connection_events::handle_disconnected(&self.registry, socket_id).await;
        self.stats.client_disconnected();
    }

    /// Registers `actor` as a client-addressable object or client grain
    /// proxied through `client_id`
    pub async fn register_proxied_actor(&self, actor: crate::ids::ActorId, client_id: ClientId) {
        self.registry.register_proxied_actor(actor, client_id).await;
    }

    /// Registers `actor` as proxied through whichever client owns `socket_id`
    /// right now, the lock-free fast path used when a client's own socket
    /// read-half observes it sending as a given actor (§4.B, §6).
    pub fn record_sending_proxied_grain(&self, actor: crate::ids::ActorId, socket_id: SocketId) {
        self.registry.record_sending_proxied_grain(actor, socket_id);
    }

    /// Evicts `actor` from the proxied-actor index, the eager-eviction path
    /// from §3's Lifecycles (§6 "Exposed to the silo").
    pub async fn record_unproxied_grain(&self, actor: &crate::ids::ActorId) {
        self.registry.unregister_proxied_actor(actor).await;
    }

    /// Every client currently known to the registry, connected or within its
    /// grace window (§6 "Exposed to the silo").
    pub fn get_connected_clients(&self) -> Vec<ClientId> {
        self.registry.client_ids()
    }

    /// Routes an inbound message toward the client that owns its target
    /// actor (§4.D). Returns whether the target was proxied through this
    /// gateway at all; a `false` leaves `message` unconsumed for the caller
    /// to route elsewhere.
    ///
    /// If the message is a client-grain call into a client-addressable
    /// object, the sending silo's address is remembered in the reply-route
    /// cache so the eventual response can find its way back here even if a
    /// different gateway ends up serving it. On delivery, `target_silo` is
    /// cleared and `sending_silo` rewritten to this gateway's own address,
    /// so the client only ever observes the gateway, never an arbitrary
    /// silo.
    pub async fn try_deliver_to_proxy(&self, mut message: Message) -> Option<Message> {
        if message.is_client_grain_to_addressable_request() {
            if let (Some(client_id), Some(sending_silo)) = (
                self.registry.lookup_by_proxied_actor(&message.sender),
                message.sending_silo.clone(),
            ) {
                self.reply_routes.record(client_id, sending_silo);
            }
        }

        let Some(client_id) = self.registry.lookup_by_proxied_actor(&message.target) else {
            return Some(message);
        };
        if self.registry.get(&client_id).is_none() {
            self.registry.unregister_proxied_actor(&message.target).await;
            return Some(message);
        }

        message.target_silo = None;
        message.sending_silo = Some(self.gateway_address.clone());
        self.deliver_to_client(client_id, message).await;
        None
    }

    /// Convenience over [`Self::try_deliver_to_proxy`] for inbound silo
    /// traffic: falls back to the silo link when the target isn't proxied
    /// here.
    pub async fn route_request(&self, message: Message) -> Result<(), SiloLinkError> {
        match self.try_deliver_to_proxy(message).await {
            Some(unclaimed) => self.silo_link.forward(unclaimed).await,
            None => Ok(()),
        }
    }

    /// Pure query over the reply-route cache (§4.A, §4.D): for a response
    /// flowing back from a client-addressable object to `target` (a client
    /// grain), returns the gateway that should receive it if one is
    /// cached. Has no side effects.
    pub fn try_to_reroute(&self, target: &crate::ids::ActorId) -> Option<SiloAddress> {
        let client_id = self.registry.lookup_by_proxied_actor(target)?;
        self.reply_routes.lookup(&client_id)
    }

    /// Convenience over [`Self::try_to_reroute`]: routes a response flowing
    /// back from a client-addressable object to the client grain that
    /// called it, honoring a cached cross-gateway reply route when one
    /// exists.
    pub async fn route_response(&self, message: Message) -> Result<(), SiloLinkError> {
        if let Some(route_silo) = self.try_to_reroute(&message.target) {
            let mut rerouted = message;
            rerouted.target_silo = Some(route_silo);
            return self.silo_link.forward(rerouted).await;
        }

        match self.try_deliver_to_proxy(message).await {
            Some(unclaimed) => self.silo_link.forward(unclaimed).await,
            None => Ok(()),
        }
    }

    /// Enqueues `message` for `client_id` on its assigned sender worker, or
    /// synthesizes the unrecoverable rejection if the client is unknown
    /// (§7, "Unknown client on send").
    async fn deliver_to_client(&self, client_id: ClientId, message: Message) {
        match self.registry.get(&client_id) {
            Some(state) => {
                if self
                    .sender_pool
                    .dispatch(state.sender_index, OutgoingItem::deliver(client_id, OutgoingPayload::Single(message)))
                    .is_err()
                {
                    self.stats.send_failed();
                }
            }
            None => {
                let rejection = Message::unrecoverable_rejection(&message, &client_id);
                if self.silo_link.forward(rejection).await.is_err() {
                    self.stats.send_failed();
                }
            }
        }
    }

    pub fn client_count(&self) -> usize {
        self.registry.client_count()
    }
}
