//! Client-facing edge gateway for a distributed virtual-actor runtime
//!
//! A gateway multiplexes a large number of long-lived client connections
//! onto a small, fixed pool of sender workers. It owns the authoritative
//! mapping from proxied client actors (client grains and client-addressable
//! objects) back to the connection that can reach them, keeps a client's
//! outbound messages queued FIFO across a short reconnect grace window, and
//! caches cross-gateway reply routes so a response can find its way back to
//! whichever gateway forwarded the original call.
//!
//! ```rust
//! use client_gateway::config::GatewayConfig;
//! use client_gateway::gateway::{Gateway, GatewayBuilder};
//! use client_gateway::ids::SiloAddress;
//! use client_gateway::silo_link::ChannelSiloLink;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
//! let params = GatewayBuilder::default()
//!     .config(GatewayConfig::default())
//!     .gateway_address(SiloAddress::from("gw-1"))
//!     .silo_link(Arc::new(ChannelSiloLink::new(tx)))
//!     .build()
//!     .unwrap();
//! let gateway = Gateway::start(params);
//! gateway.shutdown().await;
//! # }
//! ```

pub mod client_state;
pub mod cleanup;
pub mod config;
pub mod connection_events;
pub mod errors;
pub mod gateway;
pub mod ids;
pub mod message;
pub mod registrar;
pub mod registry;
pub mod reply_route_cache;
pub mod sender_pool;
pub mod serializer;
pub mod silo_link;
pub mod socket;
pub mod stats;

pub mod prelude {
    pub use crate::client_state::ClientState;
    pub use crate::cleanup::CleanupAgent;
    pub use crate::config::GatewayConfig;
    pub use crate::errors::*;
    pub use crate::gateway::{Gateway, GatewayBuilder, GatewayParams};
    pub use crate::ids::{ActorId, ActorKind, ClientId, SiloAddress};
    pub use crate::message::Message;
    pub use crate::registrar::{ClientObserverRegistrar, NullRegistrar};
    pub use crate::registry::ClientRegistry;
    pub use crate::reply_route_cache::ReplyRouteCache;
    pub use crate::sender_pool::{OutgoingItem, OutgoingPayload, SenderPool};
    pub use crate::serializer::{BincodeSerializer, Serializer};
    pub use crate::silo_link::{ChannelSiloLink, SiloMessageCenter};
    pub use crate::socket::{ClientSocket, SocketId, TcpClientSocket};
    pub use crate::stats::GatewayStats;
}
