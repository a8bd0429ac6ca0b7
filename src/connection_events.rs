//! Connection lifecycle glue (component E)
//!
//! The accept loop and socket read-half are external collaborators (see
//! `silo_link`); this module is the seam between "a socket just connected
//! or dropped" and the registry/sender-pool updates that follow from it.

use std::sync::Arc;

use log::info;

use crate::client_state::ClientState;
use crate::ids::ClientId;
use crate::registry::ClientRegistry;
use crate::sender_pool::{OutgoingItem, SenderPool};
use crate::socket::{ClientSocket, SocketId};

/// A client just (re)connected on `socket`. Registers it, closes whatever
/// socket it displaces, and wakes up its sender worker so any pending
/// queue left over from a prior connection starts draining immediately.
pub async fn handle_connected(
    registry: &ClientRegistry,
    pool: &SenderPool,
    client_id: ClientId,
    socket: Arc<dyn ClientSocket>,
) -> Arc<ClientState> {
    let (state, displaced) = registry.open(client_id.clone(), socket).await;
    if let Some(old) = displaced {
        old.close().await;
    }
    info!(client_id:% = state.id; "client connected");
    let _ = pool.dispatch(state.sender_index, OutgoingItem::wake_up(client_id));
    state
}

/// A socket dropped. Starts the client's grace window; the cleanup agent
/// (component G) is responsible for eventually reaping it.
pub async fn handle_disconnected(registry: &ClientRegistry, socket_id: SocketId) {
    if let Some(state) = registry.close_socket(socket_id).await {
        info!(client_id:% = state.id; "client disconnected, grace window started");
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ids::ClientId;
    use crate::serializer::BincodeSerializer;
    use crate::silo_link::ChannelSiloLink;
    use crate::socket::test_support::MockSocket;
    use crate::stats::GatewayStats;

    #[tokio::test]
    async fn connect_then_disconnect_round_trip() {
        let registry = Arc::new(ClientRegistry::new(2));
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let pool = SenderPool::spawn(
            2,
            registry.clone(),
            Arc::new(BincodeSerializer),
            Arc::new(ChannelSiloLink::new(tx)),
            Arc::new(GatewayStats::new()),
        );
        let socket = MockSocket::new("a");
        let socket_id = socket.id();

        let state = handle_connected(&registry, &pool, ClientId::from("c1"), socket).await;
        assert!(state.is_connected().await);

        handle_disconnected(&registry, socket_id).await;
        assert!(!state.is_connected().await);
    }
}
