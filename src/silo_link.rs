//! Link to the owning silo's message center (external collaborator, §6)
//!
//! The gateway hands inbound client traffic off to the silo's own message
//! router and receives outbound traffic the same way; this crate only
//! defines the seam, the same role `message_router.rs` plays for the
//! teacher's pub/sub traffic between a service object and its subscribers.

use async_trait::async_trait;
use log::debug;

use crate::errors::SiloLinkError;
use crate::ids::ActorId;
use crate::message::Message;

/// Where the gateway forwards a message once it has resolved (or given up
/// resolving) its recipient client
#[async_trait]
pub trait SiloMessageCenter: Send + Sync {
    async fn forward(&self, message: Message) -> Result<(), SiloLinkError>;

    /// Notifies the silo that `actor_ids` are no longer reachable through
    /// this gateway, usually because their owning client was dropped after
    /// its grace window elapsed. Default is a no-op log line; collocated
    /// test doubles and deployments that care about directory accuracy
    /// override it.
    async fn record_client_drop(&self, actor_ids: Vec<ActorId>) {
        debug!(count:% = actor_ids.len(); "orphaned proxied actors (default silo link drops this notice)");
    }
}

/// Default [`SiloMessageCenter`] backed by an unbounded channel, the same
/// decoupling the teacher uses between its `Server::run` select loop and
/// its `AdminSender`/`InternalClientSender` channels.
pub struct ChannelSiloLink {
    outbound: tokio::sync::mpsc::UnboundedSender<Message>,
}

impl ChannelSiloLink {
    pub fn new(outbound: tokio::sync::mpsc::UnboundedSender<Message>) -> Self {
        ChannelSiloLink { outbound }
    }
}

#[async_trait]
impl SiloMessageCenter for ChannelSiloLink {
    async fn forward(&self, message: Message) -> Result<(), SiloLinkError> {
        self.outbound
            .send(message)
            .map_err(|err| SiloLinkError::Unreachable(err.to_string()))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ids::ActorId;

    #[tokio::test]
    async fn forwards_onto_the_channel() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let link = ChannelSiloLink::new(tx);
        let message = Message::request(ActorId::grain("a"), ActorId::grain("b"), vec![1]);
        link.forward(message).await.unwrap();
        assert!(rx.recv().await.is_some());
    }
}
