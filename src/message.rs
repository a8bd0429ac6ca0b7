//! The wire message shape the gateway routes
//!
//! Framing and the concrete byte encoding are external collaborators
//! (see [`crate::serializer`]); this module only defines the envelope
//! the rest of the gateway reasons about.

use serde::{Deserialize, Serialize};

use crate::ids::{ActorId, ClientId, SiloAddress};

/// Whether a [`Message`] is a request awaiting a response or a response/notification
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    Request,
    Response,
}

/// A single message flowing through the gateway
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub kind: MessageKind,
    pub sender: ActorId,
    pub target: ActorId,
    pub sending_silo: Option<SiloAddress>,
    pub target_silo: Option<SiloAddress>,
    pub payload: Vec<u8>,
}

impl Message {
    pub fn request(sender: ActorId, target: ActorId, payload: Vec<u8>) -> Self {
        Message {
            kind: MessageKind::Request,
            sender,
            target,
            sending_silo: None,
            target_silo: None,
            payload,
        }
    }

    pub fn response(sender: ActorId, target: ActorId, payload: Vec<u8>) -> Self {
        Message {
            kind: MessageKind::Response,
            sender,
            target,
            sending_silo: None,
            target_silo: None,
            payload,
        }
    }

    pub fn with_sending_silo(mut self, silo: impl Into<SiloAddress>) -> Self {
        self.sending_silo = Some(silo.into());
        self
    }

    pub fn is_request(&self) -> bool {
        self.kind == MessageKind::Request
    }

    /// True for a request sent by a client grain to a client-addressable
    /// object; this is the shape the reply-route cache remembers.
    pub fn is_client_grain_to_addressable_request(&self) -> bool {
        self.is_request() && self.sender.is_client_grain() && self.target.is_client_addressable_object()
    }

    /// True for a response flowing back from a client-addressable object to
    /// the client grain that originally called it; this is the shape
    /// [`crate::gateway::Gateway::try_to_reroute`] applies to.
    pub fn is_addressable_to_client_grain_response(&self) -> bool {
        !self.is_request()
            && self.sender.is_client_addressable_object()
            && self.target.is_client_grain()
    }

    /// Synthesize the unrecoverable rejection response sent back to the
    /// silo when a sender worker finds no [`crate::client_state::ClientState`]
    /// for the intended recipient (see §7, "Unknown client on send")
    pub fn unrecoverable_rejection(request: &Message, client: &ClientId) -> Self {
        Message {
            kind: MessageKind::Response,
            sender: request.target.clone(),
            target: request.sender.clone(),
            sending_silo: None,
            target_silo: request.sending_silo.clone(),
            payload: format!("unrecoverable: unknown client {client}").into_bytes(),
        }
    }
}
