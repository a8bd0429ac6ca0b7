//! Identities used throughout the gateway: clients, actors and silos

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a connected client process
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientId(pub String);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ClientId {
    fn from(value: String) -> Self {
        ClientId(value)
    }
}

impl From<&str> for ClientId {
    fn from(value: &str) -> Self {
        ClientId(value.to_string())
    }
}

/// Opaque network identity of a cluster node
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SiloAddress(pub String);

impl fmt::Display for SiloAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SiloAddress {
    fn from(value: String) -> Self {
        SiloAddress(value)
    }
}

impl From<&str> for SiloAddress {
    fn from(value: &str) -> Self {
        SiloAddress(value.to_string())
    }
}

/// What kind of endpoint an [`ActorId`] refers to
///
/// Ordinary grains live on some silo; client grains and client-addressable
/// objects live on a client process and are only reachable via whichever
/// gateway that client is attached to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActorKind {
    Grain,
    ClientGrain,
    ClientAddressableObject,
}

/// Identifier of an actor (grain or client-addressable object)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorId {
    pub kind: ActorKind,
    pub id: String,
}

impl ActorId {
    pub fn grain(id: impl Into<String>) -> Self {
        ActorId {
            kind: ActorKind::Grain,
            id: id.into(),
        }
    }

    pub fn client_grain(id: impl Into<String>) -> Self {
        ActorId {
            kind: ActorKind::ClientGrain,
            id: id.into(),
        }
    }

    pub fn client_addressable_object(id: impl Into<String>) -> Self {
        ActorId {
            kind: ActorKind::ClientAddressableObject,
            id: id.into(),
        }
    }

    pub fn is_client_grain(&self) -> bool {
        self.kind == ActorKind::ClientGrain
    }

    pub fn is_client_addressable_object(&self) -> bool {
        self.kind == ActorKind::ClientAddressableObject
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}/{}", self.kind, self.id)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn predicates_match_kind() {
        let grain = ActorId::client_grain("g1");
        assert!(grain.is_client_grain());
        assert!(!grain.is_client_addressable_object());

        let cao = ActorId::client_addressable_object("o1");
        assert!(cao.is_client_addressable_object());
        assert!(!cao.is_client_grain());

        let plain = ActorId::grain("s1");
        assert!(!plain.is_client_grain());
        assert!(!plain.is_client_addressable_object());
    }
}
