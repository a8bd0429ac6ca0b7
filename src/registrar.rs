//! Client observer registrar (external collaborator, §6)
//!
//! A thin notification seam: the registry tells the registrar when a
//! `ClientId` starts or stops being known, mirroring the way the teacher's
//! cluster membership module notifies its own peer-observer list on join and
//! part, without the registry itself caring who is listening.

use crate::ids::ClientId;

/// Observer of client lifecycle events. Default methods are no-ops so a
/// gateway that doesn't need this hookup can ignore it entirely.
pub trait ClientObserverRegistrar: Send + Sync {
    fn client_added(&self, _client_id: &ClientId) {}
    fn client_dropped(&self, _client_id: &ClientId) {}
}

/// Registrar that observes nothing, used when no external registrar is wired up.
#[derive(Default)]
pub struct NullRegistrar;

impl ClientObserverRegistrar for NullRegistrar {}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn null_registrar_accepts_both_events_without_panicking() {
        let registrar = NullRegistrar;
        registrar.client_added(&ClientId::from("a"));
        registrar.client_dropped(&ClientId::from("a"));
    }
}
