//! Atomic gateway counters
//!
//! Plain `AtomicUsize` fields read by an operator, not a metrics backend
//! (the spec's observability non-goal excludes those); exposed the same
//! unadorned way the teacher reports its own `Server` health.

use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Default)]
pub struct GatewayStats {
    connected_clients: AtomicUsize,
    clients_dropped: AtomicUsize,
    sends_failed: AtomicUsize,
}

impl GatewayStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn client_connected(&self) {
        self.connected_clients.fetch_add(1, Ordering::Relaxed);
    }

    pub fn client_disconnected(&self) {
        self.connected_clients.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn client_dropped(&self) {
        self.clients_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn send_failed(&self) {
        self.sends_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connected_clients(&self) -> usize {
        self.connected_clients.load(Ordering::Relaxed)
    }

    pub fn clients_dropped(&self) -> usize {
        self.clients_dropped.load(Ordering::Relaxed)
    }

    pub fn sends_failed(&self) -> usize {
        self.sends_failed.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn counters_move_independently() {
        let stats = GatewayStats::new();
        stats.client_connected();
        stats.client_connected();
        stats.client_disconnected();
        stats.send_failed();

        assert_eq!(stats.connected_clients(), 1);
        assert_eq!(stats.sends_failed(), 1);
        assert_eq!(stats.clients_dropped(), 0);
    }
}
