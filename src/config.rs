//! Tunables for the gateway

use std::time::Duration;

/// Configuration for a [`crate::gateway::Gateway`]
///
/// `grace_window` and `response_timeout` both come from the host silo's own
/// configuration in the original design; they are grouped here since this
/// crate does not otherwise define a silo-wide config type.
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    /// Size of the fixed sender-worker pool. Must be at least 1.
    pub gateway_sender_queues: usize,

    /// How long a client may stay disconnected before it is dropped
    pub grace_window: Duration,

    /// Used to derive the reply-route cache TTL (`5 * response_timeout`)
    pub response_timeout: Duration,

    /// How often the cleanup agent wakes up to sweep disconnected clients
    /// and expired routes. The design ties this to `grace_window`.
    pub cleanup_interval: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            gateway_sender_queues: 8,
            grace_window: Duration::from_secs(60),
            response_timeout: Duration::from_secs(5),
            cleanup_interval: Duration::from_secs(60),
        }
    }
}

impl GatewayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// TTL for reply-route cache entries: `5 * response_timeout`
    pub fn route_cache_ttl(&self) -> Duration {
        self.response_timeout * 5
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn route_cache_ttl_is_five_times_response_timeout() {
        let config = GatewayConfig {
            response_timeout: Duration::from_secs(2),
            ..GatewayConfig::default()
        };
        assert_eq!(config.route_cache_ttl(), Duration::from_secs(10));
    }
}
