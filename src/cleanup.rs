//! Cleanup agent (component G)
//!
//! Periodically reaps clients that have been disconnected past their grace
//! window and sweeps expired reply-route cache entries. Built the same way
//! the teacher's gossip protocol runs its own periodic `serve()` loop
//! (`peer_to_peer.rs`): sleep for the configured interval, do the work,
//! compensate the next sleep for however long the work took, and honor a
//! [`CancellationToken`] for shutdown.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info};
use tokio_util::sync::CancellationToken;

use crate::registry::ClientRegistry;
use crate::reply_route_cache::ReplyRouteCache;
use crate::silo_link::SiloMessageCenter;
use crate::stats::GatewayStats;

pub struct CleanupAgent {
    registry: Arc<ClientRegistry>,
    reply_routes: Arc<ReplyRouteCache>,
    silo_link: Arc<dyn SiloMessageCenter>,
    stats: Arc<GatewayStats>,
    grace_window: Duration,
    interval: Duration,
}

/// Outcome of a single sweep, mostly useful for tests and logging
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub clients_dropped: usize,
    pub routes_expired: usize,
}

impl CleanupAgent {
    pub fn new(
        registry: Arc<ClientRegistry>,
        reply_routes: Arc<ReplyRouteCache>,
        silo_link: Arc<dyn SiloMessageCenter>,
        stats: Arc<GatewayStats>,
        grace_window: Duration,
        interval: Duration,
    ) -> Self {
        CleanupAgent {
            registry,
            reply_routes,
            silo_link,
            stats,
            grace_window,
            interval,
        }
    }

    /// Runs until `cancellation` fires
    pub async fn run(&self, cancellation: CancellationToken) {
        info!(interval_ms:% = self.interval.as_millis(); "cleanup agent started");
        loop {
            tokio::select! {
                _ = cancellation.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }

            let started = Instant::now();
            let report = self.sweep_once().await;
            if report.clients_dropped > 0 || report.routes_expired > 0 {
                debug!(
                    clients_dropped:% = report.clients_dropped,
                    routes_expired:% = report.routes_expired;
                    "cleanup sweep finished"
                );
            }

            // Compensate for however long the sweep itself took so the
            // cadence stays close to `interval` even under load.
            let elapsed = started.elapsed();
            if elapsed < self.interval {
                tokio::select! {
                    _ = cancellation.cancelled() => break,
                    _ = tokio::time::sleep(self.interval - elapsed) => {}
                }
            }
        }
        info!("cleanup agent stopped");
    }

    /// Drops every client disconnected past the grace window and sweeps
    /// expired reply routes. Exposed separately from [`Self::run`] so tests
    /// can drive it deterministically instead of racing a timer.
    pub async fn sweep_once(&self) -> SweepReport {
        let mut clients_dropped = 0;
        let mut orphaned = Vec::new();
        for client in self.registry.all_clients() {
            if let Some(disconnected_for) = client.disconnected_for().await {
                if disconnected_for >= self.grace_window {
                    if let Some((_, freed)) = self.registry.drop_client(&client.id).await {
                        orphaned.extend(freed);
                        clients_dropped += 1;
                        self.stats.client_dropped();
                    }
                }
            }
        }
        if !orphaned.is_empty() {
            self.silo_link.record_client_drop(orphaned).await;
        }
        let routes_expired = self.reply_routes.sweep_expired();
        SweepReport {
            clients_dropped,
            routes_expired,
        }
    }
}
