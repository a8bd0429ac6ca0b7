//! Cross-gateway reply routing (component A)
//!
//! When a client grain calls a client-addressable object, the call may be
//! served by a different gateway than the one the owning client is attached
//! to. This cache remembers, per [`ClientId`], which [`SiloAddress`] last
//! forwarded such a call, so the eventual response can be routed back there
//! instead of broadcasting it.
//!
//! Modeled on the lock-free hot map in the teacher's own registry
//! (`papaya::HashMap`), since this table is read on every response and
//! written on every cross-gateway request — exactly the access pattern
//! papaya is built for.

use std::time::{Duration, Instant};

use papaya::HashMap as PapayaMap;

use crate::ids::{ClientId, SiloAddress};

struct Route {
    silo: SiloAddress,
    last_seen: Instant,
}

/// Reply-route cache: `ClientId -> (SiloAddress, last_seen)`
pub struct ReplyRouteCache {
    routes: PapayaMap<ClientId, Route>,
    ttl: Duration,
}

impl ReplyRouteCache {
    pub fn new(ttl: Duration) -> Self {
        ReplyRouteCache {
            routes: PapayaMap::new(),
            ttl,
        }
    }

    /// Record that `silo` just forwarded a call on behalf of `client`
    pub fn record(&self, client: ClientId, silo: SiloAddress) {
        let guard = self.routes.guard();
        self.routes.insert(
            client,
            Route {
                silo,
                last_seen: Instant::now(),
            },
            &guard,
        );
    }

    /// Look up the last silo that forwarded a call for `client`. No
    /// freshness check: a stale-but-not-yet-swept entry is returned
    /// intentionally, since the caller tolerates a routing retry and
    /// expiry is handled solely by [`Self::sweep_expired`].
    pub fn lookup(&self, client: &ClientId) -> Option<SiloAddress> {
        let guard = self.routes.guard();
        self.routes.get(client, &guard).map(|route| route.silo.clone())
    }

    /// Drop every entry older than the configured TTL. Run periodically by
    /// the cleanup agent (component G).
    pub fn sweep_expired(&self) -> usize {
        let guard = self.routes.guard();
        let mut removed = 0;
        for (client, route) in self.routes.iter(&guard) {
            if route.last_seen.elapsed() > self.ttl {
                self.routes.remove(client, &guard);
                removed += 1;
            }
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn records_and_looks_up() {
        let cache = ReplyRouteCache::new(Duration::from_secs(60));
        let client = ClientId::from("c1");
        cache.record(client.clone(), SiloAddress::from("silo-a"));
        assert_eq!(cache.lookup(&client).unwrap(), SiloAddress::from("silo-a"));
    }

    #[test]
    fn unknown_client_misses() {
        let cache = ReplyRouteCache::new(Duration::from_secs(60));
        assert!(cache.lookup(&ClientId::from("ghost")).is_none());
    }

    #[test]
    fn stale_entry_is_still_returned_until_swept() {
        let cache = ReplyRouteCache::new(Duration::from_millis(0));
        let client = ClientId::from("c1");
        cache.record(client.clone(), SiloAddress::from("silo-a"));
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.lookup(&client).unwrap(), SiloAddress::from("silo-a"));
        assert_eq!(cache.sweep_expired(), 1);
        assert!(cache.is_empty());
        assert!(cache.lookup(&client).is_none());
    }

    #[test]
    fn re_recording_refreshes_last_seen() {
        let cache = ReplyRouteCache::new(Duration::from_millis(20));
        let client = ClientId::from("c1");
        cache.record(client.clone(), SiloAddress::from("silo-a"));
        std::thread::sleep(Duration::from_millis(10));
        cache.record(client.clone(), SiloAddress::from("silo-b"));
        std::thread::sleep(Duration::from_millis(15));
        assert_eq!(cache.lookup(&client).unwrap(), SiloAddress::from("silo-b"));
    }
}
