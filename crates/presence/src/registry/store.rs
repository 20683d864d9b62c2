//! The client store: a shared map of identity token to [`ClientRecord`].
//!
//! All operations take one whole-map lock for the duration of a single
//! logical step, so concurrent callers always observe the result of some
//! serial order of their operations. The map is small (tens to low thousands
//! of entries) and every critical section is memory-only, so a single
//! `parking_lot::Mutex` is enough.

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::identity::{IdentitySource, RandomIdentities};
use super::types::{ClientRecord, ExpireOutcome, RemoveOutcome, RenewOutcome};

/// Concurrent registry of live clients.
///
/// The store exclusively owns its records. Callers pass identity tokens
/// across the boundary and get copies of record data back, never references
/// into the map.
pub struct ClientStore {
    clients: Mutex<HashMap<String, ClientRecord>>,
    identities: Box<dyn IdentitySource>,
}

impl ClientStore {
    /// Store with randomly generated identities.
    #[must_use]
    pub fn new() -> Self {
        Self::with_identity_source(Box::new(RandomIdentities))
    }

    /// Store drawing identity candidates from `identities`. Used by tests to
    /// make the collision-retry loop deterministic.
    #[must_use]
    pub fn with_identity_source(identities: Box<dyn IdentitySource>) -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            identities,
        }
    }

    /// Register a new client, returning its freshly issued identity.
    ///
    /// Candidates are redrawn until one does not collide with a live
    /// identity. With a 62^8 token space a second collision in a row already
    /// means the source is broken, so the loop is bounded only by uniqueness.
    pub fn register(&self, origin: IpAddr) -> String {
        let mut clients = self.clients.lock();
        let identity = loop {
            let candidate = self.identities.candidate();
            if !clients.contains_key(&candidate) {
                break candidate;
            }
        };
        clients.insert(
            identity.clone(),
            ClientRecord {
                origin,
                last_seen: Instant::now(),
            },
        );
        identity
    }

    /// Refresh `last_seen` and `origin` for a live identity.
    ///
    /// `origin` is taken as-is; a client renewing from a new address simply
    /// has its origin overwritten.
    pub fn renew(&self, identity: &str, origin: IpAddr) -> RenewOutcome {
        match self.clients.lock().get_mut(identity) {
            Some(record) => {
                record.origin = origin;
                record.last_seen = Instant::now();
                RenewOutcome::Renewed
            }
            None => RenewOutcome::Unknown,
        }
    }

    /// Remove the record iff it has not been seen within `threshold` of `now`.
    ///
    /// The freshness check and the removal happen under one lock, so a
    /// renewal racing this call lands either entirely before it (record kept
    /// with a fresh `last_seen`) or entirely after it (renewal sees
    /// [`RenewOutcome::Unknown`]).
    pub fn expire_if_stale(
        &self,
        identity: &str,
        now: Instant,
        threshold: Duration,
    ) -> ExpireOutcome {
        let mut clients = self.clients.lock();
        match clients.get(identity) {
            Some(record) if now.saturating_duration_since(record.last_seen) > threshold => {
                clients.remove(identity);
                ExpireOutcome::Expired
            }
            _ => ExpireOutcome::Kept,
        }
    }

    /// Snapshot of all live `(identity, origin)` pairs. Order is whatever the
    /// map yields.
    #[must_use]
    pub fn list(&self) -> Vec<(String, IpAddr)> {
        self.clients
            .lock()
            .iter()
            .map(|(identity, record)| (identity.clone(), record.origin))
            .collect()
    }

    /// Unconditionally remove an identity. Removing an absent identity is not
    /// an error; the outcome reports which case occurred.
    pub fn remove(&self, identity: &str) -> RemoveOutcome {
        match self.clients.lock().remove(identity) {
            Some(_) => RemoveOutcome::Removed,
            None => RemoveOutcome::NotFound,
        }
    }

    /// When the identity is live, the monotonic instant it was last seen.
    #[must_use]
    pub fn last_seen(&self, identity: &str) -> Option<Instant> {
        self.clients
            .lock()
            .get(identity)
            .map(|record| record.last_seen)
    }

    /// Number of live records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ClientStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::identity::is_valid_identity;
    use std::collections::{HashSet, VecDeque};
    use std::net::Ipv4Addr;
    use std::sync::Arc;

    /// Identity source that replays a scripted sequence of candidates.
    struct ScriptedIdentities {
        queue: Mutex<VecDeque<&'static str>>,
    }

    impl ScriptedIdentities {
        fn new(candidates: &[&'static str]) -> Self {
            Self {
                queue: Mutex::new(candidates.iter().copied().collect()),
            }
        }
    }

    impl IdentitySource for ScriptedIdentities {
        fn candidate(&self) -> String {
            self.queue
                .lock()
                .pop_front()
                .expect("scripted identity sequence exhausted")
                .to_string()
        }
    }

    fn origin(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    #[test]
    fn test_register_issues_unique_valid_identities() {
        let store = ClientStore::new();
        let mut seen = HashSet::new();
        for _ in 0..100 {
            let identity = store.register(origin(1));
            assert!(is_valid_identity(&identity));
            assert!(seen.insert(identity), "identity issued twice");
        }
        assert_eq!(store.len(), 100);
    }

    #[test]
    fn test_register_retries_colliding_candidates() {
        let store = ClientStore::with_identity_source(Box::new(ScriptedIdentities::new(&[
            "AAAAAAAA", "AAAAAAAA", "AAAAAAAA", "BBBBBBBB",
        ])));
        assert_eq!(store.register(origin(1)), "AAAAAAAA");
        // The next two candidates collide with the live record and must be
        // discarded.
        assert_eq!(store.register(origin(2)), "BBBBBBBB");
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_renew_after_register_succeeds() {
        let store = ClientStore::new();
        let identity = store.register(origin(1));
        assert_eq!(store.renew(&identity, origin(1)), RenewOutcome::Renewed);
    }

    #[test]
    fn test_renew_refreshes_last_seen() {
        let store = ClientStore::new();
        let identity = store.register(origin(1));
        let registered_at = store.last_seen(&identity).unwrap();
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(store.renew(&identity, origin(1)), RenewOutcome::Renewed);
        assert!(store.last_seen(&identity).unwrap() > registered_at);
    }

    #[test]
    fn test_renew_overwrites_origin() {
        let store = ClientStore::new();
        let identity = store.register(origin(1));
        store.renew(&identity, origin(7));
        let listed = store.list();
        assert_eq!(listed, vec![(identity, origin(7))]);
    }

    #[test]
    fn test_renew_unknown_identity() {
        let store = ClientStore::new();
        assert_eq!(store.renew("ZZZZZZZZ", origin(1)), RenewOutcome::Unknown);
        let identity = store.register(origin(1));
        store.remove(&identity);
        assert_eq!(store.renew(&identity, origin(1)), RenewOutcome::Unknown);
    }

    #[test]
    fn test_expire_if_stale_removes_only_stale_records() {
        let store = ClientStore::new();
        let identity = store.register(origin(1));
        let threshold = Duration::from_secs(120);

        let fresh_now = Instant::now();
        assert_eq!(
            store.expire_if_stale(&identity, fresh_now, threshold),
            ExpireOutcome::Kept
        );

        let stale_now = Instant::now() + Duration::from_secs(200);
        assert_eq!(
            store.expire_if_stale(&identity, stale_now, threshold),
            ExpireOutcome::Expired
        );
        assert!(store.is_empty());
        assert_eq!(store.renew(&identity, origin(1)), RenewOutcome::Unknown);
    }

    #[test]
    fn test_expire_if_stale_on_absent_identity_is_kept() {
        let store = ClientStore::new();
        assert_eq!(
            store.expire_if_stale("ZZZZZZZZ", Instant::now(), Duration::ZERO),
            ExpireOutcome::Kept
        );
    }

    #[test]
    fn test_expire_tolerates_now_before_last_seen() {
        // A renewal can land between the sweep reading its clock and visiting
        // this record, putting last_seen ahead of the sweep's `now`.
        let store = ClientStore::new();
        let identity = store.register(origin(1));
        let earlier = Instant::now() - Duration::from_secs(10);
        assert_eq!(
            store.expire_if_stale(&identity, earlier, Duration::ZERO),
            ExpireOutcome::Kept
        );
    }

    #[test]
    fn test_remove_is_idempotent() {
        let store = ClientStore::new();
        let identity = store.register(origin(1));
        assert_eq!(store.remove(&identity), RemoveOutcome::Removed);
        assert_eq!(store.remove(&identity), RemoveOutcome::NotFound);
    }

    #[test]
    fn test_list_snapshots_all_live_records() {
        let store = ClientStore::new();
        let a = store.register(origin(1));
        let b = store.register(origin(2));
        let listed: HashSet<_> = store.list().into_iter().collect();
        assert_eq!(listed.len(), 2);
        assert!(listed.contains(&(a, origin(1))));
        assert!(listed.contains(&(b, origin(2))));
    }

    #[test]
    fn test_concurrent_renew_and_expire_settle_to_one_order() {
        // Hammer one identity with renewals and expiries from two threads.
        // Whatever interleaving happens, the record must end up either gone
        // or fresh; never present-but-stale.
        let store = Arc::new(ClientStore::new());
        let identity = store.register(origin(1));
        let threshold = Duration::from_millis(1);

        let renewer = {
            let store = Arc::clone(&store);
            let identity = identity.clone();
            std::thread::spawn(move || {
                for _ in 0..1000 {
                    store.renew(&identity, origin(1));
                }
            })
        };
        let reaper = {
            let store = Arc::clone(&store);
            let identity = identity.clone();
            std::thread::spawn(move || {
                for _ in 0..1000 {
                    store.expire_if_stale(&identity, Instant::now(), threshold);
                }
            })
        };
        renewer.join().unwrap();
        reaper.join().unwrap();

        if let Some(last_seen) = store.last_seen(&identity) {
            assert!(Instant::now().saturating_duration_since(last_seen) < Duration::from_secs(5));
            assert_eq!(store.len(), 1);
        } else {
            assert!(store.is_empty());
        }
    }
}
