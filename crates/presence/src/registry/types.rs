//! Record and outcome types for the client registry.

use std::net::IpAddr;
use std::time::Instant;

/// One registered, currently-live client.
///
/// The identity token is the map key in [`ClientStore`](super::ClientStore),
/// not a field here. `last_seen` is monotonic time so staleness comparisons
/// are immune to wall-clock jumps.
#[derive(Debug, Clone, Copy)]
pub struct ClientRecord {
    /// Address of the most recent registration or renewal.
    pub origin: IpAddr,
    /// Set at registration and refreshed on every successful renewal.
    pub last_seen: Instant,
}

/// Result of a renewal attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewOutcome {
    /// The identity is live; `last_seen` and `origin` were updated.
    Renewed,
    /// The identity was never issued, or has already been evicted or removed.
    /// The client holding it must register again.
    Unknown,
}

/// Result of a staleness check against one identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpireOutcome {
    /// The record was stale and has been removed.
    Expired,
    /// The record is still fresh, or the identity was not present.
    Kept,
}

/// Result of an unconditional removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    NotFound,
}
