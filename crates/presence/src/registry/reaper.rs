//! Background eviction of stale client records.
//!
//! The reaper is a full-scan sweep on a fixed period, not a per-record
//! timer. Eviction latency is bounded by staleness threshold plus sweep
//! interval, which is plenty for a liveness registry. The sweep takes the
//! store lock once per record, so foreground registrations and renewals are
//! never starved for longer than one record's check.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::store::ClientStore;
use super::types::ExpireOutcome;

/// Timing knobs for the reaper loop.
#[derive(Debug, Clone, Copy)]
pub struct ReaperConfig {
    /// Pause between full sweeps.
    pub sweep_interval: Duration,
    /// Maximum allowed gap between a record's `last_seen` and the sweep
    /// clock before the record is evicted.
    pub staleness_threshold: Duration,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(30),
            staleness_threshold: Duration::from_secs(120),
        }
    }
}

/// One full pass over the store, evicting every record whose `last_seen` is
/// more than `threshold` behind `now`. Returns the number of evictions.
///
/// `now` is a parameter so tests can sweep with a shifted clock instead of
/// waiting out the threshold.
pub fn sweep(store: &ClientStore, now: Instant, threshold: Duration) -> usize {
    let mut evicted = 0;
    for (identity, _) in store.list() {
        if store.expire_if_stale(&identity, now, threshold) == ExpireOutcome::Expired {
            info!(%identity, "evicted stale client");
            evicted += 1;
        }
    }
    evicted
}

/// Run periodic sweeps until the shutdown channel fires or its sender is
/// dropped.
pub async fn run_reaper(
    store: Arc<ClientStore>,
    config: ReaperConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(config.sweep_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // An interval's first tick completes immediately; consume it so the
    // first sweep happens one full interval after startup.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let evicted = sweep(&store, Instant::now(), config.staleness_threshold);
                if evicted > 0 {
                    info!(evicted, live = store.len(), "sweep complete");
                } else {
                    debug!(live = store.len(), "sweep complete, nothing stale");
                }
            }
            _ = shutdown.changed() => break,
        }
    }
    debug!("reaper stopped");
}
