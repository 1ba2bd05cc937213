//! Cache synchronization policy.
//!
//! The decisions are pure so they can be tested without a store:
//! [`SyncMode::on`] is the state machine, [`SyncMode::plan_read`] decides
//! whether a read is served from the mirror, and [`SettleStrategy`] says how
//! long to wait for a write's commit time before reconciling.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// How a collection's mirror is kept up to date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SyncMode {
    /// Nothing loaded yet.
    #[default]
    Uninitialized,
    /// A standing subscription pushes full snapshots into the mirror.
    LiveSubscribed,
    /// No subscription. The mirror changes only on explicit reloads.
    StaleOnDemand,
}

/// Things that move a collection between modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncEvent {
    /// A subscription was established.
    LiveSyncStarted,
    /// A full ordered query replaced the mirror, on request or after a write.
    ForcedReload,
    /// The first plain read found the mirror empty and loaded it.
    LazyLoad,
    /// The subscription was cancelled or its stream ended.
    LiveSyncStopped { loaded: bool },
}

/// What a list read should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadPlan {
    /// Serve the mirror, no store calls.
    ServeMirror,
    /// Query the store and replace the mirror first.
    Reload,
}

impl SyncMode {
    /// Returns the mode after `event`.
    #[must_use]
    pub fn on(self, event: SyncEvent) -> Self {
        match (self, event) {
            (_, SyncEvent::LiveSyncStarted) => Self::LiveSubscribed,
            // A live subscription absorbs reloads.
            (Self::LiveSubscribed, SyncEvent::ForcedReload | SyncEvent::LazyLoad) => {
                Self::LiveSubscribed
            }
            (_, SyncEvent::ForcedReload | SyncEvent::LazyLoad) => Self::StaleOnDemand,
            (Self::LiveSubscribed, SyncEvent::LiveSyncStopped { loaded: true }) => {
                Self::StaleOnDemand
            }
            (Self::LiveSubscribed, SyncEvent::LiveSyncStopped { loaded: false }) => {
                Self::Uninitialized
            }
            (mode, SyncEvent::LiveSyncStopped { .. }) => mode,
        }
    }

    /// Decides how to serve a list read.
    ///
    /// A forced refresh always reloads, whatever the mode. Otherwise an
    /// initialized mirror is served as is and an empty one is loaded lazily.
    pub fn plan_read(self, initialized: bool, force_refresh: bool) -> ReadPlan {
        if force_refresh || !initialized {
            ReadPlan::Reload
        } else {
            ReadPlan::ServeMirror
        }
    }

    pub fn is_live(self) -> bool {
        self == Self::LiveSubscribed
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Uninitialized => "uninitialized",
            Self::LiveSubscribed => "live",
            Self::StaleOnDemand => "on-demand",
        })
    }
}

/// How long a service waits after a successful write before reloading.
///
/// The store resolves commit timestamps asynchronously, so a reload issued
/// right after a write may still see the pending placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SettleStrategy {
    /// Reload immediately and accept whatever the store shows.
    None,
    /// Sleep for a fixed time.
    FixedDelay { delay_ms: u64 },
    /// Point-read the written document until its `updatedAt` is resolved
    /// (or, after a delete, until it is gone), at most `max_attempts` times.
    PollUntilResolved { interval_ms: u64, max_attempts: u32 },
}

impl SettleStrategy {
    pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;
    pub const DEFAULT_POLL_ATTEMPTS: u32 = 20;

    pub fn fixed(delay: Duration) -> Self {
        Self::FixedDelay {
            delay_ms: millis(delay),
        }
    }

    pub fn poll(interval: Duration, max_attempts: u32) -> Self {
        Self::PollUntilResolved {
            interval_ms: millis(interval),
            max_attempts,
        }
    }

    /// Upper bound on the time spent settling, ignoring store latency.
    pub fn max_wait(&self) -> Duration {
        match *self {
            Self::None => Duration::ZERO,
            Self::FixedDelay { delay_ms } => Duration::from_millis(delay_ms),
            Self::PollUntilResolved {
                interval_ms,
                max_attempts,
            } => Duration::from_millis(interval_ms.saturating_mul(u64::from(max_attempts))),
        }
    }
}

impl Default for SettleStrategy {
    fn default() -> Self {
        Self::PollUntilResolved {
            interval_ms: Self::DEFAULT_POLL_INTERVAL_MS,
            max_attempts: Self::DEFAULT_POLL_ATTEMPTS,
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
