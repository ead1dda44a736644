//! Tombstone reaper: deferred permanent purge of soft-deleted records.
//!
//! Soft-deleted tabs, templates, and gadgets stay in the store as
//! tombstones until their deletion timestamp ages past the undo window,
//! at which point a sweep permanently removes them. Purge is irreversible:
//! a later undelete for a purged id fails.
//!
//! # Triggers
//!
//! A sweep runs piggybacked on every delete operation, which bounds
//! tombstone accumulation under write-light workloads. The reaper can
//! additionally run on its own timer ([`TombstoneReaper::spawn_periodic`])
//! so tombstones also expire in read-heavy deployments where deletes are
//! rare.
//!
//! # Purge Ordering
//!
//! Gadgets are purged before their owning template, and a template is
//! purged only once no tab in any lifecycle state references it. A
//! template tombstoned by a cascade therefore becomes purgeable in the
//! same sweep that removes its expired tabs.

use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use plaza_core::clock::SharedClock;

use crate::store::{LayoutStore, Tables};

/// Undo-window policy for soft-deleted records.
///
/// Controls how long a tombstone remains undeletable before a sweep may
/// purge it permanently.
///
/// # Example
///
/// ```rust
/// use plaza_layout::reaper::UndoPolicy;
///
/// // Use the default 20-minute window
/// let policy = UndoPolicy::default();
///
/// // Or customize
/// let policy = UndoPolicy {
///     undelete_window_minutes: 45,
/// };
/// assert!(policy.validate().is_none());
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UndoPolicy {
    /// Minutes a tombstone stays undeletable before it may be purged.
    ///
    /// The window is a lower bound: a tombstone is guaranteed to survive
    /// this long, but lives until the next sweep actually runs.
    pub undelete_window_minutes: u32,
}

/// Default undo window (20 minutes).
const DEFAULT_UNDELETE_WINDOW_MINUTES: u32 = 20;

impl Default for UndoPolicy {
    fn default() -> Self {
        Self {
            undelete_window_minutes: DEFAULT_UNDELETE_WINDOW_MINUTES,
        }
    }
}

impl UndoPolicy {
    /// Creates a policy with the given window.
    #[must_use]
    pub const fn new(undelete_window_minutes: u32) -> Self {
        Self {
            undelete_window_minutes,
        }
    }

    /// Creates a policy suitable for development/testing with a short window.
    #[must_use]
    pub const fn development() -> Self {
        Self {
            undelete_window_minutes: 1,
        }
    }

    /// Validates the policy settings are reasonable.
    ///
    /// Returns an error message if validation fails.
    #[must_use]
    pub fn validate(&self) -> Option<String> {
        if self.undelete_window_minutes == 0 {
            return Some("undelete_window_minutes must be at least 1".to_string());
        }
        None
    }

    /// The instant before which a tombstone is expired, relative to `now`.
    #[must_use]
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - chrono::Duration::minutes(i64::from(self.undelete_window_minutes))
    }
}

/// Result of one reaper sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Gadget tombstones purged.
    pub gadgets_purged: u64,
    /// Tab tombstones purged.
    pub tabs_purged: u64,
    /// Template tombstones purged.
    pub templates_purged: u64,
}

impl SweepOutcome {
    /// Total tombstones purged across all entity kinds.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.gadgets_purged + self.tabs_purged + self.templates_purged
    }

    /// Returns true if the sweep purged nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Permanently removes every expired tombstone from the tables.
///
/// Crate-internal so delete operations can piggyback a sweep inside their
/// own transaction.
pub(crate) fn purge_expired(tables: &mut Tables, cutoff: DateTime<Utc>) -> SweepOutcome {
    let mut outcome = SweepOutcome::default();

    let before = tables.gadgets.len();
    tables
        .gadgets
        .retain(|_, g| !(g.deleted && g.date_deleted.is_some_and(|at| at < cutoff)));
    outcome.gadgets_purged = u64::try_from(before - tables.gadgets.len()).unwrap_or(u64::MAX);

    let before = tables.tabs.len();
    tables
        .tabs
        .retain(|_, t| !(t.deleted && t.date_deleted.is_some_and(|at| at < cutoff)));
    outcome.tabs_purged = u64::try_from(before - tables.tabs.len()).unwrap_or(u64::MAX);

    // Templates only fall once nothing references them; a template whose
    // last tab was purged above becomes eligible in this same pass.
    let expired: Vec<_> = tables
        .templates
        .values()
        .filter(|tpl| {
            tpl.deleted
                && tpl.date_deleted.is_some_and(|at| at < cutoff)
                && tables.tab_count_for_template(tpl.id) == 0
        })
        .map(|tpl| tpl.id)
        .collect();
    for template_id in expired {
        tables.templates.remove(&template_id);
        outcome.templates_purged += 1;
    }

    outcome
}

/// Emits the structured log + metrics for a completed sweep.
pub(crate) fn log_sweep(trigger: &'static str, outcome: SweepOutcome, duration_secs: f64) {
    tracing::info!(
        trigger,
        gadgets_purged = outcome.gadgets_purged,
        tabs_purged = outcome.tabs_purged,
        templates_purged = outcome.templates_purged,
        duration_secs,
        metric = "plaza_reaper_sweep_completed",
        "reaper sweep completed"
    );
    crate::metrics::record_sweep(
        trigger,
        outcome.gadgets_purged,
        outcome.tabs_purged,
        outcome.templates_purged,
        duration_secs,
    );
}

/// The tombstone reaper.
///
/// Shares the layout store's transaction discipline: a sweep holds the
/// same lock as mutation operations, so it can never purge a tombstone
/// that a concurrent undelete is about to reactivate.
pub struct TombstoneReaper {
    store: Arc<LayoutStore>,
    policy: UndoPolicy,
    clock: SharedClock,
}

impl TombstoneReaper {
    /// Creates a reaper over the given store.
    #[must_use]
    pub fn new(store: Arc<LayoutStore>, policy: UndoPolicy, clock: SharedClock) -> Self {
        Self {
            store,
            policy,
            clock,
        }
    }

    /// Runs one sweep, purging every expired tombstone.
    pub fn sweep(&self) -> SweepOutcome {
        let start = Instant::now();
        let cutoff = self.policy.cutoff(self.clock.now());
        let outcome = self.store.write(|t| purge_expired(t, cutoff));
        log_sweep("timer", outcome, start.elapsed().as_secs_f64());
        outcome
    }

    /// Starts a background thread sweeping every `interval`.
    ///
    /// The returned handle stops the thread when dropped or when
    /// [`ReaperHandle::stop`] is called.
    ///
    /// # Panics
    ///
    /// Panics if the OS refuses to spawn the thread.
    #[must_use]
    pub fn spawn_periodic(reaper: Arc<Self>, interval: Duration) -> ReaperHandle {
        let shared = Arc::new((Mutex::new(false), Condvar::new()));
        let thread_shared = Arc::clone(&shared);
        let join = thread::Builder::new()
            .name("plaza-reaper".to_string())
            .spawn(move || {
                let (stop_flag, wakeup) = &*thread_shared;
                let mut stopped = stop_flag.lock().expect("reaper stop flag poisoned");
                loop {
                    let (guard, timeout) = wakeup
                        .wait_timeout(stopped, interval)
                        .expect("reaper stop flag poisoned");
                    stopped = guard;
                    if *stopped {
                        break;
                    }
                    if timeout.timed_out() {
                        drop(stopped);
                        reaper.sweep();
                        stopped = stop_flag.lock().expect("reaper stop flag poisoned");
                    }
                }
            })
            .expect("failed to spawn reaper thread");
        ReaperHandle {
            shared,
            join: Some(join),
        }
    }
}

/// Handle to a periodic reaper thread.
pub struct ReaperHandle {
    shared: Arc<(Mutex<bool>, Condvar)>,
    join: Option<thread::JoinHandle<()>>,
}

impl ReaperHandle {
    /// Stops the reaper thread and waits for it to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let (stop_flag, wakeup) = &*self.shared;
        if let Ok(mut stopped) = stop_flag.lock() {
            *stopped = true;
        }
        wakeup.notify_all();
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl Drop for ReaperHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
