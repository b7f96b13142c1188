//! Short-lived snapshot cache.
//!
//! One entry, keyed only by age. Concurrent refreshes are not coalesced; the
//! last writer wins, which is fine because snapshots are idempotent reads.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::protocol::SessionSnapshot;

pub const DEFAULT_WINDOW: Duration = Duration::from_millis(250);

pub type Snapshot = Arc<Vec<SessionSnapshot>>;

#[derive(Debug)]
struct Entry {
    at: Instant,
    data: Snapshot,
}

#[derive(Debug)]
pub struct SnapshotCache {
    window: Duration,
    entry: Mutex<Option<Entry>>,
}

impl Default for SnapshotCache {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl SnapshotCache {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            entry: Mutex::new(None),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// The cached snapshot if it is younger than the window.
    pub fn get(&self) -> Option<Snapshot> {
        let entry = self.lock();
        entry
            .as_ref()
            .filter(|e| e.at.elapsed() < self.window)
            .map(|e| Arc::clone(&e.data))
    }

    pub fn store(&self, data: Vec<SessionSnapshot>) -> Snapshot {
        let data = Arc::new(data);
        *self.lock() = Some(Entry {
            at: Instant::now(),
            data: Arc::clone(&data),
        });
        data
    }

    /// Drop the entry so the next read refreshes.
    pub fn invalidate(&self) {
        *self.lock() = None;
    }

    fn lock(&self) -> MutexGuard<'_, Option<Entry>> {
        self.entry.lock().unwrap_or_else(|e| e.into_inner())
    }
}
