//! Shared table of sign assignments and layout frame positions.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, trace};

use crate::models::CloudSign;
use crate::registry::LocationKey;

struct Inner<T> {
    signs: HashMap<T, CloudSign<T>>,
    frame_indexes: HashMap<String, usize>,
    frame_updates: HashMap<String, Instant>,
}

/// Counts reported by [`SignState::stats`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StateStats {
    pub signs: usize,
    pub assigned: usize,
    pub layouts: usize,
}

/// Every operation runs under one lock, so a reader never sees a half-written
/// assignment and read-then-write operations are atomic.
pub struct SignState<T> {
    inner: Mutex<Inner<T>>,
}

impl<T: LocationKey> SignState<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                signs: HashMap::new(),
                frame_indexes: HashMap::new(),
                frame_updates: HashMap::new(),
            }),
        }
    }

    pub async fn get(&self, location: &T) -> Option<CloudSign<T>> {
        self.inner.lock().await.signs.get(location).cloned()
    }

    /// Overwrite the sign at its location. Returns the previous one.
    pub async fn put(&self, sign: CloudSign<T>) -> Option<CloudSign<T>> {
        let mut inner = self.inner.lock().await;
        debug!(location = ?sign.location, server = ?sign.server_id(), "updated cloud sign");
        inner.signs.insert(sign.location.clone(), sign)
    }

    pub async fn remove(&self, location: &T) -> Option<CloudSign<T>> {
        let removed = self.inner.lock().await.signs.remove(location);
        if removed.is_some() {
            debug!(location = ?location, "removed cloud sign");
        }
        removed
    }

    /// Drop every sign whose location is not in `keep`. Returns the dropped
    /// locations.
    pub async fn retain_locations(&self, keep: &HashSet<T>) -> Vec<T> {
        let mut inner = self.inner.lock().await;
        let dropped: Vec<T> = inner
            .signs
            .keys()
            .filter(|location| !keep.contains(*location))
            .cloned()
            .collect();
        for location in &dropped {
            inner.signs.remove(location);
        }
        dropped
    }

    pub async fn signs(&self) -> Vec<CloudSign<T>> {
        self.inner.lock().await.signs.values().cloned().collect()
    }

    pub async fn is_server_assigned(&self, server_id: &str) -> bool {
        self.inner
            .lock()
            .await
            .signs
            .values()
            .any(|s| s.server_id() == Some(server_id))
    }

    /// Unique ids of every assigned server, read under a single lock.
    pub async fn assigned_server_ids(&self) -> HashSet<String> {
        self.inner
            .lock()
            .await
            .signs
            .values()
            .filter_map(|s| s.server_id().map(str::to_string))
            .collect()
    }

    pub async fn frame_index(&self, layout: &str) -> usize {
        self.inner
            .lock()
            .await
            .frame_indexes
            .get(layout)
            .copied()
            .unwrap_or(0)
    }

    /// True when `interval` has passed since the last advance, or when the
    /// layout has never been advanced.
    pub async fn should_advance(&self, layout: &str, interval: Duration, now: Instant) -> bool {
        let inner = self.inner.lock().await;
        is_due(&inner, layout, interval, now)
    }

    /// Move to the next frame and stamp `now`.
    ///
    /// The first call for a layout only starts its clock at frame 0.
    /// `frame_count == 0` leaves the index untouched.
    pub async fn advance_frame_index(&self, layout: &str, frame_count: usize, now: Instant) -> usize {
        let mut inner = self.inner.lock().await;
        advance(&mut inner, layout, frame_count, now)
    }

    /// [`should_advance`](Self::should_advance) and
    /// [`advance_frame_index`](Self::advance_frame_index) under one lock.
    /// Returns the new index when the layout advanced.
    pub async fn advance_if_due(
        &self,
        layout: &str,
        frame_count: usize,
        interval: Duration,
        now: Instant,
    ) -> Option<usize> {
        let mut inner = self.inner.lock().await;
        if !is_due(&inner, layout, interval, now) {
            return None;
        }
        Some(advance(&mut inner, layout, frame_count, now))
    }

    pub async fn stats(&self) -> StateStats {
        let inner = self.inner.lock().await;
        StateStats {
            signs: inner.signs.len(),
            assigned: inner.signs.values().filter(|s| s.server.is_some()).count(),
            layouts: inner.frame_indexes.len(),
        }
    }

    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        inner.signs.clear();
        inner.frame_indexes.clear();
        inner.frame_updates.clear();
        info!("sign state cleared");
    }
}

impl<T: LocationKey> Default for SignState<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn is_due<T>(inner: &Inner<T>, layout: &str, interval: Duration, now: Instant) -> bool {
    match inner.frame_updates.get(layout) {
        Some(last) => now.saturating_duration_since(*last) >= interval,
        None => true,
    }
}

fn advance<T>(inner: &mut Inner<T>, layout: &str, frame_count: usize, now: Instant) -> usize {
    if frame_count == 0 {
        return inner.frame_indexes.get(layout).copied().unwrap_or(0);
    }
    let next = match inner.frame_indexes.get(layout) {
        Some(index) => (index + 1) % frame_count,
        None => 0,
    };
    inner.frame_indexes.insert(layout.to_string(), next);
    inner.frame_updates.insert(layout.to_string(), now);
    trace!(layout, index = next, "advanced frame");
    next
}
