use std::collections::HashSet;

use serde::Serialize;

/// Approximate time range, with both bounds rounded to a multiple of a fixed granularity and
/// stored as integer ticks of that granularity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct LockKey {
    start: i64,
    end: i64,
}

impl LockKey {
    /// Quantize `[start, end)` at the given `granularity`, in seconds.
    pub fn new(start: f64, end: f64, granularity: f64) -> Self {
        Self {
            start: to_ticks(start, granularity),
            end: to_ticks(end, granularity),
        }
    }

    pub fn start_tick(&self) -> i64 {
        self.start
    }

    pub fn end_tick(&self) -> i64 {
        self.end
    }
}

fn to_ticks(secs: f64, granularity: f64) -> i64 {
    if granularity > 0. {
        (secs / granularity).round() as i64
    } else {
        // Without granularity, deduplicate on whole milliseconds.
        (secs * 1000.).round() as i64
    }
}

/// Set of `LockKey` claimed by pending fetches.
#[derive(Debug, Default)]
pub(crate) struct FetchLockSet {
    keys: HashSet<LockKey>,
}

impl FetchLockSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Try to claim `key`.
    ///
    /// Returns `false` without doing anything if it was already held.
    pub(crate) fn acquire(&mut self, key: LockKey) -> bool {
        self.keys.insert(key)
    }

    pub(crate) fn release(&mut self, key: &LockKey) -> bool {
        self.keys.remove(key)
    }

    pub(crate) fn clear(&mut self) {
        self.keys.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.keys.len()
    }

    /// Held keys, sorted chronologically.
    pub(crate) fn keys(&self) -> Vec<LockKey> {
        let mut keys: Vec<LockKey> = self.keys.iter().copied().collect();
        keys.sort_by_key(|k| (k.start, k.end));
        keys
    }
}
