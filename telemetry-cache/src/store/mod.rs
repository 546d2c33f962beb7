//! Bounded, time-indexed record store.
//!
//! The store keeps the most recent `capacity` records in insertion order
//! together with a timestamp index and the observed time bounds of the
//! retained window. Every operation takes the same mutex for its whole
//! duration, so readers always see the sequence, the index and the bounds
//! in agreement:
//!
//! ```text
//!   RecordStore
//!   └── Mutex<Window>
//!       ├── entries: RecencyList<Record>   newest ─► ... ─► oldest
//!       ├── index:   HashMap<timestamp, SlotId>
//!       └── bounds:  Option<TimeBounds>    (None while empty)
//! ```
//!
//! Inserting into a full store evicts the single oldest record in the same
//! critical section, and the bounds are recomputed from what remains.

mod list;

use crate::error::CacheError;
use crate::record::Record;
use chrono::{DateTime, Utc};
use list::{RecencyList, SlotId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Upper bound on the slots reserved up front; larger windows grow on demand.
const INITIAL_RESERVATION: usize = 4096;

/// Inclusive time bounds of the retained records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBounds {
    pub min: DateTime<Utc>,
    pub max: DateTime<Utc>,
}

impl TimeBounds {
    fn of(timestamp: DateTime<Utc>) -> Self {
        Self {
            min: timestamp,
            max: timestamp,
        }
    }

    fn widen(&mut self, timestamp: DateTime<Utc>) {
        if timestamp < self.min {
            self.min = timestamp;
        }
        if timestamp > self.max {
            self.max = timestamp;
        }
    }

    /// Returns `true` if the closed interval `[from, to]` touches these bounds.
    pub fn overlaps(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
        !(from > self.max || to < self.min)
    }
}

/// Operations shared by producers and the query path.
///
/// Implementations must be safe to call from any number of threads at once
/// and every call must appear atomic to every other call.
pub trait TelemetryCache: Send + Sync + 'static {
    /// Inserts `record` as the most recent entry, evicting the oldest entry
    /// if the cache is full.
    fn insert(&self, record: Record);

    /// Returns the most recently inserted record still retained.
    fn latest(&self) -> Option<Record>;

    /// Returns every retained record with `from < timestamp < to`, newest
    /// first.
    fn range(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<Record>, CacheError>;

    /// Returns the newest retained record stamped exactly `timestamp`.
    fn get(&self, timestamp: DateTime<Utc>) -> Option<Record>;

    /// Number of retained records.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Time bounds of the retained records, `None` while empty.
    fn bounds(&self) -> Option<TimeBounds>;
}

#[derive(Debug)]
struct Window {
    entries: RecencyList<Record>,
    index: HashMap<DateTime<Utc>, SlotId>,
    bounds: Option<TimeBounds>,
}

impl Window {
    fn evict_oldest(&mut self) {
        let Some((slot, evicted)) = self.entries.pop_back() else {
            return;
        };
        // A newer record with the same timestamp owns the index entry now.
        if self.index.get(&evicted.timestamp) == Some(&slot) {
            self.index.remove(&evicted.timestamp);
        }
        tracing::trace!(
            source_id = evicted.source_id,
            timestamp = %evicted.timestamp,
            "evicted oldest record"
        );
    }

    fn recompute_bounds(&mut self) {
        self.bounds = self.entries.iter().fold(None, |bounds, record| match bounds {
            None => Some(TimeBounds::of(record.timestamp)),
            Some(mut bounds) => {
                bounds.widen(record.timestamp);
                Some(bounds)
            }
        });
    }
}

/// Capacity-bounded, concurrency-safe record store.
#[derive(Debug)]
pub struct RecordStore {
    capacity: usize,
    window: Mutex<Window>,
}

impl RecordStore {
    /// Creates an empty store retaining at most `capacity` records.
    pub fn new(capacity: usize) -> Result<Self, CacheError> {
        if capacity == 0 {
            return Err(CacheError::InvalidCapacity);
        }
        Ok(Self {
            capacity,
            window: Mutex::new(Window {
                entries: RecencyList::with_capacity(capacity.min(INITIAL_RESERVATION)),
                index: HashMap::with_capacity(capacity.min(INITIAL_RESERVATION)),
                bounds: None,
            }),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl TelemetryCache for RecordStore {
    fn insert(&self, record: Record) {
        let mut window = self.window.lock();

        let evicted = window.entries.len() >= self.capacity;
        if evicted {
            window.evict_oldest();
        }

        let slot = window.entries.push_front(record);
        window.index.insert(record.timestamp, slot);

        if evicted {
            window.recompute_bounds();
        } else {
            let bounds = match window.bounds {
                Some(mut bounds) => {
                    bounds.widen(record.timestamp);
                    bounds
                }
                None => TimeBounds::of(record.timestamp),
            };
            window.bounds = Some(bounds);
        }

        tracing::trace!(
            source_id = record.source_id,
            timestamp = %record.timestamp,
            retained = window.entries.len(),
            "inserted record"
        );
    }

    fn latest(&self) -> Option<Record> {
        self.window.lock().entries.front().copied()
    }

    fn range(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<Record>, CacheError> {
        if from > to {
            return Err(CacheError::InvalidRange { from, to });
        }

        let window = self.window.lock();
        match window.bounds {
            Some(bounds) if bounds.overlaps(from, to) => Ok(window
                .entries
                .iter()
                .filter(|record| record.timestamp > from && record.timestamp < to)
                .copied()
                .collect()),
            available => Err(CacheError::OutOfBounds {
                from,
                to,
                available,
            }),
        }
    }

    fn get(&self, timestamp: DateTime<Utc>) -> Option<Record> {
        let window = self.window.lock();
        window
            .index
            .get(&timestamp)
            .and_then(|slot| window.entries.get(*slot))
            .copied()
    }

    fn len(&self) -> usize {
        self.window.lock().entries.len()
    }

    fn bounds(&self) -> Option<TimeBounds> {
        self.window.lock().bounds
    }
}
