/*!
# telemetry-cache: a bounded, time-indexed window over live telemetry

`telemetry-cache` keeps the most recent records of a continuous, multi-source telemetry stream in memory
and answers two reads while ingestion carries on: "most recent record" and "all records within a time
interval".

## Key Features

### Bounded Retention
- Fixed capacity chosen at construction; the oldest record is evicted on overflow
- Time bounds of the retained window are recomputed on eviction, never left stale
- Timestamp index for O(1) latest and point lookups

### Safe Concurrent Access
- Any number of producers may insert while readers query
- One lock covers the sequence, the index and the bounds, so every read is a consistent snapshot

### Arrow Flight Serving
- `do_get` tickets for the latest record and for time ranges
- Range results stream one record batch per record

## Usage

```rust
use telemetry_cache::{Record, RecordStore, TelemetryCache, TelemetryQuery};
use std::sync::Arc;

let store = Arc::new(RecordStore::new(1000).unwrap());
store.insert(Record::new(1, 42, 50.45, 30.52));

let query = TelemetryQuery::new(store.clone());
assert_eq!(query.get_latest().unwrap().speed, 42);
```
*/

pub mod client;
pub mod error;
pub mod query;
pub mod record;
pub mod schema;
pub mod service;
pub mod store;

pub use client::TelemetryClient;
pub use error::CacheError;
pub use query::TelemetryQuery;
pub use record::Record;
pub use service::{QueryCommand, TelemetryFlightService};
pub use store::{RecordStore, TelemetryCache, TimeBounds};
