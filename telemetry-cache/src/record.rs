//! Telemetry observations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single telemetry observation from one source.
///
/// Records are produced once and never mutated afterwards; they are `Copy`
/// so the cache, producers and the query path can hand them around by value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Source identifier, starting at 1
    pub source_id: u32,
    /// Time of the observation
    pub timestamp: DateTime<Utc>,
    /// Speed in km/h
    pub speed: u32,
    /// Latitude in degrees, within [-90, 90]
    pub latitude: f64,
    /// Longitude in degrees, within [-180, 180]
    pub longitude: f64,
}

impl Record {
    /// Creates a record stamped with the current time.
    pub fn new(source_id: u32, speed: u32, latitude: f64, longitude: f64) -> Self {
        Self::at(source_id, Utc::now(), speed, latitude, longitude)
    }

    /// Creates a record with an explicit timestamp.
    pub fn at(
        source_id: u32,
        timestamp: DateTime<Utc>,
        speed: u32,
        latitude: f64,
        longitude: f64,
    ) -> Self {
        Self {
            source_id,
            timestamp,
            speed,
            latitude,
            longitude,
        }
    }

    /// Nanoseconds since the Unix epoch, or `None` if the timestamp does not
    /// fit in an `i64`.
    pub fn timestamp_nanos(&self) -> Option<i64> {
        self.timestamp.timestamp_nanos_opt()
    }
}
