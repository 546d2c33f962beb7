//! Error taxonomy for cache reads.
//!
//! All variants are local, caller-facing conditions. None of them are retried
//! internally; a caller that gets `OutOfBounds` can use the carried window to
//! issue a corrected query.

use crate::store::TimeBounds;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tonic::Status;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CacheError {
    #[error("the 'from' timestamp ({from}) must not be after the 'to' timestamp ({to})")]
    InvalidRange {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },

    #[error("requested range {from} .. {to} is out of bounds; {}", describe_window(.available))]
    OutOfBounds {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        available: Option<TimeBounds>,
    },

    #[error("no data available")]
    NotFound,

    #[error("cache capacity must be at least 1")]
    InvalidCapacity,
}

fn describe_window(available: &Option<TimeBounds>) -> String {
    match available {
        Some(bounds) => format!(
            "available range is from {} (timestamp: {}) to {} (timestamp: {})",
            bounds.min.to_rfc3339(),
            bounds.min.timestamp_nanos_opt().unwrap_or_default(),
            bounds.max.to_rfc3339(),
            bounds.max.timestamp_nanos_opt().unwrap_or_default(),
        ),
        None => "no data is retained".to_string(),
    }
}

impl From<CacheError> for Status {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::NotFound => Status::not_found(err.to_string()),
            CacheError::InvalidRange { .. } => Status::invalid_argument(err.to_string()),
            CacheError::OutOfBounds { .. } => Status::out_of_range(err.to_string()),
            CacheError::InvalidCapacity => Status::internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonic::Code;

    #[test]
    fn test_status_codes() {
        let now = Utc::now();
        assert_eq!(Status::from(CacheError::NotFound).code(), Code::NotFound);
        assert_eq!(
            Status::from(CacheError::InvalidRange { from: now, to: now }).code(),
            Code::InvalidArgument
        );
        assert_eq!(
            Status::from(CacheError::OutOfBounds {
                from: now,
                to: now,
                available: None
            })
            .code(),
            Code::OutOfRange
        );
    }

    #[test]
    fn test_out_of_bounds_message_carries_window() {
        let min = DateTime::from_timestamp_nanos(1_000);
        let max = DateTime::from_timestamp_nanos(2_000);
        let err = CacheError::OutOfBounds {
            from: DateTime::from_timestamp_nanos(5_000),
            to: DateTime::from_timestamp_nanos(6_000),
            available: Some(TimeBounds { min, max }),
        };

        let message = err.to_string();
        assert!(message.contains("timestamp: 1000"));
        assert!(message.contains("timestamp: 2000"));

        let empty = CacheError::OutOfBounds {
            from: min,
            to: max,
            available: None,
        };
        assert!(empty.to_string().contains("no data is retained"));
    }
}
