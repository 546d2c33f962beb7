//! Read-only query boundary over a [`TelemetryCache`].
//!
//! This is the layer every transport goes through. It exposes exactly two
//! reads and no writes.

use crate::error::CacheError;
use crate::record::Record;
use crate::store::TelemetryCache;
use chrono::{DateTime, Utc};
use futures::stream::{self, Stream};
use std::sync::Arc;

#[derive(Clone)]
pub struct TelemetryQuery {
    cache: Arc<dyn TelemetryCache>,
}

impl TelemetryQuery {
    pub fn new(cache: Arc<dyn TelemetryCache>) -> Self {
        Self { cache }
    }

    /// Returns the most recent record, or `CacheError::NotFound` if nothing
    /// is retained.
    pub fn get_latest(&self) -> Result<Record, CacheError> {
        self.cache.latest().ok_or(CacheError::NotFound)
    }

    /// Streams every retained record strictly between `from` and `to`.
    ///
    /// The range is evaluated against the cache before this returns, so
    /// validation errors surface immediately and the cache lock is not held
    /// while the caller drains the stream.
    pub fn get_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<impl Stream<Item = Record> + Send + 'static, CacheError> {
        let records = self.cache.range(from, to)?;
        tracing::debug!(
            from = %from,
            to = %to,
            matched = records.len(),
            "range query evaluated"
        );
        Ok(stream::iter(records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RecordStore;
    use chrono::Duration;
    use futures::StreamExt;

    fn query_with_capacity(capacity: usize) -> (Arc<RecordStore>, TelemetryQuery) {
        let store = Arc::new(RecordStore::new(capacity).unwrap());
        let query = TelemetryQuery::new(store.clone());
        (store, query)
    }

    #[test]
    fn test_get_latest_data() {
        let (store, query) = query_with_capacity(10);
        let data = Record::new(1, 10, 50.4500, 30.5233);
        store.insert(data);

        assert_eq!(query.get_latest().unwrap(), data);
    }

    #[test]
    fn test_get_latest_not_found() {
        let (_store, query) = query_with_capacity(10);
        assert_eq!(query.get_latest().unwrap_err(), CacheError::NotFound);
    }

    #[tokio::test]
    async fn test_get_range_data_streams_matches() {
        let (store, query) = query_with_capacity(10);
        let now = Utc::now();
        store.insert(Record::at(1, now - Duration::seconds(5), 10, 50.4500, 30.5233));
        store.insert(Record::at(1, now, 20, 50.4510, 30.5240));

        let records: Vec<Record> = query
            .get_range(now - Duration::seconds(20), now + Duration::seconds(20))
            .unwrap()
            .collect()
            .await;
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_get_range_errors_are_immediate() {
        let (_store, query) = query_with_capacity(10);
        let now = Utc::now();

        assert!(matches!(
            query.get_range(now, now - Duration::seconds(1)),
            Err(CacheError::InvalidRange { .. })
        ));
        assert!(matches!(
            query.get_range(now - Duration::seconds(1), now),
            Err(CacheError::OutOfBounds { available: None, .. })
        ));
    }
}
