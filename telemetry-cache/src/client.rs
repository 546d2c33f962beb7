//! Flight client for the telemetry query service.

use crate::record::Record;
use crate::schema::decode_record_batch;
use crate::service::QueryCommand;
use arrow_flight::FlightClient;
use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use tonic::transport::Channel;
use tonic::Status;

pub struct TelemetryClient {
    inner: FlightClient,
}

impl TelemetryClient {
    /// Connects to a query service, e.g. `http://127.0.0.1:50051`.
    pub async fn connect(url: impl Into<String>) -> Result<Self, Status> {
        let channel = Channel::from_shared(url.into())
            .map_err(|e| Status::invalid_argument(format!("Invalid endpoint: {}", e)))?
            .connect()
            .await
            .map_err(|e| Status::unavailable(format!("Failed to connect: {}", e)))?;
        Ok(Self::new(channel))
    }

    pub fn new(channel: Channel) -> Self {
        Self {
            inner: FlightClient::new(channel),
        }
    }

    /// Fetches the most recent record.
    pub async fn latest(&mut self) -> Result<Record, Status> {
        let mut records = Box::pin(self.fetch(QueryCommand::Latest).await?);
        match records.next().await {
            Some(record) => record,
            None => Err(Status::not_found("no data available")),
        }
    }

    /// Streams every record strictly between `from` and `to`.
    pub async fn range(
        &mut self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<impl Stream<Item = Result<Record, Status>>, Status> {
        let nanos = |ts: DateTime<Utc>| {
            ts.timestamp_nanos_opt()
                .ok_or_else(|| Status::invalid_argument(format!("Timestamp {} is not representable", ts)))
        };
        let command = QueryCommand::Range {
            from_ns: nanos(from)?,
            to_ns: nanos(to)?,
        };
        self.fetch(command).await
    }

    async fn fetch(
        &mut self,
        command: QueryCommand,
    ) -> Result<impl Stream<Item = Result<Record, Status>>, Status> {
        let mut batches = self
            .inner
            .do_get(command.to_ticket()?)
            .await
            .map_err(Status::from)?;

        Ok(async_stream::try_stream! {
            while let Some(batch) = batches.next().await {
                let batch = batch.map_err(Status::from)?;
                for record in decode_record_batch(&batch)? {
                    yield record;
                }
            }
        })
    }
}
